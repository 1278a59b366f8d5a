use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

use crate::{error, info};

pub const API_SITE: &str = "https://api.gametools.network/";

/// HTTP 边界的错误分类。三种失败各自独立上报，
/// Display 文案即最终回复给用户的文本。
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API调用失败: 网络请求异常")]
    Transport(#[source] reqwest::Error),

    #[error("API调用失败: 请求超时（{0}秒内未收到响应）")]
    Timeout(u64),

    #[error("API调用失败: 响应不是合法JSON")]
    InvalidBody(#[source] serde_json::Error),
}

/// Gametools API 客户端。
/// 启动时创建一次，连接池随实例全程复用，销毁时一并释放。
pub struct ApiClient {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl ApiClient {
    pub fn new(timeout_secs: u64) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(ApiError::Transport)?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }

    /// GET {API_SITE}{game}/{prop}?{params}
    ///
    /// 无论状态码如何，响应体都按 JSON 解析并连同真实状态码一起返回；
    /// 上游的业务失败（非 200 + 结构化错误体）由调用方检查 `is_ok` 区分。
    pub async fn get(
        &self,
        game: &str,
        prop: &str,
        params: &[(&str, &str)],
    ) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}/{}", API_SITE, game, prop);
        info!(target: "BfApi", "请求 Gametools API: {}，参数: {:?}", url, params);

        let resp = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let code = resp.status().as_u16();
        let bytes = resp.bytes().await.map_err(|e| self.classify(e))?;
        let fields: Map<String, Value> =
            serde_json::from_slice(&bytes).map_err(ApiError::InvalidBody)?;

        let resp = ApiResponse { code, fields };
        if !resp.is_ok() {
            error!(
                target: "BfApi",
                "调用接口失败，状态码 {}，错误信息: {:?}",
                code,
                resp.errors()
            );
        }
        Ok(resp)
    }

    fn classify(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.timeout_secs)
        } else {
            ApiError::Transport(e)
        }
    }
}

/// 带状态标记的响应载荷
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub code: u16,
    pub fields: Map<String, Value>,
}

impl ApiResponse {
    pub fn is_ok(&self) -> bool {
        self.code == 200
    }

    pub fn errors(&self) -> Vec<&str> {
        self.fields
            .get("errors")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// 上游报告的第一条错误原文；错误体缺失时退化为状态码提示
    pub fn first_error(&self) -> String {
        self.errors()
            .first()
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("接口返回异常状态: {}", self.code))
    }
}
