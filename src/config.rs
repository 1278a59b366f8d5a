use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::info;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    // 全局指令前缀（支持多个，如 ["/", "#"]）
    #[serde(default = "default_prefix")]
    pub command_prefix: Vec<String>,

    // Bot 连接配置
    #[serde(default)]
    pub bot: BotConfig,

    // 插件配置
    #[serde(default)]
    pub logger: LoggerConfig,

    #[serde(default)]
    pub battlefield: BattlefieldConfig,
}

impl AppConfig {
    pub async fn save(&self, path: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string).await?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_prefix(),
            bot: BotConfig::default(),
            logger: LoggerConfig::default(),
            battlefield: BattlefieldConfig::default(),
        }
    }
}

/// 读取配置文件；不存在时写出默认配置并以默认值启动
pub async fn load_or_create(path: &str) -> anyhow::Result<AppConfig> {
    match fs::read_to_string(path).await {
        Ok(content) => {
            let config: AppConfig = toml::from_str(&content)?;
            info!(target: "Config", "已加载配置: {}", path);
            Ok(config)
        }
        Err(_) => {
            let config = AppConfig::default();
            config
                .save(path)
                .await
                .map_err(|e| anyhow::anyhow!("写出默认配置失败: {}", e))?;
            info!(target: "Config", "未找到配置文件，已生成默认配置: {}", path);
            Ok(config)
        }
    }
}

fn default_prefix() -> Vec<String> {
    vec!["/".to_string()]
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BotConfig {
    // 是否启用连接（默认禁用以防误连）
    #[serde(default)]
    pub enabled: bool,

    // OneBot 正向 WebSocket 地址
    #[serde(default = "default_bot_url")]
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_bot_url(),
            access_token: Some("YOUR_TOKEN_HERE".to_string()),
        }
    }
}

fn default_bot_url() -> String {
    "ws://127.0.0.1:3001".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub debug: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debug: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BattlefieldConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    // 未显式指定、渠道也未绑定时查询的游戏代号
    #[serde(default = "default_game")]
    pub default_game: String,

    // Gametools API 超时（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    // 战绩图片的 JPEG 质量 (1-100)
    #[serde(default = "default_quality")]
    pub img_quality: u8,
}

impl Default for BattlefieldConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_game: default_game(),
            timeout_secs: default_timeout(),
            img_quality: default_quality(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_game() -> String {
    "bfv".to_string()
}

fn default_timeout() -> u64 {
    15
}

fn default_quality() -> u8 {
    90
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.command_prefix, vec!["/".to_string()]);
        assert_eq!(cfg.battlefield.default_game, "bfv");
        assert_eq!(cfg.battlefield.timeout_secs, 15);
        assert_eq!(cfg.battlefield.img_quality, 90);
        assert!(!cfg.bot.enabled);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [battlefield]
            default_game = "bf1"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.battlefield.default_game, "bf1");
        assert_eq!(cfg.battlefield.timeout_secs, 15);
        assert!(cfg.logger.enabled);
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = AppConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.battlefield.default_game, cfg.battlefield.default_game);
        assert_eq!(back.bot.url, cfg.bot.url);
    }
}
