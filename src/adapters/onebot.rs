use crate::config::{AppConfig, BotConfig};
use crate::event::{Context, Event, EventType};
use crate::plugins::battlefield::api::ApiClient;
use crate::{error, info, plugins, warn};
use futures_util::{Sink, SinkExt, StreamExt};
use http::HeaderValue;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, protocol::Message as WsMessage},
};

pub type BotError = Box<dyn std::error::Error + Send + Sync>;

pub type TraitSink =
    Box<dyn Sink<WsMessage, Error = tokio_tungstenite::tungstenite::Error> + Send + Unpin>;
pub type LockedWriter = Arc<AsyncMutex<TraitSink>>;

#[derive(Serialize)]
struct ActionFrame<T> {
    action: &'static str,
    params: T,
}

#[derive(Serialize)]
struct SendParams<M> {
    message_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<i64>,
    message: M,
}

/// OneBot 协议的主循环：断线后 3 秒重连
pub async fn run_bot_loop(
    bot_config: BotConfig,
    global_config: Arc<RwLock<AppConfig>>,
    db: DatabaseConnection,
    api: Arc<ApiClient>,
) {
    loop {
        match connect_and_listen(&bot_config, global_config.clone(), db.clone(), api.clone()).await
        {
            Ok(()) => warn!(target: "Bot", "Bot [{}] 连接断开，3秒后重连...", bot_config.url),
            Err(e) => {
                error!(target: "Bot", "Bot [{}] 连接失败: {}。3秒后重试...", bot_config.url, e)
            }
        }
        tokio::time::sleep(Duration::from_secs(3)).await;
    }
}

async fn connect_and_listen(
    config: &BotConfig,
    global_config: Arc<RwLock<AppConfig>>,
    db: DatabaseConnection,
    api: Arc<ApiClient>,
) -> Result<(), BotError> {
    let mut request = config.url.as_str().into_client_request()?;

    if let Some(token) = &config.access_token
        && !token.is_empty()
    {
        let token_header = format!("Bearer {}", token);
        request
            .headers_mut()
            .insert("Authorization", HeaderValue::from_str(&token_header)?);
    }

    let (ws_stream, _) = connect_async(request).await?;
    info!(target: "Bot", "Bot [{}] 连接成功！(OneBot)", config.url);

    let (write_half, mut read_half) = ws_stream.split();
    let writer: LockedWriter = Arc::new(AsyncMutex::new(Box::new(write_half)));

    while let Some(message) = read_half.next().await {
        match message {
            Ok(WsMessage::Text(text)) => {
                let mut data = text.as_bytes().to_vec();

                let writer = writer.clone();
                let global_config = global_config.clone();
                let db = db.clone();
                let api = api.clone();

                tokio::spawn(async move {
                    if let Err(e) =
                        process_frame(&mut data, writer, global_config, db, api).await
                    {
                        error!(target: "Bot", "事件处理失败: {}", e);
                    }
                });
            }
            Ok(WsMessage::Close(_)) => return Ok(()),
            Err(e) => return Err(Box::new(e)),
            _ => {}
        }
    }
    Ok(())
}

async fn process_frame(
    data: &mut [u8],
    writer: LockedWriter,
    config: Arc<RwLock<AppConfig>>,
    db: DatabaseConnection,
    api: Arc<ApiClient>,
) -> Result<(), BotError> {
    // 非 JSON 帧直接忽略
    let event: Event = match simd_json::to_owned_value(data) {
        Ok(v) => v,
        Err(_) => return Ok(()),
    };

    let ctx = Context {
        event: EventType::Onebot(event),
        config,
        db,
        api,
    };

    plugins::run(ctx, writer).await
}

/// 发送消息；群号优先于用户号
pub async fn send_msg<M>(
    writer: LockedWriter,
    group_id: Option<i64>,
    user_id: Option<i64>,
    message: M,
) -> Result<(), BotError>
where
    M: Serialize,
{
    let (msg_type, target_group, target_user) = if let Some(gid) = group_id.filter(|&id| id != 0) {
        ("group", Some(gid), None)
    } else if let Some(uid) = user_id.filter(|&id| id != 0) {
        ("private", None, Some(uid))
    } else {
        return Ok(());
    };

    let frame = ActionFrame {
        action: "send_msg",
        params: SendParams {
            message_type: msg_type,
            group_id: target_group,
            user_id: target_user,
            message,
        },
    };
    let json_str = simd_json::to_string(&frame)?;

    if msg_type == "group" {
        info!(target: "Chat", "发送 -> 群聊 [Group({})]", target_group.unwrap_or(0));
    } else {
        info!(target: "Chat", "发送 -> 私聊 [User({})]", target_user.unwrap_or(0));
    }

    send_frame_raw(writer, json_str).await
}

pub async fn send_frame_raw(writer: LockedWriter, json_str: String) -> Result<(), BotError> {
    let mut guard = writer.lock().await;
    guard.send(WsMessage::Text(json_str.into())).await?;
    Ok(())
}
