use crate::adapters::onebot::LockedWriter;
use crate::event::{Context, EventType};
use crate::plugins::PluginError;
use crate::{debug, info};
use futures_util::future::BoxFuture;

/// 入站消息日志。出站日志在 send_msg 中统一输出。
pub fn handle(
    ctx: Context,
    _writer: LockedWriter,
) -> BoxFuture<'static, Result<Option<Context>, PluginError>> {
    Box::pin(async move {
        let debug_on = {
            let guard = ctx.config.read().unwrap();
            guard.logger.debug
        };

        if let EventType::Onebot(ev) = &ctx.event {
            if debug_on {
                debug!(target: "Logger", "ev: {:?}", ev);
            }

            if let Some(msg) = ctx.as_message() {
                let sender = format!("{}({})", msg.sender_name(), msg.user_id());

                if let Some(gid) = msg.group_id() {
                    info!(
                        target: "Chat",
                        "接收 <- 群聊 [Group({})] [{}] {}",
                        gid, sender, msg.text()
                    );
                } else {
                    info!(target: "Chat", "接收 <- 私聊 [{}] {}", sender, msg.text());
                }
            } else if let Some(post_type) = ctx.post_type() {
                // 过滤心跳日志，减少干扰
                if post_type != "meta_event" {
                    debug!(target: "Event", "Type: {}", post_type);
                }
            }
        }

        Ok(Some(ctx))
    })
}
