#![allow(dead_code)]

use crate::config::AppConfig;
use crate::plugins::battlefield::api::ApiClient;
use sea_orm::DatabaseConnection;
use simd_json::OwnedValue;
use simd_json::derived::{ValueObjectAccess, ValueObjectAccessAsScalar};
use std::sync::{Arc, RwLock};

pub type Event = OwnedValue;

/// 统一的上下文：事件数据 + 全局共享资源。
/// db 与 api 均为启动时创建、全程复用的单例句柄。
#[derive(Clone)]
pub struct Context {
    pub event: EventType,
    pub config: Arc<RwLock<AppConfig>>,
    pub db: DatabaseConnection,
    pub api: Arc<ApiClient>,
}

impl Context {
    /// 尝试将当前事件视为 OneBot 消息事件
    pub fn as_message(&self) -> Option<MessageEvent<'_>> {
        if let EventType::Onebot(event) = &self.event
            && event.get_str("post_type") == Some("message")
        {
            return Some(MessageEvent(event));
        }
        None
    }

    /// 获取事件的 post_type（如果是 OneBot 事件）
    pub fn post_type(&self) -> Option<&str> {
        if let EventType::Onebot(event) = &self.event {
            event.get_str("post_type")
        } else {
            None
        }
    }
}

/// 事件类型
#[derive(Debug, Clone)]
pub enum EventType {
    /// 来自 OneBot 的原始事件
    Onebot(Event),
    /// 系统初始化事件
    Init,
}

/// 消息事件封装，提供便捷的强类型访问
pub struct MessageEvent<'a>(pub &'a Event);

impl<'a> MessageEvent<'a> {
    /// 获取群号（如果是群消息）
    pub fn group_id(&self) -> Option<i64> {
        self.0
            .get_i64("group_id")
            .or_else(|| self.0.get_u64("group_id").map(|v| v as i64))
    }

    /// 获取用户 ID
    pub fn user_id(&self) -> i64 {
        self.0
            .get_i64("user_id")
            .or_else(|| self.0.get_u64("user_id").map(|v| v as i64))
            .unwrap_or(0)
    }

    /// 获取消息 ID
    pub fn message_id(&self) -> i64 {
        self.0
            .get_i64("message_id")
            .or_else(|| self.0.get_u64("message_id").map(|v| v as i64))
            .unwrap_or(0)
    }

    /// 获取纯文本内容 (raw_message)
    pub fn text(&self) -> &'a str {
        self.0.get_str("raw_message").unwrap_or("")
    }

    /// 是否为群消息
    pub fn is_group(&self) -> bool {
        self.0.get_str("message_type") == Some("group")
    }

    /// 获取发送者昵称
    pub fn sender_nickname(&self) -> Option<&'a str> {
        self.0.get("sender").and_then(|s| s.get_str("nickname"))
    }

    /// 获取发送者群名片（为空则返回 None）
    pub fn sender_card(&self) -> Option<&'a str> {
        self.0
            .get("sender")
            .and_then(|s| s.get_str("card"))
            .filter(|s| !s.is_empty())
    }

    /// 获取发送者显示名称（优先名片，其次昵称）
    pub fn sender_name(&self) -> &'a str {
        self.sender_card()
            .or_else(|| self.sender_nickname())
            .unwrap_or("Unknown")
    }

    /// 获取发送者角色 (owner, admin, member)
    pub fn sender_role(&self) -> Option<&'a str> {
        self.0.get("sender").and_then(|s| s.get_str("role"))
    }

    /// 参数解析时使用的会话渠道标识：群聊取群号，私聊取发送者 QQ 号
    pub fn channel_id(&self) -> String {
        match self.group_id() {
            Some(gid) if self.is_group() => gid.to_string(),
            _ => self.user_id().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_from(json: &str) -> Event {
        let mut bytes = json.as_bytes().to_vec();
        simd_json::to_owned_value(&mut bytes).unwrap()
    }

    #[test]
    fn channel_id_uses_group_for_group_chat() {
        let ev = event_from(
            r#"{"post_type":"message","message_type":"group","group_id":123,"user_id":456}"#,
        );
        let msg = MessageEvent(&ev);
        assert_eq!(msg.channel_id(), "123");
    }

    #[test]
    fn channel_id_uses_sender_for_private_chat() {
        let ev =
            event_from(r#"{"post_type":"message","message_type":"private","user_id":456}"#);
        let msg = MessageEvent(&ev);
        assert_eq!(msg.channel_id(), "456");
        assert!(!msg.is_group());
    }

    #[test]
    fn sender_name_prefers_card() {
        let ev = event_from(
            r#"{"post_type":"message","user_id":1,"sender":{"nickname":"nick","card":"card","role":"admin"}}"#,
        );
        let msg = MessageEvent(&ev);
        assert_eq!(msg.sender_name(), "card");
        assert_eq!(msg.sender_role(), Some("admin"));
    }
}
