#![allow(dead_code)]

use serde::Serialize;
use simd_json::owned::{Object, Value};

/// 消息段 (Segment)
#[derive(Debug, Serialize, Clone)]
pub struct Segment {
    #[serde(rename = "type")]
    pub type_: String,
    pub data: Object,
}

impl Segment {
    pub fn new(type_: &str, data: Object) -> Self {
        Self {
            type_: type_.to_string(),
            data,
        }
    }
}

/// 消息链 (Message Chain)
#[derive(Debug, Serialize, Clone, Default)]
pub struct Message(pub Vec<Segment>);

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(mut self, type_: &str, data: Object) -> Self {
        self.0.push(Segment::new(type_, data));
        self
    }

    /// 纯文本
    pub fn text(self, text: impl Into<String>) -> Self {
        let mut data = Object::new();
        data.insert("text".into(), Value::from(text.into()));
        self.add("text", data)
    }

    /// 图片
    /// - `file`: 图片文件名、URL、Base64 或文件路径
    pub fn image(self, file: impl Into<String>) -> Self {
        let mut data = Object::new();
        data.insert("file".into(), Value::from(file.into()));
        self.add("image", data)
    }

    /// @某人
    pub fn at(self, user_id: impl ToString) -> Self {
        let mut data = Object::new();
        data.insert("qq".into(), Value::from(user_id.to_string()));
        self.add("at", data)
    }

    /// 回复消息
    pub fn reply(self, message_id: impl ToString) -> Self {
        let mut data = Object::new();
        data.insert("id".into(), Value::from(message_id.to_string()));
        self.add("reply", data)
    }
}

// 允许直接从字符串转换为纯文本消息
impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::new().text(s)
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::new().text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_reply_image_chain() {
        let msg = Message::new().reply(42).image("base64://abcd");
        assert_eq!(msg.0.len(), 2);
        assert_eq!(msg.0[0].type_, "reply");
        assert_eq!(msg.0[1].type_, "image");
    }

    #[test]
    fn serializes_onebot_segments() {
        let msg = Message::new().text("hello");
        let json = simd_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"text""#));
        assert!(json.contains(r#""text":"hello""#));
    }
}
