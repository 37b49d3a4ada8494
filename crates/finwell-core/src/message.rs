//! Chat transport payloads.
//!
//! Inbound content is decoded once into [`MessageContent`]; unrecognized content types become
//! [`MessageContent::Unknown`] instead of failing the whole message.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, UtcDateTime};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessageContent {
    Text { text: String },
    StartSession,
    EndSession,
    #[serde(other)]
    Unknown,
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub timestamp: UtcDateTime,
    pub msg_id: Uuid,
    pub content: Vec<MessageContent>,
}

impl ChatMessage {
    pub fn new(content: Vec<MessageContent>) -> Self {
        Self {
            timestamp: UtcDateTime::now(),
            msg_id: Uuid::new_v4(),
            content,
        }
    }

    /// Plain text reply, optionally closing the session.
    pub fn reply(text: impl Into<String>, end_session: bool) -> Self {
        let mut content = vec![MessageContent::text(text)];
        if end_session {
            content.push(MessageContent::EndSession);
        }
        Self::new(content)
    }

    pub fn from_json(input: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|item| match item {
            MessageContent::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn starts_session(&self) -> bool {
        self.content.contains(&MessageContent::StartSession)
    }

    pub fn ends_session(&self) -> bool {
        self.content.contains(&MessageContent::EndSession)
    }

    pub fn acknowledge(&self) -> ChatAcknowledgement {
        ChatAcknowledgement {
            timestamp: UtcDateTime::now(),
            acknowledged_msg_id: self.msg_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAcknowledgement {
    pub timestamp: UtcDateTime,
    pub acknowledged_msg_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_and_unknown_content_types() {
        let message = ChatMessage::from_json(
            r#"{
                "timestamp": "2024-01-01T00:00:00Z",
                "msg_id": "123e4567-e89b-42d3-a456-426614174000",
                "content": [
                    {"type": "start-session"},
                    {"type": "text", "text": "price of eth"},
                    {"type": "resource", "resource_id": "abc"}
                ]
            }"#,
        )
        .expect("must decode");

        assert!(message.starts_session());
        assert_eq!(message.first_text(), Some("price of eth"));
        assert_eq!(message.content[2], MessageContent::Unknown);
    }

    #[test]
    fn reply_can_close_session() {
        let reply = ChatMessage::reply("bye", true);
        assert_eq!(reply.first_text(), Some("bye"));
        assert!(reply.ends_session());
        assert_eq!(reply.msg_id.get_version_num(), 4);
    }

    #[test]
    fn acknowledgement_references_message_id() {
        let message = ChatMessage::reply("hi", false);
        assert_eq!(message.acknowledge().acknowledged_msg_id, message.msg_id);
    }

    #[test]
    fn text_content_serializes_with_type_tag() {
        let value = serde_json::to_value(MessageContent::text("hi")).expect("serializes");
        assert_eq!(value["type"], "text");
        assert_eq!(value["text"], "hi");
    }
}
