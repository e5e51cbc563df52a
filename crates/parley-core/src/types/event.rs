//! Inbound chat-message event.

use serde::{Deserialize, Serialize};

use super::ConversationAddress;

/// Chat message event that starts one response session.
///
/// Field names follow the wire format of the event bus (`camelCase`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageEvent {
    /// Free text sent by the user.
    pub message: String,
    /// Conversation the reply belongs to.
    pub conversation_id: String,
    /// Message id reserved for the assistant reply.
    pub assistant_message_id: String,
}

impl ChatMessageEvent {
    /// Creates a new chat message event.
    pub fn new(
        message: impl Into<String>,
        conversation_id: impl Into<String>,
        assistant_message_id: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            conversation_id: conversation_id.into(),
            assistant_message_id: assistant_message_id.into(),
        }
    }

    /// Returns the store address of the assistant reply.
    pub fn address(&self) -> ConversationAddress {
        ConversationAddress::new(&self.conversation_id, &self.assistant_message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let json = r#"{"message":"Hi","conversationId":"c1","assistantMessageId":"m1"}"#;
        let event: ChatMessageEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, ChatMessageEvent::new("Hi", "c1", "m1"));

        let address = event.address();
        assert_eq!(address.conversation_id(), "c1");
        assert_eq!(address.message_id(), "m1");
    }

    #[test]
    fn test_event_missing_field_is_rejected() {
        let json = r#"{"message":"Hi","conversationId":"c1"}"#;
        assert!(serde_json::from_str::<ChatMessageEvent>(json).is_err());
    }

    #[test]
    fn test_event_with_empty_id_is_addressable() {
        let event = ChatMessageEvent::new("Hi", "", "m1");
        assert_eq!(event.address(), ConversationAddress::new("", "m1"));
    }
}
