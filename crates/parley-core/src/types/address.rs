//! Store addresses for conversation messages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Address of one conversation message in the state store.
///
/// Both identifiers are opaque caller-supplied strings; any value, the
/// empty string included, is a valid identifier. Exactly one
/// session writes to a given address at a time; this is a precondition of
/// the caller and is not checked here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAddress {
    conversation_id: String,
    message_id: String,
}

impl ConversationAddress {
    /// Creates an address from two opaque identifiers.
    pub fn new(conversation_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message_id: message_id.into(),
        }
    }

    /// Returns the conversation identifier (partition key).
    #[inline]
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Returns the message identifier (item key).
    #[inline]
    pub fn message_id(&self) -> &str {
        &self.message_id
    }
}

impl fmt::Display for ConversationAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.conversation_id, self.message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_accessors() {
        let address = ConversationAddress::new("c1", "m1");
        assert_eq!(address.conversation_id(), "c1");
        assert_eq!(address.message_id(), "m1");
        assert_eq!(address.to_string(), "c1/m1");
    }

    #[test]
    fn test_empty_ids_are_distinct_addresses() {
        let empty_conversation = ConversationAddress::new("", "m1");
        let empty_message = ConversationAddress::new("c1", "");
        assert_eq!(empty_conversation.conversation_id(), "");
        assert_eq!(empty_message.message_id(), "");
        assert_ne!(empty_conversation, empty_message);
        assert_ne!(empty_conversation, ConversationAddress::new("", ""));
    }

    #[test]
    fn test_addresses_with_same_conversation_differ() {
        let a = ConversationAddress::new("c1", "m1");
        let b = ConversationAddress::new("c1", "m2");
        assert_ne!(a, b);
    }
}
