//! Conversation message published to the state store.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageSender {
    /// Message written by the end user.
    User,
    /// Message produced by the language model.
    Assistant,
}

/// Publication status of a conversation message.
///
/// The only transition is `Streaming` to `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageStatus {
    /// The response is still growing.
    Streaming,
    /// The response reached its terminal state.
    Completed,
}

impl MessageStatus {
    /// Returns true if no further writes follow this status.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// State of one conversation message as observed by watchers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Cumulative text produced so far.
    pub message: String,
    /// Author of the message.
    pub from: MessageSender,
    /// Publication status.
    pub status: MessageStatus,
    /// Time of this particular write.
    pub timestamp: Timestamp,
}

impl ConversationMessage {
    /// Creates an assistant message in the `streaming` state, stamped now.
    pub fn streaming(message: impl Into<String>) -> Self {
        Self::assistant(message, MessageStatus::Streaming)
    }

    /// Creates an assistant message in the `completed` state, stamped now.
    pub fn completed(message: impl Into<String>) -> Self {
        Self::assistant(message, MessageStatus::Completed)
    }

    fn assistant(message: impl Into<String>, status: MessageStatus) -> Self {
        Self {
            message: message.into(),
            from: MessageSender::Assistant,
            status,
            timestamp: Timestamp::now(),
        }
    }

    /// Returns true if this is the terminal state of the message.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }
}
