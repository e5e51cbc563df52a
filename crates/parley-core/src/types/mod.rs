//! Conversation data model shared by the aggregator and store adapters.

mod address;
mod event;
mod message;

pub use address::ConversationAddress;
pub use event::ChatMessageEvent;
pub use message::{ConversationMessage, MessageSender, MessageStatus};
