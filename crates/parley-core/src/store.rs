//! Conversation state store contract.

use std::sync::Arc;

use crate::Result;
use crate::types::{ConversationAddress, ConversationMessage};

/// Addressable store that publishes conversation messages to watchers.
///
/// `set` replaces the value at `address` and makes it visible to every
/// watcher of that address. The aggregator treats each `set` as a completed
/// step and never issues the next write before the previous one returns,
/// so implementations need no per-key ordering of their own.
#[async_trait::async_trait]
pub trait ConversationStore: Send + Sync {
    /// Replaces the message stored at `address`.
    async fn set(&self, address: &ConversationAddress, value: &ConversationMessage) -> Result<()>;
}

#[async_trait::async_trait]
impl<T> ConversationStore for Arc<T>
where
    T: ConversationStore + ?Sized,
{
    async fn set(&self, address: &ConversationAddress, value: &ConversationMessage) -> Result<()> {
        (**self).set(address, value).await
    }
}
