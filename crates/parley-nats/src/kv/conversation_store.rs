//! Conversation store backed by the `conversation` KV bucket.

use async_trait::async_trait;
use parley_core::{ConversationAddress, ConversationMessage, ConversationStore};

use super::{ConversationBucket, KvStore, KvWatch, MessageKey};
use crate::{Result, TRACING_TARGET_KV};

/// KV store holding the latest state of every assistant message.
pub type ConversationKvStore = KvStore<MessageKey, ConversationMessage, ConversationBucket>;

impl KvStore<MessageKey, ConversationMessage, ConversationBucket> {
    /// Follows one message, starting with its current state.
    pub async fn watch_message(
        &self,
        address: &ConversationAddress,
    ) -> Result<KvWatch<MessageKey, ConversationMessage>> {
        self.watch_with_history(&MessageKey::from(address.clone()))
            .await
    }

    /// Follows every message of a conversation, starting with current states.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    pub async fn watch_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<KvWatch<MessageKey, ConversationMessage>> {
        self.watch_filter(&MessageKey::conversation_filter(conversation_id))
            .await
    }
}

#[async_trait]
impl ConversationStore for KvStore<MessageKey, ConversationMessage, ConversationBucket> {
    async fn set(
        &self,
        address: &ConversationAddress,
        value: &ConversationMessage,
    ) -> parley_core::Result<()> {
        self.put(&MessageKey::from(address.clone()), value).await?;
        Ok(())
    }
}
