//! NATS Key-Value store operations.
//!
//! This module provides type-safe abstractions over NATS KV:
//! - `KvStore<K, V, B>`: Generic type-safe key-value operations
//! - `KvKey`: Trait for key types
//! - `KvBucket`: Trait for bucket configuration
//!
//! The conversation store is the `KvStore` instantiation holding one
//! `ConversationMessage` per assistant message:
//!
//! ```ignore
//! let store: ConversationKvStore = nats_client.conversation_store().await?;
//! store.set(&address, &ConversationMessage::streaming("")).await?;
//! let mut updates = store.watch_conversation("c1").await?;
//! ```

mod conversation_store;
mod kv_bucket;
mod kv_key;
mod kv_store;

pub use conversation_store::ConversationKvStore;
pub use kv_bucket::{ConversationBucket, KvBucket};
pub use kv_key::{KvKey, MessageKey};
pub use kv_store::{KvEntry, KvStore, KvUpdate, KvWatch};
