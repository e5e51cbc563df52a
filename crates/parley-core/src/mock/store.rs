use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::store::ConversationStore;
use crate::types::{ConversationAddress, ConversationMessage};
use crate::{Error, Result, TRACING_TARGET_STORE};

const UPDATE_CHANNEL_CAPACITY: usize = 1024;

/// A single successful write observed by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreUpdate {
    /// Address that was written.
    pub address: ConversationAddress,
    /// Value that was written.
    pub value: ConversationMessage,
}

/// In-memory conversation store that records every write.
///
/// Clones share state. Writes can be made to fail by attempt index with
/// [`MemoryStore::fail_write`]; failed attempts are counted but neither
/// stored nor broadcast.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

struct MemoryStoreInner {
    state: Mutex<MemoryState>,
    updates: broadcast::Sender<StoreUpdate>,
}

#[derive(Default)]
struct MemoryState {
    entries: HashMap<ConversationAddress, ConversationMessage>,
    log: Vec<StoreUpdate>,
    attempts: usize,
    failing: HashSet<usize>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(MemoryStoreInner {
                state: Mutex::new(MemoryState::default()),
                updates,
            }),
        }
    }

    /// Makes the write attempt with the given zero-based index fail.
    pub fn fail_write(self, attempt: usize) -> Self {
        self.lock().failing.insert(attempt);
        self
    }

    /// Returns the latest value stored at `address`.
    pub fn get(&self, address: &ConversationAddress) -> Option<ConversationMessage> {
        self.lock().entries.get(address).cloned()
    }

    /// Returns every successful write in order.
    pub fn writes(&self) -> Vec<StoreUpdate> {
        self.lock().log.clone()
    }

    /// Returns the successful writes to `address` in order.
    pub fn writes_for(&self, address: &ConversationAddress) -> Vec<ConversationMessage> {
        self.lock()
            .log
            .iter()
            .filter(|update| &update.address == address)
            .map(|update| update.value.clone())
            .collect()
    }

    /// Returns the number of write attempts, failed ones included.
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    /// Subscribes to successful writes made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreUpdate> {
        self.inner.updates.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn set(&self, address: &ConversationAddress, value: &ConversationMessage) -> Result<()> {
        let update = {
            let mut state = self.lock();
            let attempt = state.attempts;
            state.attempts += 1;

            if state.failing.contains(&attempt) {
                return Err(Error::store().with_message(format!("write {attempt} rejected")));
            }

            let update = StoreUpdate {
                address: address.clone(),
                value: value.clone(),
            };
            state.entries.insert(address.clone(), value.clone());
            state.log.push(update.clone());
            update
        };

        tracing::trace!(
            target: TRACING_TARGET_STORE,
            address = %address,
            status = %value.status,
            "Stored message"
        );

        // No subscribers is fine.
        let _ = self.inner.updates.send(update);
        Ok(())
    }
}
