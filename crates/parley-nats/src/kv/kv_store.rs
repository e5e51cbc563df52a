//! Type-safe NATS KV store wrapper.

use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_nats::jetstream::{self, kv};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{KvBucket, KvKey};
use crate::{Error, Result, TRACING_TARGET_KV};

/// Type-safe NATS KV store wrapper.
///
/// This store is generic over:
/// - `K`: The key type (determines key formatting)
/// - `V`: The value type to store (must be serializable)
/// - `B`: The bucket configuration (determines name, description, TTL)
#[derive(Clone)]
pub struct KvStore<K, V, B>
where
    K: KvKey,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    B: KvBucket,
{
    store: kv::Store,
    _key: PhantomData<K>,
    _value: PhantomData<V>,
    _bucket: PhantomData<B>,
}

impl<K, V, B> KvStore<K, V, B>
where
    K: KvKey,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    B: KvBucket,
{
    /// Create or get a KV bucket using the bucket configuration.
    #[tracing::instrument(skip(jetstream), target = TRACING_TARGET_KV)]
    pub(crate) async fn new(jetstream: &jetstream::Context) -> Result<Self> {
        let ttl = B::TTL.unwrap_or_default();

        let store = match jetstream.get_key_value(B::NAME).await {
            Ok(store) => {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    bucket = %B::NAME,
                    "Using existing KV bucket"
                );
                store
            }
            Err(_) => {
                tracing::debug!(
                    target: TRACING_TARGET_KV,
                    bucket = %B::NAME,
                    ttl_secs = ttl.as_secs(),
                    "Creating new KV bucket"
                );
                let config = kv::Config {
                    bucket: B::NAME.to_string(),
                    description: B::DESCRIPTION.to_string(),
                    max_age: ttl,
                    ..Default::default()
                };
                jetstream
                    .create_key_value(config)
                    .await
                    .map_err(|e| Error::operation("kv_create", e.to_string()))?
            }
        };

        Ok(Self {
            store,
            _key: PhantomData,
            _value: PhantomData,
            _bucket: PhantomData,
        })
    }

    /// Returns the bucket name.
    #[inline]
    pub fn bucket_name(&self) -> &'static str {
        B::NAME
    }

    /// Put a value into the store.
    #[tracing::instrument(skip(self, value), target = TRACING_TARGET_KV)]
    pub async fn put(&self, key: &K, value: &V) -> Result<KvEntry> {
        let key_str = key.to_string();
        let json = serde_json::to_vec(value)?;
        let size = json.len();
        let revision = self
            .store
            .put(&key_str, json.into())
            .await
            .map_err(|e| Error::operation("kv_put", e.to_string()))?;

        tracing::debug!(
            target: TRACING_TARGET_KV,
            key = %key_str,
            revision = revision,
            size_bytes = size,
            "Put value to KV store"
        );

        Ok(KvEntry {
            key: key_str,
            revision,
            size: size as u64,
        })
    }

    /// Watch a single key, starting with its current value.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_KV)]
    pub async fn watch_with_history(&self, key: &K) -> Result<KvWatch<K, V>> {
        self.watch_filter(&key.to_string()).await
    }

    /// Watch every key matching a subject-style filter (`*` and `>` wildcards),
    /// starting with the current values.
    pub(crate) async fn watch_filter(&self, filter: &str) -> Result<KvWatch<K, V>> {
        let watch = self
            .store
            .watch_with_history(filter)
            .await
            .map_err(|e| Error::operation("kv_watch", e.to_string()))?;

        tracing::debug!(
            target: TRACING_TARGET_KV,
            bucket = %B::NAME,
            filter = %filter,
            "Watching KV keys"
        );

        let updates = watch
            .map(|entry| {
                let entry = entry.map_err(|e| Error::operation("kv_watch", e.to_string()))?;
                KvUpdate::from_entry(entry)
            })
            .boxed();

        Ok(KvWatch { updates })
    }
}

/// KV entry metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvEntry {
    pub key: String,
    pub revision: u64,
    pub size: u64,
}

/// A change observed by a [`KvWatch`].
#[derive(Debug, Clone)]
pub struct KvUpdate<K, V> {
    /// Key that changed.
    pub key: K,
    /// Revision of the change.
    pub revision: u64,
    /// New value, or `None` when the key was deleted or purged.
    pub value: Option<V>,
}

impl<K, V> KvUpdate<K, V>
where
    K: KvKey,
    V: DeserializeOwned,
{
    fn from_entry(entry: kv::Entry) -> Result<Self> {
        let key = entry
            .key
            .parse::<K>()
            .map_err(|_| Error::invalid_key(&entry.key, "unrecognized key format"))?;

        let value = match entry.operation {
            kv::Operation::Put => Some(serde_json::from_slice(&entry.value)?),
            kv::Operation::Delete | kv::Operation::Purge => None,
        };

        Ok(Self {
            key,
            revision: entry.revision,
            value,
        })
    }
}

/// Typed stream of KV updates.
pub struct KvWatch<K, V> {
    updates: BoxStream<'static, Result<KvUpdate<K, V>>>,
}

impl<K, V> Stream for KvWatch<K, V> {
    type Item = Result<KvUpdate<K, V>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.updates.poll_next_unpin(cx)
    }
}
