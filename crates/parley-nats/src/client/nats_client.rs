//! NATS client wrapper and connection management.
//!
//! The `NatsClient` wraps the `async-nats` client, which multiplexes every
//! operation over one TCP connection. Cloning is an `Arc` clone, so a single
//! client is shared by the worker, the conversation store and the event
//! subscriber.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_nats::{Client, ConnectOptions, jetstream};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::timeout;

use super::nats_config::NatsConfig;
use crate::kv::{ConversationKvStore, KvBucket, KvKey, KvStore};
use crate::stream::{
    ChatMessagePublisher, ChatMessageSubscriber, EventPublisher, EventStream, EventSubscriber,
};
use crate::{Error, Result, TRACING_TARGET_CLIENT, TRACING_TARGET_CONNECTION};

const PING_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RECONNECT_DELAY_MS: u64 = 30_000;

/// NATS client wrapper with connection management.
///
/// This wrapper is cheaply cloneable and thread-safe.
#[derive(Debug, Clone)]
pub struct NatsClient {
    inner: Arc<NatsClientInner>,
}

#[derive(Debug)]
struct NatsClientInner {
    client: Client,
    jetstream: jetstream::Context,
}

impl NatsClient {
    /// Create a new NATS client and connect
    #[tracing::instrument(skip(config), target = TRACING_TARGET_CONNECTION)]
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            servers = %config.nats_url,
            client_name = %config.name(),
            "Connecting to NATS servers"
        );

        let connect_timeout = config.connect_timeout();
        let mut connect_opts = ConnectOptions::new()
            .name(config.name())
            .ping_interval(config.ping_interval())
            .connection_timeout(connect_timeout);

        if let Some(token) = &config.nats_token {
            connect_opts = connect_opts.token(token.clone());
        }

        if let Some(max_reconnects) = config.max_reconnects_option() {
            connect_opts = connect_opts.max_reconnects(max_reconnects);
        }

        let reconnect_delay_ms =
            u64::try_from(config.reconnect_delay().as_millis()).unwrap_or(u64::MAX);
        connect_opts = connect_opts.reconnect_delay_callback(move |attempts| {
            let factor = 2_u64.saturating_pow(attempts.min(32) as u32);
            Duration::from_millis(
                reconnect_delay_ms
                    .saturating_mul(factor)
                    .min(MAX_RECONNECT_DELAY_MS),
            )
        });

        let client = timeout(
            connect_timeout,
            async_nats::connect_with_options(config.nats_url.as_str(), connect_opts),
        )
        .await
        .map_err(|_| Error::timeout(connect_timeout))?
        .map_err(|e| Error::Connection(Box::new(e)))?;

        let jetstream = jetstream::new(client.clone());

        let server_info = client.server_info();
        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            server_host = %server_info.host,
            server_version = %server_info.version,
            server_id = %server_info.server_id,
            max_payload = server_info.max_payload,
            "Successfully connected to NATS"
        );

        Ok(Self {
            inner: Arc::new(NatsClientInner {
                client,
                jetstream,
            }),
        })
    }

    /// Test connectivity with a round trip to the server.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CONNECTION)]
    pub async fn ping(&self) -> Result<Duration> {
        let start = Instant::now();

        timeout(PING_TIMEOUT, self.inner.client.flush())
            .await
            .map_err(|_| Error::timeout(PING_TIMEOUT))?
            .map_err(|e| Error::Connection(Box::new(e)))?;

        let ping_time = start.elapsed();
        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            duration_ms = ping_time.as_millis(),
            "NATS ping successful"
        );
        Ok(ping_time)
    }

    /// Check if the client is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(
            self.inner.client.connection_state(),
            async_nats::connection::State::Connected
        )
    }

    /// Flush pending publishes and close the connection.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CONNECTION)]
    pub async fn drain(&self) -> Result<()> {
        self.inner
            .client
            .drain()
            .await
            .map_err(|e| Error::Connection(Box::new(e)))?;

        tracing::info!(target: TRACING_TARGET_CONNECTION, "NATS connection drained");
        Ok(())
    }
}

// Key-value store getters
impl NatsClient {
    /// Get or create a KV store for the specified key, value, and bucket types.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn kv_store<K, V, B>(&self) -> Result<KvStore<K, V, B>>
    where
        K: KvKey,
        V: Serialize + DeserializeOwned + Send + Sync + 'static,
        B: KvBucket,
    {
        KvStore::new(&self.inner.jetstream).await
    }

    /// Get or create the conversation store.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn conversation_store(&self) -> Result<ConversationKvStore> {
        self.kv_store().await
    }
}

// Stream getters
impl NatsClient {
    /// Create an event publisher for the specified stream type.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn event_publisher<T, S>(&self) -> Result<EventPublisher<T, S>>
    where
        T: Serialize + Send + Sync + 'static,
        S: EventStream,
    {
        EventPublisher::new(&self.inner.jetstream).await
    }

    /// Create an event subscriber for the specified stream type.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn event_subscriber<T, S>(&self) -> Result<EventSubscriber<T, S>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
        S: EventStream,
    {
        EventSubscriber::new(&self.inner.jetstream).await
    }

    /// Create a chat message publisher.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn chat_publisher(&self) -> Result<ChatMessagePublisher> {
        self.event_publisher().await
    }

    /// Create a chat message subscriber.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn chat_subscriber(&self) -> Result<ChatMessageSubscriber> {
        self.event_subscriber().await
    }
}
