//! Type-safe subscriber for JetStream streams.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_nats::jetstream::consumer::{self, pull};
use async_nats::jetstream::{self, AckKind, Context, Message};
use futures::StreamExt;
use serde::de::DeserializeOwned;

use crate::{Error, Result, TRACING_TARGET_STREAM};

const DEFAULT_ACK_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct StreamSubscriberInner {
    jetstream: Context,
    stream_name: String,
    consumer_name: String,
    ack_wait: Duration,
    max_ack_pending: Option<usize>,
}

/// Type-safe stream subscriber bound to one durable pull consumer.
///
/// Cloning is cheap. Every clone subscribes through the same durable
/// consumer, so messages are load-balanced between subscriptions.
#[derive(Debug, Clone)]
pub struct StreamSubscriber<T> {
    inner: Arc<StreamSubscriberInner>,
    _marker: PhantomData<T>,
}

impl<T> StreamSubscriber<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    pub(crate) fn new(jetstream: &Context, stream_name: &str, consumer_name: &str) -> Self {
        Self {
            inner: Arc::new(StreamSubscriberInner {
                jetstream: jetstream.clone(),
                stream_name: stream_name.to_string(),
                consumer_name: consumer_name.to_string(),
                ack_wait: DEFAULT_ACK_WAIT,
                max_ack_pending: None,
            }),
            _marker: PhantomData,
        }
    }

    /// Set the ack deadline of the consumer (builder pattern).
    pub(crate) fn with_ack_wait(self, ack_wait: Duration) -> Self {
        let mut inner = Arc::try_unwrap(self.inner).unwrap_or_else(|arc| (*arc).clone());
        inner.ack_wait = ack_wait;
        Self {
            inner: Arc::new(inner),
            _marker: PhantomData,
        }
    }

    /// Cap the number of delivered but unacked messages (builder pattern).
    ///
    /// Applied when the durable consumer is created; an existing consumer
    /// keeps its limit.
    pub fn with_max_ack_pending(self, max_ack_pending: usize) -> Self {
        let mut inner = Arc::try_unwrap(self.inner).unwrap_or_else(|arc| (*arc).clone());
        inner.max_ack_pending = Some(max_ack_pending);
        Self {
            inner: Arc::new(inner),
            _marker: PhantomData,
        }
    }

    /// Subscribe to the stream and get a typed message stream.
    ///
    /// Creates the durable consumer on first use. Messages are pulled one at
    /// a time so none sits in a local buffer while its ack deadline runs.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_STREAM)]
    pub async fn subscribe(&self) -> Result<TypedMessageStream<T>> {
        let consumer_config = pull_config(
            &self.inner.stream_name,
            &self.inner.consumer_name,
            self.inner.ack_wait,
            self.inner.max_ack_pending,
        );

        let stream = self
            .inner
            .jetstream
            .get_stream(&self.inner.stream_name)
            .await
            .map_err(|e| Error::stream_error(&self.inner.stream_name, e.to_string()))?;

        let consumer = stream
            .get_or_create_consumer(&self.inner.consumer_name, consumer_config)
            .await
            .map_err(|e| Error::consumer_error(&self.inner.consumer_name, e.to_string()))?;

        let messages = consumer
            .stream()
            .max_messages_per_batch(1)
            .messages()
            .await
            .map_err(|e| Error::consumer_error(&self.inner.consumer_name, e.to_string()))?;

        tracing::debug!(
            target: TRACING_TARGET_STREAM,
            stream = %self.inner.stream_name,
            consumer = %self.inner.consumer_name,
            ack_wait_secs = self.inner.ack_wait.as_secs(),
            max_ack_pending = ?self.inner.max_ack_pending,
            "Subscribed to stream"
        );

        Ok(TypedMessageStream {
            messages,
            _marker: PhantomData,
        })
    }

    /// Get the stream name.
    #[inline]
    pub fn stream_name(&self) -> &str {
        &self.inner.stream_name
    }

    /// Get the consumer name.
    #[inline]
    pub fn consumer_name(&self) -> &str {
        &self.inner.consumer_name
    }
}

fn pull_config(
    stream_name: &str,
    consumer_name: &str,
    ack_wait: Duration,
    max_ack_pending: Option<usize>,
) -> pull::Config {
    let mut config = pull::Config {
        durable_name: Some(consumer_name.to_string()),
        description: Some(format!("Consumer for stream {stream_name}")),
        ack_policy: consumer::AckPolicy::Explicit,
        ack_wait,
        ..Default::default()
    };
    if let Some(max_ack_pending) = max_ack_pending {
        config.max_ack_pending = i64::try_from(max_ack_pending).unwrap_or(i64::MAX);
    }
    config
}

/// Type-safe message stream over one pull subscription.
pub struct TypedMessageStream<T> {
    messages: pull::Stream,
    _marker: PhantomData<T>,
}

impl<T> TypedMessageStream<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Fetch the next message, returning `None` if none arrives in time.
    pub async fn next_with_timeout(&mut self, timeout: Duration) -> Result<Option<TypedMessage<T>>> {
        match tokio::time::timeout(timeout, self.next()).await {
            Ok(result) => result,
            Err(_) => Ok(None),
        }
    }

    /// Fetch the next message from the stream.
    ///
    /// Payloads that fail to deserialize can never be processed; they are
    /// terminated so the server stops redelivering them, and skipped.
    pub async fn next(&mut self) -> Result<Option<TypedMessage<T>>> {
        loop {
            let message = match self.messages.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    tracing::warn!(
                        target: TRACING_TARGET_STREAM,
                        error = %e,
                        "Error receiving message"
                    );
                    return Err(Error::operation("message_receive", e.to_string()));
                }
                None => return Ok(None),
            };

            match serde_json::from_slice::<T>(&message.payload) {
                Ok(payload) => {
                    tracing::debug!(
                        target: TRACING_TARGET_STREAM,
                        subject = %message.subject,
                        "Received typed message"
                    );
                    return Ok(Some(TypedMessage { payload, message }));
                }
                Err(e) => {
                    tracing::warn!(
                        target: TRACING_TARGET_STREAM,
                        subject = %message.subject,
                        error = %e,
                        "Dropping message with malformed payload"
                    );
                    if let Err(e) = message.ack_with(AckKind::Term).await {
                        tracing::warn!(
                            target: TRACING_TARGET_STREAM,
                            error = %e,
                            "Failed to terminate malformed message"
                        );
                    }
                }
            }
        }
    }
}

/// A typed message from the stream.
pub struct TypedMessage<T> {
    /// The deserialized payload.
    pub payload: T,
    message: Message,
}

impl<T> TypedMessage<T> {
    /// Get the message subject.
    pub fn subject(&self) -> &str {
        &self.message.subject
    }

    /// Get a reference to the typed payload.
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Get the message metadata.
    pub fn info(&self) -> Result<jetstream::message::Info<'_>> {
        self.message
            .info()
            .map_err(|e| Error::operation("message_info", e.to_string()))
    }

    /// Get the number of delivery attempts.
    pub fn delivery_count(&self) -> Result<i64> {
        self.info().map(|info| info.delivered)
    }

    /// Acknowledge the message.
    pub async fn ack(&self) -> Result<()> {
        self.message
            .ack()
            .await
            .map_err(|e| Error::operation("message_ack", e.to_string()))
    }

    /// Terminate the message (never redeliver).
    pub async fn term(&self) -> Result<()> {
        self.message
            .ack_with(AckKind::Term)
            .await
            .map_err(|e| Error::operation("message_term", e.to_string()))
    }

    /// Signal the message is still being worked on, resetting its ack deadline.
    pub async fn progress(&self) -> Result<()> {
        self.message
            .ack_with(AckKind::Progress)
            .await
            .map_err(|e| Error::operation("message_progress", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_config_is_durable_with_explicit_acks() {
        let config = pull_config("CHAT_MESSAGES", "ai-response", Duration::from_secs(60), None);

        assert_eq!(config.durable_name.as_deref(), Some("ai-response"));
        assert_eq!(config.ack_policy, consumer::AckPolicy::Explicit);
        assert_eq!(config.ack_wait, Duration::from_secs(60));
        assert_eq!(config.max_ack_pending, pull::Config::default().max_ack_pending);
    }

    #[test]
    fn test_pull_config_caps_unacked_deliveries() {
        let config = pull_config("CHAT_MESSAGES", "ai-response", DEFAULT_ACK_WAIT, Some(4));
        assert_eq!(config.max_ack_pending, 4);
    }
}
