//! Type-safe publisher for JetStream streams.

use std::marker::PhantomData;

use async_nats::jetstream::Context;
use serde::Serialize;

use crate::{Error, Result, TRACING_TARGET_STREAM};

/// Type-safe stream publisher.
///
/// Every publish waits for the JetStream acknowledgement, so a successful
/// return means the message is persisted in the stream.
#[derive(Debug, Clone)]
pub struct StreamPublisher<T> {
    jetstream: Context,
    stream_name: String,
    _marker: PhantomData<T>,
}

impl<T> StreamPublisher<T>
where
    T: Serialize + Send + Sync + 'static,
{
    pub(crate) fn new(jetstream: &Context, stream_name: &str) -> Self {
        Self {
            jetstream: jetstream.clone(),
            stream_name: stream_name.to_string(),
            _marker: PhantomData,
        }
    }

    /// Publish a payload to `subject` and wait for the stream to store it.
    #[tracing::instrument(skip(self, payload), target = TRACING_TARGET_STREAM)]
    pub async fn publish(&self, subject: &str, payload: &T) -> Result<u64> {
        let bytes = serde_json::to_vec(payload)?;
        let payload_size = bytes.len();

        let ack = self
            .jetstream
            .publish(subject.to_string(), bytes.into())
            .await
            .map_err(|e| Error::delivery_failed(subject, e.to_string()))?
            .await
            .map_err(|e| Error::delivery_failed(subject, e.to_string()))?;

        tracing::debug!(
            target: TRACING_TARGET_STREAM,
            stream = %self.stream_name,
            subject = %subject,
            sequence = ack.sequence,
            payload_size = payload_size,
            "Published message"
        );

        Ok(ack.sequence)
    }

    /// Get the stream name.
    #[inline]
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }
}
