//! Generic event stream subscriber.

use std::marker::PhantomData;

use async_nats::jetstream::Context;
use derive_more::Deref;
use serde::de::DeserializeOwned;

use super::event_stream::{EventStream, ensure_stream};
use super::stream_sub::StreamSubscriber;
use crate::Result;

/// Generic event subscriber for consuming typed events.
///
/// This subscriber is generic over:
/// - `T`: The event/message type to consume
/// - `S`: The stream configuration (determines stream name, subject, consumer name)
#[derive(Debug, Clone, Deref)]
pub struct EventSubscriber<T, S>
where
    T: DeserializeOwned + Send + Sync + 'static,
    S: EventStream,
{
    #[deref]
    subscriber: StreamSubscriber<T>,
    _stream: PhantomData<S>,
}

impl<T, S> EventSubscriber<T, S>
where
    T: DeserializeOwned + Send + Sync + 'static,
    S: EventStream,
{
    /// Create a new event subscriber using the stream's default consumer name.
    ///
    /// If the stream doesn't exist, it will be created with the configuration
    /// from the `EventStream` trait.
    pub(crate) async fn new(jetstream: &Context) -> Result<Self> {
        ensure_stream::<S>(jetstream).await?;
        let subscriber =
            StreamSubscriber::new(jetstream, S::NAME, S::CONSUMER_NAME).with_ack_wait(S::ACK_WAIT);
        Ok(Self {
            subscriber,
            _stream: PhantomData,
        })
    }

    /// Cap the number of unacked deliveries on the consumer (builder pattern).
    pub fn with_max_ack_pending(mut self, max_ack_pending: usize) -> Self {
        self.subscriber = self.subscriber.with_max_ack_pending(max_ack_pending);
        self
    }

    /// Returns the subject.
    #[inline]
    pub fn subject(&self) -> &'static str {
        S::SUBJECT
    }
}
