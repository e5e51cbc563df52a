//! Generic event stream publisher.

use std::marker::PhantomData;

use async_nats::jetstream::Context;
use derive_more::Deref;
use serde::Serialize;

use super::event_stream::{EventStream, ensure_stream};
use super::stream_pub::StreamPublisher;
use crate::Result;

/// Generic event publisher for delivering typed events to workers.
///
/// This publisher is generic over:
/// - `T`: The event/message type to publish
/// - `S`: The stream configuration (determines stream name, subject, etc.)
#[derive(Debug, Clone, Deref)]
pub struct EventPublisher<T, S>
where
    T: Serialize + Send + Sync + 'static,
    S: EventStream,
{
    #[deref]
    publisher: StreamPublisher<T>,
    _stream: PhantomData<S>,
}

impl<T, S> EventPublisher<T, S>
where
    T: Serialize + Send + Sync + 'static,
    S: EventStream,
{
    /// Create a new event publisher, creating the stream if needed.
    pub(crate) async fn new(jetstream: &Context) -> Result<Self> {
        ensure_stream::<S>(jetstream).await?;
        Ok(Self {
            publisher: StreamPublisher::new(jetstream, S::NAME),
            _stream: PhantomData,
        })
    }

    /// Publish an event to the stream's configured subject.
    ///
    /// Returns the stream sequence assigned to the event.
    pub async fn publish(&self, event: &T) -> Result<u64> {
        self.publisher.publish(S::SUBJECT, event).await
    }

    /// Returns the subject.
    #[inline]
    pub fn subject(&self) -> &'static str {
        S::SUBJECT
    }
}
