//! Event stream configuration for NATS JetStream.

use std::time::Duration;

use async_nats::jetstream::{self, stream};

use crate::{Error, Result, TRACING_TARGET_STREAM};

/// Marker trait for event streams.
///
/// This trait defines the configuration for a NATS JetStream stream.
pub trait EventStream: Clone + Send + Sync + 'static {
    /// Stream name used in NATS JetStream.
    const NAME: &'static str;

    /// Subject for publishing to this stream.
    ///
    /// The stream also captures every subject below it (`{SUBJECT}.>`).
    const SUBJECT: &'static str;

    /// Maximum age for messages in this stream.
    /// Returns `None` for streams where messages should not expire.
    const MAX_AGE: Option<Duration>;

    /// Default durable consumer name for this stream.
    const CONSUMER_NAME: &'static str;

    /// How long a delivered message may stay unacknowledged before redelivery.
    const ACK_WAIT: Duration = Duration::from_secs(30);

    /// Returns the subjects captured by the stream.
    fn subjects() -> Vec<String> {
        vec![Self::SUBJECT.to_string(), format!("{}.>", Self::SUBJECT)]
    }
}

/// Gets the stream described by `S`, creating it if needed.
#[tracing::instrument(skip(jetstream), target = TRACING_TARGET_STREAM)]
pub(crate) async fn ensure_stream<S: EventStream>(
    jetstream: &jetstream::Context,
) -> Result<stream::Stream> {
    let config = stream::Config {
        name: S::NAME.to_string(),
        subjects: S::subjects(),
        max_age: S::MAX_AGE.unwrap_or_default(),
        ..Default::default()
    };

    let stream = jetstream
        .get_or_create_stream(config)
        .await
        .map_err(|e| Error::stream_error(S::NAME, e.to_string()))?;

    tracing::debug!(
        target: TRACING_TARGET_STREAM,
        stream = %S::NAME,
        subject = %S::SUBJECT,
        "Stream ready"
    );

    Ok(stream)
}
