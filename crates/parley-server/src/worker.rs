//! Chat message worker.
//!
//! Consumes chat message events from NATS and runs one response session per
//! event, bounded by a semaphore.

use std::future::Future;
use std::time::Duration;

use parley_core::ChatMessageEvent;
use parley_nats::NatsClient;
use parley_nats::stream::{ChatMessageStream, EventStream, TypedMessage};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::{Error, ResponseHandler, Result, TRACING_TARGET_WORKER, WorkerConfig};

/// How long a single fetch waits before checking for shutdown again.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause after a failed fetch.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// How often a running session extends its message's ack deadline.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(ChatMessageStream::ACK_WAIT.as_secs() / 2);

type ChatMessage = TypedMessage<ChatMessageEvent>;

/// Response worker.
///
/// Subscribes to the `CHAT_MESSAGES` stream and streams one AI response into
/// the conversation store for every event received.
pub struct ResponseWorker {
    nats_client: NatsClient,
    handler: ResponseHandler,
    config: WorkerConfig,
}

impl ResponseWorker {
    /// Create a new response worker.
    pub fn new(nats_client: NatsClient, handler: ResponseHandler, config: WorkerConfig) -> Self {
        Self {
            nats_client,
            handler,
            config,
        }
    }

    /// Run the worker until cancelled.
    ///
    /// Cancelling `cancel` stops intake, cancels in-flight sessions and waits
    /// up to the configured shutdown timeout for them to finalize.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        tracing::info!(
            target: TRACING_TARGET_WORKER,
            max_concurrent_sessions = self.config.max_concurrent_sessions,
            "Starting response worker"
        );

        let result = self.run_inner(cancel).await;

        match &result {
            Ok(()) => {
                tracing::info!(
                    target: TRACING_TARGET_WORKER,
                    "Response worker stopped"
                );
            }
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET_WORKER,
                    error = %err,
                    "Response worker failed"
                );
            }
        }

        result
    }

    async fn run_inner(&self, cancel: CancellationToken) -> Result<()> {
        self.config.validate()?;

        let subscriber = self
            .nats_client
            .chat_subscriber()
            .await?
            .with_max_ack_pending(self.config.max_concurrent_sessions);
        let mut stream = subscriber.subscribe().await?;

        tracing::info!(
            target: TRACING_TARGET_WORKER,
            stream = %subscriber.stream_name(),
            consumer = %subscriber.consumer_name(),
            max_ack_pending = self.config.max_concurrent_sessions,
            "Listening for chat messages"
        );

        let semaphore = self.config.create_semaphore();
        let tracker = TaskTracker::new();

        loop {
            // A fetched message always has a free session slot.
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => permit
                    .map_err(|_| Error::internal("worker", "session semaphore closed"))?,
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = stream.next_with_timeout(FETCH_TIMEOUT) => {
                    match result {
                        Ok(Some(message)) => {
                            let handler = self.handler.clone();
                            let session_cancel = cancel.child_token();

                            tracker.spawn(async move {
                                let _permit = permit;
                                process_message(&handler, message, &session_cancel).await;
                            });
                        }
                        Ok(None) => {
                            // Timeout, continue loop
                        }
                        Err(err) => {
                            tracing::error!(
                                target: TRACING_TARGET_WORKER,
                                error = %err,
                                "Error receiving message from stream"
                            );
                            tokio::time::sleep(RETRY_DELAY).await;
                        }
                    }
                }
            }
        }

        tracing::info!(
            target: TRACING_TARGET_WORKER,
            in_flight = tracker.len(),
            "Response worker shutdown requested"
        );

        tracker.close();
        if tokio::time::timeout(self.config.shutdown_timeout(), tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                target: TRACING_TARGET_WORKER,
                in_flight = tracker.len(),
                timeout_secs = self.config.shutdown_timeout_secs,
                "Sessions still running after shutdown timeout"
            );
        }

        Ok(())
    }
}

/// Runs one session and acks the message.
///
/// Every session is acked once it ends, failures included. While it runs the
/// message's ack deadline is extended so the server does not redeliver it.
async fn process_message(
    handler: &ResponseHandler,
    message: ChatMessage,
    cancel: &CancellationToken,
) {
    let event = message.payload();

    tracing::debug!(
        target: TRACING_TARGET_WORKER,
        subject = %message.subject(),
        delivery_count = message.delivery_count().unwrap_or_default(),
        conversation_id = %event.conversation_id,
        "Processing chat message"
    );

    let in_progress = &message;
    let report = with_progress(handler.handle(event, cancel), PROGRESS_INTERVAL, || async move {
        if let Err(err) = in_progress.progress().await {
            tracing::warn!(
                target: TRACING_TARGET_WORKER,
                error = %err,
                "Failed to extend ack deadline"
            );
        }
    })
    .await;

    if !report.terminal_written {
        tracing::error!(
            target: TRACING_TARGET_WORKER,
            address = %report.address,
            outcome = %report.outcome.as_str(),
            error = report.error.as_deref().unwrap_or_default(),
            "Session ended without a terminal write"
        );
    }

    if let Err(err) = message.ack().await {
        tracing::error!(
            target: TRACING_TARGET_WORKER,
            error = %err,
            "Failed to ack message"
        );
    }
}

/// Drives `session` to completion, calling `progress` every `interval`.
async fn with_progress<S, P, F>(session: S, interval: Duration, mut progress: P) -> S::Output
where
    S: Future,
    P: FnMut() -> F,
    F: Future<Output = ()>,
{
    tokio::pin!(session);
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            output = &mut session => return output,
            _ = ticker.tick() => progress().await,
        }
    }
}
