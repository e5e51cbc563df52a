//! Per-event response handling.

use std::sync::Arc;

use parley_core::{
    ChatMessageEvent, ConversationStore, FragmentSource, ResponseAggregator, SessionOutcome,
    SessionReport,
};
use tokio_util::sync::CancellationToken;

use crate::TRACING_TARGET_HANDLER;

/// Turns one chat message event into one response session.
///
/// Cheap to clone; clones share the store and the fragment source.
#[derive(Clone)]
pub struct ResponseHandler {
    aggregator: ResponseAggregator,
    source: Arc<dyn FragmentSource>,
}

impl ResponseHandler {
    /// Creates a handler writing to `store` and streaming from `source`.
    pub fn new<S, F>(store: S, source: F) -> Self
    where
        S: ConversationStore + 'static,
        F: FragmentSource + 'static,
    {
        Self {
            aggregator: ResponseAggregator::new(store),
            source: Arc::new(source),
        }
    }

    /// Runs the session for `event` and reports how it ended.
    pub async fn handle(
        &self,
        event: &ChatMessageEvent,
        cancel: &CancellationToken,
    ) -> SessionReport {
        tracing::info!(
            target: TRACING_TARGET_HANDLER,
            conversation_id = %event.conversation_id,
            message_id = %event.assistant_message_id,
            message_len = event.message.len(),
            "Generating AI response"
        );

        let report = self.aggregator.respond(event, &*self.source, cancel).await;

        match report.outcome {
            SessionOutcome::Completed => {
                tracing::info!(
                    target: TRACING_TARGET_HANDLER,
                    conversation_id = %event.conversation_id,
                    message_id = %event.assistant_message_id,
                    response_length = report.response_length,
                    fragments = report.fragments,
                    writes = report.writes,
                    elapsed_ms = report.elapsed.as_millis(),
                    "AI response completed"
                );
            }
            outcome => {
                tracing::warn!(
                    target: TRACING_TARGET_HANDLER,
                    conversation_id = %event.conversation_id,
                    message_id = %event.assistant_message_id,
                    outcome = %outcome.as_str(),
                    response_length = report.response_length,
                    fragments = report.fragments,
                    writes = report.writes,
                    terminal_written = report.terminal_written,
                    error = report.error.as_deref().unwrap_or_default(),
                    "AI response ended early"
                );
            }
        }

        report
    }
}
