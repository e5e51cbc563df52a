//! Streaming aggregation and state publication.
//!
//! A session walks the store entry of one address through
//! `initialize → accumulate* → finalize`:
//!
//! - [`ResponseAggregator::initialize`] writes an empty `streaming` message
//!   before the source is asked for anything.
//! - [`StreamingSession::accumulate`] appends a non-empty fragment and
//!   publishes the full cumulative text; empty fragments are dropped.
//! - [`StreamingSession::finalize`] issues the single `completed` write and
//!   consumes the session, so nothing can be written after it.
//!
//! Every write is awaited before the next one is issued, so watchers
//! observe a monotonically growing prefix followed by one terminal value.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::source::FragmentSource;
use crate::store::ConversationStore;
use crate::types::{ChatMessageEvent, ConversationAddress, ConversationMessage};
use crate::{Error, Result, TRACING_TARGET_AGGREGATOR};

/// Terminal text published when the response could not be produced.
pub const APOLOGY_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

/// Drives response sessions against a shared conversation store.
///
/// The aggregator itself is stateless between sessions and cheap to clone;
/// all per-session state lives in [`StreamingSession`].
#[derive(Clone)]
pub struct ResponseAggregator {
    store: Arc<dyn ConversationStore>,
}

impl ResponseAggregator {
    /// Creates an aggregator writing to `store`.
    pub fn new<S>(store: S) -> Self
    where
        S: ConversationStore + 'static,
    {
        Self {
            store: Arc::new(store),
        }
    }

    /// Publishes the empty `streaming` entry and opens a session on `address`.
    pub async fn initialize(&self, address: ConversationAddress) -> Result<StreamingSession> {
        let mut session = StreamingSession {
            store: Arc::clone(&self.store),
            address,
            buffer: String::new(),
            fragments: 0,
            writes: 0,
            started: Instant::now(),
        };

        session.write(ConversationMessage::streaming("")).await?;

        tracing::debug!(
            target: TRACING_TARGET_AGGREGATOR,
            conversation_id = %session.address.conversation_id(),
            message_id = %session.address.message_id(),
            "Session initialized"
        );

        Ok(session)
    }

    /// Runs a full session for a chat message event.
    ///
    /// Every failure is folded into the returned [`SessionReport`].
    pub async fn respond<S>(
        &self,
        event: &ChatMessageEvent,
        source: &S,
        cancel: &CancellationToken,
    ) -> SessionReport
    where
        S: FragmentSource + ?Sized,
    {
        self.run(event.address(), &event.message, source, cancel)
            .await
    }

    /// Runs a full session on `address`, streaming the reply to `prompt`.
    ///
    /// Source failures end in the apology text, cancellation ends in the text
    /// accumulated so far. Both leave the entry `completed`.
    pub async fn run<S>(
        &self,
        address: ConversationAddress,
        prompt: &str,
        source: &S,
        cancel: &CancellationToken,
    ) -> SessionReport
    where
        S: FragmentSource + ?Sized,
    {
        let started = Instant::now();
        let mut session = match self.initialize(address.clone()).await {
            Ok(session) => session,
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET_AGGREGATOR,
                    conversation_id = %address.conversation_id(),
                    message_id = %address.message_id(),
                    error = %err,
                    "Failed to initialize session"
                );
                return SessionReport {
                    address,
                    outcome: SessionOutcome::StoreFailed,
                    fragments: 0,
                    writes: 0,
                    response_length: 0,
                    terminal_written: false,
                    elapsed: started.elapsed(),
                    error: Some(err.to_string()),
                };
            }
        };

        let opened = tokio::select! {
            biased;

            () = cancel.cancelled() => return session.finalize(Finalization::Cancelled).await,
            opened = source.open(prompt) => opened,
        };

        let mut fragments = match opened {
            Ok(fragments) => fragments,
            Err(err) => return session.finalize(Finalization::SourceFailed(err)).await,
        };

        let finalization = loop {
            let next = tokio::select! {
                biased;

                () = cancel.cancelled() => break Finalization::Cancelled,
                next = fragments.next() => next,
            };

            match next {
                Some(Ok(fragment)) => {
                    if let Err(err) = session.accumulate(&fragment).await {
                        break Finalization::StoreFailed(err);
                    }
                }
                Some(Err(err)) => break Finalization::SourceFailed(err),
                None => break Finalization::Exhausted,
            }
        };

        // Stop the backend before the terminal write.
        drop(fragments);

        session.finalize(finalization).await
    }
}

/// Reason a session is being finalized.
#[derive(Debug)]
pub enum Finalization {
    /// The source ended without error.
    Exhausted,
    /// The source failed to open or raised mid-stream.
    SourceFailed(Error),
    /// A streaming write to the store failed.
    StoreFailed(Error),
    /// The surrounding pipeline cancelled the session.
    Cancelled,
}

/// One in-progress session owning writes to a single address.
///
/// Created by [`ResponseAggregator::initialize`]; consumed by
/// [`StreamingSession::finalize`].
pub struct StreamingSession {
    store: Arc<dyn ConversationStore>,
    address: ConversationAddress,
    buffer: String,
    fragments: usize,
    writes: usize,
    started: Instant,
}

impl StreamingSession {
    /// Returns the address owned by this session.
    #[inline]
    pub fn address(&self) -> &ConversationAddress {
        &self.address
    }

    /// Returns the cumulative text accumulated so far.
    #[inline]
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Returns the number of successful store writes.
    #[inline]
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Appends `fragment` and publishes the cumulative text.
    ///
    /// Returns `false` without writing when the fragment is empty.
    pub async fn accumulate(&mut self, fragment: &str) -> Result<bool> {
        self.fragments += 1;
        if fragment.is_empty() {
            return Ok(false);
        }

        self.buffer.push_str(fragment);
        self.write(ConversationMessage::streaming(self.buffer.clone()))
            .await?;

        tracing::trace!(
            target: TRACING_TARGET_AGGREGATOR,
            conversation_id = %self.address.conversation_id(),
            message_id = %self.address.message_id(),
            fragment_len = fragment.len(),
            response_length = self.buffer.len(),
            "Published fragment"
        );

        Ok(true)
    }

    /// Issues the single terminal write and closes the session.
    ///
    /// Never fails: a failed terminal write is logged, reported as
    /// [`SessionOutcome::StoreFailed`] and leaves
    /// [`SessionReport::terminal_written`] unset.
    pub async fn finalize(mut self, finalization: Finalization) -> SessionReport {
        let mut error = None;
        let (message, outcome) = match finalization {
            Finalization::Exhausted => (self.buffer.clone(), SessionOutcome::Completed),
            Finalization::Cancelled => {
                tracing::info!(
                    target: TRACING_TARGET_AGGREGATOR,
                    conversation_id = %self.address.conversation_id(),
                    message_id = %self.address.message_id(),
                    response_length = self.buffer.len(),
                    "Session cancelled, completing with partial response"
                );
                (self.buffer.clone(), SessionOutcome::Cancelled)
            }
            Finalization::SourceFailed(err) => {
                tracing::error!(
                    target: TRACING_TARGET_AGGREGATOR,
                    conversation_id = %self.address.conversation_id(),
                    message_id = %self.address.message_id(),
                    error = %err,
                    "Error generating response"
                );
                error = Some(err.to_string());
                (APOLOGY_MESSAGE.to_owned(), SessionOutcome::SourceFailed)
            }
            Finalization::StoreFailed(err) => {
                tracing::error!(
                    target: TRACING_TARGET_AGGREGATOR,
                    conversation_id = %self.address.conversation_id(),
                    message_id = %self.address.message_id(),
                    error = %err,
                    "Failed to publish fragment, abandoning stream"
                );
                error = Some(err.to_string());
                (APOLOGY_MESSAGE.to_owned(), SessionOutcome::StoreFailed)
            }
        };

        let (outcome, terminal_written) = match self
            .write(ConversationMessage::completed(message))
            .await
        {
            Ok(()) => (outcome, true),
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET_AGGREGATOR,
                    conversation_id = %self.address.conversation_id(),
                    message_id = %self.address.message_id(),
                    error = %err,
                    "Failed to write terminal state"
                );
                error = Some(err.to_string());
                (SessionOutcome::StoreFailed, false)
            }
        };

        let report = SessionReport {
            address: self.address,
            outcome,
            fragments: self.fragments,
            writes: self.writes,
            response_length: self.buffer.len(),
            terminal_written,
            elapsed: self.started.elapsed(),
            error,
        };

        tracing::debug!(
            target: TRACING_TARGET_AGGREGATOR,
            conversation_id = %report.address.conversation_id(),
            message_id = %report.address.message_id(),
            outcome = %report.outcome.as_str(),
            fragments = report.fragments,
            writes = report.writes,
            terminal_written = report.terminal_written,
            "Session finalized"
        );

        report
    }

    async fn write(&mut self, value: ConversationMessage) -> Result<()> {
        self.store.set(&self.address, &value).await?;
        self.writes += 1;
        Ok(())
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionOutcome {
    /// The full response was published as `completed`.
    Completed,
    /// The source failed; the apology was published as `completed`.
    SourceFailed,
    /// The session was cancelled; the partial text was published as `completed`.
    Cancelled,
    /// A store write failed. The apology was published as `completed` only
    /// if [`SessionReport::terminal_written`] is set.
    StoreFailed,
}

impl SessionOutcome {
    /// Returns the outcome as a string for logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::SourceFailed => "source_failed",
            Self::Cancelled => "cancelled",
            Self::StoreFailed => "store_failed",
        }
    }

    /// Returns true if the full response was published.
    #[inline]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Address the session wrote to.
    pub address: ConversationAddress,
    /// How the session ended.
    pub outcome: SessionOutcome,
    /// Fragments pulled from the source, including empty ones.
    pub fragments: usize,
    /// Successful store writes, including the terminal one.
    pub writes: usize,
    /// Length in bytes of the accumulated response text.
    pub response_length: usize,
    /// Whether the `completed` state reached the store.
    pub terminal_written: bool,
    /// Wall time from initialization to the terminal write.
    pub elapsed: Duration,
    /// Error that ended the session early, if any.
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mock::{MemoryStore, ScriptedSource};
    use crate::types::MessageStatus;

    fn address(conversation: &str, message: &str) -> ConversationAddress {
        ConversationAddress::new(conversation, message)
    }

    fn observed(store: &MemoryStore, address: &ConversationAddress) -> Vec<(String, MessageStatus)> {
        store
            .writes_for(address)
            .into_iter()
            .map(|value| (value.message, value.status))
            .collect()
    }

    fn streaming(text: &str) -> (String, MessageStatus) {
        (text.to_owned(), MessageStatus::Streaming)
    }

    fn completed(text: &str) -> (String, MessageStatus) {
        (text.to_owned(), MessageStatus::Completed)
    }

    #[tokio::test]
    async fn test_successful_stream_publishes_prefixes() {
        let store = MemoryStore::new();
        let aggregator = ResponseAggregator::new(store.clone());
        let source = ScriptedSource::new(["Hello", "!"]);
        let event = ChatMessageEvent::new("Hi", "c1", "m1");

        let report = aggregator
            .respond(&event, &source, &CancellationToken::new())
            .await;

        assert_eq!(
            observed(&store, &address("c1", "m1")),
            vec![
                streaming(""),
                streaming("Hello"),
                streaming("Hello!"),
                completed("Hello!"),
            ]
        );
        assert_eq!(report.outcome, SessionOutcome::Completed);
        assert_eq!(report.writes, 4);
        assert!(report.terminal_written);
        assert_eq!(report.fragments, 2);
        assert_eq!(report.response_length, 6);
        assert!(report.error.is_none());
        assert_eq!(source.prompts(), vec!["Hi".to_owned()]);
    }

    #[tokio::test]
    async fn test_source_failure_publishes_apology() {
        let store = MemoryStore::new();
        let aggregator = ResponseAggregator::new(store.clone());
        let source = ScriptedSource::new(["Hel"]).failing_with("connection reset");
        let event = ChatMessageEvent::new("Hi", "c1", "m1");

        let report = aggregator
            .respond(&event, &source, &CancellationToken::new())
            .await;

        assert_eq!(
            observed(&store, &address("c1", "m1")),
            vec![streaming(""), streaming("Hel"), completed(APOLOGY_MESSAGE)]
        );
        assert_eq!(report.outcome, SessionOutcome::SourceFailed);
        assert!(report.error.unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_failure_after_partial_text_discards_it() {
        let store = MemoryStore::new();
        let aggregator = ResponseAggregator::new(store.clone());
        let source = ScriptedSource::new(["Hello", ", I"]).failing_with("backend error");
        let target = address("c1", "m1");

        aggregator
            .run(target.clone(), "Hi", &source, &CancellationToken::new())
            .await;

        let last = store.get(&target).unwrap();
        assert_eq!(last.message, APOLOGY_MESSAGE);
        assert!(last.is_completed());
    }

    #[tokio::test]
    async fn test_open_failure_publishes_apology() {
        let store = MemoryStore::new();
        let aggregator = ResponseAggregator::new(store.clone());
        let source = ScriptedSource::new(Vec::<String>::new()).failing_to_open("model not found");
        let target = address("c1", "m1");

        let report = aggregator
            .run(target.clone(), "Hi", &source, &CancellationToken::new())
            .await;

        assert_eq!(
            observed(&store, &target),
            vec![streaming(""), completed(APOLOGY_MESSAGE)]
        );
        assert_eq!(report.outcome, SessionOutcome::SourceFailed);
        assert_eq!(report.fragments, 0);
    }

    #[tokio::test]
    async fn test_empty_fragments_do_not_write() {
        let with_empty = MemoryStore::new();
        let without_empty = MemoryStore::new();
        let target = address("c1", "m1");
        let cancel = CancellationToken::new();

        ResponseAggregator::new(with_empty.clone())
            .run(
                target.clone(),
                "Hi",
                &ScriptedSource::new(["", "ab", "", "c"]),
                &cancel,
            )
            .await;
        ResponseAggregator::new(without_empty.clone())
            .run(target.clone(), "Hi", &ScriptedSource::new(["ab", "c"]), &cancel)
            .await;

        let expected = vec![
            streaming(""),
            streaming("ab"),
            streaming("abc"),
            completed("abc"),
        ];
        assert_eq!(observed(&with_empty, &target), expected);
        assert_eq!(observed(&without_empty, &target), expected);
    }

    #[tokio::test]
    async fn test_empty_response_completes_with_empty_text() {
        let store = MemoryStore::new();
        let target = address("c1", "m1");

        let report = ResponseAggregator::new(store.clone())
            .run(
                target.clone(),
                "Hi",
                &ScriptedSource::new(["", ""]),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(observed(&store, &target), vec![streaming(""), completed("")]);
        assert_eq!(report.outcome, SessionOutcome::Completed);
    }

    #[tokio::test]
    async fn test_streaming_writes_are_growing_prefixes() {
        let fragments = ["The", " quick", " brown", " fox", " jumps"];
        let store = MemoryStore::new();
        let target = address("c1", "m1");

        ResponseAggregator::new(store.clone())
            .run(
                target.clone(),
                "Hi",
                &ScriptedSource::new(fragments),
                &CancellationToken::new(),
            )
            .await;

        let writes = store.writes_for(&target);
        let streamed: Vec<_> = writes
            .iter()
            .skip(1)
            .filter(|value| value.status == MessageStatus::Streaming)
            .map(|value| value.message.clone())
            .collect();

        let mut expected = String::new();
        let prefixes: Vec<_> = fragments
            .iter()
            .map(|fragment| {
                expected.push_str(fragment);
                expected.clone()
            })
            .collect();
        assert_eq!(streamed, prefixes);

        let completed_count = writes.iter().filter(|value| value.is_completed()).count();
        assert_eq!(completed_count, 1);
        assert!(writes.last().unwrap().is_completed());
    }

    #[tokio::test]
    async fn test_source_opened_after_initial_write() {
        let store = MemoryStore::new();
        let source = ScriptedSource::new(["Hello"]).observing(store.clone());

        ResponseAggregator::new(store.clone())
            .run(
                address("c1", "m1"),
                "Hi",
                &source,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(source.writes_at_open(), vec![1]);
    }

    #[tokio::test]
    async fn test_initialize_failure_skips_source() {
        let store = MemoryStore::new().fail_write(0);
        let source = ScriptedSource::new(["Hello"]);
        let target = address("c1", "m1");

        let report = ResponseAggregator::new(store.clone())
            .run(target.clone(), "Hi", &source, &CancellationToken::new())
            .await;

        assert_eq!(report.outcome, SessionOutcome::StoreFailed);
        assert!(!report.terminal_written);
        assert_eq!(report.writes, 0);
        assert!(source.prompts().is_empty());
        assert!(store.get(&target).is_none());
    }

    #[tokio::test]
    async fn test_streaming_write_failure_completes_with_apology() {
        let store = MemoryStore::new().fail_write(1);
        let target = address("c1", "m1");

        let report = ResponseAggregator::new(store.clone())
            .run(
                target.clone(),
                "Hi",
                &ScriptedSource::new(["Hel", "lo"]),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(
            observed(&store, &target),
            vec![streaming(""), completed(APOLOGY_MESSAGE)]
        );
        assert_eq!(report.outcome, SessionOutcome::StoreFailed);
        assert!(report.terminal_written);
        assert_eq!(report.fragments, 1);
    }

    #[tokio::test]
    async fn test_terminal_write_failure_is_reported() {
        let store = MemoryStore::new().fail_write(2);
        let target = address("c1", "m1");

        let report = ResponseAggregator::new(store.clone())
            .run(
                target.clone(),
                "Hi",
                &ScriptedSource::new(["Hello"]),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(report.outcome, SessionOutcome::StoreFailed);
        assert!(!report.terminal_written);
        assert_eq!(report.writes, 2);
        assert_eq!(
            observed(&store, &target),
            vec![streaming(""), streaming("Hello")]
        );
    }

    #[tokio::test]
    async fn test_cancellation_completes_with_partial_text() {
        let store = MemoryStore::new();
        let mut updates = store.subscribe();
        let aggregator = ResponseAggregator::new(store.clone());
        let source = Arc::new(ScriptedSource::new(["Hel"]).then_pending());
        let cancel = CancellationToken::new();
        let target = address("c1", "m1");

        let handle = tokio::spawn({
            let cancel = cancel.clone();
            let target = target.clone();
            async move { aggregator.run(target, "Hi", &source, &cancel).await }
        });

        // Initial write, then the first fragment.
        updates.recv().await.unwrap();
        updates.recv().await.unwrap();
        cancel.cancel();

        let report = handle.await.unwrap();
        assert_eq!(report.outcome, SessionOutcome::Cancelled);
        assert_eq!(
            observed(&store, &target),
            vec![streaming(""), streaming("Hel"), completed("Hel")]
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_start_completes_empty() {
        let store = MemoryStore::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let source = ScriptedSource::new(["Hello"]);
        let target = address("c1", "m1");

        let report = ResponseAggregator::new(store.clone())
            .run(target.clone(), "Hi", &source, &cancel)
            .await;

        assert_eq!(report.outcome, SessionOutcome::Cancelled);
        assert_eq!(observed(&store, &target), vec![streaming(""), completed("")]);
        assert!(source.prompts().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_sessions_are_isolated() {
        let store = MemoryStore::new();
        let aggregator = ResponseAggregator::new(store.clone());
        let first = address("c1", "m1");
        let second = address("c2", "m1");
        let cancel = CancellationToken::new();

        let left = ScriptedSource::new(["a", "b", "c"]);
        let right = ScriptedSource::new(["x", "y"]).failing_with("boom");
        let (left_report, right_report) = tokio::join!(
            aggregator.run(first.clone(), "left", &left, &cancel),
            aggregator.run(second.clone(), "right", &right, &cancel),
        );

        assert_eq!(left_report.outcome, SessionOutcome::Completed);
        assert_eq!(right_report.outcome, SessionOutcome::SourceFailed);
        assert_eq!(
            observed(&store, &first),
            vec![
                streaming(""),
                streaming("a"),
                streaming("ab"),
                streaming("abc"),
                completed("abc"),
            ]
        );
        assert_eq!(
            observed(&store, &second),
            vec![
                streaming(""),
                streaming("x"),
                streaming("xy"),
                completed(APOLOGY_MESSAGE),
            ]
        );
        assert_eq!(store.writes().len(), 9);
    }

    #[tokio::test]
    async fn test_manual_session_protocol() {
        let store = MemoryStore::new();
        let aggregator = ResponseAggregator::new(store.clone());
        let target = address("c1", "m1");

        let mut session = aggregator.initialize(target.clone()).await.unwrap();
        assert!(!session.accumulate("").await.unwrap());
        assert!(session.accumulate("Hi").await.unwrap());
        assert_eq!(session.text(), "Hi");
        assert_eq!(session.writes(), 2);

        let report = session.finalize(Finalization::Exhausted).await;
        assert_eq!(report.outcome, SessionOutcome::Completed);
        assert_eq!(
            observed(&store, &target),
            vec![streaming(""), streaming("Hi"), completed("Hi")]
        );
    }

    #[tokio::test]
    async fn test_empty_conversation_id_is_served() {
        let store = MemoryStore::new();
        let event = ChatMessageEvent::new("Hi", "", "m1");

        let report = ResponseAggregator::new(store.clone())
            .respond(&event, &ScriptedSource::new(["x"]), &CancellationToken::new())
            .await;

        assert_eq!(report.outcome, SessionOutcome::Completed);
        assert_eq!(
            observed(&store, &address("", "m1")),
            vec![streaming(""), streaming("x"), completed("x")]
        );
    }
}
