//! Chat message event stream.

use std::time::Duration;

use parley_core::ChatMessageEvent;

use super::{EventPublisher, EventStream, EventSubscriber, TypedMessageStream};

/// Stream of inbound chat messages that each start one response session.
///
/// Messages expire after 1 day. A session may stream for minutes, so the
/// ack deadline is generous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChatMessageStream;

impl EventStream for ChatMessageStream {
    const ACK_WAIT: Duration = Duration::from_secs(5 * 60);
    const CONSUMER_NAME: &'static str = "ai-response";
    const MAX_AGE: Option<Duration> = Some(Duration::from_secs(24 * 60 * 60));
    const NAME: &'static str = "CHAT_MESSAGES";
    const SUBJECT: &'static str = "chat.message";
}

/// Publisher of chat message events.
pub type ChatMessagePublisher = EventPublisher<ChatMessageEvent, ChatMessageStream>;

/// Subscriber of chat message events.
pub type ChatMessageSubscriber = EventSubscriber<ChatMessageEvent, ChatMessageStream>;

/// Pull stream of chat message events.
pub type ChatMessageReceiver = TypedMessageStream<ChatMessageEvent>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_stream() {
        assert_eq!(ChatMessageStream::NAME, "CHAT_MESSAGES");
        assert_eq!(ChatMessageStream::SUBJECT, "chat.message");
        assert_eq!(ChatMessageStream::CONSUMER_NAME, "ai-response");
        assert_eq!(
            ChatMessageStream::MAX_AGE,
            Some(Duration::from_secs(24 * 60 * 60))
        );
    }

    #[test]
    fn test_chat_message_subjects() {
        assert_eq!(
            ChatMessageStream::subjects(),
            vec!["chat.message".to_string(), "chat.message.>".to_string()]
        );
    }
}
