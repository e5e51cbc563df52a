//! JetStream streams carrying inbound chat message events.
//!
//! Streams are described by [`EventStream`] types; publishers and
//! subscribers are generic over the payload and the stream description.

mod chat_message;
mod event_pub;
mod event_stream;
mod event_sub;
mod stream_pub;
mod stream_sub;

pub use chat_message::{
    ChatMessagePublisher, ChatMessageReceiver, ChatMessageStream, ChatMessageSubscriber,
};
pub use event_pub::EventPublisher;
pub use event_stream::EventStream;
pub use event_sub::EventSubscriber;
pub use stream_pub::StreamPublisher;
pub use stream_sub::{StreamSubscriber, TypedMessage, TypedMessageStream};
