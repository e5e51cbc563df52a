#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for response aggregation sessions.
pub const TRACING_TARGET_AGGREGATOR: &str = "parley_core::aggregator";

/// Tracing target for in-memory store operations.
pub const TRACING_TARGET_STORE: &str = "parley_core::store";

mod error;

pub mod aggregator;
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;
pub mod source;
pub mod store;
pub mod types;

pub use aggregator::{
    APOLOGY_MESSAGE, Finalization, ResponseAggregator, SessionOutcome, SessionReport,
    StreamingSession,
};
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use source::{FragmentSource, FragmentStream};
pub use store::ConversationStore;
pub use types::{
    ChatMessageEvent, ConversationAddress, ConversationMessage, MessageSender, MessageStatus,
};
