#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for the event worker loop.
pub const TRACING_TARGET_WORKER: &str = "parley_server::worker";

/// Tracing target for per-event session handling.
pub const TRACING_TARGET_HANDLER: &str = "parley_server::handler";

mod config;
mod error;
mod handler;
mod worker;

pub use crate::config::WorkerConfig;
pub use crate::error::{BoxedError, Error, ErrorKind, Result};
pub use crate::handler::ResponseHandler;
pub use crate::worker::ResponseWorker;
