#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for Ollama requests and streams.
pub const TRACING_TARGET_OLLAMA: &str = "parley_rig::ollama";

mod config;
mod error;
mod source;

pub use config::OllamaConfig;
pub use error::{Error, Result};
pub use source::OllamaSource;
