//! Error types for parley-rig.

use std::fmt;

/// Result type alias for rig operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the model provider.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Provider error (client setup or request failed).
    #[error("provider error: {provider}: {message}")]
    Provider { provider: String, message: String },

    /// The provider stream failed mid-response.
    #[error("stream error: {0}")]
    Stream(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Creates a provider error.
    pub fn provider(provider: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Provider {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }

    /// Creates a stream error.
    pub fn stream(message: impl fmt::Display) -> Self {
        Self::Stream(message.to_string())
    }

    /// Creates a configuration error.
    pub fn config(message: impl fmt::Display) -> Self {
        Self::Config(message.to_string())
    }
}

impl From<Error> for parley_core::Error {
    fn from(err: Error) -> Self {
        let core = match &err {
            Error::Config(_) => parley_core::Error::configuration(),
            Error::Provider { .. } | Error::Stream(_) => parley_core::Error::source_failure(),
        };

        core.with_message(err.to_string()).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use parley_core::ErrorKind;

    use super::*;

    #[test]
    fn test_error_display() {
        let error = Error::provider("ollama", "model not found");
        assert_eq!(error.to_string(), "provider error: ollama: model not found");
    }

    #[test]
    fn test_conversion_to_core_error() {
        let core: parley_core::Error = Error::stream("connection reset").into();
        assert_eq!(core.kind(), ErrorKind::Source);

        let core: parley_core::Error = Error::config("bad host").into();
        assert_eq!(core.kind(), ErrorKind::Configuration);
    }
}
