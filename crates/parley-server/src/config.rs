//! Worker configuration.

use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::{Error, Result};

/// Default maximum number of concurrent sessions.
pub const DEFAULT_MAX_CONCURRENT_SESSIONS: usize = 16;

/// Default time in seconds to wait for in-flight sessions on shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// Configuration for the response worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct WorkerConfig {
    /// Maximum sessions streaming at the same time.
    #[cfg_attr(
        feature = "config",
        arg(
            long,
            env = "PARLEY_MAX_CONCURRENT_SESSIONS",
            default_value_t = DEFAULT_MAX_CONCURRENT_SESSIONS
        )
    )]
    pub max_concurrent_sessions: usize,

    /// Seconds to wait for in-flight sessions after shutdown is requested.
    #[cfg_attr(
        feature = "config",
        arg(
            long,
            env = "PARLEY_SHUTDOWN_TIMEOUT_SECS",
            default_value_t = DEFAULT_SHUTDOWN_TIMEOUT_SECS
        )
    )]
    pub shutdown_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: DEFAULT_MAX_CONCURRENT_SESSIONS,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl WorkerConfig {
    /// Creates a new worker configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum concurrent sessions.
    #[must_use]
    pub fn with_max_concurrent_sessions(mut self, max_concurrent_sessions: usize) -> Self {
        self.max_concurrent_sessions = max_concurrent_sessions;
        self
    }

    /// Sets the shutdown timeout in seconds.
    #[must_use]
    pub fn with_shutdown_timeout_secs(mut self, secs: u64) -> Self {
        self.shutdown_timeout_secs = secs;
        self
    }

    /// Returns the shutdown timeout as a Duration.
    #[inline]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Creates a semaphore for limiting concurrent sessions.
    pub fn create_semaphore(&self) -> Arc<Semaphore> {
        Arc::new(Semaphore::new(self.max_concurrent_sessions))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_sessions == 0 {
            return Err(Error::config("max concurrent sessions must be positive"));
        }
        if self.max_concurrent_sessions > Semaphore::MAX_PERMITS {
            return Err(Error::config("max concurrent sessions is too large"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkerConfig::new();
        assert_eq!(config.max_concurrent_sessions, 16);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_semaphore_permits() {
        let config = WorkerConfig::new().with_max_concurrent_sessions(3);
        assert_eq!(config.create_semaphore().available_permits(), 3);
    }

    #[test]
    fn test_config_validation() {
        let config = WorkerConfig::new().with_max_concurrent_sessions(0);
        assert!(config.validate().is_err());

        let config = WorkerConfig::new().with_shutdown_timeout_secs(0);
        assert!(config.validate().is_ok());
    }
}
