//! CLI configuration management.
//!
//! This module defines the complete CLI configuration hierarchy:
//!
//! ```text
//! Cli
//! ├── command: Command          # serve (default), send, watch
//! ├── nats: NatsConfig          # NATS connection
//! ├── ollama: OllamaConfig      # Model endpoint and prompt
//! └── worker: WorkerConfig      # Session limits and shutdown
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.

mod command;

use std::process;

use anyhow::Context;
use clap::Parser;
use parley_nats::NatsConfig;
use parley_rig::OllamaConfig;
use parley_server::WorkerConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use self::command::{Command, SendArgs, WatchArgs};
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "parley")]
#[command(about = "Streams AI chat responses into a NATS conversation store")]
#[command(version)]
pub struct Cli {
    /// Command to run; `serve` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "PARLEY_LOG_JSON")]
    pub log_json: bool,

    /// NATS connection configuration.
    #[clap(flatten)]
    pub nats: NatsConfig,

    /// Ollama model configuration.
    #[clap(flatten)]
    pub ollama: OllamaConfig,

    /// Response worker configuration.
    #[clap(flatten)]
    pub worker: WorkerConfig,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded first so clap picks its values up as
    /// environment defaults.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(filter);

        if self.log_json {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
    }

    /// Returns the command to run.
    pub fn selected_command(&self) -> Command {
        self.command.clone().unwrap_or_default()
    }

    /// Validates the configuration the selected command needs.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.nats
            .validate()
            .context("invalid NATS configuration")?;

        if matches!(self.selected_command(), Command::Serve) {
            self.ollama
                .validate()
                .context("invalid Ollama configuration")?;
            self.worker
                .validate()
                .context("invalid worker configuration")?;
        }

        Ok(())
    }

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            command = self.selected_command().as_str(),
            nats_url = %self.nats.nats_url,
            nats_client_name = %self.nats.name(),
            nats_token = self.nats.nats_token.is_some(),
            "NATS configuration"
        );

        if matches!(self.selected_command(), Command::Serve) {
            tracing::info!(
                target: TRACING_TARGET_CONFIG,
                ollama_host = %self.ollama.ollama_host,
                ollama_model = %self.ollama.ollama_model,
                max_concurrent_sessions = self.worker.max_concurrent_sessions,
                shutdown_timeout_secs = self.worker.shutdown_timeout_secs,
                "Worker configuration"
            );
        }
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_is_default() {
        let cli = Cli::try_parse_from(["parley"]).unwrap();
        assert_eq!(cli.selected_command(), Command::Serve);
        assert_eq!(cli.worker, WorkerConfig::default());
    }

    #[test]
    fn test_parse_send() {
        let cli = Cli::try_parse_from([
            "parley",
            "--nats-url",
            "nats://broker:4222",
            "send",
            "Hi",
            "--conversation-id",
            "c1",
        ])
        .unwrap();

        assert_eq!(cli.nats.nats_url, "nats://broker:4222");
        let Command::Send(args) = cli.selected_command() else {
            panic!("expected send command");
        };
        assert_eq!(args.message, "Hi");
        assert_eq!(args.conversation_id, "c1");
        assert!(args.assistant_message_id.is_none());
        assert!(!args.follow);
    }

    #[test]
    fn test_parse_watch() {
        let cli = Cli::try_parse_from(["parley", "watch", "c1", "--log-json"]).unwrap();
        assert!(cli.log_json);
        assert_eq!(
            cli.selected_command(),
            Command::Watch(WatchArgs {
                conversation_id: "c1".to_owned(),
            })
        );
    }

    #[test]
    fn test_send_requires_conversation() {
        assert!(Cli::try_parse_from(["parley", "send", "Hi"]).is_err());
    }
}
