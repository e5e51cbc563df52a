//! Subcommand implementations.

mod send;
mod serve;
mod watch;

use std::time::Duration;

use anyhow::Context;
use parley_nats::{NatsClient, NatsConfig};

use crate::{TRACING_TARGET_SHUTDOWN, TRACING_TARGET_STARTUP};
use crate::config::{Cli, Command};

/// Runs the command selected on the command line.
pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let command = cli.selected_command();
    let nats_client = connect(cli.nats.clone()).await?;

    let result = match command {
        Command::Serve => serve::run(&cli, nats_client.clone()).await,
        Command::Send(args) => send::run(&args, &nats_client).await,
        Command::Watch(args) => watch::run(&args, &nats_client).await,
    };

    if let Err(err) = nats_client.drain().await {
        tracing::warn!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %err,
            "Failed to drain NATS connection"
        );
    }

    result
}

/// Connects to NATS and reports the round trip of a first ping.
async fn connect(config: NatsConfig) -> anyhow::Result<NatsClient> {
    let nats_client = NatsClient::connect(config)
        .await
        .context("failed to connect to NATS")?;

    let rtt: Duration = nats_client
        .ping()
        .await
        .context("NATS did not answer ping")?;

    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        connected = nats_client.is_connected(),
        rtt_ms = rtt.as_millis(),
        "NATS connection ready"
    );

    Ok(nats_client)
}
