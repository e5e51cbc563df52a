//! `serve` command: run the response worker.

use anyhow::Context;
use parley_nats::NatsClient;
use parley_rig::OllamaSource;
use parley_server::{ResponseHandler, ResponseWorker};
use tokio_util::sync::CancellationToken;

use crate::TRACING_TARGET_STARTUP;
use crate::config::Cli;
use crate::server::shutdown_signal;

/// Runs the worker until a shutdown signal arrives.
pub async fn run(cli: &Cli, nats_client: NatsClient) -> anyhow::Result<()> {
    let store = nats_client
        .conversation_store()
        .await
        .context("failed to open conversation store")?;

    let source = OllamaSource::new(&cli.ollama).context("failed to create Ollama source")?;

    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        bucket = store.bucket_name(),
        model = %source.model(),
        "Response handler ready"
    );

    let handler = ResponseHandler::new(store, source);
    let worker = ResponseWorker::new(nats_client, handler, cli.worker.clone());

    let cancel = CancellationToken::new();
    let signal = tokio::spawn(shutdown_signal(cancel.clone()));

    let result = worker.run(cancel.clone()).await;

    // Release the signal task if the worker stopped on its own.
    cancel.cancel();
    let _ = signal.await;

    result.context("response worker failed")
}
