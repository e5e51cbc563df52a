//! `watch` command: follow a conversation in the store.

use anyhow::Context;
use futures::StreamExt;
use parley_nats::NatsClient;
use tokio_util::sync::CancellationToken;

use crate::config::WatchArgs;
use crate::server::shutdown_signal;

/// Prints every state change until interrupted.
///
/// Each change is one JSON line with the ids, revision and value.
pub async fn run(args: &WatchArgs, nats_client: &NatsClient) -> anyhow::Result<()> {
    let store = nats_client
        .conversation_store()
        .await
        .context("failed to open conversation store")?;
    let mut updates = store
        .watch_conversation(&args.conversation_id)
        .await
        .context("failed to watch conversation")?;

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    loop {
        let update = tokio::select! {
            _ = cancel.cancelled() => break,
            update = updates.next() => update,
        };

        let Some(update) = update else { break };
        let update = update.context("failed to read conversation update")?;

        let line = serde_json::json!({
            "conversationId": update.key.0.conversation_id(),
            "messageId": update.key.0.message_id(),
            "revision": update.revision,
            "value": update.value,
        });
        println!("{line}");
    }

    cancel.cancel();
    Ok(())
}
