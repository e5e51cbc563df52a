//! `send` command: publish one chat message event.

use std::io::{self, Write};

use anyhow::{Context, bail};
use futures::StreamExt;
use parley_core::ChatMessageEvent;
use parley_nats::NatsClient;

use crate::config::SendArgs;

/// Publishes the event and optionally follows the reply.
pub async fn run(args: &SendArgs, nats_client: &NatsClient) -> anyhow::Result<()> {
    let assistant_message_id = args
        .assistant_message_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());

    let event = ChatMessageEvent::new(
        args.message.clone(),
        args.conversation_id.clone(),
        assistant_message_id,
    );
    let address = event.address();

    let publisher = nats_client
        .chat_publisher()
        .await
        .context("failed to create chat publisher")?;
    let sequence = publisher
        .publish(&event)
        .await
        .context("failed to publish chat message")?;

    println!("published {address} (sequence {sequence})");

    if !args.follow {
        return Ok(());
    }

    let store = nats_client
        .conversation_store()
        .await
        .context("failed to open conversation store")?;
    let mut updates = store
        .watch_message(&address)
        .await
        .context("failed to watch reply")?;

    let mut stdout = io::stdout();
    let mut printed = String::new();
    while let Some(update) = updates.next().await {
        let update = update.context("failed to read reply update")?;
        let Some(value) = update.value else {
            bail!("reply {address} was deleted");
        };

        print_delta(&mut stdout, &printed, &value.message)
            .context("failed to print reply")?;
        if value.is_completed() {
            println!();
            return Ok(());
        }
        printed = value.message;
    }

    bail!("watch on {address} ended before the reply completed")
}

/// Prints the part of `current` not yet printed.
///
/// A value that does not extend what was printed (the apology) is printed
/// on its own line.
fn print_delta(out: &mut impl Write, printed: &str, current: &str) -> io::Result<()> {
    match current.strip_prefix(printed) {
        Some(delta) => write!(out, "{delta}")?,
        None => write!(out, "\n{current}")?,
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn test_print_delta_appends_new_text() {
        let mut out = Vec::new();
        print_delta(&mut out, "", "Hel").unwrap();
        print_delta(&mut out, "Hel", "Hello").unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "Hello");
    }

    #[test]
    fn test_print_delta_puts_replacement_on_new_line() {
        let mut out = Vec::new();
        print_delta(&mut out, "Hel", "Sorry").unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "\nSorry");
    }

    #[test]
    fn test_print_delta_reports_write_failure() {
        let err = print_delta(&mut ClosedPipe, "", "Hello").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
