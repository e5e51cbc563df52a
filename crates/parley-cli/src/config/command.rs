//! Subcommand definitions.

use clap::{Args, Subcommand};

/// Command selected on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the response worker until interrupted.
    #[default]
    Serve,

    /// Publish a chat message event.
    Send(SendArgs),

    /// Print every state change of a conversation.
    Watch(WatchArgs),
}

impl Command {
    /// Returns the command name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Serve => "serve",
            Self::Send(_) => "send",
            Self::Watch(_) => "watch",
        }
    }
}

/// Arguments of the `send` command.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct SendArgs {
    /// Text of the user message.
    pub message: String,

    /// Conversation the reply belongs to.
    #[arg(long, short = 'c')]
    pub conversation_id: String,

    /// Message id reserved for the reply; a new UUIDv7 when omitted.
    #[arg(long, short = 'm')]
    pub assistant_message_id: Option<String>,

    /// Follow the reply until it completes.
    #[arg(long, short = 'f')]
    pub follow: bool,
}

/// Arguments of the `watch` command.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct WatchArgs {
    /// Conversation to follow.
    pub conversation_id: String,
}
