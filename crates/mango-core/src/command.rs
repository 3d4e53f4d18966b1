//! The operator command vocabulary.
//!
//! Every entry point (chat relay, job runner, parameter store) converges on
//! this one closed enum. String-typed dispatch exists only at the parse
//! boundary; past `FromStr` the set is checked exhaustively.

use crate::error::{MangoError, Result};
use serde::{Deserialize, Serialize};

/// An operator command for the Minecraft server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Start,
    Stop,
    Status,
}

impl Command {
    /// The lowercase name used on the wire and in chat.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Stop => "stop",
            Command::Status => "status",
        }
    }

    /// All commands, in the order they appear in the help listing.
    pub fn all() -> [Command; 3] {
        [Command::Start, Command::Status, Command::Stop]
    }

    /// One-line usage blurb for the help listing.
    pub fn blurb(&self) -> &'static str {
        match self {
            Command::Start => {
                " 🚀 Use this command to start the Minecraft server! Just type `!start` and watch the magic happen. "
            }
            Command::Status => " 🔍 Type `!status` and I'll get the latest updates for you.",
            Command::Stop => {
                " 🛑 Want to pause your Minecraft journey for now? Type `!stop` and the server will safely stop, allowing you to resume later."
            }
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Command {
    type Err = MangoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "status" => Ok(Command::Status),
            other => Err(MangoError::InvalidCommand(other.to_string())),
        }
    }
}

/// The static help listing shown in the tracked message at rest.
pub fn help_text() -> String {
    let mut out = String::new();
    for command in Command::all() {
        out.push_str(&format!("`{}`: {}\n", command.name(), command.blurb()));
    }
    out
}
