//! `mango-relay` — the chat side of mango.
//!
//! Translates operator chat commands (`!start`, `!stop`, `!status`) into
//! calls against the control-plane API and reflects every outcome into a
//! single tracked status message, edited in place rather than re-posted.
//!
//! ```text
//! ChatClient (REST poll)
//!     │ ChatMessage
//!     ▼
//! RelaySession ── parses Command, owns StatusTracker + inactivity clock
//!     │
//!     ▼
//! CommandApi ── POST /minecraft-prod/command, BOT_REPLY → status message
//! ```

pub mod api;
pub mod chat;
pub mod error;
pub mod session;
pub mod tracker;

pub use api::{ApiReply, CommandApi};
pub use chat::{bootstrap_channel, ChatApi, ChatClient, ChatMessage};
pub use error::{RelayError, Result};
pub use session::{CommandRequest, RelaySession};
pub use tracker::StatusTracker;
