//! `mango-core` — domain types and infrastructure orchestration.
//!
//! Everything the job process needs to turn one operator [`Command`] into
//! an infrastructure run: environment configuration, parameter-store
//! lookups, key provisioning, a git checkout of the Terraform manifests,
//! and the terraform driver itself. The chat-facing side lives in
//! `mango-relay`.

pub mod command;
pub mod config;
pub mod error;
pub mod git;
pub mod io;
pub mod job;
pub mod keys;
pub mod params;
pub mod terraform;

pub use command::Command;
pub use error::{MangoError, Result};
