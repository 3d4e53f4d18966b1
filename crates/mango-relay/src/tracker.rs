//! Single-status-message tracker.
//!
//! At most one live status message per relay process, identified by one
//! decimal integer persisted in a flat text file. The file is loaded once
//! at startup and atomically overwritten on every (re)creation; it is
//! never appended to and never deleted.

use crate::error::Result;
use mango_core::io;
use std::path::{Path, PathBuf};

pub struct StatusTracker {
    path: PathBuf,
    id: Option<u64>,
}

impl StatusTracker {
    /// Load the persisted id; an absent file or unparseable content means
    /// no tracked message yet.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| raw.trim().parse().ok());
        Self { path, id }
    }

    pub fn get(&self) -> Option<u64> {
        self.id
    }

    /// Remember and persist a new message id.
    pub fn set(&mut self, id: u64) -> Result<()> {
        self.id = Some(id);
        io::atomic_write(&self.path, id.to_string().as_bytes())?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
