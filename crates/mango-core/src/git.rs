//! Source sync over authenticated SSH.
//!
//! Thin wrapper over the `git` binary. All network operations go through a
//! [`GitTransport`] that pins `GIT_SSH_COMMAND` to the run's private key.
//! Output is never parsed; a non-zero exit surfaces the captured stderr.

use crate::error::{MangoError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Whether SSH verifies the remote host key.
///
/// `AcceptAny` disables verification (`StrictHostKeyChecking=no` with a null
/// known-hosts file), trading host authenticity for zero-setup clones from
/// ephemeral jobs. It is an explicit opt-in and logged as a warning; use
/// `Strict` anywhere a known-hosts file can be provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKeyCheck {
    Strict,
    AcceptAny,
}

/// SSH transport configuration shared by clone and push.
#[derive(Debug)]
pub struct GitTransport {
    ssh_command: String,
}

impl GitTransport {
    pub fn new(private_key: &Path, host_key_check: HostKeyCheck) -> Self {
        let mut ssh_command = format!("ssh -i {}", private_key.display());
        if host_key_check == HostKeyCheck::AcceptAny {
            tracing::warn!("host-key verification disabled for git transport");
            ssh_command.push_str(" -o UserKnownHostsFile=/dev/null -o StrictHostKeyChecking=no");
        }
        Self { ssh_command }
    }

    pub fn ssh_command(&self) -> &str {
        &self.ssh_command
    }

    /// Clone `url` at `branch` into `dest`.
    pub fn clone(&self, url: &str, dest: &Path, branch: &str) -> Result<Checkout> {
        tracing::info!(url, branch, dest = %dest.display(), "cloning repository");
        let dest_str = dest.to_str().ok_or_else(|| MangoError::Git {
            op: "clone".to_string(),
            stderr: "destination path is not valid UTF-8".to_string(),
        })?;
        run_git(
            "clone",
            None,
            self,
            &["clone", "--branch", branch, url, dest_str],
        )?;
        Ok(Checkout {
            workdir: dest.to_path_buf(),
            transport: GitTransport {
                ssh_command: self.ssh_command.clone(),
            },
        })
    }
}

/// A cloned working directory, valid for the lifetime of one job.
#[derive(Debug)]
pub struct Checkout {
    workdir: PathBuf,
    transport: GitTransport,
}

impl Checkout {
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Stage all tracked-file modifications and commit them.
    pub fn commit(&self, message: &str, author_name: &str, author_email: &str) -> Result<()> {
        run_git("add", Some(&self.workdir), &self.transport, &["add", "-u"])?;
        run_git(
            "commit",
            Some(&self.workdir),
            &self.transport,
            &[
                "-c",
                &format!("user.name={author_name}"),
                "-c",
                &format!("user.email={author_email}"),
                "commit",
                "-m",
                message,
                "--author",
                &format!("{author_name} <{author_email}>"),
            ],
        )?;
        Ok(())
    }

    /// Push `branch` to `remote` over the same transport used for clone.
    pub fn push(&self, remote: &str, branch: &str) -> Result<()> {
        tracing::info!(remote, branch, "pushing");
        run_git(
            "push",
            Some(&self.workdir),
            &self.transport,
            &["push", remote, branch],
        )?;
        Ok(())
    }
}

fn run_git(op: &str, cwd: Option<&Path>, transport: &GitTransport, args: &[&str]) -> Result<()> {
    let git = which::which("git").map_err(|_| MangoError::BinaryNotFound("git"))?;

    let mut cmd = Command::new(git);
    cmd.args(args)
        .env("GIT_SSH_COMMAND", transport.ssh_command())
        .env("GIT_TERMINAL_PROMPT", "0");
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = cmd.output()?;
    if !output.status.success() {
        return Err(MangoError::Git {
            op: op.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}
