//! One infrastructure run, end to end.
//!
//! State machine: `received command → init → (apply | destroy) → done | failed`.
//! There is no planning or review state; an `init` failure short-circuits
//! before the mutating step ever runs. Each run works in a throwaway temp
//! directory and coordinates nothing with concurrent runs.

use crate::command::Command;
use crate::config::JobConfig;
use crate::error::Result;
use crate::git::{GitTransport, HostKeyCheck};
use crate::keys;
use crate::params::ParameterStore;
use crate::terraform::Terraform;
use std::path::Path;

/// Relative locations inside the manifests repository.
const INFRA_DIR: &str = "terraform/minecraft_infrastructure";
const PRIVATE_KEY_DIR: &str = "terraform/minecraft_infrastructure/private-key";
const EC2_KEY_FILE: &str = "terraform_key.pem";

pub struct JobRunner {
    config: JobConfig,
    store: ParameterStore,
}

impl JobRunner {
    pub fn new(config: JobConfig) -> Result<Self> {
        let store = ParameterStore::new(config.ssm_endpoint.clone())?;
        Ok(Self { config, store })
    }

    /// Read the pending command from the parameter store and run it.
    pub fn run_pending(&self) -> Result<()> {
        let command = self.store.fetch_command(&self.config.command_param)?;
        self.run(command)
    }

    /// Execute one run for `command`.
    pub fn run(&self, command: Command) -> Result<()> {
        tracing::info!(%command, "starting infrastructure run");

        let git_key = self.store.fetch(&self.config.git_key_param)?;
        let tf_token = self.store.fetch(&self.config.tf_token_param)?;

        let scratch = tempfile::tempdir()?;
        let key_path = keys::write_secret_file(scratch.path(), "git_deploy_key", &git_key)?;

        let host_key_check = if self.config.git_accept_any_host_key {
            HostKeyCheck::AcceptAny
        } else {
            HostKeyCheck::Strict
        };
        let transport = GitTransport::new(&key_path, host_key_check);
        let checkout = transport.clone(
            &self.config.manifest_repo_url,
            &scratch.path().join("manifests"),
            &self.config.manifest_repo_branch,
        )?;

        let infra_dir = checkout.workdir().join(INFRA_DIR);
        let tf = Terraform::new(&infra_dir)?.env("TF_TOKEN_app_terraform_io", tf_token);

        run_phases(&tf, command, &checkout.workdir().join(PRIVATE_KEY_DIR))?;
        tracing::info!(%command, "infrastructure run complete");
        Ok(())
    }
}

/// The terraform phase sequence for one command. Split out so tests can
/// drive it against a stub binary without a checkout or parameter store.
pub fn run_phases(tf: &Terraform, command: Command, key_dir: &Path) -> Result<()> {
    match command {
        Command::Start => {
            keys::generate_key_pair(key_dir, EC2_KEY_FILE)?;
            tf.init()?;
            tf.apply()?;
        }
        Command::Stop => {
            tf.init()?;
            tf.destroy()?;
        }
        // The control plane answers status directly; nothing to mutate.
        Command::Status => {
            tracing::info!("status run: no terraform operation");
        }
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::MangoError;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn stub_terraform(dir: &Path, fail_op: Option<&str>) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let log = dir.join("calls.log");
        let fail = fail_op.unwrap_or("");
        let script = format!(
            "#!/bin/sh\necho \"$1\" >> {log}\nif [ \"$1\" = \"{fail}\" ]; then\n  echo \"{fail} failed\" >&2\n  exit 1\nfi\n",
            log = log.display(),
        );
        let path = dir.join("terraform");
        std::fs::write(&path, script).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn calls(dir: &Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn start_runs_init_then_apply() {
        let dir = TempDir::new().unwrap();
        let tf = Terraform::with_binary(stub_terraform(dir.path(), None), dir.path());
        run_phases(&tf, Command::Start, &dir.path().join("private-key")).unwrap();
        assert_eq!(calls(dir.path()), vec!["init", "apply"]);
        assert!(dir.path().join("private-key").join(EC2_KEY_FILE).exists());
    }

    #[test]
    fn stop_runs_init_then_destroy() {
        let dir = TempDir::new().unwrap();
        let tf = Terraform::with_binary(stub_terraform(dir.path(), None), dir.path());
        run_phases(&tf, Command::Stop, &dir.path().join("private-key")).unwrap();
        assert_eq!(calls(dir.path()), vec!["init", "destroy"]);
    }

    #[test]
    fn init_failure_short_circuits_the_mutating_step() {
        let dir = TempDir::new().unwrap();
        let tf = Terraform::with_binary(stub_terraform(dir.path(), Some("init")), dir.path());

        let err = run_phases(&tf, Command::Start, &dir.path().join("private-key")).unwrap_err();
        assert!(matches!(err, MangoError::Terraform { ref op, .. } if op == "init"));
        assert_eq!(calls(dir.path()), vec!["init"]);

        let err = run_phases(&tf, Command::Stop, &dir.path().join("private-key")).unwrap_err();
        assert!(matches!(err, MangoError::Terraform { ref op, .. } if op == "init"));
        assert_eq!(calls(dir.path()), vec!["init", "init"]);
    }

    #[test]
    fn status_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let tf = Terraform::with_binary(stub_terraform(dir.path(), None), dir.path());
        run_phases(&tf, Command::Status, &dir.path().join("private-key")).unwrap();
        assert!(calls(dir.path()).is_empty());
        assert!(!dir.path().join("private-key").exists());
    }
}
