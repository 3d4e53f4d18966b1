//! Infra driver: a narrow wrapper around the `terraform` binary.
//!
//! Three operations — `init`, `apply`, `destroy` — each a single blocking
//! invocation scoped to one working directory. The tool is an opaque
//! collaborator: nothing is parsed beyond the exit code and the captured
//! streams, and any non-zero exit is fatal for the run.

use crate::error::{MangoError, Result};
use std::path::PathBuf;
use std::process::Command;

/// The terraform operations this driver knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TfOp {
    Init,
    Apply,
    Destroy,
}

impl TfOp {
    pub fn name(&self) -> &'static str {
        match self {
            TfOp::Init => "init",
            TfOp::Apply => "apply",
            TfOp::Destroy => "destroy",
        }
    }

    /// Full argument list. `apply` and `destroy` always auto-approve —
    /// there is no interactive confirmation in a headless job.
    fn args(&self) -> &'static [&'static str] {
        match self {
            TfOp::Init => &["init", "-input=false", "-no-color"],
            TfOp::Apply => &["apply", "-input=false", "-auto-approve", "-no-color"],
            TfOp::Destroy => &["destroy", "-input=false", "-auto-approve", "-no-color"],
        }
    }
}

/// Captured result of one terraform invocation.
#[derive(Debug)]
pub struct InfraOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

pub struct Terraform {
    binary: PathBuf,
    working_dir: PathBuf,
    env: Vec<(String, String)>,
}

impl Terraform {
    /// Driver for `working_dir`, with the binary discovered on PATH.
    pub fn new(working_dir: impl Into<PathBuf>) -> Result<Self> {
        let binary = which::which("terraform").map_err(|_| MangoError::BinaryNotFound("terraform"))?;
        Ok(Self::with_binary(binary, working_dir))
    }

    /// Driver with an explicit binary — used by tests to substitute a stub.
    pub fn with_binary(binary: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            working_dir: working_dir.into(),
            env: Vec::new(),
        }
    }

    /// Add an environment variable for every subsequent invocation
    /// (e.g. `TF_TOKEN_app_terraform_io` for Terraform Cloud).
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn init(&self) -> Result<InfraOutput> {
        self.run(TfOp::Init)
    }

    pub fn apply(&self) -> Result<InfraOutput> {
        self.run(TfOp::Apply)
    }

    pub fn destroy(&self) -> Result<InfraOutput> {
        self.run(TfOp::Destroy)
    }

    /// Run one operation to completion, blocking the caller.
    pub fn run(&self, op: TfOp) -> Result<InfraOutput> {
        tracing::info!(op = op.name(), dir = %self.working_dir.display(), "terraform");

        let mut cmd = Command::new(&self.binary);
        cmd.args(op.args()).current_dir(&self.working_dir);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let output = cmd.output()?;
        let result = InfraOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if result.exit_code != 0 {
            return Err(MangoError::Terraform {
                op: op.name().to_string(),
                stderr: result.stderr,
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// Write a stub `terraform` that appends its first argument to
    /// `calls.log` and exits 1 for any op named in `FAIL_OPS`.
    #[cfg(unix)]
    fn stub_terraform(dir: &Path, fail_op: Option<&str>) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let log = dir.join("calls.log");
        let fail = fail_op.unwrap_or("");
        let script = format!(
            "#!/bin/sh\necho \"$1\" >> {log}\nif [ \"$1\" = \"{fail}\" ]; then\n  echo \"stub {fail} exploded\" >&2\n  exit 1\nfi\necho ok\n",
            log = log.display(),
        );
        let path = dir.join("terraform");
        std::fs::write(&path, script).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[cfg(unix)]
    fn calls(dir: &Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn successful_run_captures_stdout() {
        let dir = TempDir::new().unwrap();
        let tf = Terraform::with_binary(stub_terraform(dir.path(), None), dir.path());
        let out = tf.init().unwrap();
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.stdout.trim(), "ok");
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_fatal_and_carries_stderr() {
        let dir = TempDir::new().unwrap();
        let tf = Terraform::with_binary(stub_terraform(dir.path(), Some("apply")), dir.path());
        tf.init().unwrap();
        let err = tf.apply().unwrap_err();
        match err {
            MangoError::Terraform { op, stderr } => {
                assert_eq!(op, "apply");
                assert!(stderr.contains("stub apply exploded"));
            }
            other => panic!("expected Terraform error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn apply_and_destroy_auto_approve() {
        assert!(TfOp::Apply.args().contains(&"-auto-approve"));
        assert!(TfOp::Destroy.args().contains(&"-auto-approve"));
        assert!(!TfOp::Init.args().contains(&"-auto-approve"));
    }

    #[cfg(unix)]
    #[test]
    fn env_is_passed_to_the_subprocess() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let out_file = dir.path().join("env.out");
        let script = format!("#!/bin/sh\necho \"$TF_TOKEN_app_terraform_io\" > {}\n", out_file.display());
        let path = dir.path().join("terraform");
        std::fs::write(&path, script).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();

        let tf = Terraform::with_binary(&path, dir.path()).env("TF_TOKEN_app_terraform_io", "tok-123");
        tf.init().unwrap();
        assert_eq!(std::fs::read_to_string(&out_file).unwrap().trim(), "tok-123");
    }

    #[cfg(unix)]
    #[test]
    fn stub_logs_each_op_once() {
        let dir = TempDir::new().unwrap();
        let tf = Terraform::with_binary(stub_terraform(dir.path(), None), dir.path());
        tf.init().unwrap();
        tf.apply().unwrap();
        assert_eq!(calls(dir.path()), vec!["init", "apply"]);
    }
}
