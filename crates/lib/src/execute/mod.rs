//! Shell command execution.
//!
//! Installers never spawn processes directly; they go through the [`Shell`]
//! handed to them by the compiler so a build can be driven by a fake in tests.

mod types;

pub use types::*;

use std::process::Command;

use tracing::{debug, info};

/// Runs commands on behalf of installers.
pub trait Shell {
  /// Run `spec` to completion, returning captured output.
  ///
  /// A non-zero exit is an error carrying the captured stdout and stderr.
  fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecuteError>;
}

/// Runs commands with `/bin/sh -c`, inheriting the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShell;

const SHELL: &str = "/bin/sh";

impl Shell for SystemShell {
  fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecuteError> {
    info!(cmd = %spec.cmd, cwd = ?spec.cwd, "executing command");

    let output = Command::new(SHELL)
      .arg("-c")
      .arg(&spec.cmd)
      .current_dir(&spec.cwd)
      .envs(&spec.env)
      .output()
      .map_err(|source| ExecuteError::Spawn {
        cmd: spec.cmd.clone(),
        source,
      })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
      debug!(stderr = %stderr, stdout = %stdout, "command failed");
      return Err(ExecuteError::CmdFailed {
        cmd: spec.cmd.clone(),
        code: output.status.code(),
        stdout,
        stderr,
      });
    }

    if !stdout.is_empty() {
      debug!(stdout = %stdout.trim_end(), "command output");
    }

    Ok(CommandOutput { stdout, stderr })
  }
}
