//! Types for command execution.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// The process could not be started.
  #[error("failed to spawn `{cmd}`: {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  /// The command ran and exited non-zero.
  #[error("command failed with exit code {code:?}: {cmd}\n{}", format_output(.stdout, .stderr))]
  CmdFailed {
    cmd: String,
    code: Option<i32>,
    stdout: String,
    stderr: String,
  },
}

fn format_output(stdout: &str, stderr: &str) -> String {
  let mut out = String::new();
  if !stdout.trim().is_empty() {
    out.push_str("--- stdout ---\n");
    out.push_str(stdout.trim_end());
    out.push('\n');
  }
  if !stderr.trim().is_empty() {
    out.push_str("--- stderr ---\n");
    out.push_str(stderr.trim_end());
    out.push('\n');
  }
  out
}

/// A command to run through a [`Shell`](super::Shell).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
  /// The command line, interpreted by the shell.
  pub cmd: String,
  /// Working directory.
  pub cwd: PathBuf,
  /// Variables set on top of the inherited process environment.
  pub env: BTreeMap<String, String>,
}

impl CommandSpec {
  pub fn new(cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
    Self {
      cmd: cmd.into(),
      cwd: cwd.into(),
      env: BTreeMap::new(),
    }
  }

  pub fn with_env(mut self, env: &BTreeMap<String, String>) -> Self {
    self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
    self
  }
}

/// Captured result of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
  pub stdout: String,
  pub stderr: String,
}
