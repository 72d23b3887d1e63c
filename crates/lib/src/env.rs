//! Supply environment files.
//!
//! A platform hands the buildpack extra build-time variables as a file of
//! `VAR=value` lines. Blank lines and `#` comments are ignored, an `export `
//! prefix is accepted and a value wrapped in matching quotes is unquoted.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvFileError {
  #[error("failed to read env file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid env file line {line}: {content:?}")]
  Invalid { line: usize, content: String },
}

pub fn parse_env_file(path: &Path) -> Result<BTreeMap<String, String>, EnvFileError> {
  let content = fs::read_to_string(path).map_err(|source| EnvFileError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  parse_env(&content)
}

pub fn parse_env(content: &str) -> Result<BTreeMap<String, String>, EnvFileError> {
  let mut vars = BTreeMap::new();

  for (index, raw) in content.lines().enumerate() {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
      continue;
    }
    let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);

    let invalid = || EnvFileError::Invalid {
      line: index + 1,
      content: raw.to_string(),
    };
    let (key, value) = line.split_once('=').ok_or_else(invalid)?;
    let key = key.trim();
    if !is_valid_name(key) {
      return Err(invalid());
    }

    vars.insert(key.to_string(), unquote(value.trim()).to_string());
  }

  Ok(vars)
}

fn is_valid_name(name: &str) -> bool {
  let mut chars = name.chars();
  match chars.next() {
    Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
    _ => false,
  }
}

fn unquote(value: &str) -> &str {
  for quote in ['"', '\''] {
    if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
      return &value[1..value.len() - 1];
    }
  }
  value
}
