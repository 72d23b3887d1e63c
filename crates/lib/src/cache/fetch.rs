//! Download transport for dependency archives.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

/// Transport-level download failures.
#[derive(Debug, Error)]
pub enum FetchError {
  #[error("request to {uri} failed: {message}")]
  Transport { uri: String, message: String },

  #[error("request to {uri} returned HTTP {status}")]
  Status { uri: String, status: u16 },

  #[error("failed to write download to {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("unsupported URI scheme: {0}")]
  UnsupportedScheme(String),
}

/// Retrieves a URI into a local file.
///
/// Implementations perform exactly one attempt; retries are not this layer's
/// concern.
pub trait Fetcher {
  fn fetch(&self, uri: &str, dest: &Path) -> Result<(), FetchError>;
}

/// Default fetcher: `http(s)://` through reqwest, `file://` and plain paths
/// by copying from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
  fn fetch(&self, uri: &str, dest: &Path) -> Result<(), FetchError> {
    info!(uri = %uri, "fetching");

    if uri.starts_with("http://") || uri.starts_with("https://") {
      return fetch_http(uri, dest);
    }

    let local = match uri.strip_prefix("file://") {
      Some(path) => Path::new(path),
      None if !uri.contains("://") => Path::new(uri),
      None => return Err(FetchError::UnsupportedScheme(uri.to_string())),
    };

    debug!(path = ?local, "copying local dependency");
    fs::copy(local, dest).map_err(|e| FetchError::Transport {
      uri: uri.to_string(),
      message: e.to_string(),
    })?;
    Ok(())
  }
}

fn fetch_http(uri: &str, dest: &Path) -> Result<(), FetchError> {
  let transport = |e: reqwest::Error| FetchError::Transport {
    uri: uri.to_string(),
    message: e.to_string(),
  };

  let response = reqwest::blocking::get(uri).map_err(transport)?;
  if !response.status().is_success() {
    return Err(FetchError::Status {
      uri: uri.to_string(),
      status: response.status().as_u16(),
    });
  }

  let bytes = response.bytes().map_err(transport)?;
  let write_err = |source| FetchError::Write {
    path: dest.to_path_buf(),
    source,
  };
  let mut file = File::create(dest).map_err(write_err)?;
  file.write_all(&bytes).map_err(write_err)?;
  file.flush().map_err(write_err)?;

  info!(path = ?dest, size = bytes.len(), "download complete");
  Ok(())
}

/// Convert a URI to a safe filename.
///
/// Takes the last path component and sanitizes it. Falls back to a hash of the
/// URI if no suitable filename can be extracted.
pub fn uri_to_filename(uri: &str) -> String {
  if let Some(filename) = uri.rsplit('/').next() {
    let filename = filename.split('?').next().unwrap_or(filename);

    let sanitized: String = filename
      .chars()
      .map(|c| {
        if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
          c
        } else {
          '_'
        }
      })
      .collect();

    if !sanitized.is_empty() && sanitized != "." && sanitized != ".." {
      return sanitized;
    }
  }

  let mut hasher = Sha256::new();
  hasher.update(uri.as_bytes());
  format!("download_{}", &hex::encode(hasher.finalize())[..16])
}
