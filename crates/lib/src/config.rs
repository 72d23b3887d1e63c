//! Buildpack configuration from the process environment.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::consts::{DEFAULT_PRUNE_GRACE, MANIFEST_FILE};

pub const MANIFEST_ENV: &str = "NETPACK_MANIFEST";
pub const RESOURCES_DIR_ENV: &str = "NETPACK_RESOURCES_DIR";
pub const SKIP_INSTALLERS_ENV: &str = "NETPACK_SKIP_INSTALLERS";
pub const LOG_ENV: &str = "NETPACK_LOG";
pub const CACHE_GRACE_ENV: &str = "NETPACK_CACHE_GRACE";

/// Settings that do not come from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  /// Dependency manifest to load.
  pub manifest_path: PathBuf,
  /// Extra files copied into the build directory after installation.
  pub resources_dir: Option<PathBuf>,
  /// Installers disabled by name.
  pub skip_installers: BTreeSet<String>,
  /// Log filter directive, used when `RUST_LOG` is unset.
  pub log_filter: Option<String>,
  /// Other versions of a dependency used more recently than this survive pruning.
  pub prune_grace: Duration,
}

impl Config {
  /// Read configuration from the environment.
  ///
  /// The manifest defaults to `manifest.yml` in the buildpack root, the
  /// parent of the directory holding the executable (`<root>/bin/netpack`).
  pub fn from_env() -> Self {
    let manifest_path = non_empty_var(MANIFEST_ENV)
      .map(PathBuf::from)
      .unwrap_or_else(default_manifest_path);

    Self {
      manifest_path,
      resources_dir: non_empty_var(RESOURCES_DIR_ENV).map(PathBuf::from),
      skip_installers: non_empty_var(SKIP_INSTALLERS_ENV)
        .map(|v| parse_list(&v))
        .unwrap_or_default(),
      log_filter: non_empty_var(LOG_ENV),
      prune_grace: non_empty_var(CACHE_GRACE_ENV)
        .and_then(|v| parse_grace(&v))
        .unwrap_or(DEFAULT_PRUNE_GRACE),
    }
  }

  /// Configuration with an explicit manifest and nothing else set.
  pub fn with_manifest(manifest_path: impl Into<PathBuf>) -> Self {
    Self {
      manifest_path: manifest_path.into(),
      resources_dir: None,
      skip_installers: BTreeSet::new(),
      log_filter: None,
      prune_grace: DEFAULT_PRUNE_GRACE,
    }
  }

  pub fn is_skipped(&self, installer: &str) -> bool {
    self.skip_installers.contains(installer)
  }
}

fn non_empty_var(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_list(value: &str) -> BTreeSet<String> {
  value
    .split([',', ' '])
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
    .collect()
}

fn parse_grace(value: &str) -> Option<Duration> {
  match humantime::parse_duration(value.trim()) {
    Ok(grace) => Some(grace),
    Err(e) => {
      warn!(var = CACHE_GRACE_ENV, value, error = %e, "ignoring invalid duration");
      None
    }
  }
}

fn default_manifest_path() -> PathBuf {
  std::env::current_exe()
    .ok()
    .and_then(|exe| exe.parent().and_then(|bin| bin.parent()).map(|root| root.join(MANIFEST_FILE)))
    .unwrap_or_else(|| PathBuf::from(MANIFEST_FILE))
}
