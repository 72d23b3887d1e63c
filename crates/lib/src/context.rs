//! Per-build state shared by the compiler and installers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::consts::STATE_DIR;
use crate::manifest::Manifest;

/// Inputs of one build.
///
/// Everything except `env` is fixed at construction. Installers append to
/// `env` so later steps (restore, other installers) see earlier installs.
#[derive(Debug, Clone)]
pub struct BuildContext {
  pub build_dir: PathBuf,
  pub cache_dir: PathBuf,
  pub manifest: Manifest,
  pub env: BTreeMap<String, String>,
}

impl BuildContext {
  pub fn new(build_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>, manifest: Manifest) -> Self {
    Self {
      build_dir: build_dir.into(),
      cache_dir: cache_dir.into(),
      manifest,
      env: BTreeMap::new(),
    }
  }

  /// Add supply-environment variables, overriding earlier values.
  pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
    self.env.extend(env);
    self
  }

  /// Buildpack-owned state inside the build directory.
  pub fn state_dir(&self) -> PathBuf {
    self.build_dir.join(STATE_DIR)
  }

  pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.env.insert(key.into(), value.into());
  }

  /// Prepend `dir` to a colon-separated search path variable.
  ///
  /// The first prepend of a variable not yet in `env` starts from the
  /// process value so commands still find system tools.
  pub fn prepend_path(&mut self, key: &str, dir: &Path) {
    let current = self
      .env
      .get(key)
      .cloned()
      .or_else(|| std::env::var(key).ok())
      .unwrap_or_default();
    let dir = dir.display().to_string();

    let value = if current.is_empty() {
      dir
    } else if current.split(':').any(|p| p == dir) {
      current
    } else {
      format!("{dir}:{current}")
    };
    self.env.insert(key.to_string(), value);
  }
}
