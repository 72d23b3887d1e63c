//! Install receipts.
//!
//! `<build_dir>/.netpack/installed/<installer>.json` records which dependency
//! an installer last copied into the build directory, and the files it wrote,
//! so a later version can remove what it no longer ships.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::InstallError;
use crate::manifest::DependencyDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
  pub installer: String,
  pub name: String,
  pub version: String,
  pub sha256: String,
  /// Install directory relative to the build directory.
  pub target: String,
  /// Files written, relative to `target`.
  #[serde(default)]
  pub files: Vec<PathBuf>,
}

pub fn receipt_path(state_dir: &Path, installer: &str) -> PathBuf {
  state_dir.join("installed").join(format!("{installer}.json"))
}

impl Receipt {
  pub fn new(installer: &str, dep: &DependencyDescriptor, target: &str, files: Vec<PathBuf>) -> Self {
    Self {
      installer: installer.to_string(),
      name: dep.name.clone(),
      version: dep.version.clone(),
      sha256: dep.sha256.trim().to_ascii_lowercase(),
      target: target.to_string(),
      files,
    }
  }

  /// Read a receipt; a missing or unreadable file is no receipt.
  pub fn load(path: &Path) -> Option<Self> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
  }

  pub fn save(&self, path: &Path) -> Result<(), InstallError> {
    let receipt_err = |source| InstallError::Receipt {
      path: path.to_path_buf(),
      source,
    };
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(receipt_err)?;
    }
    let content = serde_json::to_string_pretty(self).map_err(|e| receipt_err(std::io::Error::other(e)))?;
    fs::write(path, format!("{content}\n")).map_err(receipt_err)
  }

  pub fn records(&self, dep: &DependencyDescriptor) -> bool {
    self.name == dep.name && self.version == dep.version && self.sha256.eq_ignore_ascii_case(dep.sha256.trim())
  }
}
