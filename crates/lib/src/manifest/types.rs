//! Manifest types for netpack.
//!
//! The manifest is the versioned list of dependencies the buildpack can
//! install, with their source locations and checksums. It is loaded once per
//! build and never modified.
//!
//! # Example
//!
//! ```yaml
//! language: dotnet-core
//! default_versions:
//!   - name: dotnet-sdk
//!     version: 8.0.x
//! dependencies:
//!   - name: dotnet-sdk
//!     version: 8.0.100
//!     uri: https://example.com/dotnet-sdk.{version}.linux-x64.tar.gz
//!     sha256: 3f1c...
//! ```

use std::path::{Path, PathBuf};

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::CACHE_KEY_SHA_LEN;

/// Errors raised while loading or querying the manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse manifest: {0}")]
  Parse(#[from] serde_yaml::Error),

  #[error("manifest has no entry for {name} matching version {version}")]
  MissingDependency { name: String, version: String },

  #[error("manifest declares no default version for {0}")]
  MissingDefault(String),

  #[error("invalid version pattern {pattern:?} for {name}: {message}")]
  InvalidVersion {
    name: String,
    pattern: String,
    message: String,
  },
}

/// A single installable dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDescriptor {
  pub name: String,
  pub version: String,
  /// Source location; may contain `{name}` and `{version}` placeholders.
  pub uri: String,
  pub sha256: String,
  /// Leading path components dropped when extracting the archive.
  #[serde(default)]
  pub strip_components: usize,
}

impl DependencyDescriptor {
  /// The source URI with `{name}` and `{version}` substituted.
  pub fn resolved_uri(&self) -> String {
    self.uri.replace("{name}", &self.name).replace("{version}", &self.version)
  }

  /// Cache key directory name: `<name>-<version>-<sha256 prefix>`.
  pub fn cache_key(&self) -> String {
    let sha = self.sha256.trim().to_ascii_lowercase();
    let prefix = &sha[..sha.len().min(CACHE_KEY_SHA_LEN)];
    format!("{}-{}-{}", self.name, self.version, prefix)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultVersion {
  pub name: String,
  pub version: String,
}

/// The buildpack manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
  #[serde(default)]
  pub language: String,
  #[serde(default)]
  pub default_versions: Vec<DefaultVersion>,
  #[serde(default)]
  pub dependencies: Vec<DependencyDescriptor>,
}

impl Manifest {
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_yaml(&content)
  }

  pub fn from_yaml(content: &str) -> Result<Self, ManifestError> {
    Ok(serde_yaml::from_str(content)?)
  }

  /// The default version pattern declared for `name`.
  pub fn default_version(&self, name: &str) -> Option<&str> {
    self
      .default_versions
      .iter()
      .find(|d| d.name == name)
      .map(|d| d.version.as_str())
  }

  /// Find the dependency `name` matching `pattern`.
  ///
  /// `pattern` is either an exact version string or a wildcard such as
  /// `8.0.x` / `8.0.*`, in which case the highest matching version wins.
  pub fn find(&self, name: &str, pattern: &str) -> Result<&DependencyDescriptor, ManifestError> {
    let missing = || ManifestError::MissingDependency {
      name: name.to_string(),
      version: pattern.to_string(),
    };
    let mut candidates = self.dependencies.iter().filter(|d| d.name == name);

    if !is_wildcard(pattern) {
      return candidates.find(|d| d.version == pattern).ok_or_else(missing);
    }

    let req = wildcard_req(name, pattern)?;
    candidates
      .filter_map(|d| Version::parse(&d.version).ok().map(|v| (v, d)))
      .filter(|(v, _)| req.matches(v))
      .max_by(|(a, _), (b, _)| a.cmp(b))
      .map(|(_, d)| d)
      .ok_or_else(missing)
  }

  /// Find `name` at its declared default version.
  pub fn find_default(&self, name: &str) -> Result<&DependencyDescriptor, ManifestError> {
    let pattern = self
      .default_version(name)
      .ok_or_else(|| ManifestError::MissingDefault(name.to_string()))?;
    self.find(name, pattern)
  }

  /// Find the highest patch release of `name` sharing `version`'s major.minor.
  pub fn roll_forward(&self, name: &str, version: &str) -> Result<&DependencyDescriptor, ManifestError> {
    let parsed = Version::parse(version).map_err(|e| ManifestError::InvalidVersion {
      name: name.to_string(),
      pattern: version.to_string(),
      message: e.to_string(),
    })?;
    self.find(name, &format!("{}.{}.x", parsed.major, parsed.minor))
  }
}

fn is_wildcard(pattern: &str) -> bool {
  pattern.split('.').any(|part| matches!(part, "x" | "X" | "*"))
}

fn wildcard_req(name: &str, pattern: &str) -> Result<VersionReq, ManifestError> {
  let normalized: Vec<&str> = pattern
    .split('.')
    .map(|part| if matches!(part, "x" | "X") { "*" } else { part })
    .collect();
  VersionReq::parse(&normalized.join(".")).map_err(|e| ManifestError::InvalidVersion {
    name: name.to_string(),
    pattern: pattern.to_string(),
    message: e.to_string(),
  })
}
