//! Dependency cache.
//!
//! Maps a manifest dependency to a verified, extracted tree under the cache
//! directory, downloading only on a miss.
//!
//! # Layout
//!
//! ```text
//! <cache_dir>/
//! ├── deps/<name>-<version>-<sha256 prefix>/   # complete entries
//! │   └── .netpack-complete                   # marker, written last
//! └── tmp/                                    # staging, safe to delete
//! ```
//!
//! An entry becomes visible only through a single directory rename from
//! `tmp/`, after its contents and marker are fully written. A crash therefore
//! leaves at most an orphaned staging directory, and two builds racing on the
//! same key both produce identical, checksum-verified content.

pub mod extract;
pub mod fetch;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consts::CACHE_COMPLETE_MARKER;
use crate::manifest::DependencyDescriptor;
use crate::util::hash::{HashError, hash_directory, hash_file};

pub use fetch::{FetchError, Fetcher, HttpFetcher};

/// Errors raised while filling or reading the cache.
#[derive(Debug, Error)]
pub enum CacheError {
  #[error("failed to download {name} {version}: {source}")]
  Fetch {
    name: String,
    version: String,
    #[source]
    source: FetchError,
  },

  #[error("checksum mismatch for {name} {version} from {uri}: expected {expected}, got {actual}")]
  ChecksumMismatch {
    name: String,
    version: String,
    uri: String,
    expected: String,
    actual: String,
  },

  #[error("failed to extract {name} {version}: {source}")]
  Extract {
    name: String,
    version: String,
    #[source]
    source: io::Error,
  },

  #[error("failed to hash cache entry: {0}")]
  Hash(#[from] HashError),

  #[error("cache io error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
  move |source| CacheError::Io {
    path: path.to_path_buf(),
    source,
  }
}

/// Contents of the completion marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMarker {
  /// Marker format version.
  pub version: u32,
  pub name: String,
  pub dependency_version: String,
  pub sha256: String,
  /// Hash of the extracted tree, excluding the marker itself.
  pub output_hash: String,
}

impl CacheMarker {
  fn describes(&self, dep: &DependencyDescriptor) -> bool {
    self.name == dep.name
      && self.dependency_version == dep.version
      && self.sha256.eq_ignore_ascii_case(dep.sha256.trim())
  }
}

/// Read the completion marker of a cache entry, if any.
pub fn read_marker(entry: &Path) -> Option<CacheMarker> {
  let content = fs::read_to_string(entry.join(CACHE_COMPLETE_MARKER)).ok()?;
  serde_json::from_str(&content).ok()
}

/// A (name, version, checksum) keyed cache of extracted dependencies.
pub struct DependencyCache {
  root: PathBuf,
  fetcher: Box<dyn Fetcher>,
}

impl DependencyCache {
  pub fn new(root: impl Into<PathBuf>, fetcher: Box<dyn Fetcher>) -> Self {
    Self {
      root: root.into(),
      fetcher,
    }
  }

  /// A cache that downloads with [`HttpFetcher`].
  pub fn with_http(root: impl Into<PathBuf>) -> Self {
    Self::new(root, Box::new(HttpFetcher))
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn deps_dir(&self) -> PathBuf {
    self.root.join("deps")
  }

  fn tmp_dir(&self) -> PathBuf {
    self.root.join("tmp")
  }

  /// The directory a complete entry for `dep` lives in.
  pub fn entry_path(&self, dep: &DependencyDescriptor) -> PathBuf {
    self.deps_dir().join(dep.cache_key())
  }

  /// Whether a complete entry for `dep` exists. Does not rehash the tree.
  pub fn is_cached(&self, dep: &DependencyDescriptor) -> bool {
    read_marker(&self.entry_path(dep)).is_some_and(|m| m.describes(dep))
  }

  /// Return the extracted tree for `dep`, downloading and extracting on a miss.
  pub fn fetch(&self, dep: &DependencyDescriptor) -> Result<PathBuf, CacheError> {
    let entry = self.entry_path(dep);

    if let Some(marker) = read_marker(&entry) {
      if marker.describes(dep) && self.verify(&entry, &marker) {
        info!(name = %dep.name, version = %dep.version, "using cached dependency");
        touch_marker(&entry);
        return Ok(entry);
      }
      warn!(path = ?entry, "cache entry invalid, refetching");
      fs::remove_dir_all(&entry).map_err(io_err(&entry))?;
    } else if entry.exists() {
      debug!(path = ?entry, "removing unmarked cache entry");
      fs::remove_dir_all(&entry).map_err(io_err(&entry))?;
    }

    self.fill(dep, &entry)?;
    Ok(entry)
  }

  fn verify(&self, entry: &Path, marker: &CacheMarker) -> bool {
    match hash_directory(entry, &[CACHE_COMPLETE_MARKER]) {
      Ok(current) if current.0 == marker.output_hash => true,
      Ok(current) => {
        warn!(
          path = ?entry,
          expected = %marker.output_hash,
          actual = %current.0,
          "cache entry corrupted"
        );
        false
      }
      Err(e) => {
        warn!(path = ?entry, error = %e, "failed to hash cache entry");
        false
      }
    }
  }

  fn fill(&self, dep: &DependencyDescriptor, entry: &Path) -> Result<(), CacheError> {
    let tmp = self.tmp_dir();
    fs::create_dir_all(&tmp).map_err(io_err(&tmp))?;
    let deps = self.deps_dir();
    fs::create_dir_all(&deps).map_err(io_err(&deps))?;

    let key = dep.cache_key();
    let download_dir = tempfile::Builder::new()
      .prefix(&format!("{key}.download."))
      .tempdir_in(&tmp)
      .map_err(io_err(&tmp))?;
    let staging = tempfile::Builder::new()
      .prefix(&format!("{key}."))
      .tempdir_in(&tmp)
      .map_err(io_err(&tmp))?;

    let uri = dep.resolved_uri();
    let archive = download_dir.path().join(fetch::uri_to_filename(&uri));

    info!(name = %dep.name, version = %dep.version, uri = %uri, "downloading dependency");
    self.fetcher.fetch(&uri, &archive).map_err(|source| CacheError::Fetch {
      name: dep.name.clone(),
      version: dep.version.clone(),
      source,
    })?;

    let actual = hash_file(&archive)?;
    if !actual.matches(&dep.sha256) {
      return Err(CacheError::ChecksumMismatch {
        name: dep.name.clone(),
        version: dep.version.clone(),
        uri,
        expected: dep.sha256.clone(),
        actual: actual.0,
      });
    }

    extract::unpack(&archive, staging.path(), dep.strip_components).map_err(|source| CacheError::Extract {
      name: dep.name.clone(),
      version: dep.version.clone(),
      source,
    })?;

    let marker = CacheMarker {
      version: 1,
      name: dep.name.clone(),
      dependency_version: dep.version.clone(),
      sha256: dep.sha256.trim().to_ascii_lowercase(),
      output_hash: hash_directory(staging.path(), &[CACHE_COMPLETE_MARKER])?.0,
    };
    write_marker(staging.path(), &marker)?;

    match fs::rename(staging.path(), entry) {
      Ok(()) => {
        info!(path = ?entry, "cached dependency");
        Ok(())
      }
      Err(e) => {
        if read_marker(entry).is_some_and(|m| m.describes(dep)) {
          debug!(path = ?entry, "concurrent writer completed entry first");
          Ok(())
        } else {
          Err(io_err(entry)(e))
        }
      }
    }
  }

  /// Remove cached versions of `name` other than `keep` that have not been
  /// used for at least `grace`.
  ///
  /// Every hit refreshes an entry's marker mtime, so a version another build
  /// is still copying from stays in place. Returns the removed entry paths.
  pub fn prune(
    &self,
    name: &str,
    keep: &DependencyDescriptor,
    grace: Duration,
  ) -> Result<Vec<PathBuf>, CacheError> {
    let deps = self.deps_dir();
    if !deps.exists() {
      return Ok(Vec::new());
    }

    let keep_key = keep.cache_key();
    let now = SystemTime::now();
    let mut removed = Vec::new();

    for dirent in fs::read_dir(&deps).map_err(io_err(&deps))? {
      let dirent = dirent.map_err(io_err(&deps))?;
      let path = dirent.path();
      if dirent.file_name().to_string_lossy() == keep_key {
        continue;
      }
      let Some(marker) = read_marker(&path) else {
        continue;
      };
      if marker.name != name {
        continue;
      }

      let idle = last_used(&path).map(|used| now.duration_since(used).unwrap_or_default());
      if idle.is_some_and(|idle| idle < grace) {
        debug!(name = %name, version = %marker.dependency_version, "cache entry used recently, keeping");
        continue;
      }

      info!(name = %name, version = %marker.dependency_version, "pruning stale cache entry");
      fs::remove_dir_all(&path).map_err(io_err(&path))?;
      removed.push(path);
    }

    Ok(removed)
  }
}

/// When the entry was last fetched, as the marker's modification time.
pub fn last_used(entry: &Path) -> Option<SystemTime> {
  fs::metadata(entry.join(CACHE_COMPLETE_MARKER)).and_then(|m| m.modified()).ok()
}

fn touch_marker(entry: &Path) {
  let path = entry.join(CACHE_COMPLETE_MARKER);
  let touched = fs::File::options()
    .append(true)
    .open(&path)
    .and_then(|file| file.set_modified(SystemTime::now()));
  if let Err(e) = touched {
    debug!(path = ?path, error = %e, "failed to record cache use");
  }
}

/// Write the marker next to the entry contents via write-then-rename.
fn write_marker(dir: &Path, marker: &CacheMarker) -> Result<(), CacheError> {
  let final_path = dir.join(CACHE_COMPLETE_MARKER);
  let tmp_path = dir.join(format!("{CACHE_COMPLETE_MARKER}.tmp"));
  let content = serde_json::to_string(marker).map_err(|e| CacheError::Io {
    path: final_path.clone(),
    source: io::Error::other(e),
  })?;
  fs::write(&tmp_path, format!("{content}\n")).map_err(io_err(&tmp_path))?;
  fs::rename(&tmp_path, &final_path).map_err(io_err(&final_path))
}
