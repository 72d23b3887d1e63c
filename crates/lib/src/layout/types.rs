//! Application layout types.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Errors raised while classifying a build directory.
#[derive(Debug, Error)]
pub enum LayoutError {
  /// Neither a published runtime config nor a project descriptor was found.
  #[error("no .NET application found in {0}")]
  NoApplication(PathBuf),

  /// Several projects and no unambiguous entry point.
  #[error(
    "cannot determine which project to run; candidates: {}. Add a .deployment file with `[config]` and `project = <path>`",
    .candidates.iter().map(|c| c.display().to_string()).collect::<Vec<_>>().join(", ")
  )]
  Ambiguous { candidates: Vec<PathBuf> },

  /// The `.deployment` file names a project that does not exist.
  #[error(".deployment names project {0} which was not found")]
  DeploymentProjectNotFound(PathBuf),

  #[error("failed to parse {path}: {message}")]
  Parse { path: PathBuf, message: String },

  #[error("failed to scan {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Structural classification of a build directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
  /// One buildable project.
  SourceSingle,
  /// Several buildable projects, one of which is the entry point.
  SourceMulti,
  /// Published output carrying its own runtime.
  PublishedSelfContained,
  /// Published output that needs a shared runtime installed.
  PublishedPortable,
}

impl LayoutKind {
  pub fn is_source(self) -> bool {
    matches!(self, LayoutKind::SourceSingle | LayoutKind::SourceMulti)
  }

  pub fn is_published(self) -> bool {
    !self.is_source()
  }
}

/// A shared framework a published application runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameworkRef {
  pub name: String,
  pub version: String,
}

/// What the published runtime config tells us.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeConfig {
  /// Path relative to the build directory.
  pub path: PathBuf,
  /// Assembly name, i.e. the file name without `.runtimeconfig.json`.
  pub assembly: String,
  pub frameworks: Vec<FrameworkRef>,
}

impl RuntimeConfig {
  pub fn framework(&self, name: &str) -> Option<&FrameworkRef> {
    self.frameworks.iter().find(|f| f.name == name)
  }
}

/// A discovered project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
  /// Project descriptor path relative to the build directory.
  pub file: PathBuf,
  /// Whether the project declares a web-server dependency.
  pub is_web: bool,
  /// Whether a `package.json` sits next to the descriptor.
  pub has_package_json: bool,
}

impl Project {
  /// Directory holding the descriptor, relative to the build directory.
  pub fn dir(&self) -> &Path {
    self.file.parent().unwrap_or_else(|| Path::new(""))
  }
}

/// Uniform description of an application layout.
///
/// Kind-specific fields are empty when they do not apply: published layouts
/// have no projects, source layouts have no runtime config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppLayout {
  pub kind: LayoutKind,
  /// Discovered projects in discovery order.
  pub projects: Vec<Project>,
  /// Index into `projects` of the project to restore and run.
  pub entry: Option<usize>,
  pub runtime_config: Option<RuntimeConfig>,
  pub has_runtime_config: bool,
  pub has_native_host: bool,
}

impl AppLayout {
  pub fn entry_project(&self) -> Option<&Project> {
    self.entry.and_then(|i| self.projects.get(i))
  }

  /// Project directories in discovery order.
  pub fn project_dirs(&self) -> Vec<&Path> {
    self.projects.iter().map(Project::dir).collect()
  }

  pub fn references_framework(&self, name: &str) -> bool {
    self
      .runtime_config
      .as_ref()
      .is_some_and(|rc| rc.framework(name).is_some())
  }
}
