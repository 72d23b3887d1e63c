//! Application layout resolution.
//!
//! Classifies a build directory as published output (self-contained or
//! portable) or source (one or several projects), producing an [`AppLayout`]
//! the installers read from.
//!
//! Rules, in priority order:
//! 1. A top-level `*.runtimeconfig.json` means published output. A native
//!    host library next to it makes it self-contained.
//! 2. Otherwise every directory containing a project descriptor is a project.
//!    With several, the entry project comes from `.deployment`, else from the
//!    single project declaring a web server. Anything else is ambiguous.

pub mod project;
mod types;

pub use types::*;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use project::{
  NATIVE_HOST_FILES, RUNTIME_CONFIG_SUFFIX, declares_web_server, is_project_file, read_deployment_project,
  read_frameworks,
};

/// Directory names never searched for projects.
const SKIPPED_DIRS: &[&str] = &["bin", "obj", "node_modules", "packages"];

/// Classify `build_dir`.
pub fn resolve(build_dir: &Path) -> Result<AppLayout, LayoutError> {
  if let Some(layout) = resolve_published(build_dir)? {
    info!(kind = ?layout.kind, "resolved published layout");
    return Ok(layout);
  }

  let projects = discover_projects(build_dir)?;
  let layout = match projects.len() {
    0 => return Err(LayoutError::NoApplication(build_dir.to_path_buf())),
    1 => AppLayout {
      kind: LayoutKind::SourceSingle,
      projects,
      entry: Some(0),
      runtime_config: None,
      has_runtime_config: false,
      has_native_host: false,
    },
    _ => {
      let entry = select_entry(build_dir, &projects)?;
      AppLayout {
        kind: LayoutKind::SourceMulti,
        projects,
        entry: Some(entry),
        runtime_config: None,
        has_runtime_config: false,
        has_native_host: false,
      }
    }
  };

  info!(
    kind = ?layout.kind,
    projects = layout.projects.len(),
    entry = ?layout.entry_project().map(|p| &p.file),
    "resolved source layout"
  );
  Ok(layout)
}

/// Whether `build_dir` holds a .NET application at all.
///
/// True for a top-level runtime config or any project descriptor, even when
/// the layout cannot be resolved; `compile` then reports why. Only an empty
/// or unreadable directory is someone else's application.
pub fn detect(build_dir: &Path) -> bool {
  match resolve(build_dir) {
    Ok(_) => true,
    Err(LayoutError::NoApplication(_)) => false,
    Err(LayoutError::Io { path, source }) => {
      debug!(path = ?path, error = %source, "detect could not scan");
      false
    }
    Err(e) => {
      info!(error = %e, "detected .NET application with an unresolvable layout");
      true
    }
  }
}

fn resolve_published(build_dir: &Path) -> Result<Option<AppLayout>, LayoutError> {
  let mut names: Vec<String> = fs::read_dir(build_dir)
    .map_err(|source| LayoutError::Io {
      path: build_dir.to_path_buf(),
      source,
    })?
    .filter_map(|e| e.ok())
    .filter(|e| e.path().is_file())
    .map(|e| e.file_name().to_string_lossy().to_string())
    .collect();
  names.sort();

  let mut configs = names.iter().filter(|n| n.ends_with(RUNTIME_CONFIG_SUFFIX));
  let Some(config_name) = configs.next() else {
    return Ok(None);
  };
  if let Some(other) = configs.next() {
    debug!(chosen = %config_name, ignored = %other, "multiple runtime configs at top level");
  }

  let assembly = config_name.trim_end_matches(RUNTIME_CONFIG_SUFFIX).to_string();
  let frameworks = read_frameworks(&build_dir.join(config_name))?;
  let has_native_host = NATIVE_HOST_FILES.iter().any(|f| names.iter().any(|n| n == f));

  Ok(Some(AppLayout {
    kind: if has_native_host {
      LayoutKind::PublishedSelfContained
    } else {
      LayoutKind::PublishedPortable
    },
    projects: Vec::new(),
    entry: None,
    runtime_config: Some(RuntimeConfig {
      path: PathBuf::from(config_name),
      assembly,
      frameworks,
    }),
    has_runtime_config: true,
    has_native_host,
  }))
}

/// Walk `build_dir` for project descriptors in file-name order.
///
/// Symlinks are followed; a directory reached twice (by canonical path) is
/// searched once, which also terminates symlink loops.
fn discover_projects(build_dir: &Path) -> Result<Vec<Project>, LayoutError> {
  let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
  let mut seen_files: HashSet<PathBuf> = HashSet::new();
  let mut projects = Vec::new();

  let mut walker = WalkDir::new(build_dir)
    .follow_links(true)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|e| e.depth() == 0 || !e.file_type().is_dir() || !is_skipped_dir(e.file_name().to_str()));

  while let Some(entry) = walker.next() {
    let entry = match entry {
      Ok(entry) => entry,
      Err(e) if e.loop_ancestor().is_some() => {
        debug!(path = ?e.path(), "skipping symlink loop");
        continue;
      }
      Err(e) => {
        let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| build_dir.to_path_buf());
        return Err(LayoutError::Io {
          path,
          source: e.into_io_error().unwrap_or_else(|| std::io::Error::other("walk failed")),
        });
      }
    };

    let canonical = dunce::canonicalize(entry.path()).unwrap_or_else(|_| entry.path().to_path_buf());

    if entry.file_type().is_dir() {
      if !seen_dirs.insert(canonical) {
        debug!(path = ?entry.path(), "directory already visited");
        walker.skip_current_dir();
      }
      continue;
    }

    if !entry.file_type().is_file() || !is_project_file(entry.path()) || !seen_files.insert(canonical) {
      continue;
    }

    let relative = entry.path().strip_prefix(build_dir).unwrap_or(entry.path()).to_path_buf();
    let is_web = declares_web_server(entry.path()).unwrap_or_else(|e| {
      warn!(path = ?entry.path(), error = %e, "could not read project, assuming no web server");
      false
    });
    let has_package_json = entry.path().parent().is_some_and(|dir| dir.join("package.json").is_file());
    debug!(project = ?relative, is_web, has_package_json, "found project");
    projects.push(Project {
      file: relative,
      is_web,
      has_package_json,
    });
  }

  Ok(projects)
}

fn is_skipped_dir(name: Option<&str>) -> bool {
  match name {
    Some(name) => name.starts_with('.') || SKIPPED_DIRS.contains(&name),
    None => false,
  }
}

fn select_entry(build_dir: &Path, projects: &[Project]) -> Result<usize, LayoutError> {
  if let Some(named) = read_deployment_project(build_dir)? {
    let named_dir = named.components().collect::<PathBuf>();
    return projects
      .iter()
      .position(|p| p.file == named_dir || p.dir() == named_dir)
      .ok_or(LayoutError::DeploymentProjectNotFound(named));
  }

  let mut web = projects.iter().enumerate().filter(|(_, p)| p.is_web);
  match (web.next(), web.next()) {
    (Some((index, _)), None) => Ok(index),
    _ => Err(LayoutError::Ambiguous {
      candidates: projects.iter().map(|p| p.file.clone()).collect(),
    }),
  }
}
