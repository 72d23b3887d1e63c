//! Reading project descriptors, runtime configs and the `.deployment` file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::types::{FrameworkRef, LayoutError};

pub const PROJECT_EXTENSIONS: &[&str] = &["csproj", "fsproj", "vbproj"];
pub const RUNTIME_CONFIG_SUFFIX: &str = ".runtimeconfig.json";
pub const NATIVE_HOST_FILES: &[&str] = &["libhostfxr.so", "libhostfxr.dylib", "hostfxr.dll"];
pub const DEPLOYMENT_FILE: &str = ".deployment";

const WEB_SDK: &str = "Microsoft.NET.Sdk.Web";

pub fn is_project_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|ext| PROJECT_EXTENSIONS.contains(&ext))
}

/// Whether the project declares a web-server dependency.
///
/// True for the web SDK, or a package reference to any `Microsoft.AspNetCore`
/// package.
pub fn declares_web_server(path: &Path) -> Result<bool, LayoutError> {
  let content = fs::read_to_string(path).map_err(|source| LayoutError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  let doc = roxmltree::Document::parse(&content).map_err(|e| LayoutError::Parse {
    path: path.to_path_buf(),
    message: e.to_string(),
  })?;

  let root = doc.root_element();
  if root.attribute("Sdk").is_some_and(|sdk| sdk.trim() == WEB_SDK) {
    return Ok(true);
  }

  let web_ref = doc.descendants().any(|node| match node.tag_name().name() {
    "Sdk" => node.attribute("Name") == Some(WEB_SDK),
    "PackageReference" | "FrameworkReference" => node
      .attribute("Include")
      .is_some_and(|inc| inc.starts_with("Microsoft.AspNetCore")),
    _ => false,
  });
  Ok(web_ref)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeConfigFile {
  #[serde(default)]
  runtime_options: RuntimeOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeOptions {
  framework: Option<FrameworkEntry>,
  #[serde(default)]
  frameworks: Vec<FrameworkEntry>,
  #[serde(default)]
  included_frameworks: Vec<FrameworkEntry>,
}

#[derive(Debug, Deserialize)]
struct FrameworkEntry {
  name: String,
  #[serde(default)]
  version: String,
}

/// Parse the framework references out of a `*.runtimeconfig.json`.
///
/// Self-contained publishes list their bundled frameworks under
/// `includedFrameworks`; those are reported too.
pub fn read_frameworks(path: &Path) -> Result<Vec<FrameworkRef>, LayoutError> {
  let content = fs::read_to_string(path).map_err(|source| LayoutError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  let parsed: RuntimeConfigFile = serde_json::from_str(&content).map_err(|e| LayoutError::Parse {
    path: path.to_path_buf(),
    message: e.to_string(),
  })?;

  let options = parsed.runtime_options;
  Ok(
    options
      .framework
      .into_iter()
      .chain(options.frameworks)
      .chain(options.included_frameworks)
      .map(|f| FrameworkRef {
        name: f.name,
        version: f.version,
      })
      .collect(),
  )
}

/// Read `project = <path>` from the `[config]` section of a `.deployment` file.
///
/// Returns `None` when the file or key is absent.
pub fn read_deployment_project(build_dir: &Path) -> Result<Option<PathBuf>, LayoutError> {
  let path = build_dir.join(DEPLOYMENT_FILE);
  if !path.is_file() {
    return Ok(None);
  }
  let content = fs::read_to_string(&path).map_err(|source| LayoutError::Io {
    path: path.clone(),
    source,
  })?;

  let mut in_config = false;
  for line in content.lines() {
    let line = line.trim();
    if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
      continue;
    }
    if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
      in_config = section.trim().eq_ignore_ascii_case("config");
      continue;
    }
    if !in_config {
      continue;
    }
    if let Some((key, value)) = line.split_once('=')
      && key.trim().eq_ignore_ascii_case("project")
    {
      let value = value.trim().trim_matches('"').replace('\\', "/");
      let value = value.trim_start_matches("./");
      if !value.is_empty() {
        return Ok(Some(PathBuf::from(value)));
      }
    }
  }

  Ok(None)
}
