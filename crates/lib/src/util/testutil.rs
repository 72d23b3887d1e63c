//! Test utilities for netpack-lib.
//!
//! Fixture builders for application layouts and dependency archives.

use std::fs;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::util::hash::hash_file;

/// A minimal SDK-style console project.
pub const CONSOLE_CSPROJ: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <OutputType>Exe</OutputType>
    <TargetFramework>net8.0</TargetFramework>
  </PropertyGroup>
</Project>
"#;

/// A minimal ASP.NET Core project.
pub const WEB_CSPROJ: &str = r#"<Project Sdk="Microsoft.NET.Sdk.Web">
  <PropertyGroup>
    <TargetFramework>net8.0</TargetFramework>
  </PropertyGroup>
</Project>
"#;

/// Write `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
  let path = root.join(relative);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(&path, content).unwrap();
  path
}

/// Build a `.tar.gz` archive at `dest` holding the given `(path, content)` files.
///
/// Returns the lowercase sha256 of the archive.
pub fn write_tar_gz(dest: &Path, files: &[(&str, &str)]) -> String {
  let file = fs::File::create(dest).unwrap();
  let encoder = GzEncoder::new(file, Compression::default());
  let mut builder = tar::Builder::new(encoder);

  for (path, content) in files {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o755);
    header.set_mtime(0);
    header.set_cksum();
    builder.append_data(&mut header, path, content.as_bytes()).unwrap();
  }

  builder.into_inner().unwrap().finish().unwrap();
  hash_file(dest).unwrap().0
}

/// `file://` URI for a local path.
pub fn file_uri(path: &Path) -> String {
  format!("file://{}", path.display())
}
