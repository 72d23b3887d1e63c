//! Shared fixtures for the build integration tests.

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use tempfile::TempDir;

use netpack_lib::cache::{DependencyCache, FetchError, Fetcher, HttpFetcher};
use netpack_lib::execute::{CommandOutput, CommandSpec, ExecuteError, Shell};

pub const WEB_CSPROJ: &str = r#"<Project Sdk="Microsoft.NET.Sdk.Web">
  <PropertyGroup>
    <TargetFramework>net8.0</TargetFramework>
  </PropertyGroup>
</Project>
"#;

pub const LIB_CSPROJ: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <TargetFramework>net8.0</TargetFramework>
  </PropertyGroup>
</Project>
"#;

/// Counts downloads while delegating to the real fetcher.
pub struct CountingFetcher {
  pub calls: Rc<Cell<usize>>,
}

impl Fetcher for CountingFetcher {
  fn fetch(&self, uri: &str, dest: &Path) -> Result<(), FetchError> {
    self.calls.set(self.calls.get() + 1);
    HttpFetcher.fetch(uri, dest)
  }
}

/// Records commands; fails those containing `fail_on`.
#[derive(Default)]
pub struct FakeShell {
  pub commands: RefCell<Vec<String>>,
  pub fail_on: Option<&'static str>,
}

impl Shell for FakeShell {
  fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecuteError> {
    self.commands.borrow_mut().push(spec.cmd.clone());
    if let Some(pattern) = self.fail_on
      && spec.cmd.contains(pattern)
    {
      return Err(ExecuteError::CmdFailed {
        cmd: spec.cmd.clone(),
        code: Some(1),
        stdout: "Determining projects to restore...".to_string(),
        stderr: "error NU1301: Unable to load the service index".to_string(),
      });
    }
    Ok(CommandOutput::default())
  }
}

pub fn write_file(root: &Path, relative: &str, content: &str) {
  let path = root.join(relative);
  fs::create_dir_all(path.parent().unwrap()).unwrap();
  fs::write(path, content).unwrap();
}

fn write_tar_gz(dest: &Path, files: &[(&str, &str)]) -> String {
  let encoder = GzEncoder::new(fs::File::create(dest).unwrap(), Compression::default());
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
  hex::encode(Sha256::digest(fs::read(dest).unwrap()))
}

/// A buildpack fixture: dependency archives on disk and a manifest naming them.
pub struct Buildpack {
  pub temp: TempDir,
  pub manifest_path: PathBuf,
}

impl Buildpack {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let deps = temp.path().join("dependencies");
    fs::create_dir_all(&deps).unwrap();

    let archives: Vec<(&str, &str, usize, Vec<(&str, &str)>)> = vec![
      ("libunwind", "1.6.2", 0, vec![("lib/libunwind.so.8", "libunwind")]),
      ("dotnet-sdk", "8.0.204", 0, vec![("dotnet", "#!/bin/sh\n"), ("sdk/8.0.204/dotnet.dll", "sdk")]),
      (
        "dotnet-runtime",
        "8.0.4",
        0,
        vec![("dotnet", "#!/bin/sh\n"), ("shared/Microsoft.NETCore.App/8.0.4/System.dll", "rt")],
      ),
      (
        "dotnet-aspnetcore",
        "8.0.4",
        0,
        vec![("shared/Microsoft.AspNetCore.App/8.0.4/Microsoft.AspNetCore.dll", "asp")],
      ),
      ("node", "20.11.0", 1, vec![("node-v20.11.0-linux-x64/bin/node", "node")]),
    ];

    let mut yaml = String::from("language: dotnet-core\ndefault_versions:\n");
    for (name, version, _, _) in &archives {
      yaml.push_str(&format!("  - name: {name}\n    version: {version}\n"));
    }
    yaml.push_str("dependencies:\n");
    for (name, version, strip, files) in &archives {
      let archive = deps.join(format!("{name}-{version}.tar.gz"));
      let sha = write_tar_gz(&archive, files);
      yaml.push_str(&format!(
        "  - name: {name}\n    version: {version}\n    uri: file://{}\n    sha256: \"{sha}\"\n    strip_components: {strip}\n",
        deps.join("{name}-{version}.tar.gz").display()
      ));
    }

    let manifest_path = temp.path().join("manifest.yml");
    fs::write(&manifest_path, yaml).unwrap();
    Self { temp, manifest_path }
  }

  /// Write another archive next to the manifest's and return its checksum.
  pub fn add_archive(&self, name: &str, version: &str, files: &[(&str, &str)]) -> String {
    let archive = self.temp.path().join("dependencies").join(format!("{name}-{version}.tar.gz"));
    write_tar_gz(&archive, files)
  }

  pub fn cache_dir(&self) -> PathBuf {
    self.temp.path().join("cache")
  }

  /// A cache over [`Self::cache_dir`] that counts downloads into `calls`.
  pub fn counting_cache(&self, calls: &Rc<Cell<usize>>) -> DependencyCache {
    DependencyCache::new(self.cache_dir(), Box::new(CountingFetcher { calls: calls.clone() }))
  }

  /// A fresh, empty build directory.
  pub fn build_dir(&self, name: &str) -> PathBuf {
    let dir = self.temp.path().join(name);
    fs::create_dir_all(&dir).unwrap();
    dir
  }
}

/// A two-project source app whose web project has a `package.json`.
pub fn write_source_app(build_dir: &Path) {
  write_file(build_dir, "src/Shop.Web/Shop.Web.csproj", WEB_CSPROJ);
  write_file(build_dir, "src/Shop.Web/package.json", "{\"name\":\"shop\"}");
  write_file(build_dir, "src/Shop.Core/Shop.Core.csproj", LIB_CSPROJ);
}

/// Every file under `root` with its content, sorted by path.
pub fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
  let mut files: Vec<_> = walkdir::WalkDir::new(root)
    .sort_by_file_name()
    .into_iter()
    .map(|e| e.unwrap())
    .filter(|e| e.file_type().is_file())
    .map(|e| (e.path().strip_prefix(root).unwrap().to_path_buf(), fs::read(e.path()).unwrap()))
    .collect();
  files.sort();
  files
}
