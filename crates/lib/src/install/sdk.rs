//! The .NET SDK: installed for source layouts, which it then restores.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use super::{InstallContext, InstallError, Installer, install_dependency};
use crate::consts::{DOTNET_DIR, NUGET_DIR};
use crate::context::BuildContext;
use crate::execute::CommandSpec;
use crate::layout::AppLayout;
use crate::manifest::{DependencyDescriptor, ManifestError};

pub const NAME: &str = "dotnet-sdk";
const GLOBAL_JSON: &str = "global.json";

pub struct SdkInstaller;

#[derive(Debug, Deserialize)]
struct GlobalJson {
  sdk: Option<GlobalJsonSdk>,
}

#[derive(Debug, Deserialize)]
struct GlobalJsonSdk {
  version: Option<String>,
}

/// The SDK version pinned by `global.json`, looked up in `dir`.
fn pinned_sdk_version(dir: &Path) -> Result<Option<String>, InstallError> {
  let path = dir.join(GLOBAL_JSON);
  if !path.is_file() {
    return Ok(None);
  }
  let invalid = |message: String| InstallError::GlobalJson {
    path: path.clone(),
    message,
  };
  let content = fs::read_to_string(&path).map_err(|e| invalid(e.to_string()))?;
  let parsed: GlobalJson = serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;
  Ok(parsed.sdk.and_then(|sdk| sdk.version).filter(|v| !v.trim().is_empty()))
}

/// Point the build environment at the `.dotnet` install.
pub(crate) fn configure_dotnet_env(build: &mut BuildContext) {
  let dotnet_root = build.build_dir.join(DOTNET_DIR);
  build.set_env("DOTNET_ROOT", dotnet_root.display().to_string());
  build.set_env("DOTNET_CLI_TELEMETRY_OPTOUT", "1");
  build.set_env("DOTNET_SKIP_FIRST_TIME_EXPERIENCE", "1");
  build.set_env("DOTNET_NOLOGO", "1");
  build.prepend_path("PATH", &dotnet_root);
}

impl Installer for SdkInstaller {
  fn name(&self) -> &str {
    NAME
  }

  fn install_order(&self) -> u32 {
    20
  }

  fn should_install(&self, layout: &AppLayout) -> bool {
    layout.kind.is_source()
  }

  /// `global.json` at the build root, then in the entry project directory,
  /// else the manifest default. A pinned version missing from the manifest
  /// rolls forward to the latest patch of its feature band.
  fn required_dependency(&self, build: &BuildContext, layout: &AppLayout) -> Result<DependencyDescriptor, InstallError> {
    let mut pinned = pinned_sdk_version(&build.build_dir)?;
    if pinned.is_none()
      && let Some(entry) = layout.entry_project()
    {
      pinned = pinned_sdk_version(&build.build_dir.join(entry.dir()))?;
    }

    let Some(version) = pinned else {
      return Ok(build.manifest.find_default(NAME)?.clone());
    };

    debug!(version = %version, "sdk pinned by global.json");
    match build.manifest.find(NAME, &version) {
      Ok(dep) => Ok(dep.clone()),
      Err(ManifestError::MissingDependency { .. }) => Ok(build.manifest.roll_forward(NAME, &version)?.clone()),
      Err(e) => Err(e.into()),
    }
  }

  fn install(&self, ctx: &mut InstallContext<'_>, dep: &DependencyDescriptor) -> Result<(), InstallError> {
    install_dependency(ctx, NAME, dep, DOTNET_DIR)?;
    configure_dotnet_env(ctx.build);
    Ok(())
  }

  fn should_restore(&self, layout: &AppLayout) -> bool {
    layout.kind.is_source()
  }

  fn restore(&self, ctx: &mut InstallContext<'_>) -> Result<(), InstallError> {
    let entry = ctx.layout.entry_project().ok_or_else(|| InstallError::LayoutMismatch {
      installer: NAME.to_string(),
      what: "an entry project",
    })?;

    configure_dotnet_env(ctx.build);
    let nuget = ctx.build.build_dir.join(NUGET_DIR);
    ctx.build.set_env("NUGET_PACKAGES", nuget.display().to_string());

    ctx.reporter.step(&format!("Restoring {}", entry.file.display()));
    let spec = CommandSpec::new(format!("dotnet restore \"{}\"", entry.file.display()), &ctx.build.build_dir)
      .with_env(&ctx.build.env);
    let output = ctx.shell.run(&spec)?;

    debug!(stdout = %output.stdout, "restore output");
    info!(project = ?entry.file, "restored");
    Ok(())
  }
}
