//! Installers: the ordered steps that put dependencies into the build directory.
//!
//! Each installer owns one dependency. The compiler asks every installer
//! whether it applies to the resolved layout, plans its manifest lookup up
//! front, then runs `install` and `restore` in ascending [`Installer::install_order`].
//!
//! Installs are idempotent. A receipt under `<build_dir>/.netpack/installed/`
//! records what was copied; a matching receipt turns a repeat install into a
//! no-op.

mod framework;
mod libunwind;
mod node;
pub mod receipt;
mod sdk;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::cache::{CacheError, DependencyCache};
use crate::consts::CACHE_COMPLETE_MARKER;
use crate::context::BuildContext;
use crate::execute::{ExecuteError, Shell};
use crate::layout::AppLayout;
use crate::manifest::{DependencyDescriptor, ManifestError};
use crate::report::Reporter;
use crate::util::fs::{copy_dir_all, remove_stale_files};

pub use framework::FrameworkInstaller;
pub use libunwind::LibunwindInstaller;
pub use node::NodeInstaller;
pub use receipt::Receipt;
pub use sdk::SdkInstaller;

#[derive(Debug, Error)]
pub enum InstallError {
  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Cache(#[from] CacheError),

  #[error(transparent)]
  Execute(#[from] ExecuteError),

  #[error("failed to copy {name} into {dest}: {source}")]
  Copy {
    name: String,
    dest: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write install receipt {path}: {source}")]
  Receipt {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid {path}: {message}")]
  GlobalJson { path: PathBuf, message: String },

  #[error("{installer} needs {what} but the layout has none")]
  LayoutMismatch { installer: String, what: &'static str },
}

/// Everything an installer may touch while running.
pub struct InstallContext<'a> {
  pub build: &'a mut BuildContext,
  pub layout: &'a AppLayout,
  pub cache: &'a DependencyCache,
  pub shell: &'a dyn Shell,
  pub reporter: &'a dyn Reporter,
}

/// One ordered installation step.
pub trait Installer {
  fn name(&self) -> &str;

  /// Position in the pipeline; lower runs first.
  fn install_order(&self) -> u32;

  /// Whether this installer's dependency is needed for `layout`.
  fn should_install(&self, layout: &AppLayout) -> bool;

  /// The manifest entry `install` will be given.
  ///
  /// Called during planning, before anything is written, and only when
  /// [`should_install`](Installer::should_install) is true.
  fn required_dependency(
    &self,
    build: &BuildContext,
    layout: &AppLayout,
  ) -> Result<DependencyDescriptor, InstallError>;

  /// Put `dep` into the build directory.
  fn install(&self, ctx: &mut InstallContext<'_>, dep: &DependencyDescriptor) -> Result<(), InstallError>;

  fn should_restore(&self, _layout: &AppLayout) -> bool {
    false
  }

  /// Fetch the application's own packages.
  fn restore(&self, _ctx: &mut InstallContext<'_>) -> Result<(), InstallError> {
    Ok(())
  }
}

/// The installers shipped with the buildpack, in no particular order.
pub fn registry() -> Vec<Box<dyn Installer>> {
  vec![
    Box::new(LibunwindInstaller),
    Box::new(SdkInstaller),
    Box::new(FrameworkInstaller::runtime()),
    Box::new(FrameworkInstaller::aspnetcore()),
    Box::new(NodeInstaller),
  ]
}

fn copy_err(name: &str, dest: &Path) -> impl FnOnce(io::Error) -> InstallError {
  let (name, dest) = (name.to_string(), dest.to_path_buf());
  move |source| InstallError::Copy { name, dest, source }
}

/// Copy the cached extraction of `dep` into `<build_dir>/<target>`.
///
/// Skipped when the receipt for `installer` already records `dep` and the
/// target exists. When the receipt names another version, files it wrote that
/// `dep` does not ship are removed after the copy. Returns the absolute target
/// directory either way.
pub(crate) fn install_dependency(
  ctx: &mut InstallContext<'_>,
  installer: &str,
  dep: &DependencyDescriptor,
  target: &str,
) -> Result<PathBuf, InstallError> {
  let dest = ctx.build.build_dir.join(target);
  let receipt_path = receipt::receipt_path(&ctx.build.state_dir(), installer);
  let previous = Receipt::load(&receipt_path);

  if let Some(existing) = &previous
    && existing.records(dep)
    && dest.is_dir()
  {
    debug!(installer, version = %dep.version, "receipt matches, skipping copy");
    ctx.reporter.detail(&format!("Using installed {} {}", dep.name, dep.version));
    return Ok(dest);
  }

  ctx.reporter.step(&format!("Installing {} {}", dep.name, dep.version));
  let entry = ctx.cache.fetch(dep)?;

  let copied = copy_dir_all(&entry, &dest, &[CACHE_COMPLETE_MARKER]).map_err(copy_err(&dep.name, &dest))?;
  info!(installer, name = %dep.name, version = %dep.version, files = copied.len(), dest = ?dest, "installed");

  if let Some(old) = previous {
    let old_root = ctx.build.build_dir.join(&old.target);
    let keep: &[PathBuf] = if old.target == target { &copied } else { &[] };
    let removed = remove_stale_files(&old_root, &old.files, keep).map_err(copy_err(&dep.name, &old_root))?;
    if removed > 0 {
      info!(installer, previous = %old.version, files = removed, "removed files of previous install");
    }
  }

  Receipt::new(installer, dep, target, copied).save(&receipt_path)?;
  Ok(dest)
}
