//! Native unwinding library required by the .NET runtime on Linux.

use super::{InstallContext, InstallError, Installer, install_dependency};
use crate::context::BuildContext;
use crate::layout::AppLayout;
use crate::manifest::DependencyDescriptor;

pub const NAME: &str = "libunwind";
const TARGET: &str = ".libunwind";

pub struct LibunwindInstaller;

impl Installer for LibunwindInstaller {
  fn name(&self) -> &str {
    NAME
  }

  fn install_order(&self) -> u32 {
    10
  }

  fn should_install(&self, _layout: &AppLayout) -> bool {
    true
  }

  fn required_dependency(&self, build: &BuildContext, _layout: &AppLayout) -> Result<DependencyDescriptor, InstallError> {
    Ok(build.manifest.find_default(NAME)?.clone())
  }

  fn install(&self, ctx: &mut InstallContext<'_>, dep: &DependencyDescriptor) -> Result<(), InstallError> {
    let dest = install_dependency(ctx, NAME, dep, TARGET)?;
    ctx.build.prepend_path("LD_LIBRARY_PATH", &dest.join("lib"));
    Ok(())
  }
}
