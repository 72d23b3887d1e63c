//! Node.js for source projects that build front-end assets.

use super::{InstallContext, InstallError, Installer, install_dependency};
use crate::context::BuildContext;
use crate::layout::AppLayout;
use crate::manifest::DependencyDescriptor;

pub const NAME: &str = "node";
const TARGET: &str = ".node";

pub struct NodeInstaller;

impl Installer for NodeInstaller {
  fn name(&self) -> &str {
    NAME
  }

  fn install_order(&self) -> u32 {
    50
  }

  fn should_install(&self, layout: &AppLayout) -> bool {
    layout.kind.is_source() && layout.entry_project().is_some_and(|p| p.has_package_json)
  }

  fn required_dependency(&self, build: &BuildContext, _layout: &AppLayout) -> Result<DependencyDescriptor, InstallError> {
    Ok(build.manifest.find_default(NAME)?.clone())
  }

  fn install(&self, ctx: &mut InstallContext<'_>, dep: &DependencyDescriptor) -> Result<(), InstallError> {
    let dest = install_dependency(ctx, NAME, dep, TARGET)?;
    ctx.build.prepend_path("PATH", &dest.join("bin"));
    Ok(())
  }
}
