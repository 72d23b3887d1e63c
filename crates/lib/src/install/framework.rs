//! Shared frameworks for portable published applications.
//!
//! A portable publish names the frameworks it runs on in its runtime config
//! but ships none of them. Each framework installer supplies one, rolled
//! forward to the newest patch the manifest carries.

use tracing::debug;

use super::sdk::configure_dotnet_env;
use super::{InstallContext, InstallError, Installer, install_dependency};
use crate::consts::DOTNET_DIR;
use crate::context::BuildContext;
use crate::layout::{AppLayout, FrameworkRef, LayoutKind};
use crate::manifest::DependencyDescriptor;

pub const NETCORE_APP: &str = "Microsoft.NETCore.App";
pub const ASPNETCORE_APP: &str = "Microsoft.AspNetCore.App";

pub struct FrameworkInstaller {
  name: &'static str,
  order: u32,
  framework: &'static str,
  /// Also install when the app only references some other framework,
  /// which is itself layered on this one.
  underlies_others: bool,
}

impl FrameworkInstaller {
  /// `Microsoft.NETCore.App`, needed by every framework-dependent app.
  pub fn runtime() -> Self {
    Self {
      name: "dotnet-runtime",
      order: 30,
      framework: NETCORE_APP,
      underlies_others: true,
    }
  }

  pub fn aspnetcore() -> Self {
    Self {
      name: "dotnet-aspnetcore",
      order: 40,
      framework: ASPNETCORE_APP,
      underlies_others: false,
    }
  }

  fn framework_ref<'l>(&self, layout: &'l AppLayout) -> Option<&'l FrameworkRef> {
    let config = layout.runtime_config.as_ref()?;
    config.framework(self.framework).or_else(|| {
      if self.underlies_others {
        config.frameworks.first()
      } else {
        None
      }
    })
  }
}

impl Installer for FrameworkInstaller {
  fn name(&self) -> &str {
    self.name
  }

  fn install_order(&self) -> u32 {
    self.order
  }

  fn should_install(&self, layout: &AppLayout) -> bool {
    layout.kind == LayoutKind::PublishedPortable && self.framework_ref(layout).is_some()
  }

  fn required_dependency(&self, build: &BuildContext, layout: &AppLayout) -> Result<DependencyDescriptor, InstallError> {
    let framework = self.framework_ref(layout).ok_or_else(|| InstallError::LayoutMismatch {
      installer: self.name.to_string(),
      what: "a framework reference",
    })?;
    debug!(installer = self.name, framework = %framework.name, version = %framework.version, "rolling forward");
    Ok(build.manifest.roll_forward(self.name, &framework.version)?.clone())
  }

  fn install(&self, ctx: &mut InstallContext<'_>, dep: &DependencyDescriptor) -> Result<(), InstallError> {
    install_dependency(ctx, self.name, dep, DOTNET_DIR)?;
    configure_dotnet_env(ctx.build);
    Ok(())
  }
}
