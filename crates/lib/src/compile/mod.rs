//! Build orchestration.
//!
//! The compiler resolves the layout once, plans every manifest lookup before
//! touching the build directory, then runs installers strictly in ascending
//! install order and stops at the first failure.

mod resources;

pub use resources::write_resources;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::cache::DependencyCache;
use crate::config::Config;
use crate::consts::DEFAULT_PRUNE_GRACE;
use crate::context::BuildContext;
use crate::execute::Shell;
use crate::install::{InstallContext, InstallError, Installer, registry};
use crate::layout::{self, AppLayout, LayoutError};
use crate::manifest::DependencyDescriptor;
use crate::report::Reporter;

#[derive(Debug, Error)]
pub enum CompileError {
  #[error(transparent)]
  Layout(#[from] LayoutError),

  #[error("configuration error: {0}")]
  Configuration(String),

  #[error("configuration error for {installer}: {source}")]
  Plan {
    installer: String,
    #[source]
    source: InstallError,
  },

  #[error("{installer} failed to install: {source}")]
  Install {
    installer: String,
    #[source]
    source: InstallError,
  },

  #[error("{installer} failed to restore: {source}")]
  Restore {
    installer: String,
    #[source]
    source: InstallError,
  },

  #[error("failed to write support resources: {0}")]
  Resources(#[source] std::io::Error),
}

/// A dependency placed into the build directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledDependency {
  pub installer: String,
  pub name: String,
  pub version: String,
}

/// What a successful compile did.
#[derive(Debug, Clone, Serialize)]
pub struct CompileReport {
  pub layout: AppLayout,
  /// In install order.
  pub installed: Vec<InstalledDependency>,
  pub restored: Vec<String>,
  /// Installers disabled by configuration.
  pub skipped: Vec<String>,
  /// Support files, relative to the build directory.
  pub resources: Vec<PathBuf>,
  /// Stale cache entries removed after the build.
  pub pruned: Vec<PathBuf>,
}

struct PlannedStep<'i> {
  installer: &'i dyn Installer,
  dependency: Option<DependencyDescriptor>,
  restore: bool,
}

/// Runs one build of `context.build_dir`.
pub struct Compiler<'a> {
  context: BuildContext,
  cache: DependencyCache,
  shell: &'a dyn Shell,
  reporter: &'a dyn Reporter,
  installers: Vec<Box<dyn Installer>>,
  skip_installers: BTreeSet<String>,
  resources_dir: Option<PathBuf>,
  prune_grace: Duration,
}

impl<'a> Compiler<'a> {
  /// A compiler running the shipped installers.
  pub fn new(context: BuildContext, cache: DependencyCache, shell: &'a dyn Shell, reporter: &'a dyn Reporter) -> Self {
    Self {
      context,
      cache,
      shell,
      reporter,
      installers: registry(),
      skip_installers: BTreeSet::new(),
      resources_dir: None,
      prune_grace: DEFAULT_PRUNE_GRACE,
    }
  }

  /// Replace the installer set.
  pub fn with_installers(mut self, installers: Vec<Box<dyn Installer>>) -> Self {
    self.installers = installers;
    self
  }

  /// Apply the skip list, resources directory and prune grace from `config`.
  pub fn with_config(mut self, config: &Config) -> Self {
    self.skip_installers = config.skip_installers.clone();
    self.resources_dir = config.resources_dir.clone();
    self.prune_grace = config.prune_grace;
    self
  }

  pub fn context(&self) -> &BuildContext {
    &self.context
  }

  /// Run the build, reporting success only.
  pub fn compile(&mut self) -> bool {
    match self.run() {
      Ok(_) => true,
      Err(e) => {
        error!(error = %e, "compile failed");
        false
      }
    }
  }

  /// Run the build.
  pub fn run(&mut self) -> Result<CompileReport, CompileError> {
    let layout = layout::resolve(&self.context.build_dir)?;
    self.reporter.step(&format!("Detected {} application", describe(&layout)));

    self.installers.sort_by_key(|i| i.install_order());
    let (active, skipped) = select_active(&self.installers, &self.skip_installers, &layout);
    check_unique_orders(&active)?;
    let plan = self.plan(&active, &layout)?;

    let mut installed = Vec::new();
    let mut restored = Vec::new();
    for step in &plan {
      let name = step.installer.name().to_string();
      let mut ctx = InstallContext {
        build: &mut self.context,
        layout: &layout,
        cache: &self.cache,
        shell: self.shell,
        reporter: self.reporter,
      };

      if let Some(dep) = &step.dependency {
        step.installer.install(&mut ctx, dep).map_err(|source| CompileError::Install {
          installer: name.clone(),
          source,
        })?;
        installed.push(InstalledDependency {
          installer: name.clone(),
          name: dep.name.clone(),
          version: dep.version.clone(),
        });
      }

      if step.restore {
        step.installer.restore(&mut ctx).map_err(|source| CompileError::Restore {
          installer: name.clone(),
          source,
        })?;
        restored.push(name);
      }
    }

    let resources =
      write_resources(&self.context.build_dir, self.resources_dir.as_deref()).map_err(CompileError::Resources)?;

    let pruned = self.prune(&plan);

    info!(installed = installed.len(), restored = restored.len(), "compile complete");
    Ok(CompileReport {
      layout,
      installed,
      restored,
      skipped,
      resources,
      pruned,
    })
  }

  fn plan<'i>(&self, active: &[&'i dyn Installer], layout: &AppLayout) -> Result<Vec<PlannedStep<'i>>, CompileError> {
    active
      .iter()
      .map(|&installer| {
        let dependency = if installer.should_install(layout) {
          let dep = installer
            .required_dependency(&self.context, layout)
            .map_err(|source| CompileError::Plan {
              installer: installer.name().to_string(),
              source,
            })?;
          Some(dep)
        } else {
          None
        };
        Ok(PlannedStep {
          installer,
          dependency,
          restore: installer.should_restore(layout),
        })
      })
      .collect()
  }

  /// Drop cached versions superseded by this build and idle past the grace
  /// window. Failures only warn.
  fn prune(&self, plan: &[PlannedStep<'_>]) -> Vec<PathBuf> {
    let mut pruned = Vec::new();
    for dep in plan.iter().filter_map(|s| s.dependency.as_ref()) {
      match self.cache.prune(&dep.name, dep, self.prune_grace) {
        Ok(removed) => pruned.extend(removed),
        Err(e) => {
          warn!(name = %dep.name, error = %e, "failed to prune cache");
          self.reporter.warn(&format!("Could not prune cached {}: {e}", dep.name));
        }
      }
    }
    pruned
  }
}

/// Installers that will do something for `layout`, in install order,
/// and the names of those disabled by configuration.
fn select_active<'i>(
  installers: &'i [Box<dyn Installer>],
  skip: &BTreeSet<String>,
  layout: &AppLayout,
) -> (Vec<&'i dyn Installer>, Vec<String>) {
  let mut active = Vec::new();
  let mut skipped = Vec::new();

  for installer in installers {
    let installer = installer.as_ref();
    if skip.contains(installer.name()) {
      info!(installer = installer.name(), "skipped by configuration");
      skipped.push(installer.name().to_string());
      continue;
    }
    if installer.should_install(layout) || installer.should_restore(layout) {
      active.push(installer);
    }
  }

  (active, skipped)
}

fn check_unique_orders(active: &[&dyn Installer]) -> Result<(), CompileError> {
  for pair in active.windows(2) {
    if pair[0].install_order() == pair[1].install_order() {
      return Err(CompileError::Configuration(format!(
        "installers {} and {} share install order {}",
        pair[0].name(),
        pair[1].name(),
        pair[0].install_order()
      )));
    }
  }
  Ok(())
}

fn describe(layout: &AppLayout) -> &'static str {
  match layout.kind {
    layout::LayoutKind::SourceSingle => "single-project source",
    layout::LayoutKind::SourceMulti => "multi-project source",
    layout::LayoutKind::PublishedSelfContained => "self-contained published",
    layout::LayoutKind::PublishedPortable => "framework-dependent published",
  }
}
