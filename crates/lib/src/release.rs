//! Launch descriptor for the built application.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::DOTNET_DIR;
use crate::layout::{self, AppLayout, LayoutError, LayoutKind};

const LISTEN_ARGS: &str = "--urls http://0.0.0.0:${PORT}";

#[derive(Debug, Error)]
pub enum ReleaseError {
  #[error(transparent)]
  Layout(#[from] LayoutError),

  #[error("{0:?} layout has no {1}")]
  Incomplete(LayoutKind, &'static str),

  #[error("failed to serialize release descriptor: {0}")]
  Serialize(#[from] serde_yaml::Error),
}

/// Process types the platform starts, keyed by type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
  pub default_process_types: BTreeMap<String, String>,
}

impl ReleaseDescriptor {
  pub fn web_command(&self) -> Option<&str> {
    self.default_process_types.get("web").map(String::as_str)
  }

  pub fn to_yaml(&self) -> Result<String, ReleaseError> {
    Ok(serde_yaml::to_string(self)?)
  }
}

/// Describe how to launch the application in `build_dir`.
pub fn release(build_dir: &Path) -> Result<ReleaseDescriptor, ReleaseError> {
  let layout = layout::resolve(build_dir)?;
  descriptor_for(&layout)
}

pub fn descriptor_for(layout: &AppLayout) -> Result<ReleaseDescriptor, ReleaseError> {
  let command = match layout.kind {
    LayoutKind::PublishedSelfContained => {
      let config = layout
        .runtime_config
        .as_ref()
        .ok_or(ReleaseError::Incomplete(layout.kind, "runtime config"))?;
      format!("cd ${{HOME}} && ./{} {LISTEN_ARGS}", config.assembly)
    }
    LayoutKind::PublishedPortable => {
      let config = layout
        .runtime_config
        .as_ref()
        .ok_or(ReleaseError::Incomplete(layout.kind, "runtime config"))?;
      format!(
        "cd ${{HOME}} && ${{HOME}}/{DOTNET_DIR}/dotnet {}.dll {LISTEN_ARGS}",
        config.assembly
      )
    }
    LayoutKind::SourceSingle | LayoutKind::SourceMulti => {
      let entry = layout
        .entry_project()
        .ok_or(ReleaseError::Incomplete(layout.kind, "entry project"))?;
      let dir = entry.dir().to_string_lossy().replace('\\', "/");
      let cd = if dir.is_empty() {
        "${HOME}".to_string()
      } else {
        format!("${{HOME}}/{dir}")
      };
      format!("cd {cd} && ${{HOME}}/{DOTNET_DIR}/dotnet run --no-restore -- {LISTEN_ARGS}")
    }
  };

  Ok(ReleaseDescriptor {
    default_process_types: BTreeMap::from([("web".to_string(), command)]),
  })
}
