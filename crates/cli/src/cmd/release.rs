//! Implementation of the `netpack release` command.

use std::path::Path;

use anyhow::{Context, Result};

use netpack_lib::release::release;

pub fn cmd_release(build_dir: &Path) -> Result<bool> {
  let descriptor =
    release(build_dir).with_context(|| format!("Failed to describe launch for {}", build_dir.display()))?;
  print!("{}", descriptor.to_yaml()?);
  Ok(true)
}
