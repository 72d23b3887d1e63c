//! Implementation of the `netpack detect` command.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use netpack_lib::consts::LANGUAGE;
use netpack_lib::layout;

/// Print the buildpack language and succeed when `build_dir` is buildable.
///
/// Returns `Ok(false)` (exit 1, no diagnostic) when it is not, which is the
/// platform's signal to try the next buildpack.
pub fn cmd_detect(build_dir: &Path) -> Result<bool> {
  if !layout::detect(build_dir) {
    info!(path = ?build_dir, "no .NET application detected");
    return Ok(false);
  }
  println!("{LANGUAGE}");
  Ok(true)
}
