//! Support files written into every build.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::consts::PROFILE_D_DIR;
use crate::util::fs::{copy_dir_all, make_executable};

const PROFILE_SCRIPT: &str = include_str!("profile.sh");
const PROFILE_SCRIPT_NAME: &str = "netpack.sh";

/// Write the launch environment script and copy `extra_dir` into `build_dir`.
///
/// Returns the written paths relative to `build_dir`.
pub fn write_resources(build_dir: &Path, extra_dir: Option<&Path>) -> io::Result<Vec<PathBuf>> {
  let mut written = Vec::new();

  let profile_dir = build_dir.join(PROFILE_D_DIR);
  fs::create_dir_all(&profile_dir)?;
  let script = profile_dir.join(PROFILE_SCRIPT_NAME);
  fs::write(&script, PROFILE_SCRIPT)?;
  make_executable(&script)?;
  written.push(Path::new(PROFILE_D_DIR).join(PROFILE_SCRIPT_NAME));

  if let Some(extra) = extra_dir {
    if !extra.is_dir() {
      return Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("resources directory {} does not exist", extra.display()),
      ));
    }
    let copied = copy_dir_all(extra, build_dir, &[])?;
    info!(from = ?extra, files = copied.len(), "copied support resources");
    written.extend(copied);
  }

  Ok(written)
}
