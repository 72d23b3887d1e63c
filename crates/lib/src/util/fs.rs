//! Filesystem helpers for laying cached trees into the build directory.

use std::fs;
use std::io;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Recursively copy `src` into `dest`, merging with whatever `dest` already holds.
///
/// Existing files are overwritten, symlinks are recreated as symlinks and Unix
/// permission bits are carried over. Top-level entries named in `exclude` are
/// not copied. Returns the files and symlinks written, relative to `dest`, in
/// walk order.
pub fn copy_dir_all(src: &Path, dest: &Path, exclude: &[&str]) -> io::Result<Vec<PathBuf>> {
  fs::create_dir_all(dest)?;
  let mut copied = Vec::new();

  let walker = WalkDir::new(src).sort_by_file_name().min_depth(1).into_iter().filter_entry(|e| {
    e.depth() != 1
      || e
        .file_name()
        .to_str()
        .map(|name| !exclude.contains(&name))
        .unwrap_or(true)
  });

  for entry in walker {
    let entry = entry.map_err(io::Error::other)?;
    let rel = entry.path().strip_prefix(src).map_err(io::Error::other)?;
    let target = dest.join(rel);
    let file_type = entry.file_type();

    if file_type.is_dir() {
      fs::create_dir_all(&target)?;
    } else if file_type.is_symlink() {
      let link_target = fs::read_link(entry.path())?;
      if target.symlink_metadata().is_ok() {
        fs::remove_file(&target)?;
      }
      create_symlink(&link_target, &target)?;
      copied.push(rel.to_path_buf());
    } else if file_type.is_file() {
      if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
      }
      fs::copy(entry.path(), &target)?;
      copied.push(rel.to_path_buf());
    }
  }

  Ok(copied)
}

/// Delete `files` (relative to `root`) except those in `keep`, then any
/// directories under `root` the deletions left empty.
///
/// Missing files are ignored. Returns how many files were removed.
pub fn remove_stale_files(root: &Path, files: &[PathBuf], keep: &[PathBuf]) -> io::Result<usize> {
  let keep: BTreeSet<&PathBuf> = keep.iter().collect();
  let mut removed = 0;
  let mut parents = BTreeSet::new();

  for rel in files.iter().filter(|f| !keep.contains(f)) {
    let path = root.join(rel);
    if path.symlink_metadata().is_err() {
      continue;
    }
    fs::remove_file(&path)?;
    removed += 1;
    parents.extend(rel.ancestors().skip(1).filter(|a| !a.as_os_str().is_empty()).map(Path::to_path_buf));
  }

  // Deepest first, so a directory is tried after its children.
  for dir in parents.iter().rev() {
    let path = root.join(dir);
    if fs::read_dir(&path).is_ok_and(|mut entries| entries.next().is_none()) {
      fs::remove_dir(&path)?;
    }
  }

  Ok(removed)
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
  std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
  std::os::windows::fs::symlink_file(target, link)
}

/// Mark a file executable for its owner, group and others.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> io::Result<()> {
  use std::os::unix::fs::PermissionsExt;

  let mut perms = fs::metadata(path)?.permissions();
  perms.set_mode(perms.mode() | 0o755);
  fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> io::Result<()> {
  Ok(())
}
