//! Archive extraction into cache staging directories.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
  TarGz,
  Tar,
  Zip,
  /// Not an archive: the file is placed into the destination as-is.
  Plain,
}

impl ArchiveKind {
  pub fn detect(filename: &str) -> Self {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
      ArchiveKind::TarGz
    } else if lower.ends_with(".tar") {
      ArchiveKind::Tar
    } else if lower.ends_with(".zip") {
      ArchiveKind::Zip
    } else {
      ArchiveKind::Plain
    }
  }
}

/// Unpack `archive_path` into `dest`, dropping `strip` leading path components.
///
/// Returns the number of regular files written.
pub fn unpack(archive_path: &Path, dest: &Path, strip: usize) -> io::Result<usize> {
  fs::create_dir_all(dest)?;

  let filename = archive_path
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_default();

  let count = match ArchiveKind::detect(&filename) {
    ArchiveKind::TarGz => {
      let file = File::open(archive_path)?;
      unpack_tar(GzDecoder::new(BufReader::new(file)), dest, strip)?
    }
    ArchiveKind::Tar => unpack_tar(BufReader::new(File::open(archive_path)?), dest, strip)?,
    ArchiveKind::Zip => unpack_zip(archive_path, dest, strip)?,
    ArchiveKind::Plain => {
      fs::copy(archive_path, dest.join(&filename))?;
      1
    }
  };

  debug!(archive = ?archive_path, dest = ?dest, files = count, "unpacked");
  Ok(count)
}

/// Drop the first `strip` components, rejecting paths that escape the root.
fn stripped_path(path: &Path, strip: usize) -> Option<PathBuf> {
  let mut out = PathBuf::new();
  for component in path.components().filter(|c| !matches!(c, Component::CurDir)).skip(strip) {
    match component {
      Component::Normal(part) => out.push(part),
      _ => return None,
    }
  }
  if out.as_os_str().is_empty() { None } else { Some(out) }
}

fn unpack_tar<R: Read>(reader: R, dest: &Path, strip: usize) -> io::Result<usize> {
  let mut archive = Archive::new(reader);
  archive.set_preserve_permissions(true);
  let mut count = 0;

  for entry in archive.entries()? {
    let mut entry = entry?;
    let path = entry.path()?.to_path_buf();

    let Some(stripped) = stripped_path(&path, strip) else {
      continue;
    };
    let dest_path = dest.join(&stripped);

    if let Some(parent) = dest_path.parent() {
      fs::create_dir_all(parent)?;
    }

    if entry.header().entry_type().is_file() {
      count += 1;
    }
    entry.unpack(&dest_path)?;
  }

  Ok(count)
}

fn unpack_zip(archive_path: &Path, dest: &Path, strip: usize) -> io::Result<usize> {
  let file = File::open(archive_path)?;
  let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(io::Error::other)?;
  let mut count = 0;

  for i in 0..archive.len() {
    let mut file = archive.by_index(i).map_err(io::Error::other)?;

    let Some(path) = file.enclosed_name() else {
      return Err(io::Error::other(format!("invalid zip entry name: {}", file.name())));
    };
    let Some(stripped) = stripped_path(&path, strip) else {
      continue;
    };
    let dest_path = dest.join(&stripped);

    if file.is_dir() {
      fs::create_dir_all(&dest_path)?;
      continue;
    }

    if let Some(parent) = dest_path.parent() {
      fs::create_dir_all(parent)?;
    }
    let mut outfile = File::create(&dest_path)?;
    io::copy(&mut file, &mut outfile)?;
    count += 1;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      if let Some(mode) = file.unix_mode() {
        fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode))?;
      }
    }
  }

  Ok(count)
}
