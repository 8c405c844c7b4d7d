//! Filesystem utilities.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// Remove a directory and all its contents, if it exists.
///
/// Returns whether anything was removed.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<bool> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
        return Ok(true);
    }
    Ok(false)
}

/// Remove a file, if it exists.
pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    if path.is_file() {
        fs::remove_file(path)
            .with_context(|| format!("failed to remove file: {}", path.display()))?;
        return Ok(true);
    }
    Ok(false)
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Copy `src` into directory `dest_dir`, keeping its file name and
/// overwriting any existing file.
///
/// The bytes are written to a temporary file in `dest_dir` first and then
/// renamed over the target, so a reader never sees a half-written library.
pub fn copy_into_dir(src: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let file_name = src
        .file_name()
        .with_context(|| format!("not a file path: {}", src.display()))?;
    let dest = dest_dir.join(file_name);

    let bytes =
        fs::read(src).with_context(|| format!("failed to read file: {}", src.display()))?;

    let mut tmp = NamedTempFile::new_in(dest_dir)
        .with_context(|| format!("failed to create temporary file in {}", dest_dir.display()))?;
    tmp.write_all(&bytes)
        .with_context(|| format!("failed to write {}", dest.display()))?;

    if let Ok(meta) = fs::metadata(src) {
        // Keep the executable bit on shared objects
        let _ = fs::set_permissions(tmp.path(), meta.permissions());
    }

    tmp.persist(&dest)
        .with_context(|| format!("failed to copy {} to {}", src.display(), dest.display()))?;

    Ok(dest)
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}
