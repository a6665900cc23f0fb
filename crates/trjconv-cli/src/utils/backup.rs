use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Parses `N` out of a `#<name>.N#` backup file name.
fn backup_number(candidate: &str, name: &str) -> Option<u32> {
    candidate
        .strip_prefix('#')?
        .strip_suffix('#')?
        .strip_prefix(name)?
        .strip_prefix('.')?
        .parse()
        .ok()
}

/// Path the next backup of `path` would be renamed to.
pub fn next_backup_path(path: &Path) -> io::Result<PathBuf> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name"))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut highest = 0;
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if let Some(n) = entry.file_name().to_str().and_then(|c| backup_number(c, name)) {
            highest = highest.max(n);
        }
    }
    Ok(dir.join(format!("#{}.{}#", name, highest + 1)))
}

/// Renames an existing `path` out of the way, GROMACS style.
///
/// Returns the backup path, or `None` when there was nothing to back up.
pub fn backup_existing(path: &Path) -> io::Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let backup = next_backup_path(path)?;
    fs::rename(path, &backup)?;
    info!("Backed up {} to {}", path.display(), backup.display());
    Ok(Some(backup))
}
