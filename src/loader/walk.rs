//! Recursive discovery of config files by exact file name.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Regular files named `file_name` anywhere below `root`, sorted by path.
///
/// A missing root yields an empty list. Symlinks are neither followed nor
/// returned. Entries below the root that cannot be read are skipped with a
/// warning.
pub fn find_config_files(root: &Path, file_name: &str) -> Result<Vec<PathBuf>> {
    match fs::metadata(root) {
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("reading config directory {}", root.display()));
        }
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(err).with_context(|| format!("reading config directory {}", root.display()));
            }
            Err(err) => {
                let path = err.path().map(|p| p.display().to_string()).unwrap_or_default();
                tracing::warn!(path = %path, error = %err, "cannot read entry; skipping");
                continue;
            }
        };
        if entry.file_type().is_file() && entry.file_name() == file_name {
            found.push(entry.into_path());
        }
    }

    found.sort();
    Ok(found)
}
