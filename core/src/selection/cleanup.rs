use crate::error::Result;
use crate::progress::ProgressSink;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Removes every entry of `dir` except `keep`
///
/// Entries are compared to `keep` by canonical path; when either path cannot
/// be resolved the file names are compared instead. Files and symlinks are
/// unlinked, directories removed recursively. A failure on one entry is
/// reported to the sink and the remaining entries are still processed.
///
/// # Returns
///
/// The entries that were removed
pub fn remove_all_except(
    dir: &Path,
    keep: &Path,
    sink: &mut dyn ProgressSink,
) -> Result<Vec<PathBuf>> {
    let keep_resolved = fs::canonicalize(keep).ok();
    let mut removed = Vec::new();

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        match entry {
            Ok(entry) => entries.push(entry.path()),
            Err(e) => sink.warn(&format!("Could not read entry in {}: {}", dir.display(), e)),
        }
    }
    entries.sort();

    for path in entries {
        if is_same_entry(&path, keep, keep_resolved.as_deref()) {
            continue;
        }
        match remove_entry(&path) {
            Ok(()) => {
                log::debug!("Removed {}", path.display());
                removed.push(path);
            }
            Err(e) => sink.warn(&format!("Could not remove {}: {}", path.display(), e)),
        }
    }

    Ok(removed)
}

fn is_same_entry(candidate: &Path, keep: &Path, keep_resolved: Option<&Path>) -> bool {
    match (fs::canonicalize(candidate).ok(), keep_resolved) {
        (Some(resolved), Some(keep_resolved)) => resolved == keep_resolved,
        _ => candidate.file_name() == keep.file_name(),
    }
}

fn remove_entry(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
