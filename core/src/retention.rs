//! Bounded storage of patient result folders

use crate::error::Result;
use crate::progress::ProgressSink;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Number of patient folders kept by default
pub const DEFAULT_MAX_PATIENTS: usize = 5;

/// Removes the oldest patient folders until at most `max_patients` remain
///
/// Folders are ordered by modification time, oldest first. Plain files in
/// `results_dir` are ignored. Pruning stops at the first folder that cannot
/// be removed.
///
/// # Returns
///
/// The folders that were removed
pub fn enforce_patient_limit(
    results_dir: &Path,
    max_patients: usize,
    sink: &mut dyn ProgressSink,
) -> Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    for entry in fs::read_dir(results_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        match entry.metadata().and_then(|meta| meta.modified()) {
            Ok(modified) => folders.push((path, modified)),
            Err(e) => sink.warn(&format!(
                "Could not read modification time of {}: {}",
                path.display(),
                e
            )),
        }
    }

    let mut removed = Vec::new();
    for folder in excess_folders(folders, max_patients) {
        match fs::remove_dir_all(&folder) {
            Ok(()) => {
                sink.info(&format!(
                    "Deleted oldest patient folder: {}",
                    folder
                        .file_name()
                        .map(|n| n.to_string_lossy())
                        .unwrap_or_default()
                ));
                removed.push(folder);
            }
            Err(e) => {
                sink.warn(&format!("Could not remove {}: {}", folder.display(), e));
                break;
            }
        }
    }

    Ok(removed)
}

/// Oldest folders beyond the limit, oldest first
fn excess_folders(mut folders: Vec<(PathBuf, SystemTime)>, max_patients: usize) -> Vec<PathBuf> {
    folders.sort_by(|(a_path, a_time), (b_path, b_time)| {
        a_time.cmp(b_time).then_with(|| a_path.cmp(b_path))
    });
    let excess = folders.len().saturating_sub(max_patients);
    folders
        .into_iter()
        .take(excess)
        .map(|(path, _)| path)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::MemorySink;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_excess_folders_oldest_first() {
        let base = SystemTime::UNIX_EPOCH;
        let folders = vec![
            (PathBuf::from("c"), base + Duration::from_secs(30)),
            (PathBuf::from("a"), base + Duration::from_secs(10)),
            (PathBuf::from("d"), base + Duration::from_secs(40)),
            (PathBuf::from("b"), base + Duration::from_secs(20)),
        ];

        assert_eq!(
            excess_folders(folders.clone(), 2),
            vec![PathBuf::from("a"), PathBuf::from("b")]
        );
        assert!(excess_folders(folders, 4).is_empty());
    }

    #[test]
    fn test_enforce_limit_counts_only_folders() {
        let temp_dir = TempDir::new().unwrap();
        let results = temp_dir.path();
        for name in ["p1", "p2", "p3"] {
            fs::create_dir(results.join(name)).unwrap();
        }
        File::create(results.join("index.csv")).unwrap();

        let mut sink = MemorySink::new();
        assert!(enforce_patient_limit(results, 3, &mut sink)
            .unwrap()
            .is_empty());

        let removed = enforce_patient_limit(results, 1, &mut sink).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(fs::read_dir(results).unwrap().count(), 2);
        assert!(results.join("index.csv").exists());
        assert!(sink.contains("Deleted oldest patient folder"));
    }

    #[test]
    fn test_missing_results_dir_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut sink = MemorySink::new();
        assert!(enforce_patient_limit(&temp_dir.path().join("none"), 5, &mut sink).is_err());
    }
}
