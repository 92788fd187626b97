use crate::error::Result;
use crate::progress::ProgressSink;
use crate::types::SelectorConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Volume and descriptor files found directly inside a converter output directory
///
/// Both lists are sorted by file name.
#[derive(Debug, Default)]
pub(crate) struct ConversionListing {
    pub volumes: Vec<PathBuf>,
    pub descriptors: Vec<PathBuf>,
}

/// Lists the volume and descriptor files of a directory (non-recursive)
///
/// Only a failure to open the directory is returned as an error. Entries that
/// cannot be inspected are reported to the sink and skipped.
pub(crate) fn list_conversion_output(
    dir: &Path,
    config: &SelectorConfig,
    sink: &mut dyn ProgressSink,
) -> Result<ConversionListing> {
    let mut listing = ConversionListing::default();

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                sink.warn(&format!("Could not read entry in {}: {}", dir.display(), e));
                continue;
            }
        };
        let path = entry.path();

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            sink.warn(&format!("Skipping entry with non-UTF-8 name: {}", path.display()));
            continue;
        };
        if !path.is_file() {
            continue;
        }

        if config.is_volume_name(name) {
            listing.volumes.push(path);
        } else if config.is_descriptor_name(name) {
            listing.descriptors.push(path);
        }
    }

    listing.volumes.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    listing.descriptors.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(listing)
}
