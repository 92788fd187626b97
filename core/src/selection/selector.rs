use crate::error::Result;
use crate::progress::ProgressSink;
use crate::selection::cleanup::remove_all_except;
use crate::selection::listing::list_conversion_output;
use crate::types::{normalize_identifier, Selection, SelectionKind, SelectorConfig, LARGEST_TAG};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Keeps a single volume in a converter output directory and removes the rest
///
/// Selection order:
/// 1. No volume files: nothing is kept and nothing is deleted.
/// 2. The first descriptor (by name) whose text contains the marker token is
///    used. Its companion volume is renamed to `{identifier}_{marker}` (or
///    `{descriptor stem}_{marker}` without identifier). A missing companion
///    volume means nothing is kept; the other volumes are not considered.
/// 3. Without a marker descriptor, the largest volume is renamed to
///    `{identifier}_largest` (or `{stem}_largest`). Ties go to the first
///    volume in name order. A lone volume already named as this call would
///    name it is kept as it is. Without identifier that is any
///    `*_{marker}` or `*_largest` volume.
///
/// Once a volume is kept, every other entry of the directory is removed.
///
/// # Arguments
///
/// * `dir` - Converter output directory
/// * `identifier` - Optional name prefix for the retained file, whitespace runs become `_`
/// * `config` - Marker token and file suffixes
/// * `sink` - Receives one line per decision and per recoverable error
///
/// # Returns
///
/// The retained volume, or `None` when nothing could be kept
///
/// # Errors
///
/// Only when the directory itself cannot be read, or the marker token is empty.
pub fn select_volume(
    dir: &Path,
    identifier: Option<&str>,
    config: &SelectorConfig,
    sink: &mut dyn ProgressSink,
) -> Result<Option<Selection>> {
    let pattern = config.marker_pattern()?;
    let identifier = identifier.and_then(normalize_identifier);
    let listing = list_conversion_output(dir, config, sink)?;

    if listing.volumes.is_empty() {
        sink.warn(&format!("No NIfTI files created in {}", dir.display()));
        return Ok(None);
    }

    let kept = match find_marker_descriptor(&listing.descriptors, &pattern, sink) {
        Some(descriptor) => keep_marker_volume(dir, &descriptor, identifier.as_deref(), config, sink),
        None => keep_largest_volume(&listing.volumes, identifier.as_deref(), config, sink),
    };

    let Some((path, kind)) = kept else {
        sink.info("No final NIfTI produced.");
        return Ok(None);
    };

    let removed = remove_all_except(dir, &path, sink)?;
    for entry in &removed {
        sink.info(&format!("Removed {}", entry.display()));
    }
    sink.info(&format!("Cleanup complete. Final file: {}", path.display()));

    Ok(Some(Selection {
        path,
        kind,
        removed,
    }))
}

/// First descriptor whose text contains the marker; unreadable ones are skipped
fn find_marker_descriptor(
    descriptors: &[PathBuf],
    pattern: &Regex,
    sink: &mut dyn ProgressSink,
) -> Option<PathBuf> {
    for descriptor in descriptors {
        match fs::read(descriptor) {
            Ok(bytes) => {
                if pattern.is_match(&String::from_utf8_lossy(&bytes)) {
                    return Some(descriptor.clone());
                }
            }
            Err(e) => {
                sink.warn(&format!("Skipping unreadable {}: {}", descriptor.display(), e));
            }
        }
    }
    None
}

fn keep_marker_volume(
    dir: &Path,
    descriptor: &Path,
    identifier: Option<&str>,
    config: &SelectorConfig,
    sink: &mut dyn ProgressSink,
) -> Option<(PathBuf, SelectionKind)> {
    let descriptor_name = file_name(descriptor)?;
    let candidate = dir.join(config.companion_volume_name(descriptor_name));

    if !candidate.is_file() {
        sink.warn(&format!(
            "{} JSON found but corresponding NIfTI missing: {}",
            config.marker,
            candidate.display()
        ));
        return None;
    }

    let stem = config.descriptor_stem(descriptor_name);
    let target = dir.join(config.retained_name(identifier, stem, &config.marker));
    let path = rename_volume(&candidate, &target, sink)?;
    sink.info(&format!("Found {} file. Kept: {}", config.marker, path.display()));

    Some((path, SelectionKind::Marker))
}

fn keep_largest_volume(
    volumes: &[PathBuf],
    identifier: Option<&str>,
    config: &SelectorConfig,
    sink: &mut dyn ProgressSink,
) -> Option<(PathBuf, SelectionKind)> {
    if let [only] = volumes {
        if file_name(only).is_some_and(|name| config.is_retained_name(name, identifier)) {
            sink.info(&format!("Volume already selected. Kept: {}", only.display()));
            return Some((only.clone(), SelectionKind::AlreadySelected));
        }
    }

    let largest = largest_volume(volumes, sink)?;
    let stem = config.volume_stem(file_name(&largest)?);
    let target = largest.with_file_name(config.retained_name(identifier, stem, LARGEST_TAG));
    let path = rename_volume(&largest, &target, sink)?;
    sink.info(&format!(
        "No {} found, kept largest NIfTI: {}",
        config.marker,
        path.display()
    ));

    Some((path, SelectionKind::Largest))
}

/// First volume of maximal byte size in the given order
fn largest_volume(volumes: &[PathBuf], sink: &mut dyn ProgressSink) -> Option<PathBuf> {
    let mut largest: Option<(&PathBuf, u64)> = None;

    for volume in volumes {
        let size = match fs::metadata(volume) {
            Ok(meta) => meta.len(),
            Err(e) => {
                sink.warn(&format!("Could not read size of {}: {}", volume.display(), e));
                continue;
            }
        };
        if largest.map_or(true, |(_, best)| size > best) {
            largest = Some((volume, size));
        }
    }

    largest.map(|(volume, _)| volume.clone())
}

fn rename_volume(from: &Path, to: &Path, sink: &mut dyn ProgressSink) -> Option<PathBuf> {
    if from == to {
        return Some(to.to_path_buf());
    }
    match fs::rename(from, to) {
        Ok(()) => Some(to.to_path_buf()),
        Err(e) => {
            sink.warn(&format!(
                "Could not rename {} to {}: {}",
                from.display(),
                to.display(),
                e
            ));
            None
        }
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}
