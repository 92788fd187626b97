//! DICOM to NIfTI conversion
//!
//! Runs the converter once per series folder of a study, then reduces the
//! output directory to the single volume the rest of the pipeline works on.

use crate::error::Result;
use crate::progress::ProgressSink;
use crate::selection::select_volume;
use crate::tools::{describe, run_streaming, ToolCommand, DCM2NIIX};
use crate::types::{normalize_identifier, Selection, SelectorConfig};
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the folder holding converted volumes
pub const NIFTI_DIR: &str = "nifti";

/// Output directory for converted volumes
///
/// With an identifier: `{output_base}/{identifier}/nifti`, whitespace runs in
/// the identifier replaced by `_`. Without one: `output_base` when it is
/// already named `nifti`, else `{output_base}/nifti`.
///
/// # Example
///
/// ```
/// use sarcopipe_core::convert::nifti_output_dir;
/// use std::path::Path;
///
/// assert_eq!(
///     nifti_output_dir(Path::new("results"), Some("Jane Doe")),
///     Path::new("results/Jane_Doe/nifti")
/// );
/// assert_eq!(
///     nifti_output_dir(Path::new("out/nifti"), None),
///     Path::new("out/nifti")
/// );
/// ```
pub fn nifti_output_dir(output_base: &Path, identifier: Option<&str>) -> PathBuf {
    match identifier.and_then(normalize_identifier) {
        Some(id) => output_base.join(id).join(NIFTI_DIR),
        None if output_base.file_name().is_some_and(|n| n == NIFTI_DIR) => {
            output_base.to_path_buf()
        }
        None => output_base.join(NIFTI_DIR),
    }
}

/// Folders under `input` (itself included) that directly hold a visible file
///
/// Walks the tree recursively and returns the folders sorted by path. Folders
/// that cannot be read are skipped.
pub fn find_series_folders(input: &Path) -> Vec<PathBuf> {
    let mut folders = Vec::new();
    let mut pending = vec![input.to_path_buf()];

    while let Some(dir) = pending.pop() {
        match scan_folder(&dir, &mut pending) {
            Ok(true) => folders.push(dir),
            Ok(false) => {}
            Err(e) => debug!("Skipping unreadable folder {}: {}", dir.display(), e),
        }
    }

    folders.sort();
    folders
}

/// Queues subfolders of `dir` and reports whether it holds a visible file
fn scan_folder(dir: &Path, pending: &mut Vec<PathBuf>) -> io::Result<bool> {
    let mut has_files = false;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            pending.push(entry.path());
        } else if entry.path().is_file() && !entry.file_name().to_string_lossy().starts_with('.')
        {
            has_files = true;
        }
    }
    Ok(has_files)
}

/// Drives the DICOM to NIfTI converter
///
/// # Example
///
/// ```
/// use sarcopipe_core::convert::Converter;
/// use sarcopipe_core::SelectorConfig;
///
/// let converter = Converter::new("/usr/local/bin/dcm2niix")
///     .with_selector(SelectorConfig::default().with_marker("L4"));
///
/// assert_eq!(converter.selector.marker, "L4");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converter {
    /// Converter invocation
    pub tool: ToolCommand,

    /// Selection applied to the output directory
    pub selector: SelectorConfig,
}

impl Converter {
    /// Creates a converter for the given program
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self::with_tool(ToolCommand::new(program))
    }

    /// Creates a converter for a full tool invocation
    pub fn with_tool(tool: ToolCommand) -> Self {
        Self {
            tool,
            selector: SelectorConfig::default(),
        }
    }

    /// Creates a converter for the resolved `dcm2niix` binary
    pub fn from_env() -> Self {
        Self::with_tool(ToolCommand::resolve(&DCM2NIIX))
    }

    /// Builder: Set the selection applied after conversion
    pub fn with_selector(mut self, selector: SelectorConfig) -> Self {
        self.selector = selector;
        self
    }

    /// Converter command for one series folder
    ///
    /// Writes gzip-compressed volumes named `{protocol}_{series}` into `out_dir`.
    pub fn command_for(&self, folder: &Path, out_dir: &Path) -> std::process::Command {
        let mut command = self.tool.command();
        command
            .args(["-z", "y", "-o"])
            .arg(out_dir)
            .args(["-f", "%p_%s"])
            .arg(folder);
        command
    }

    /// Converts a study and keeps one volume
    ///
    /// # Arguments
    ///
    /// * `input` - Study folder; it and every subfolder holding files is converted
    /// * `output_base` - Base of the output directory, see [`nifti_output_dir`]
    /// * `identifier` - Optional patient identifier used for folder and file names
    /// * `sink` - Receives progress lines and converter output
    ///
    /// # Returns
    ///
    /// The retained volume, or `None` when the input is missing, holds no
    /// files, or the converter produced nothing usable
    ///
    /// # Errors
    ///
    /// Fails if the output directory cannot be created or read, or the
    /// converter cannot be started.
    pub fn convert(
        &self,
        input: &Path,
        output_base: &Path,
        identifier: Option<&str>,
        sink: &mut dyn ProgressSink,
    ) -> Result<Option<Selection>> {
        if !input.exists() {
            sink.warn(&format!("Input folder does not exist: {}", input.display()));
            return Ok(None);
        }

        let out_dir = nifti_output_dir(output_base, identifier);
        fs::create_dir_all(&out_dir)?;
        sink.info(&format!("Output NIfTI folder: {}", out_dir.display()));
        sink.info(&format!("Using converter: {}", self.tool.program.display()));

        let folders = find_series_folders(input);
        if folders.is_empty() {
            sink.warn(&format!(
                "No DICOM-containing subfolders found under: {}",
                input.display()
            ));
            return Ok(None);
        }

        for folder in &folders {
            sink.info(&format!("Processing: {}", folder.display()));
            let mut command = self.command_for(folder, &out_dir);
            sink.info(&format!("Running: {}", describe(&command)));

            let status = run_streaming(&mut command, sink)?;
            if status.success() {
                sink.info(&format!("Conversion finished for {}", folder.display()));
            } else {
                sink.warn(&format!(
                    "Converter exit status {} for {}",
                    status,
                    folder.display()
                ));
            }
        }

        select_volume(&out_dir, identifier, &self.selector, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::MemorySink;
    use crate::types::SelectionKind;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap().write_all(contents).unwrap();
    }

    #[test]
    fn test_nifti_output_dir() {
        let base = Path::new("/data/results");
        assert_eq!(
            nifti_output_dir(base, Some("patient42")),
            PathBuf::from("/data/results/patient42/nifti")
        );
        assert_eq!(
            nifti_output_dir(base, None),
            PathBuf::from("/data/results/nifti")
        );
        assert_eq!(
            nifti_output_dir(base, Some("  ")),
            PathBuf::from("/data/results/nifti")
        );
        assert_eq!(
            nifti_output_dir(Path::new("/data/nifti"), None),
            PathBuf::from("/data/nifti")
        );
    }

    #[test]
    fn test_find_series_folders() {
        let temp_dir = TempDir::new().unwrap();
        let study = temp_dir.path();
        write_file(&study.join("series2/IM0001.dcm"), b"x");
        write_file(&study.join("series1/IM0001.dcm"), b"x");
        write_file(&study.join("series1/nested/IM0002"), b"x");
        write_file(&study.join("hidden_only/.DS_Store"), b"x");
        fs::create_dir_all(study.join("empty")).unwrap();

        let folders = find_series_folders(study);

        assert_eq!(
            folders,
            vec![
                study.join("series1"),
                study.join("series1/nested"),
                study.join("series2"),
            ]
        );
    }

    #[test]
    fn test_find_series_folders_includes_root_with_files() {
        let temp_dir = TempDir::new().unwrap();
        write_file(&temp_dir.path().join("IM0001.dcm"), b"x");

        assert_eq!(
            find_series_folders(temp_dir.path()),
            vec![temp_dir.path().to_path_buf()]
        );
    }

    #[test]
    fn test_command_for() {
        let converter = Converter::new("dcm2niix");
        let command = converter.command_for(Path::new("study/s1"), Path::new("out/nifti"));
        assert_eq!(
            describe(&command),
            "dcm2niix -z y -o out/nifti -f %p_%s study/s1"
        );
    }

    #[test]
    fn test_missing_input_yields_none() {
        let temp_dir = TempDir::new().unwrap();
        let converter = Converter::new("/nonexistent/dcm2niix");
        let mut sink = MemorySink::new();

        let result = converter
            .convert(
                &temp_dir.path().join("missing"),
                temp_dir.path(),
                Some("p1"),
                &mut sink,
            )
            .unwrap();

        assert!(result.is_none());
        assert!(sink.contains("Input folder does not exist"));
        assert!(!temp_dir.path().join("p1").exists());
    }

    #[test]
    fn test_empty_study_yields_none() {
        let temp_dir = TempDir::new().unwrap();
        let study = temp_dir.path().join("study");
        fs::create_dir_all(study.join("empty")).unwrap();
        let converter = Converter::new("/nonexistent/dcm2niix");
        let mut sink = MemorySink::new();

        let result = converter
            .convert(&study, &temp_dir.path().join("out"), None, &mut sink)
            .unwrap();

        assert!(result.is_none());
        assert!(sink.contains("No DICOM-containing subfolders"));
    }

    #[test]
    fn test_unstartable_converter_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let study = temp_dir.path().join("study");
        write_file(&study.join("s1/IM0001.dcm"), b"x");
        let converter = Converter::new("/nonexistent/dcm2niix");
        let mut sink = MemorySink::new();

        let result = converter.convert(&study, &temp_dir.path().join("out"), None, &mut sink);

        assert!(result.is_err());
    }

    /// Stand-in converter: copies `desc` to `{folder}.json` and the `.dcm`
    /// files to `{folder}.nii.gz` in the output directory
    #[cfg(unix)]
    const FAKE_CONVERTER: &str = r#"
out="$4"
folder="$7"
name=$(basename "$folder")
echo "Convert 1 DICOM as $out/$name"
cat "$folder/desc" > "$out/$name.json"
cat "$folder"/*.dcm > "$out/$name.nii.gz"
"#;

    #[cfg(unix)]
    #[test]
    fn test_convert_keeps_marker_series() {
        let temp_dir = TempDir::new().unwrap();
        let study = temp_dir.path().join("study");
        write_file(&study.join("chest/desc"), b"axial chest");
        write_file(&study.join("chest/IM0001.dcm"), &[1u8; 500]);
        write_file(&study.join("abdomen/desc"), b"abdomen L3 level");
        write_file(&study.join("abdomen/IM0001.dcm"), &[3u8; 300]);
        let script = temp_dir.path().join("fake_dcm2niix.sh");
        write_file(&script, FAKE_CONVERTER.as_bytes());

        let converter = Converter::with_tool(
            ToolCommand::new("sh").with_leading_args([script.as_os_str()]),
        );
        let results = temp_dir.path().join("results");
        let mut sink = MemorySink::new();

        let selection = converter
            .convert(&study, &results, Some("patient 42"), &mut sink)
            .unwrap()
            .unwrap();

        let out_dir = results.join("patient_42/nifti");
        assert_eq!(selection.path, out_dir.join("patient_42_L3.nii.gz"));
        assert_eq!(selection.kind, SelectionKind::Marker);
        assert_eq!(fs::read(&selection.path).unwrap(), vec![3u8; 300]);
        assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 1);
        assert!(sink.contains("Convert 1 DICOM"));
        assert!(sink.contains("Conversion finished"));
    }

    #[cfg(unix)]
    #[test]
    fn test_convert_logs_failed_folder_and_continues() {
        let temp_dir = TempDir::new().unwrap();
        let study = temp_dir.path().join("study");
        write_file(&study.join("a/IM0001.dcm"), b"x");
        write_file(&study.join("b/IM0001.dcm"), b"x");

        let converter = Converter::with_tool(
            ToolCommand::new("sh").with_leading_args(["-c", "exit 2", "dcm2niix"]),
        );
        let mut sink = MemorySink::new();

        let selection = converter
            .convert(&study, &temp_dir.path().join("out"), None, &mut sink)
            .unwrap();

        assert!(selection.is_none());
        assert_eq!(
            sink.lines
                .iter()
                .filter(|l| l.contains("Converter exit status"))
                .count(),
            2
        );
        assert!(sink.contains("No NIfTI files created"));
    }
}
