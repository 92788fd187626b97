//! Muscle and fat segmentation step
//!
//! The segmentation tool reads the retained volume folder and writes
//! `body_composition_2d.csv` into the segmentation folder.

use crate::error::Result;
use crate::progress::ProgressSink;
use crate::tools::{describe, run_streaming, ToolCommand, SEGMENTER};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Name of the folder holding segmentation output and patient metadata
pub const SEGMENTATION_DIR: &str = "segmentation";

/// Drives the segmentation tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmenter {
    /// Segmenter invocation
    pub tool: ToolCommand,

    /// Working directory for the tool (model checkpoints are looked up relative to it)
    pub working_dir: Option<PathBuf>,
}

impl Segmenter {
    pub fn new(tool: ToolCommand) -> Self {
        Self {
            tool,
            working_dir: None,
        }
    }

    /// Creates a segmenter for the resolved segmentation binary
    pub fn from_env() -> Self {
        Self::new(ToolCommand::resolve(&SEGMENTER))
    }

    /// Builder: Run the tool from this directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Segmenter command for one patient
    pub fn command_for(&self, nifti_dir: &Path, segmentation_dir: &Path) -> Command {
        let mut command = self.tool.command();
        command
            .arg("--input")
            .arg(nifti_dir)
            .arg("--output")
            .arg(segmentation_dir)
            .args([
                "--checkpoint_type",
                "best",
                "--body_composition_type",
                "2D",
                "--overwrite",
                "True",
            ]);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }

    /// Runs the segmentation tool
    ///
    /// # Returns
    ///
    /// Whether the tool exited successfully. A failed run is reported to the
    /// sink, not returned as an error.
    ///
    /// # Errors
    ///
    /// Fails if the segmentation folder cannot be created or the tool cannot
    /// be started.
    pub fn run(
        &self,
        nifti_dir: &Path,
        segmentation_dir: &Path,
        sink: &mut dyn ProgressSink,
    ) -> Result<bool> {
        fs::create_dir_all(segmentation_dir)?;

        let mut command = self.command_for(nifti_dir, segmentation_dir);
        sink.info(&format!("Running: {}", describe(&command)));
        if let Some(dir) = &self.working_dir {
            sink.info(&format!("Working directory: {}", dir.display()));
        }

        let status = run_streaming(&mut command, sink)?;
        if !status.success() {
            sink.warn(&format!(
                "Command failed ({}): {}",
                status,
                describe(&command)
            ));
        }
        Ok(status.success())
    }
}
