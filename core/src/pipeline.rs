//! End-to-end processing of one patient
//!
//! intake metadata → conversion and volume selection → segmentation →
//! sarcopenia assessment → pruning of old results.

use crate::convert::{Converter, NIFTI_DIR};
use crate::error::Result;
use crate::patient::{PatientDetails, METADATA_FILE};
use crate::progress::ProgressSink;
use crate::retention::{enforce_patient_limit, DEFAULT_MAX_PATIENTS};
use crate::sarcopenia::{calculate_sarcopenia, SarcopeniaAssessment, REPORT_FILE};
use crate::segment::{Segmenter, SEGMENTATION_DIR};
use crate::types::Selection;
use std::fs;
use std::path::{Path, PathBuf};

/// Default folder for patient results, relative to the working directory
pub const DEFAULT_RESULTS_DIR: &str = "results";

/// Configuration for a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Folder holding one subfolder per patient
    pub results_dir: PathBuf,

    /// Patient folders kept after the run
    pub max_patients: usize,

    pub converter: Converter,
    pub segmenter: Segmenter,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            max_patients: DEFAULT_MAX_PATIENTS,
            converter: Converter::from_env(),
            segmenter: Segmenter::from_env(),
        }
    }
}

impl PipelineConfig {
    /// Builder: Set the results folder
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    /// Builder: Set how many patient folders are kept
    pub fn with_max_patients(mut self, max_patients: usize) -> Self {
        self.max_patients = max_patients;
        self
    }

    /// Builder: Set the converter
    pub fn with_converter(mut self, converter: Converter) -> Self {
        self.converter = converter;
        self
    }

    /// Builder: Set the segmenter
    pub fn with_segmenter(mut self, segmenter: Segmenter) -> Self {
        self.segmenter = segmenter;
        self
    }
}

/// What a pipeline run produced
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    /// Folder holding this patient's results
    pub patient_dir: PathBuf,

    /// Volume kept after conversion
    pub selection: Option<Selection>,

    /// Whether the segmenter ran and succeeded
    pub segmented: bool,

    /// Assessment, when the tables could be evaluated
    pub assessment: Option<SarcopeniaAssessment>,

    /// Patient folders removed by retention
    pub pruned: Vec<PathBuf>,
}

/// Runs every step for one patient
///
/// Step failures after intake are reported to the sink and the run moves on,
/// so a failed conversion still leaves the metadata and prunes old results.
///
/// # Errors
///
/// Fails if the patient details are invalid or the patient folder and its
/// metadata table cannot be written.
pub fn run_pipeline(
    input: &Path,
    details: &PatientDetails,
    config: &PipelineConfig,
    sink: &mut dyn ProgressSink,
) -> Result<PipelineOutcome> {
    details.validate()?;
    let folder_name = details.folder_name()?;
    let patient_dir = config.results_dir.join(&folder_name);
    let nifti_dir = patient_dir.join(NIFTI_DIR);
    let segmentation_dir = patient_dir.join(SEGMENTATION_DIR);

    fs::create_dir_all(&patient_dir)?;
    let metadata_file = segmentation_dir.join(METADATA_FILE);
    details.write_metadata(&metadata_file)?;
    sink.info(&format!("Saved patient metadata: {}", metadata_file.display()));

    let selection = match config.converter.convert(
        input,
        &config.results_dir,
        Some(&folder_name),
        sink,
    ) {
        Ok(selection) => selection,
        Err(e) => {
            sink.warn(&format!("Conversion failed: {}", e));
            None
        }
    };

    let segmented = if selection.is_some() {
        match config.segmenter.run(&nifti_dir, &segmentation_dir, sink) {
            Ok(success) => success,
            Err(e) => {
                sink.warn(&format!("Segmentation failed: {}", e));
                false
            }
        }
    } else {
        sink.warn("Skipping segmentation: no volume retained");
        false
    };

    let report_file = patient_dir.join(REPORT_FILE);
    let assessment = match calculate_sarcopenia(&patient_dir, &report_file, sink) {
        Ok(assessment) => Some(assessment),
        Err(e) => {
            sink.warn(&format!("Sarcopenia assessment failed: {}", e));
            None
        }
    };

    sink.info("Pipeline finished!");

    let pruned = match enforce_patient_limit(&config.results_dir, config.max_patients, sink) {
        Ok(pruned) => pruned,
        Err(e) => {
            sink.warn(&format!("Could not prune results: {}", e));
            Vec::new()
        }
    };

    Ok(PipelineOutcome {
        patient_dir,
        selection,
        segmented,
        assessment,
        pruned,
    })
}
