pub mod report;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for sarcopipe
#[derive(Parser, Debug)]
#[command(name = "sarcopipe")]
#[command(about = "CT sarcopenia pipeline: DICOM conversion, L3 volume selection and SMI assessment")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Keep one volume in a converter output directory and remove the rest
    Select {
        /// Directory written by the converter
        #[arg(value_name = "DIRECTORY")]
        directory: PathBuf,

        /// Identifier used to name the retained volume
        #[arg(long)]
        id: Option<String>,

        /// Marker token searched for in descriptor files
        #[arg(short, long, default_value = "L3")]
        marker: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Convert a DICOM study and keep one volume
    Convert {
        /// Study folder
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Base folder for the NIfTI output
        #[arg(value_name = "OUTPUT_BASE")]
        output_base: PathBuf,

        /// Patient identifier used for folder and file names
        #[arg(long)]
        id: Option<String>,
    },

    /// Apply the sarcopenia rule to a patient folder
    Evaluate {
        /// Patient folder holding segmentation/body_composition_2d.csv and segmentation/metadata.csv
        #[arg(value_name = "PATIENT_DIR")]
        patient_dir: PathBuf,

        /// Report file (default: PATIENT_DIR/report.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run every step for one patient
    Run {
        /// Study folder
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Patient name
        #[arg(long)]
        name: String,

        /// Age in years
        #[arg(long)]
        age: Option<String>,

        /// Weight in kg
        #[arg(long)]
        weight: Option<String>,

        /// Gender (M/F)
        #[arg(long)]
        gender: Option<String>,

        /// Height in cm
        #[arg(long)]
        height: Option<String>,

        /// Folder holding one subfolder per patient
        #[arg(long, default_value = crate::pipeline::DEFAULT_RESULTS_DIR)]
        results_dir: PathBuf,

        /// Patient folders kept after the run
        #[arg(long, default_value_t = crate::retention::DEFAULT_MAX_PATIENTS)]
        keep: usize,

        /// Working directory for the segmentation tool
        #[arg(long)]
        segmenter_cwd: Option<PathBuf>,
    },

    /// Remove the oldest patient folders beyond a limit
    Prune {
        /// Folder holding one subfolder per patient
        #[arg(value_name = "RESULTS_DIR")]
        results_dir: PathBuf,

        /// Patient folders kept
        #[arg(long, default_value_t = crate::retention::DEFAULT_MAX_PATIENTS)]
        keep: usize,
    },
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
    /// Retained path only
    Paths,
}
