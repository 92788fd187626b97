pub mod age;
pub mod cli;
pub mod convert;
pub mod error;
pub mod patient;
pub mod pipeline;
pub mod progress;
pub mod retention;
pub mod sarcopenia;
pub mod segment;
pub mod selection;
pub mod tools;
pub mod types;

pub use age::parse_patient_age;
pub use cli::report::{AssessmentReport, SelectionReport};
pub use convert::Converter;
pub use error::{Result, SarcopipeError};
pub use patient::PatientDetails;
pub use pipeline::{run_pipeline, PipelineConfig, PipelineOutcome};
pub use progress::{LogSink, MemorySink, ProgressSink};
pub use sarcopenia::{calculate_sarcopenia, SarcopeniaAssessment};
pub use segment::Segmenter;
pub use selection::select_volume;
pub use types::*;
