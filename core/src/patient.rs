//! Patient details entered at intake

use crate::error::{Result, SarcopipeError};
use crate::types::normalize_identifier;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// File name of the patient metadata table inside the segmentation folder
pub const METADATA_FILE: &str = "metadata.csv";

/// Details supplied by the operator for one patient
///
/// Values are kept as entered; the rule evaluator decides how to read them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientDetails {
    pub name: String,
    pub age: Option<String>,
    pub weight: Option<String>,
    pub gender: Option<String>,
    pub height: Option<String>,
}

#[derive(Serialize)]
struct MetadataRow<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Age")]
    age: &'a str,
    #[serde(rename = "Weight")]
    weight: &'a str,
    #[serde(rename = "Gender")]
    gender: &'a str,
    #[serde(rename = "Height")]
    height: &'a str,
}

impl PatientDetails {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder: Set age in years
    pub fn with_age(mut self, age: impl Into<String>) -> Self {
        self.age = Some(age.into());
        self
    }

    /// Builder: Set weight in kg
    pub fn with_weight(mut self, weight: impl Into<String>) -> Self {
        self.weight = Some(weight.into());
        self
    }

    /// Builder: Set gender
    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    /// Builder: Set height in cm
    pub fn with_height(mut self, height: impl Into<String>) -> Self {
        self.height = Some(height.into());
        self
    }

    /// Rejects details without a patient name
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SarcopipeError::InvalidInput(
                "patient name is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Folder and file name prefix for this patient
    pub fn folder_name(&self) -> Result<String> {
        normalize_identifier(&self.name).ok_or_else(|| {
            SarcopipeError::InvalidInput("patient name is required".to_string())
        })
    }

    /// Writes the one-row metadata table read by the rule evaluator
    ///
    /// Columns: `ID,Age,Weight,Gender,Height`; absent values are left empty.
    /// Parent directories are created as needed.
    pub fn write_metadata(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path)?;
        writer.serialize(MetadataRow {
            id: self.name.trim(),
            age: field(&self.age),
            weight: field(&self.weight),
            gender: field(&self.gender),
            height: field(&self.height),
        })?;
        writer.flush()?;
        Ok(())
    }
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or("")
}
