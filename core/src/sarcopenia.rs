//! Rule-based sarcopenia assessment
//!
//! Reads the body composition table written by the segmenter and the patient
//! metadata table, computes the skeletal muscle index (muscle area over
//! height squared) and compares it with a sex-specific cutoff.

use crate::age::parse_patient_age;
use crate::error::{Result, SarcopipeError};
use crate::patient::METADATA_FILE;
use crate::progress::ProgressSink;
use crate::segment::SEGMENTATION_DIR;
use crate::types::Sex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// File name of the segmenter's body composition table
pub const BODY_COMPOSITION_FILE: &str = "body_composition_2d.csv";

/// File name of the assessment report inside the patient folder
pub const REPORT_FILE: &str = "report.csv";

/// Cell values treated as absent
const MISSING_MARKERS: [&str; 6] = ["", "NA", "N/A", "NaN", "nan", "null"];

/// Outcome of the sarcopenia rule for one patient
///
/// Serializes to one row of the report table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SarcopeniaAssessment {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "PatientName")]
    pub patient_name: String,
    /// Sex as recorded (`M`, `F`, ...)
    #[serde(rename = "Sex")]
    pub sex: String,
    #[serde(rename = "Age")]
    pub age: String,
    #[serde(rename = "Height_cm")]
    pub height_cm: f64,
    #[serde(rename = "Weight_kg")]
    pub weight_kg: String,
    /// Skeletal muscle index, rounded to two decimals
    #[serde(rename = "SMI")]
    pub smi: f64,
    #[serde(rename = "MuscleArea_mm2")]
    pub muscle_area: f64,
    #[serde(rename = "VfatArea_mm2")]
    pub vfat_area: f64,
    #[serde(rename = "SfatArea_mm2")]
    pub sfat_area: f64,
    #[serde(rename = "MfatArea_mm2")]
    pub mfat_area: f64,
    #[serde(rename = "Sarcopenia", serialize_with = "yes_no")]
    pub sarcopenia: bool,
}

impl SarcopeniaAssessment {
    /// Sex category used for the cutoff
    pub fn sex_category(&self) -> Sex {
        Sex::from_str(&self.sex)
    }
}

fn yes_no<S: serde::Serializer>(value: &bool, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "Yes" } else { "No" })
}

/// Skeletal muscle index: muscle area divided by height in metres squared
pub fn skeletal_muscle_index(muscle_area: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    muscle_area / (height_m * height_m)
}

/// Whether an index falls below the cutoff for the given sex
pub fn is_sarcopenic(smi: f64, sex: Sex) -> bool {
    smi < sex.smi_cutoff()
}

/// First data row of a CSV table, keyed by header, missing cells dropped
fn read_first_row(path: &Path) -> Result<HashMap<String, String>> {
    if !path.is_file() {
        return Err(SarcopipeError::MissingInput(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let record = match reader.records().next() {
        Some(record) => record?,
        None => return Err(SarcopipeError::EmptyTable(path.to_path_buf())),
    };

    Ok(headers
        .iter()
        .zip(record.iter())
        .map(|(header, value)| (header.trim().to_string(), value.trim().to_string()))
        .filter(|(_, value)| !MISSING_MARKERS.contains(&value.as_str()))
        .collect())
}

/// First present value among the given columns
fn first_present<'a>(row: &'a HashMap<String, String>, columns: &[&str]) -> Option<&'a str> {
    columns
        .iter()
        .find_map(|column| row.get(*column).map(String::as_str))
}

fn parse_number(row: &HashMap<String, String>, column: &str) -> Result<Option<f64>> {
    match row.get(column) {
        None => Ok(None),
        Some(value) => value.parse::<f64>().map(Some).map_err(|_| {
            SarcopipeError::InvalidValue(format!("{} is not a number: {:?}", column, value))
        }),
    }
}

/// Applies the sarcopenia rule to the tables of a patient folder
///
/// Reads `segmentation/body_composition_2d.csv` and `segmentation/metadata.csv`.
/// Values entered at intake (`Gender`, `Age`, `Height`, `Weight`) take
/// precedence over scanned ones (`PatientSex`, `PatientAge`, `TableHeight`,
/// `ScannedWeight_kg`).
///
/// # Errors
///
/// - [`SarcopipeError::MissingInput`] if either table is absent
/// - [`SarcopipeError::EmptyTable`] if either table has no data row
/// - [`SarcopipeError::MissingValue`] if height or muscle area is absent
/// - [`SarcopipeError::InvalidValue`] if a numeric value cannot be used
pub fn assess_patient(patient_folder: &Path) -> Result<SarcopeniaAssessment> {
    let seg_dir = patient_folder.join(SEGMENTATION_DIR);
    let body = read_first_row(&seg_dir.join(BODY_COMPOSITION_FILE))?;
    let meta = read_first_row(&seg_dir.join(METADATA_FILE))?;

    let patient_name = first_present(&meta, &["PatientName"]).unwrap_or("NA");
    let sex = first_present(&meta, &["Gender", "PatientSex"]).unwrap_or("NA");
    let age = match first_present(&meta, &["Age"]) {
        Some(age) => age.to_string(),
        None => first_present(&meta, &["PatientAge"])
            .and_then(parse_patient_age)
            .map(|years| years.to_string())
            .unwrap_or_else(|| "NA".to_string()),
    };
    let weight = first_present(&meta, &["Weight", "ScannedWeight_kg"]).unwrap_or("NA");

    let height_column = if meta.contains_key("Height") {
        "Height"
    } else {
        "TableHeight"
    };
    let height_cm = parse_number(&meta, height_column)?
        .ok_or_else(|| SarcopipeError::MissingValue(format!("height for {}", patient_name)))?;
    if height_cm <= 0.0 {
        return Err(SarcopipeError::InvalidValue(format!(
            "height must be positive, got {}",
            height_cm
        )));
    }

    let muscle_area = parse_number(&body, "muscle_area_mm2")?
        .ok_or_else(|| SarcopipeError::MissingValue("muscle_area_mm2".to_string()))?;
    let vfat_area = parse_number(&body, "vfat_area_mm2")?.unwrap_or(0.0);
    let sfat_area = parse_number(&body, "sfat_area_mm2")?.unwrap_or(0.0);
    let mfat_area = parse_number(&body, "mfat_area_mm2")?.unwrap_or(0.0);

    let smi = skeletal_muscle_index(muscle_area, height_cm);
    let sarcopenia = is_sarcopenic(smi, Sex::from_str(sex));

    let id = patient_folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(SarcopeniaAssessment {
        id,
        patient_name: patient_name.to_string(),
        sex: sex.to_string(),
        age,
        height_cm,
        weight_kg: weight.to_string(),
        smi: (smi * 100.0).round() / 100.0,
        muscle_area,
        vfat_area,
        sfat_area,
        mfat_area,
        sarcopenia,
    })
}

/// Writes an assessment as a one-row CSV report
pub fn write_report(assessment: &SarcopeniaAssessment, output_csv: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_csv)?;
    writer.serialize(assessment)?;
    writer.flush()?;
    Ok(())
}

/// Assesses a patient folder and saves the report
pub fn calculate_sarcopenia(
    patient_folder: &Path,
    output_csv: &Path,
    sink: &mut dyn ProgressSink,
) -> Result<SarcopeniaAssessment> {
    let assessment = assess_patient(patient_folder)?;
    write_report(&assessment, output_csv)?;
    sink.info(&format!(
        "Saved sarcopenia predictions to {}",
        output_csv.display()
    ));
    Ok(assessment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::MemorySink;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn patient_folder(body: &str, meta: &str) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let seg = temp_dir.path().join(SEGMENTATION_DIR);
        fs::create_dir_all(&seg).unwrap();
        fs::write(seg.join(BODY_COMPOSITION_FILE), body).unwrap();
        fs::write(seg.join(METADATA_FILE), meta).unwrap();
        temp_dir
    }

    #[rstest]
    #[case(Sex::Male, 52.3, true)]
    #[case(Sex::Male, 52.4, false)]
    #[case(Sex::Female, 38.4, true)]
    #[case(Sex::Female, 40.0, false)]
    #[case(Sex::Unspecified, 44.9, true)]
    #[case(Sex::Unspecified, 45.0, false)]
    fn test_is_sarcopenic(#[case] sex: Sex, #[case] smi: f64, #[case] expected: bool) {
        assert_eq!(is_sarcopenic(smi, sex), expected);
    }

    #[test]
    fn test_skeletal_muscle_index() {
        assert_eq!(skeletal_muscle_index(160.0, 200.0), 40.0);
    }

    #[test]
    fn test_user_values_take_precedence() {
        let dir = patient_folder(
            "muscle_area_mm2,vfat_area_mm2,sfat_area_mm2,mfat_area_mm2\n150,80,120,10\n",
            "ID,Age,Weight,Gender,Height,PatientSex,PatientAge,TableHeight\n\
             Jane,61,70,F,200,M,070Y,150\n",
        );

        let assessment = assess_patient(dir.path()).unwrap();

        assert_eq!(assessment.sex, "F");
        assert_eq!(assessment.age, "61");
        assert_eq!(assessment.weight_kg, "70");
        assert_eq!(assessment.height_cm, 200.0);
        assert_eq!(assessment.smi, 37.5);
        assert!(assessment.sarcopenia);
        assert_eq!(assessment.vfat_area, 80.0);
        assert_eq!(assessment.mfat_area, 10.0);
    }

    #[test]
    fn test_scanned_values_fill_gaps() {
        let dir = patient_folder(
            "muscle_area_mm2\n160\n",
            "ID,Age,Weight,Gender,Height,PatientSex,PatientAge,TableHeight,PatientName\n\
             p1,,,NA,,M,042Y,200,DOE^JOHN\n",
        );

        let assessment = assess_patient(dir.path()).unwrap();

        assert_eq!(assessment.patient_name, "DOE^JOHN");
        assert_eq!(assessment.sex, "M");
        assert_eq!(assessment.sex_category(), Sex::Male);
        assert_eq!(assessment.age, "42");
        assert_eq!(assessment.weight_kg, "NA");
        assert_eq!(assessment.smi, 40.0);
        assert!(assessment.sarcopenia);
        assert_eq!(assessment.vfat_area, 0.0);
    }

    #[test]
    fn test_unknown_sex_uses_neutral_cutoff() {
        let dir = patient_folder("muscle_area_mm2\n184\n", "Height\n200\n");

        let assessment = assess_patient(dir.path()).unwrap();

        assert_eq!(assessment.sex, "NA");
        assert_eq!(assessment.smi, 46.0);
        assert!(!assessment.sarcopenia);
    }

    #[test]
    fn test_missing_height_is_rejected() {
        let dir = patient_folder("muscle_area_mm2\n150\n", "ID,Gender,Height\np1,M,\n");
        let err = assess_patient(dir.path()).unwrap_err();
        assert!(matches!(err, SarcopipeError::MissingValue(_)));
    }

    #[test]
    fn test_non_numeric_height_is_rejected() {
        let dir = patient_folder("muscle_area_mm2\n150\n", "Height\ntall\n");
        let err = assess_patient(dir.path()).unwrap_err();
        assert!(matches!(err, SarcopipeError::InvalidValue(_)));
    }

    #[test]
    fn test_missing_table() {
        let temp_dir = TempDir::new().unwrap();
        let err = assess_patient(temp_dir.path()).unwrap_err();
        assert!(matches!(err, SarcopipeError::MissingInput(_)));
    }

    #[test]
    fn test_empty_table() {
        let dir = patient_folder("muscle_area_mm2\n", "Height\n170\n");
        let err = assess_patient(dir.path()).unwrap_err();
        assert!(matches!(err, SarcopipeError::EmptyTable(_)));
    }

    #[test]
    fn test_calculate_writes_report() {
        let dir = patient_folder(
            "muscle_area_mm2,vfat_area_mm2\n160,80.5\n",
            "ID,Gender,Height,Weight\np1,F,200,58\n",
        );
        let output = dir.path().join(REPORT_FILE);
        let mut sink = MemorySink::new();

        calculate_sarcopenia(dir.path(), &output, &mut sink).unwrap();

        let report = fs::read_to_string(&output).unwrap();
        let mut lines = report.lines();
        assert_eq!(
            lines.next().unwrap(),
            "ID,PatientName,Sex,Age,Height_cm,Weight_kg,SMI,MuscleArea_mm2,\
             VfatArea_mm2,SfatArea_mm2,MfatArea_mm2,Sarcopenia"
        );
        let row = lines.next().unwrap();
        assert!(row.ends_with(",No"), "unexpected row: {}", row);
        assert!(row.contains(",F,"));
        assert!(sink.contains("Saved sarcopenia predictions"));
    }
}
