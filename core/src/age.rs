//! DICOM age string parsing

/// Converts a DICOM `PatientAge` value into years
///
/// The value is a three-digit count followed by a unit: `Y` years, `M`
/// months, `W` weeks or `D` days. Non-year units are converted and rounded
/// to two decimals; an unknown unit leaves the count as is.
///
/// # Example
///
/// ```
/// use sarcopipe_core::parse_patient_age;
///
/// assert_eq!(parse_patient_age("042Y"), Some(42.0));
/// assert_eq!(parse_patient_age("006M"), Some(0.5));
/// assert_eq!(parse_patient_age("NA"), None);
/// ```
pub fn parse_patient_age(age: &str) -> Option<f64> {
    let age = age.trim();
    if age.is_empty() || age == "NA" {
        return None;
    }

    let count: u32 = age.chars().take(3).collect::<String>().parse().ok()?;
    let count = f64::from(count);
    let unit = age.chars().last()?.to_ascii_uppercase();

    let years = match unit {
        'Y' => count,
        'M' => round2(count / 12.0),
        'W' => round2(count / 52.0),
        'D' => round2(count / 365.0),
        _ => count,
    };
    Some(years)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
