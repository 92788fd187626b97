use std::fmt;

/// How the selector arrived at the retained volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(rename_all = "kebab-case"))]
pub enum SelectionKind {
    /// A descriptor mentioned the marker and its companion volume was kept
    Marker,
    /// No descriptor matched, the largest volume was kept
    Largest,
    /// The directory already held a single previously retained volume
    AlreadySelected,
}

impl SelectionKind {
    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            SelectionKind::Marker => "marker",
            SelectionKind::Largest => "largest",
            SelectionKind::AlreadySelected => "already-selected",
        }
    }
}

impl fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Patient sex as used by the skeletal muscle index rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum Sex {
    Male,
    Female,
    Unspecified,
}

impl Sex {
    /// SMI cutoff in cm²/m²; an index below it flags sarcopenia
    pub fn smi_cutoff(&self) -> f64 {
        match self {
            Sex::Male => 52.4,
            Sex::Female => 38.5,
            Sex::Unspecified => 45.0,
        }
    }

    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Unspecified => "unspecified",
        }
    }

    /// Parses sex from a DICOM `PatientSex` code or free text
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" => Sex::Male,
            "f" | "female" => Sex::Female,
            _ => Sex::Unspecified,
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}
