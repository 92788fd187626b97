use crate::sarcopenia::SarcopeniaAssessment;
use crate::types::Selection;
use std::fmt;

/// Text report for the conversion-output selector
pub struct SelectionReport<'a> {
    selection: Option<&'a Selection>,
}

impl<'a> SelectionReport<'a> {
    /// Creates a new selection report
    pub fn new(selection: Option<&'a Selection>) -> Self {
        Self { selection }
    }
}

impl<'a> fmt::Display for SelectionReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Volume Selection")?;
        writeln!(f, "================")?;
        writeln!(f)?;

        let Some(selection) = self.selection else {
            writeln!(f, "Retained: none")?;
            return Ok(());
        };

        writeln!(f, "Retained: {}", selection.path.display())?;
        writeln!(f, "Chosen by: {}", selection.kind)?;
        writeln!(f, "Removed:  {} entries", selection.removed.len())?;
        for entry in &selection.removed {
            writeln!(f, "  {}", entry.display())?;
        }

        Ok(())
    }
}

/// Text report for a sarcopenia assessment
pub struct AssessmentReport<'a> {
    assessment: &'a SarcopeniaAssessment,
}

impl<'a> AssessmentReport<'a> {
    /// Creates a new assessment report
    pub fn new(assessment: &'a SarcopeniaAssessment) -> Self {
        Self { assessment }
    }
}

impl<'a> fmt::Display for AssessmentReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = self.assessment;
        writeln!(f, "Sarcopenia Assessment")?;
        writeln!(f, "=====================")?;
        writeln!(f)?;
        writeln!(f, "ID:             {}", a.id)?;
        writeln!(f, "Patient:        {}", a.patient_name)?;
        writeln!(f, "Sex:            {}", a.sex)?;
        writeln!(f, "Age:            {}", a.age)?;
        writeln!(f, "Height (cm):    {}", a.height_cm)?;
        writeln!(f, "Weight (kg):    {}", a.weight_kg)?;
        writeln!(f)?;
        writeln!(f, "Muscle area:    {} mm2", a.muscle_area)?;
        writeln!(f, "Visceral fat:   {} mm2", a.vfat_area)?;
        writeln!(f, "Subcut. fat:    {} mm2", a.sfat_area)?;
        writeln!(f, "Intermusc. fat: {} mm2", a.mfat_area)?;
        writeln!(f)?;
        writeln!(
            f,
            "SMI:            {:.2} (cutoff {} for {})",
            a.smi,
            a.sex_category().smi_cutoff(),
            a.sex_category()
        )?;
        writeln!(
            f,
            "Sarcopenia:     {}",
            if a.sarcopenia { "Yes" } else { "No" }
        )?;

        Ok(())
    }
}
