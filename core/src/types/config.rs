use crate::error::{Result, SarcopipeError};
use regex::Regex;

/// Marker token identifying the L3 vertebral level in descriptor text
pub const DEFAULT_MARKER: &str = "L3";

/// Suffix written by the converter for compressed NIfTI volumes
pub const DEFAULT_VOLUME_SUFFIX: &str = ".nii.gz";

/// Suffix written by the converter for the per-series sidecar
pub const DEFAULT_DESCRIPTOR_SUFFIX: &str = ".json";

/// Name tag used when the volume was kept for being the largest
pub const LARGEST_TAG: &str = "largest";

/// Configuration for the conversion-output selector
///
/// Names the marker token searched for in descriptor files and the
/// suffixes that pair descriptors with volumes.
///
/// # Example
///
/// ```
/// use sarcopipe_core::SelectorConfig;
///
/// let config = SelectorConfig::default().with_marker("L4");
///
/// assert_eq!(config.marker, "L4");
/// assert_eq!(config.volume_suffix, ".nii.gz");
/// assert_eq!(config.descriptor_suffix, ".json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectorConfig {
    /// Case-insensitive token marking the clinically relevant level
    pub marker: String,

    /// Suffix of volume files, including the leading dot
    pub volume_suffix: String,

    /// Suffix of descriptor files, including the leading dot
    pub descriptor_suffix: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            volume_suffix: DEFAULT_VOLUME_SUFFIX.to_string(),
            descriptor_suffix: DEFAULT_DESCRIPTOR_SUFFIX.to_string(),
        }
    }
}

impl SelectorConfig {
    /// Builder: Set the marker token
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Builder: Set the volume suffix
    pub fn with_volume_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.volume_suffix = suffix.into();
        self
    }

    /// Builder: Set the descriptor suffix
    pub fn with_descriptor_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.descriptor_suffix = suffix.into();
        self
    }

    /// Compiles the marker into a case-insensitive whole-word pattern
    ///
    /// # Example
    ///
    /// ```
    /// use sarcopipe_core::SelectorConfig;
    ///
    /// let pattern = SelectorConfig::default().marker_pattern().unwrap();
    /// assert!(pattern.is_match("\"SeriesDescription\": \"abdomen l3 axial\""));
    /// assert!(!pattern.is_match("\"SeriesDescription\": \"L30\""));
    /// ```
    pub fn marker_pattern(&self) -> Result<Regex> {
        if self.marker.trim().is_empty() {
            return Err(SarcopipeError::InvalidValue(
                "marker token must not be empty".to_string(),
            ));
        }
        let pattern = format!(r"(?i)\b{}\b", regex::escape(&self.marker));
        Regex::new(&pattern)
            .map_err(|e| SarcopipeError::InvalidValue(format!("marker {:?}: {}", self.marker, e)))
    }

    /// Checks if a file name carries the volume suffix
    pub fn is_volume_name(&self, name: &str) -> bool {
        name.len() > self.volume_suffix.len() && name.ends_with(&self.volume_suffix)
    }

    /// Checks if a file name carries the descriptor suffix
    pub fn is_descriptor_name(&self, name: &str) -> bool {
        name.len() > self.descriptor_suffix.len() && name.ends_with(&self.descriptor_suffix)
    }

    /// Strips the volume suffix from a file name
    pub fn volume_stem<'a>(&self, name: &'a str) -> &'a str {
        name.strip_suffix(self.volume_suffix.as_str()).unwrap_or(name)
    }

    /// Strips the descriptor suffix from a file name
    pub fn descriptor_stem<'a>(&self, name: &'a str) -> &'a str {
        name.strip_suffix(self.descriptor_suffix.as_str())
            .unwrap_or(name)
    }

    /// Volume file name paired with a descriptor file name
    pub fn companion_volume_name(&self, descriptor_name: &str) -> String {
        format!(
            "{}{}",
            self.descriptor_stem(descriptor_name),
            self.volume_suffix
        )
    }

    /// Final name of a retained volume
    ///
    /// Uses the identifier when one is supplied, else the series stem,
    /// followed by `_{tag}` and the volume suffix.
    ///
    /// # Example
    ///
    /// ```
    /// use sarcopipe_core::SelectorConfig;
    ///
    /// let config = SelectorConfig::default();
    /// assert_eq!(
    ///     config.retained_name(Some("patient42"), "seriesB_L3", "L3"),
    ///     "patient42_L3.nii.gz"
    /// );
    /// assert_eq!(
    ///     config.retained_name(None, "seriesA", "largest"),
    ///     "seriesA_largest.nii.gz"
    /// );
    /// ```
    pub fn retained_name(&self, identifier: Option<&str>, stem: &str, tag: &str) -> String {
        format!(
            "{}_{}{}",
            identifier.unwrap_or(stem),
            tag,
            self.volume_suffix
        )
    }

    /// Checks if a volume name is what a selection with `identifier` would produce
    ///
    /// With an identifier the name must equal `{identifier}_{marker}{suffix}` or
    /// `{identifier}_largest{suffix}`. Without one, any `*_{marker}{suffix}` or
    /// `*_largest{suffix}` name matches, ignoring ASCII case in the tag.
    pub fn is_retained_name(&self, name: &str, identifier: Option<&str>) -> bool {
        if !self.is_volume_name(name) {
            return false;
        }
        let tags = [self.marker.as_str(), LARGEST_TAG];
        if let Some(identifier) = identifier {
            return tags
                .iter()
                .any(|tag| name == self.retained_name(Some(identifier), "", tag));
        }
        let stem = self.volume_stem(name);
        tags.iter().any(|tag| {
            stem.len() > tag.len() + 1
                && stem
                    .get(stem.len() - tag.len() - 1..)
                    .map(|tail| tail.starts_with('_') && tail[1..].eq_ignore_ascii_case(tag))
                    .unwrap_or(false)
        })
    }
}
