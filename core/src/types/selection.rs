use super::SelectionKind;
use std::path::PathBuf;

/// Volume retained by the conversion-output selector
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Selection {
    /// Final path of the retained volume
    pub path: PathBuf,

    /// How the volume was chosen
    pub kind: SelectionKind,

    /// Entries deleted during cleanup
    pub removed: Vec<PathBuf>,
}

impl Selection {
    /// File name of the retained volume
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}
