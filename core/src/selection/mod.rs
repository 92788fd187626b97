//! Conversion-output selection
//!
//! Picks the one NIfTI volume worth keeping from a converter output directory
//! (the series whose sidecar mentions the marker level, else the largest
//! volume), gives it a deterministic name and removes everything else.

mod cleanup;
mod listing;
mod selector;

pub use cleanup::remove_all_except;
pub use selector::select_volume;
