//! Core type definitions for the sarcopenia pipeline
//!
//! This module provides the fundamental types used throughout the sarcopipe library:
//! - [`SelectorConfig`]: Marker token and file suffixes used by the conversion-output selector
//! - [`Selection`]: The volume kept by the selector and what cleanup removed
//! - [`SelectionKind`]: How the retained volume was chosen
//! - [`Sex`]: Patient sex with its skeletal muscle index cutoff

mod config;
mod enums;
mod identifier;
mod selection;

pub use config::{
    SelectorConfig, DEFAULT_DESCRIPTOR_SUFFIX, DEFAULT_MARKER, DEFAULT_VOLUME_SUFFIX, LARGEST_TAG,
};
pub use enums::{SelectionKind, Sex};
pub use identifier::normalize_identifier;
pub use selection::Selection;
