//! Entry-scoped error types.
//!
//! Nothing in this module aborts a run: a `ParseError` skips one inventory
//! line and a `ResolveError` skips one entry. Both are logged and counted.

use dsnap_core::error::SnapError;
use thiserror::Error;

/// Errors that make a single inventory line unusable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected 1 to 4 comma-separated fields, found {0}")]
    FieldCount(usize),

    #[error("field {0} is empty")]
    EmptyField(usize),
}

/// Errors that stop one entry from being turned into disk references.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("neither instance nor disk found for '{name}' in project {project}")]
    NotFound { project: String, name: String },

    #[error("ambiguous disk location for '{}' (zones: {}), provide zone explicitly", .name, .zones.join(", "))]
    AmbiguousDisk { name: String, zones: Vec<String> },

    #[error("disk '{name}' not found in {project}/{zone}")]
    DiskMissing {
        project: String,
        zone: String,
        name: String,
    },

    #[error("instance '{name}' in {zone} has no attached disks to snapshot")]
    NoAttachedDisks { zone: String, name: String },

    #[error(transparent)]
    Provider(#[from] SnapError),
}
