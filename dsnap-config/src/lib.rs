//! dsnap configuration library.
//!
//! A run is driven by one immutable [`SnapConfig`], resolved from an optional
//! `dsnap.yaml` file merged with command-line overrides and then validated.
//! Validation failures are the only fatal errors in a run.

pub mod config;
pub mod labels;
pub mod loader;
pub mod validator;

pub use config::{BackupType, ConfigFile, SnapConfig};
pub use labels::{parse_label_pairs, LabelSet};
pub use loader::ConfigLoader;
pub use validator::ValidationReport;
