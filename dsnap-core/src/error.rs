use std::fmt::{self, Display, Formatter};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapError {
    Config(String),
    Provider(String),
    Io(#[from] std::io::Error),
    Command(String),
    Dependency(String),
    Timeout(String),
    Serialization(String),
}

impl SnapError {
    /// Configuration problems abort the run before any cloud call is made.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SnapError::Config(_) | SnapError::Dependency(_))
    }
}

impl Display for SnapError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            SnapError::Config(s) => write!(f, "Configuration error: {}", s),
            SnapError::Provider(s) => write!(f, "Provider error: {}", s),
            SnapError::Io(e) => write!(f, "I/O error: {}", e),
            SnapError::Command(s) => write!(f, "Command failed: {}", s),
            SnapError::Dependency(s) => write!(f, "Dependency not found: {}", s),
            SnapError::Timeout(s) => write!(f, "Timed out: {}", s),
            SnapError::Serialization(s) => write!(f, "Serialization error: {}", s),
        }
    }
}

impl From<serde_yaml_ng::Error> for SnapError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        SnapError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SnapError {
    fn from(err: serde_json::Error) -> Self {
        SnapError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SnapError>;
