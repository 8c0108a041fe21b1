//! Inventory parsing.
//!
//! An inventory is a text file with one target per line:
//!
//! ```text
//! # project,zone,name,retention
//! prod-project,asia-south1-b,web-01,30
//! # zone,name,retention
//! asia-south1-b,db-01,14
//! # project,zone,name
//! prod-project,asia-south1-b,db-02
//! # zone,name
//! asia-south1-b,cache-01
//! # name,retention
//! web-02,7
//! my-disk
//! ```
//!
//! The field count and whether the last field is all digits decide which
//! shape a line has. Only whole lines starting with `#` are comments.

// Standard library
use std::io::Read;
use std::path::Path;

// External crates
use tracing::warn;

// Internal imports
use crate::error::ParseError;
use dsnap_core::error::{Result, SnapError};

/// Which parts of a target a line spells out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetShape {
    FullySpecified {
        project: String,
        zone: String,
        name: String,
    },
    ZoneAndName {
        zone: String,
        name: String,
    },
    NameOnly {
        name: String,
    },
}

/// One parsed inventory line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    pub shape: TargetShape,
    /// Per-entry retention in days, overriding the global default
    pub retention: Option<u32>,
}

impl TargetDescriptor {
    pub fn project(&self) -> Option<&str> {
        match &self.shape {
            TargetShape::FullySpecified { project, .. } => Some(project.as_str()),
            _ => None,
        }
    }

    pub fn zone(&self) -> Option<&str> {
        match &self.shape {
            TargetShape::FullySpecified { zone, .. } | TargetShape::ZoneAndName { zone, .. } => {
                Some(zone.as_str())
            }
            TargetShape::NameOnly { .. } => None,
        }
    }

    pub fn name(&self) -> &str {
        match &self.shape {
            TargetShape::FullySpecified { name, .. }
            | TargetShape::ZoneAndName { name, .. }
            | TargetShape::NameOnly { name } => name,
        }
    }
}

/// A line of the inventory with its 1-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryLine {
    pub line_no: usize,
    pub raw: String,
    pub parsed: std::result::Result<TargetDescriptor, ParseError>,
}

fn is_all_digits(field: &str) -> bool {
    !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit())
}

/// A retention field that is not a non-negative integer is dropped so the
/// entry falls back to the global default.
fn parse_retention(field: &str) -> Option<u32> {
    let parsed = if is_all_digits(field) {
        field.parse::<u32>().ok()
    } else {
        None
    };
    if parsed.is_none() {
        warn!(
            "Ignoring invalid retention '{}', using the global default",
            field
        );
    }
    parsed
}

/// Parse one line. `Ok(None)` means blank or comment.
pub fn parse_line(line: &str) -> std::result::Result<Option<TargetDescriptor>, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut fields: Vec<&str> = line.split(',').map(str::trim).collect();
    while fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }

    if let Some(pos) = fields.iter().position(|f| f.is_empty()) {
        return Err(ParseError::EmptyField(pos + 1));
    }

    let descriptor = match fields.as_slice() {
        [project, zone, name, retention] => TargetDescriptor {
            shape: TargetShape::FullySpecified {
                project: project.to_string(),
                zone: zone.to_string(),
                name: name.to_string(),
            },
            retention: parse_retention(retention),
        },
        [zone, name, retention] if is_all_digits(retention) => TargetDescriptor {
            shape: TargetShape::ZoneAndName {
                zone: zone.to_string(),
                name: name.to_string(),
            },
            retention: parse_retention(retention),
        },
        [project, zone, name] => TargetDescriptor {
            shape: TargetShape::FullySpecified {
                project: project.to_string(),
                zone: zone.to_string(),
                name: name.to_string(),
            },
            retention: None,
        },
        [name, retention] if is_all_digits(retention) => TargetDescriptor {
            shape: TargetShape::NameOnly { name: name.to_string() },
            retention: parse_retention(retention),
        },
        [zone, name] => TargetDescriptor {
            shape: TargetShape::ZoneAndName {
                zone: zone.to_string(),
                name: name.to_string(),
            },
            retention: None,
        },
        [name] => TargetDescriptor {
            shape: TargetShape::NameOnly { name: name.to_string() },
            retention: None,
        },
        other => return Err(ParseError::FieldCount(other.len())),
    };

    Ok(Some(descriptor))
}

/// Parse a whole inventory, dropping blank and comment lines.
pub fn parse_inventory(text: &str) -> Vec<InventoryLine> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let parsed = parse_line(raw).transpose()?;
            Some(InventoryLine {
                line_no: idx + 1,
                raw: raw.trim().to_string(),
                parsed,
            })
        })
        .collect()
}

/// Read the inventory text from `path`, or from stdin when `path` is `-`.
pub fn load_inventory(path: &Path) -> Result<String> {
    if path.to_str() == Some("-") {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        return Ok(buffer);
    }
    std::fs::read_to_string(path).map_err(|e| {
        SnapError::Config(format!(
            "Cannot read inventory {}: {}",
            path.display(),
            e
        ))
    })
}
