// Standard library imports
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// External crate imports
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// Internal imports
use crate::labels::{parse_label_pairs, LabelSet};
use crate::validator::ValidationReport;
use dsnap_core::error::{Result, SnapError};

pub const DEFAULT_RETENTION_DAYS: u32 = 7;
pub const DEFAULT_CREATED_BY: &str = "dsnap";
pub const DEFAULT_PROVIDER: &str = "gcloud";

/// How a snapshot is taken.
///
/// `Incremental` and `Full` only differ in the `backup-type` label; the cloud
/// stores every snapshot incrementally either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    #[default]
    Incremental,
    Full,
    Clone,
}

impl BackupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupType::Incremental => "incremental",
            BackupType::Full => "full",
            BackupType::Clone => "clone",
        }
    }

    /// Suffix used in generated snapshot names.
    pub fn name_tag(&self) -> &'static str {
        match self {
            BackupType::Clone => "clone",
            BackupType::Incremental | BackupType::Full => "backup",
        }
    }
}

impl fmt::Display for BackupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "incremental" => Ok(BackupType::Incremental),
            "full" => Ok(BackupType::Full),
            "clone" => Ok(BackupType::Clone),
            other => Err(format!(
                "Unsupported backup type '{}'. Must be one of: incremental, full, clone",
                other
            )),
        }
    }
}

/// Raw configuration as it appears in `dsnap.yaml` or on the command line.
///
/// Every field is optional so that a file and a set of CLI overrides can be
/// layered with [`ConfigFile::merge`] before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Inventory file, one target per line; `-` reads stdin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servers: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<String>,

    /// Extra `key=value` pairs appended after `labels`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,

    /// Kept as text so an unsupported value becomes a validation error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ConfigFile {
    /// Layer `overrides` on top of `self`; any value set in `overrides` wins.
    pub fn merge(self, overrides: ConfigFile) -> ConfigFile {
        ConfigFile {
            project: overrides.project.or(self.project),
            servers: overrides.servers.or(self.servers),
            labels: overrides.labels.or(self.labels),
            tags: overrides.tags.or(self.tags),
            retention_days: overrides.retention_days.or(self.retention_days),
            activity: overrides.activity.or(self.activity),
            backup_type: overrides.backup_type.or(self.backup_type),
            storage_location: overrides.storage_location.or(self.storage_location),
            created_by: overrides.created_by.or(self.created_by),
            dry_run: overrides.dry_run.or(self.dry_run),
            provider: overrides.provider.or(self.provider),
            command_timeout_secs: overrides.command_timeout_secs.or(self.command_timeout_secs),
        }
    }
}

/// The validated, immutable configuration bundle shared by every component.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapConfig {
    pub project: String,
    pub servers: Option<PathBuf>,
    pub labels: LabelSet,
    pub tags: LabelSet,
    pub retention_days: u32,
    pub activity: Option<String>,
    pub backup_type: BackupType,
    pub storage_location: Option<String>,
    pub created_by: String,
    pub dry_run: bool,
    pub provider: String,
    pub command_timeout_secs: Option<u64>,
}

impl SnapConfig {
    /// A configuration for `project` with every other setting at its default.
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            servers: None,
            labels: LabelSet::new(),
            tags: LabelSet::new(),
            retention_days: DEFAULT_RETENTION_DAYS,
            activity: None,
            backup_type: BackupType::default(),
            storage_location: None,
            created_by: DEFAULT_CREATED_BY.to_string(),
            dry_run: false,
            provider: DEFAULT_PROVIDER.to_string(),
            command_timeout_secs: None,
        }
    }

    /// Validate a merged [`ConfigFile`].
    ///
    /// Every problem is collected before failing so the user sees all of them
    /// at once. `require_inventory` is false for commands that never read the
    /// inventory, such as a prune-only run.
    pub fn resolve(raw: ConfigFile, require_inventory: bool) -> Result<Self> {
        let mut report = ValidationReport::default();

        let project = non_empty(raw.project);
        if project.is_none() {
            report.add_error("No project configured. Pass --project or set 'project'".into());
        }

        let servers = raw.servers.filter(|p| !p.as_os_str().is_empty());
        if require_inventory && servers.is_none() {
            report.add_error(
                "No inventory source configured. Pass --servers <FILE> or set 'servers'".into(),
            );
        }

        let backup_type = match non_empty(raw.backup_type) {
            Some(value) => value.parse().unwrap_or_else(|e: String| {
                report.add_error(e);
                BackupType::default()
            }),
            None => BackupType::default(),
        };

        let labels = parse_labels_field("labels", raw.labels, &mut report);
        let tags = parse_labels_field("tags", raw.tags, &mut report);

        let created_by = non_empty(raw.created_by).unwrap_or_else(|| DEFAULT_CREATED_BY.into());
        if created_by.contains(',') || created_by.contains('=') {
            report.add_error(format!(
                "created_by '{}' must not contain ',' or '='",
                created_by
            ));
        }

        if raw.retention_days == Some(0) {
            report.add_warning(
                "retention_days is 0: every managed snapshot older than now will be pruned".into(),
            );
        }

        if raw.command_timeout_secs == Some(0) {
            report.add_error("command_timeout_secs must be greater than zero".into());
        }

        if report.has_errors() {
            return Err(SnapError::Config(report.to_string().trim_end().to_string()));
        }
        for warning in &report.warnings {
            warn!("{}", warning);
        }

        let config = SnapConfig {
            project: project.unwrap_or_default(),
            servers,
            labels,
            tags,
            retention_days: raw.retention_days.unwrap_or(DEFAULT_RETENTION_DAYS),
            activity: non_empty(raw.activity),
            backup_type,
            storage_location: non_empty(raw.storage_location),
            created_by,
            dry_run: raw.dry_run.unwrap_or(false),
            provider: non_empty(raw.provider).unwrap_or_else(|| DEFAULT_PROVIDER.into()),
            command_timeout_secs: raw.command_timeout_secs,
        };
        debug!(?config, "Resolved configuration");
        Ok(config)
    }
}

fn parse_labels_field(
    field: &str,
    value: Option<String>,
    report: &mut ValidationReport,
) -> LabelSet {
    match value {
        Some(text) => parse_label_pairs(&text).unwrap_or_else(|e| {
            report.add_error(format!("{}: {}", field, e));
            LabelSet::new()
        }),
        None => LabelSet::new(),
    }
}
