//! Snapshot names, descriptions and labels.

// External crates
use chrono::{DateTime, Utc};

// Internal imports
use crate::resolve::{ResolvedTarget, TargetKind};
use dsnap_config::labels::LabelSet;
use dsnap_config::SnapConfig;
use dsnap_provider::CreateSnapshotRequest;

/// Longest resource name the cloud accepts.
pub const MAX_NAME_LEN: usize = 63;

/// Returned when nothing usable is left of the input.
const FALLBACK_NAME: &str = "s";

/// Second-resolution UTC timestamp used in snapshot names.
pub fn snapshot_timestamp(now: DateTime<Utc>) -> String {
    now.format("%d-%m-%Y-%H%M%S").to_string()
}

/// Make `raw` a valid resource name: lowercase letters, digits and hyphens,
/// starting with a letter, not ending with a hyphen, at most 63 characters.
///
/// `sanitize(sanitize(x)) == sanitize(x)` for every input.
pub fn sanitize(raw: &str) -> String {
    let mapped: String = raw
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();

    let body = mapped.trim_matches('-');
    if body.is_empty() {
        return FALLBACK_NAME.to_string();
    }

    let mut name = if body.starts_with(|c: char| c.is_ascii_lowercase()) {
        body.to_string()
    } else {
        format!("s-{body}")
    };

    if name.len() > MAX_NAME_LEN {
        // Only ASCII is left, so byte truncation is safe.
        name.truncate(MAX_NAME_LEN);
        let kept = name.trim_end_matches('-').len();
        name.truncate(kept);
    }
    name
}

/// Activity label value: anything but ASCII letters and digits becomes `_`.
pub fn sanitize_activity(activity: &str) -> String {
    activity
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .to_lowercase()
}

/// One snapshot to take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSpec {
    pub name: String,
    pub disk_ref: String,
    pub description: String,
    pub labels: LabelSet,
    pub storage_location: Option<String>,
}

impl SnapshotSpec {
    pub fn to_request(&self, target: &ResolvedTarget) -> CreateSnapshotRequest {
        CreateSnapshotRequest {
            project: target.project.clone(),
            zone: target.zone.clone(),
            disk_name: self.disk_ref.clone(),
            snapshot_name: self.name.clone(),
            description: self.description.clone(),
            labels: self.labels.clone(),
            storage_location: self.storage_location.clone(),
        }
    }
}

/// Labels carried by every snapshot, in the order they are rendered.
pub fn build_labels(config: &SnapConfig, retention_days: u32) -> LabelSet {
    let mut labels = LabelSet::new();
    for (key, value) in config.labels.iter().chain(config.tags.iter()) {
        labels.insert(key.clone(), value.clone());
    }

    labels.insert("created-by".into(), config.created_by.clone());
    if let Some(activity) = &config.activity {
        labels.insert("activity".into(), sanitize_activity(activity));
    }
    labels.insert("backup-type".into(), config.backup_type.as_str().into());
    if let Some(location) = &config.storage_location {
        labels.insert("storage-type".into(), location.clone());
    }
    labels.insert("retention-days".into(), retention_days.to_string());
    labels
}

pub fn build_snapshot_spec(
    target: &ResolvedTarget,
    disk_ref: &str,
    config: &SnapConfig,
    now: DateTime<Utc>,
) -> SnapshotSpec {
    let timestamp = snapshot_timestamp(now);
    let tag = config.backup_type.name_tag();

    let raw_name = if disk_ref == target.canonical_name {
        format!("{}-{}-{}", target.canonical_name, timestamp, tag)
    } else {
        format!("{}-{}-{}-{}", target.canonical_name, disk_ref, timestamp, tag)
    };

    let source = match target.kind {
        TargetKind::Instance => format!("instance {}", target.canonical_name),
        TargetKind::Disk => "direct disk".to_string(),
    };
    let description = format!(
        "Snapshot of disk {} from {} taken at {} ({})",
        disk_ref, source, timestamp, config.backup_type
    );

    SnapshotSpec {
        name: sanitize(&raw_name),
        disk_ref: disk_ref.to_string(),
        description,
        labels: build_labels(config, target.retention_days),
        storage_location: config.storage_location.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dsnap_config::BackupType;
    use regex::Regex;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 9, 7, 3).unwrap()
    }

    fn target(kind: TargetKind, name: &str, disks: &[&str]) -> ResolvedTarget {
        ResolvedTarget {
            project: "p".into(),
            zone: "asia-south1-b".into(),
            kind,
            canonical_name: name.into(),
            disk_refs: disks.iter().map(|d| d.to_string()).collect(),
            retention_days: 7,
        }
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(snapshot_timestamp(now()), "05-03-2024-090703");
    }

    #[test]
    fn test_sanitize_basic() {
        assert_eq!(sanitize("Web_01"), "web-01");
        assert_eq!(sanitize("--my disk--"), "my-disk");
        assert_eq!(sanitize("01-data"), "s-01-data");
        assert_eq!(sanitize("___"), "s");
        assert_eq!(sanitize(""), "s");
    }

    #[test]
    fn test_sanitize_truncates_without_trailing_hyphen() {
        let raw = format!("{}-tail", "a".repeat(62));
        let name = sanitize(&raw);
        assert_eq!(name, "a".repeat(62));
        assert!(name.len() <= MAX_NAME_LEN);

        let long = "x".repeat(200);
        assert_eq!(sanitize(&long).len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_sanitize_is_idempotent_and_well_formed() {
        let pattern = Regex::new(r"^[a-z][a-z0-9-]*[a-z0-9]?$").unwrap();
        let inputs = [
            "Web_01",
            "9lives",
            "ÄÖÜ-disk",
            "a--b",
            "-",
            "UPPER CASE NAME WITH SPACES AND A VERY LONG TAIL THAT GOES ON AND ON AND ON",
            "1111111111111111111111111111111111111111111111111111111111111111111",
            "name-with-trailing-hyphen-at-position-sixty-three-xxxxxxxxxxxx-y",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {input:?}");
            assert!(once.len() <= MAX_NAME_LEN);
            assert!(
                once == "s" || (pattern.is_match(&once) && !once.ends_with('-')),
                "bad name {once:?} for {input:?}"
            );
        }
    }

    #[test]
    fn test_sanitize_activity() {
        assert_eq!(sanitize_activity("Nightly Run-2"), "nightly_run_2");
    }

    #[test]
    fn test_disk_target_name() {
        let config = SnapConfig::new("p");
        let t = target(TargetKind::Disk, "my-disk", &["my-disk"]);
        let spec = build_snapshot_spec(&t, "my-disk", &config, now());
        assert_eq!(spec.name, "my-disk-05-03-2024-090703-backup");
        assert!(spec.description.contains("direct disk"));
    }

    #[test]
    fn test_instance_disk_name_includes_disk() {
        let mut config = SnapConfig::new("p");
        config.backup_type = BackupType::Clone;
        let t = target(TargetKind::Instance, "web-01", &["web-01", "web-01-data"]);

        let boot = build_snapshot_spec(&t, "web-01", &config, now());
        assert_eq!(boot.name, "web-01-05-03-2024-090703-clone");

        let data = build_snapshot_spec(&t, "web-01-data", &config, now());
        assert_eq!(data.name, "web-01-web-01-data-05-03-2024-090703-clone");
        assert_eq!(data.labels["backup-type"], "clone");
        assert!(data.description.contains("instance web-01"));
    }

    #[test]
    fn test_label_order_and_optional_labels() {
        let mut config = SnapConfig::new("p");
        config.labels.insert("env".into(), "prod".into());
        config.tags.insert("team".into(), "infra".into());
        let t = target(TargetKind::Disk, "d", &["d"]);

        let spec = build_snapshot_spec(&t, "d", &config, now());
        let keys: Vec<&str> = spec.labels.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["env", "team", "created-by", "backup-type", "retention-days"]
        );
        assert_eq!(spec.labels["created-by"], "dsnap");
        assert_eq!(spec.labels["retention-days"], "7");

        config.activity = Some("Month End".into());
        config.storage_location = Some("asia-south1".into());
        let spec = build_snapshot_spec(&t, "d", &config, now());
        let keys: Vec<&str> = spec.labels.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "env",
                "team",
                "created-by",
                "activity",
                "backup-type",
                "storage-type",
                "retention-days"
            ]
        );
        assert_eq!(spec.labels["activity"], "month_end");
        assert_eq!(spec.storage_location.as_deref(), Some("asia-south1"));
    }

    #[test]
    fn test_to_request_carries_target_location() {
        let config = SnapConfig::new("p");
        let t = target(TargetKind::Disk, "d", &["d"]);
        let spec = build_snapshot_spec(&t, "d", &config, now());
        let request = spec.to_request(&t);
        assert_eq!(request.project, "p");
        assert_eq!(request.zone, "asia-south1-b");
        assert_eq!(request.disk_name, "d");
        assert_eq!(request.snapshot_name, spec.name);
    }
}
