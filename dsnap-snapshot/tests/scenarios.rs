//! End-to-end runs against the in-memory provider.

use chrono::{DateTime, Duration, TimeZone, Utc};
use dsnap_config::{BackupType, SnapConfig};
use dsnap_provider::mock::MockProvider;
use dsnap_snapshot::{EntryOutcome, SnapshotRunner, TargetKind};
use regex::Regex;

const PROJECT: &str = "prod-project";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn disk_source(zone: &str, disk: &str) -> String {
    format!("https://www.googleapis.com/compute/v1/projects/{PROJECT}/zones/{zone}/disks/{disk}")
}

#[test]
fn instance_entry_snapshots_every_attached_disk() {
    let boot = disk_source("asia-south1-b", "web-01");
    let data = disk_source("asia-south1-b", "web-01-data");
    let provider = MockProvider::new().with_instance(
        PROJECT,
        "asia-south1-b",
        "web-01",
        &[boot.as_str(), data.as_str()],
    );
    let config = SnapConfig::new(PROJECT);

    let summary = SnapshotRunner::new(&provider, &config)
        .with_clock(now)
        .run("web-01,7\n");

    assert_eq!(summary.created, 2);
    let created = provider.created();
    assert_eq!(created[0].zone, "asia-south1-b");
    assert_eq!(created[0].snapshot_name, "web-01-01-06-2024-120000-backup");
    assert_eq!(
        created[1].snapshot_name,
        "web-01-web-01-data-01-06-2024-120000-backup"
    );
    assert_eq!(created[0].labels["retention-days"], "7");
    assert_eq!(created[0].labels["created-by"], "dsnap");
}

#[test]
fn direct_disk_entry_is_named_after_the_disk() {
    let provider = MockProvider::new().with_disk(PROJECT, "asia-south1-a", "my-disk");
    let config = SnapConfig::new(PROJECT);
    let runner = SnapshotRunner::new(&provider, &config).with_clock(now);

    let lines = dsnap_snapshot::parse_inventory("my-disk,7");
    match runner.process_line(&lines[0]) {
        EntryOutcome::Processed { target, .. } => {
            assert_eq!(target.kind, TargetKind::Disk);
            assert_eq!(target.disk_refs, vec!["my-disk"]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let pattern = Regex::new(r"^my-disk-\d{2}-\d{2}-\d{4}-\d{6}-backup$").unwrap();
    let created = provider.created();
    assert_eq!(created.len(), 1);
    assert!(pattern.is_match(&created[0].snapshot_name));
    assert!(created[0].snapshot_name.len() <= 63);
}

#[test]
fn clone_backup_type_changes_suffix_and_label() {
    let provider = MockProvider::new().with_disk(PROJECT, "asia-south1-a", "my-disk");
    let mut config = SnapConfig::new(PROJECT);
    config.backup_type = BackupType::Clone;

    SnapshotRunner::new(&provider, &config)
        .with_clock(now)
        .run("my-disk\n");

    let created = provider.created();
    assert!(created[0].snapshot_name.ends_with("-clone"));
    assert_eq!(created[0].labels["backup-type"], "clone");
}

#[test]
fn sweep_deletes_expired_backup_and_keeps_unmanaged_names() {
    let forty_days_ago = now() - Duration::days(40);
    let provider = MockProvider::new()
        .with_snapshot(
            PROJECT,
            "old-snap-backup",
            forty_days_ago,
            &[("created-by", "dsnap"), ("retention-days", "30")],
        )
        .with_snapshot(
            PROJECT,
            "old-snap-misc",
            forty_days_ago,
            &[("created-by", "dsnap"), ("retention-days", "30")],
        );
    let config = SnapConfig::new(PROJECT);

    let summary = SnapshotRunner::new(&provider, &config)
        .with_clock(now)
        .run("");

    assert_eq!(provider.deleted(), vec!["old-snap-backup"]);
    let sweep = summary.sweep.expect("sweep always runs");
    assert_eq!(sweep.deleted, vec!["old-snap-backup"]);
}

#[test]
fn instance_without_disks_is_skipped_and_the_run_continues() {
    let provider = MockProvider::new()
        .with_instance(PROJECT, "z1", "bare", &[])
        .with_disk(PROJECT, "z1", "vol");
    let config = SnapConfig::new(PROJECT);

    let summary = SnapshotRunner::new(&provider, &config)
        .with_clock(now)
        .run("bare\nvol\n");

    assert_eq!(summary.resolve_errors, 1);
    assert_eq!(summary.created, 1);
    assert_eq!(provider.created()[0].disk_name, "vol");
}

#[test]
fn ambiguous_instance_name_resolves_as_disk() {
    let z1 = disk_source("z1", "shared");
    let z2 = disk_source("z2", "shared");
    let provider = MockProvider::new()
        .with_instance(PROJECT, "z1", "shared", &[z1.as_str()])
        .with_instance(PROJECT, "z2", "shared", &[z2.as_str()])
        .with_disk(PROJECT, "z1", "shared");
    let config = SnapConfig::new(PROJECT);

    let summary = SnapshotRunner::new(&provider, &config)
        .with_clock(now)
        .run("shared\n");

    assert_eq!(summary.created, 1);
    let created = provider.created();
    assert_eq!(created[0].zone, "z1");
    assert!(created[0].description.contains("direct disk"));
}

#[test]
fn failures_are_isolated_per_disk_and_per_line() {
    let boot = disk_source("z1", "db-01");
    let logs = disk_source("z1", "db-01-logs");
    let provider = MockProvider::new()
        .with_instance(PROJECT, "z1", "db-01", &[boot.as_str(), logs.as_str()])
        .with_disk(PROJECT, "z1", "cache")
        .fail_create_for("db-01");
    let config = SnapConfig::new(PROJECT);

    let summary = SnapshotRunner::new(&provider, &config)
        .with_clock(now)
        .run("bogus,,line\ndb-01\ncache\n");

    assert_eq!(summary.parse_errors, 1);
    assert_eq!(summary.create_failures, 1);
    assert_eq!(summary.created, 2);
    let disks: Vec<String> = provider.created().into_iter().map(|r| r.disk_name).collect();
    assert_eq!(disks, vec!["db-01-logs", "cache"]);
}

#[test]
fn dry_run_touches_nothing() {
    let provider = MockProvider::new()
        .with_disk(PROJECT, "z1", "vol")
        .with_snapshot(
            PROJECT,
            "vol-old-backup",
            now() - Duration::days(100),
            &[("created-by", "dsnap")],
        );
    let mut config = SnapConfig::new(PROJECT);
    config.dry_run = true;

    let summary = SnapshotRunner::new(&provider, &config)
        .with_clock(now)
        .run("vol\n");

    assert_eq!(summary.dry_run, 1);
    assert!(provider.created().is_empty());
    assert!(provider.deleted().is_empty());
    assert_eq!(summary.sweep.unwrap().dry_run, vec!["vol-old-backup"]);
}

#[test]
fn sweep_runs_even_when_listing_fails() {
    let provider = MockProvider::new().with_disk(PROJECT, "z1", "vol").fail_listing();
    let config = SnapConfig::new(PROJECT);

    let summary = SnapshotRunner::new(&provider, &config)
        .with_clock(now)
        .run("vol\n");

    assert_eq!(summary.created, 1);
    assert!(summary.sweep.unwrap().listing_error.is_some());
}
