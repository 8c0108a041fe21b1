//! Retention sweeping.
//!
//! Which snapshots to delete is decided from label metadata alone: a snapshot
//! is ours if it carries our `created-by` tag and its name ends in `backup` or
//! `clone`, and it is expired once it is older than its `retention-days` label
//! (or the global default when the label is missing or unreadable).

// Standard library
use std::fmt;

// External crates
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, info_span, warn};

// Internal imports
use dsnap_config::SnapConfig;
use dsnap_core::dsnap_println;
use dsnap_provider::{CloudProvider, LabelFilter, ManagedSnapshot};

/// Name suffixes the naming scheme produces.
const MANAGED_SUFFIXES: [&str; 2] = ["backup", "clone"];

pub fn is_managed_name(name: &str) -> bool {
    MANAGED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Retention for one snapshot: its label when that is a plain non-negative
/// integer, otherwise `default_days`.
pub fn effective_retention(snapshot: &ManagedSnapshot, default_days: u32) -> u32 {
    snapshot
        .retention_days_label
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default_days)
}

/// Strictly older than `now - days`. A snapshot exactly at the cutoff stays;
/// the strict comparison wins over an "age >= retention" reading.
///
/// A retention so long that the cutoff falls outside the representable date
/// range never expires.
pub fn is_expired(created: DateTime<Utc>, days: u32, now: DateTime<Utc>) -> bool {
    Duration::try_days(i64::from(days))
        .and_then(|window| now.checked_sub_signed(window))
        .is_some_and(|cutoff| created < cutoff)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub examined: usize,
    pub expired: usize,
    pub deleted: Vec<String>,
    pub failed: Vec<(String, String)>,
    /// Deletes printed instead of run
    pub dry_run: Vec<String>,
    /// Set when the snapshot listing itself failed
    pub listing_error: Option<String>,
}

impl SweepSummary {
    pub fn has_problems(&self) -> bool {
        self.listing_error.is_some() || !self.failed.is_empty()
    }
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(reason) = &self.listing_error {
            return write!(f, "snapshot listing failed: {}", reason);
        }
        write!(
            f,
            "{} managed snapshots, {} expired, {} deleted, {} delete failures",
            self.examined,
            self.expired,
            self.deleted.len(),
            self.failed.len()
        )?;
        if !self.dry_run.is_empty() {
            write!(f, ", {} dry-run", self.dry_run.len())?;
        }
        Ok(())
    }
}

pub struct RetentionSweeper<'a> {
    provider: &'a dyn CloudProvider,
    config: &'a SnapConfig,
}

impl<'a> RetentionSweeper<'a> {
    pub fn new(provider: &'a dyn CloudProvider, config: &'a SnapConfig) -> Self {
        Self { provider, config }
    }

    /// Snapshots that would be deleted at `now`, in listing order.
    pub fn expired_snapshots(
        &self,
        snapshots: Vec<ManagedSnapshot>,
        now: DateTime<Utc>,
    ) -> Vec<(ManagedSnapshot, u32)> {
        snapshots
            .into_iter()
            .filter(|s| is_managed_name(&s.name))
            .filter_map(|s| {
                let days = effective_retention(&s, self.config.retention_days);
                is_expired(s.creation_timestamp, days, now).then_some((s, days))
            })
            .collect()
    }

    /// List, filter and delete. Never fails: a listing error ends the sweep
    /// early and each delete failure is recorded in the summary.
    pub fn sweep(&self, now: DateTime<Utc>) -> SweepSummary {
        let _span = info_span!("sweep", created_by = %self.config.created_by).entered();
        let mut summary = SweepSummary::default();

        let filter = LabelFilter::created_by(&self.config.created_by);
        let snapshots = match self.provider.list_snapshots(&self.config.project, &filter) {
            Ok(snapshots) => snapshots,
            Err(e) => {
                error!("Could not list snapshots for retention sweep: {}", e);
                summary.listing_error = Some(e.to_string());
                return summary;
            }
        };
        summary.examined = snapshots.len();

        for (snapshot, days) in self.expired_snapshots(snapshots, now) {
            summary.expired += 1;
            let project = snapshot.project.as_str();

            if self.config.dry_run {
                let rendered = self.provider.render_delete(project, &snapshot.name);
                dsnap_println!("[dry-run] {}", rendered);
                summary.dry_run.push(snapshot.name);
                continue;
            }

            match self.provider.delete_snapshot(project, &snapshot.name) {
                Ok(()) => {
                    info!(
                        "Deleted snapshot {} (created {}, retention {} days)",
                        snapshot.name,
                        snapshot.creation_timestamp.to_rfc3339(),
                        days
                    );
                    summary.deleted.push(snapshot.name);
                }
                Err(e) => {
                    warn!("Failed to delete snapshot {}: {}", snapshot.name, e);
                    summary.failed.push((snapshot.name, e.to_string()));
                }
            }
        }

        summary
    }
}
