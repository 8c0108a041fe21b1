//! Whole-run orchestration: every inventory line goes through
//! parse → resolve → name → create, then the retention sweep runs once.

// Standard library
use std::fmt;

// External crates
use chrono::{DateTime, Utc};
use tracing::{error, info, info_span, warn};

// Internal imports
use crate::create::{CreateOutcome, SnapshotExecutor};
use crate::error::ParseError;
use crate::inventory::{parse_inventory, InventoryLine};
use crate::naming::build_snapshot_spec;
use crate::resolve::{ResolvedTarget, Resolver};
use crate::retention::{RetentionSweeper, SweepSummary};
use dsnap_config::SnapConfig;
use dsnap_provider::CloudProvider;

/// Result of one inventory line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    ParseFailed(ParseError),
    ResolveFailed(String),
    Processed {
        target: ResolvedTarget,
        outcomes: Vec<CreateOutcome>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub entries: usize,
    pub parse_errors: usize,
    pub resolve_errors: usize,
    pub created: usize,
    pub create_failures: usize,
    pub dry_run: usize,
    pub sweep: Option<SweepSummary>,
}

impl RunSummary {
    fn record(&mut self, outcome: &EntryOutcome) {
        self.entries += 1;
        match outcome {
            EntryOutcome::ParseFailed(_) => self.parse_errors += 1,
            EntryOutcome::ResolveFailed(_) => self.resolve_errors += 1,
            EntryOutcome::Processed { outcomes, .. } => {
                for outcome in outcomes {
                    match outcome {
                        CreateOutcome::Created { .. } => self.created += 1,
                        CreateOutcome::DryRun { .. } => self.dry_run += 1,
                        CreateOutcome::Failed { .. } => self.create_failures += 1,
                    }
                }
            }
        }
    }

    /// Entries or disks that did not get a snapshot.
    pub fn skipped(&self) -> usize {
        self.parse_errors + self.resolve_errors + self.create_failures
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries: {} snapshots created, {} failed, {} unparseable, {} unresolved",
            self.entries, self.created, self.create_failures, self.parse_errors, self.resolve_errors
        )?;
        if self.dry_run > 0 {
            write!(f, ", {} dry-run", self.dry_run)?;
        }
        if let Some(sweep) = &self.sweep {
            write!(f, "; sweep: {}", sweep)?;
        }
        Ok(())
    }
}

type Clock = Box<dyn Fn() -> DateTime<Utc>>;

pub struct SnapshotRunner<'a> {
    provider: &'a dyn CloudProvider,
    config: &'a SnapConfig,
    clock: Clock,
}

impl<'a> SnapshotRunner<'a> {
    pub fn new(provider: &'a dyn CloudProvider, config: &'a SnapConfig) -> Self {
        Self {
            provider,
            config,
            clock: Box::new(Utc::now),
        }
    }

    /// Replace the wall clock, for deterministic names and cutoffs.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn process_line(&self, line: &InventoryLine) -> EntryOutcome {
        let _span = info_span!("entry", line = line.line_no, raw = %line.raw).entered();

        let descriptor = match &line.parsed {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!("Skipping line {}: {}", line.line_no, e);
                return EntryOutcome::ParseFailed(e.clone());
            }
        };

        let target = match Resolver::new(self.provider, self.config).resolve(descriptor) {
            Ok(target) => target,
            Err(e) => {
                error!("Skipping '{}': {}", descriptor.name(), e);
                return EntryOutcome::ResolveFailed(e.to_string());
            }
        };
        info!(
            "Resolved '{}' as {} in {}/{} ({} disk(s), retention {} days)",
            target.canonical_name,
            target.kind.as_str(),
            target.project,
            target.zone,
            target.disk_refs.len(),
            target.retention_days
        );

        let executor = SnapshotExecutor::new(self.provider, self.config.dry_run);
        let outcomes = target
            .disk_refs
            .iter()
            .map(|disk| {
                let spec = build_snapshot_spec(&target, disk, self.config, (self.clock)());
                executor.execute(&target, &spec)
            })
            .collect();

        EntryOutcome::Processed { target, outcomes }
    }

    /// Snapshot every entry of `inventory`, then sweep.
    pub fn run(&self, inventory: &str) -> RunSummary {
        let mut summary = RunSummary::default();
        for line in parse_inventory(inventory) {
            let outcome = self.process_line(&line);
            summary.record(&outcome);
        }
        summary.sweep = Some(self.sweep());
        summary
    }

    /// Retention sweep only.
    pub fn sweep(&self) -> SweepSummary {
        RetentionSweeper::new(self.provider, self.config).sweep((self.clock)())
    }

    /// Resolve every entry without creating or deleting anything.
    pub fn resolve_all(
        &self,
        inventory: &str,
    ) -> Vec<(usize, std::result::Result<ResolvedTarget, String>)> {
        let resolver = Resolver::new(self.provider, self.config);
        parse_inventory(inventory)
            .into_iter()
            .map(|line| {
                let _span =
                    info_span!("entry", line = line.line_no, raw = %line.raw).entered();
                let result = match &line.parsed {
                    Ok(descriptor) => resolver.resolve(descriptor).map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                (line.line_no, result)
            })
            .collect()
    }
}
