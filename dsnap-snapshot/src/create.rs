//! Snapshot creation.

// External crates
use tracing::{error, info};

// Internal imports
use crate::naming::SnapshotSpec;
use crate::resolve::ResolvedTarget;
use dsnap_core::dsnap_println;
use dsnap_provider::CloudProvider;

/// What happened to one disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created { name: String },
    /// The call was printed, not made
    DryRun { rendered: String },
    Failed { name: String, reason: String },
}

impl CreateOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, CreateOutcome::Failed { .. })
    }
}

pub struct SnapshotExecutor<'a> {
    provider: &'a dyn CloudProvider,
    dry_run: bool,
}

impl<'a> SnapshotExecutor<'a> {
    pub fn new(provider: &'a dyn CloudProvider, dry_run: bool) -> Self {
        Self { provider, dry_run }
    }

    /// Issue one create call. A failure is logged and returned as an outcome,
    /// never as an error, so the caller can move on to the next disk.
    pub fn execute(&self, target: &ResolvedTarget, spec: &SnapshotSpec) -> CreateOutcome {
        let request = spec.to_request(target);

        if self.dry_run {
            let rendered = self.provider.render_create(&request);
            dsnap_println!("[dry-run] {}", rendered);
            return CreateOutcome::DryRun { rendered };
        }

        match self.provider.create_snapshot(&request) {
            Ok(()) => {
                info!(
                    "Created snapshot {} of disk {} in {}/{}",
                    spec.name, spec.disk_ref, target.project, target.zone
                );
                CreateOutcome::Created {
                    name: spec.name.clone(),
                }
            }
            Err(e) => {
                error!(
                    "Failed to create snapshot {} of disk {}: {}",
                    spec.name, spec.disk_ref, e
                );
                CreateOutcome::Failed {
                    name: spec.name.clone(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Execute every spec in order, continuing past failures.
    pub fn execute_all(
        &self,
        target: &ResolvedTarget,
        specs: &[SnapshotSpec],
    ) -> Vec<CreateOutcome> {
        specs.iter().map(|spec| self.execute(target, spec)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::build_snapshot_spec;
    use crate::resolve::TargetKind;
    use chrono::{TimeZone, Utc};
    use dsnap_config::SnapConfig;
    use dsnap_provider::mock::MockProvider;

    fn setup() -> (ResolvedTarget, Vec<SnapshotSpec>) {
        let target = ResolvedTarget {
            project: "p".into(),
            zone: "z1".into(),
            kind: TargetKind::Instance,
            canonical_name: "web-01".into(),
            disk_refs: vec!["web-01".into(), "web-01-data".into()],
            retention_days: 7,
        };
        let config = SnapConfig::new("p");
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let specs = target
            .disk_refs
            .iter()
            .map(|disk| build_snapshot_spec(&target, disk, &config, now))
            .collect();
        (target, specs)
    }

    #[test]
    fn test_creates_one_snapshot_per_disk() {
        let (target, specs) = setup();
        let provider = MockProvider::new();
        let outcomes = SnapshotExecutor::new(&provider, false).execute_all(&target, &specs);

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| matches!(o, CreateOutcome::Created { .. })));
        let created = provider.created();
        assert_eq!(created[0].disk_name, "web-01");
        assert_eq!(created[1].disk_name, "web-01-data");
        assert_eq!(created[1].zone, "z1");
    }

    #[test]
    fn test_failure_on_one_disk_does_not_stop_the_next() {
        let (target, specs) = setup();
        let provider = MockProvider::new().fail_create_for("web-01");
        let outcomes = SnapshotExecutor::new(&provider, false).execute_all(&target, &specs);

        assert!(outcomes[0].is_failure());
        assert!(matches!(outcomes[1], CreateOutcome::Created { .. }));
        assert_eq!(provider.created().len(), 1);
    }

    #[test]
    fn test_dry_run_makes_no_calls() {
        let (target, specs) = setup();
        let provider = MockProvider::new();
        let outcomes = SnapshotExecutor::new(&provider, true).execute_all(&target, &specs);

        assert!(provider.calls().is_empty());
        match &outcomes[0] {
            CreateOutcome::DryRun { rendered } => {
                assert!(rendered.contains(&specs[0].name));
                assert!(rendered.contains("created-by=dsnap"));
            }
            other => panic!("expected dry run, got {other:?}"),
        }
    }
}
