// Retention sweep without taking new snapshots

use anyhow::Result;

use dsnap_config::SnapConfig;
use dsnap_core::{dsnap_success, dsnap_warning};
use dsnap_provider::CloudProvider;
use dsnap_snapshot::SnapshotRunner;

pub fn handle_prune(provider: &dyn CloudProvider, config: &SnapConfig) -> Result<()> {
    let summary = SnapshotRunner::new(provider, config).sweep();
    if summary.has_problems() {
        dsnap_warning!("Prune finished with problems: {}", summary);
    } else {
        dsnap_success!("Prune: {}", summary);
    }
    Ok(())
}
