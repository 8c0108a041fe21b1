// Snapshot run: every inventory entry, then the retention sweep

use anyhow::{Context, Result};
use tracing::info;

use dsnap_config::SnapConfig;
use dsnap_core::{dsnap_success, dsnap_warning};
use dsnap_provider::CloudProvider;
use dsnap_snapshot::{load_inventory, SnapshotRunner};

use super::resolve::inventory_path;

pub fn handle_run(provider: &dyn CloudProvider, config: &SnapConfig) -> Result<()> {
    let path = inventory_path(config)?;
    let inventory = load_inventory(path)
        .with_context(|| format!("Failed to load inventory {}", path.display()))?;

    info!(
        "Starting snapshot run for project {} (backup type {}, default retention {} days{})",
        config.project,
        config.backup_type,
        config.retention_days,
        if config.dry_run { ", dry-run" } else { "" }
    );

    let summary = SnapshotRunner::new(provider, config).run(&inventory);
    let sweep_problems = summary.sweep.as_ref().is_some_and(|s| s.has_problems());

    if summary.skipped() > 0 || sweep_problems {
        dsnap_warning!("Finished with problems: {}", summary);
    } else {
        dsnap_success!("{}", summary);
    }
    Ok(())
}
