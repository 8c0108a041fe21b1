// Resolve-only mode: show where each entry points

use anyhow::{Context, Result};
use std::path::Path;

use dsnap_config::SnapConfig;
use dsnap_core::error::SnapError;
use dsnap_core::{dsnap_info, dsnap_println, dsnap_warning};
use dsnap_provider::CloudProvider;
use dsnap_snapshot::{load_inventory, SnapshotRunner};

pub(crate) fn inventory_path(config: &SnapConfig) -> Result<&Path> {
    config.servers.as_deref().ok_or_else(|| {
        SnapError::Config("No inventory source configured. Pass --servers <FILE>".into()).into()
    })
}

pub fn handle_resolve(provider: &dyn CloudProvider, config: &SnapConfig) -> Result<()> {
    let path = inventory_path(config)?;
    let inventory = load_inventory(path)
        .with_context(|| format!("Failed to load inventory {}", path.display()))?;

    let results = SnapshotRunner::new(provider, config).resolve_all(&inventory);
    let unresolved = results.iter().filter(|(_, r)| r.is_err()).count();

    for (line_no, result) in &results {
        match result {
            Ok(target) => {
                dsnap_println!(
                    "line {}: {} {} in {}/{} -> {} (retention {} days)",
                    line_no,
                    target.kind.as_str(),
                    target.canonical_name,
                    target.project,
                    target.zone,
                    target.disk_refs.join(", "),
                    target.retention_days
                );
            }
            Err(reason) => {
                dsnap_warning!("line {}: {}", line_no, reason);
            }
        }
    }

    dsnap_info!(
        "{} entries, {} resolved, {} unresolved",
        results.len(),
        results.len() - unresolved,
        unresolved
    );
    Ok(())
}
