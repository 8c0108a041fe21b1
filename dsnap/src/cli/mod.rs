// CLI argument parsing and definitions

use clap::{Parser, Subcommand};
use dsnap_config::ConfigFile;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "dsnap")]
#[command(about = "Snapshot cloud disks from an inventory and prune expired snapshots")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a dsnap.yaml configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Cloud project (defaults to the provider's active project)
    #[arg(short, long, global = true)]
    pub project: Option<String>,

    /// Inventory file, one target per line; `-` reads stdin
    #[arg(short, long, global = true)]
    pub servers: Option<PathBuf>,

    /// Labels for every snapshot, e.g. "env=prod,team=infra"
    #[arg(long, global = true)]
    pub labels: Option<String>,

    /// Extra labels appended after --labels
    #[arg(long, global = true)]
    pub tags: Option<String>,

    /// Days to keep snapshots when an entry sets no retention
    #[arg(short, long, global = true)]
    pub retention_days: Option<u32>,

    /// Free-form activity recorded as a label
    #[arg(long, global = true)]
    pub activity: Option<String>,

    /// incremental, full or clone
    #[arg(short, long, global = true)]
    pub backup_type: Option<String>,

    /// Multi-regional or regional snapshot storage location
    #[arg(long, global = true)]
    pub storage_location: Option<String>,

    /// Value of the created-by label used to find managed snapshots
    #[arg(long, global = true)]
    pub created_by: Option<String>,

    /// Cloud provider backend
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Kill any single cloud CLI call after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Print create and delete calls instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,
}

impl Args {
    /// Flags as a config layer to merge over the file.
    pub fn overrides(&self) -> ConfigFile {
        ConfigFile {
            project: self.project.clone(),
            servers: self.servers.clone(),
            labels: self.labels.clone(),
            tags: self.tags.clone(),
            retention_days: self.retention_days,
            activity: self.activity.clone(),
            backup_type: self.backup_type.clone(),
            storage_location: self.storage_location.clone(),
            created_by: self.created_by.clone(),
            dry_run: self.dry_run.then_some(true),
            provider: self.provider.clone(),
            command_timeout_secs: self.timeout,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Snapshot every inventory entry, then prune expired snapshots
    Run,
    /// Prune expired snapshots only
    Prune,
    /// Show what each inventory entry resolves to, without changing anything
    Resolve,
}

impl Command {
    pub fn needs_inventory(&self) -> bool {
        !matches!(self, Command::Prune)
    }
}
