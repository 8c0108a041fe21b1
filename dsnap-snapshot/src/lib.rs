//! Disk snapshot engine.
//!
//! Turns inventory lines into disk references, names and labels the
//! snapshots, creates them, and sweeps expired ones.

pub mod create;
pub mod error;
pub mod inventory;
pub mod naming;
pub mod resolve;
pub mod retention;
pub mod runner;

// Re-export key types
pub use create::{CreateOutcome, SnapshotExecutor};
pub use error::{ParseError, ResolveError};
pub use inventory::{load_inventory, parse_inventory, parse_line, TargetDescriptor, TargetShape};
pub use naming::{build_snapshot_spec, sanitize, SnapshotSpec};
pub use resolve::{ResolvedTarget, Resolver, TargetKind};
pub use retention::{RetentionSweeper, SweepSummary};
pub use runner::{EntryOutcome, RunSummary, SnapshotRunner};
