//! Cloud provider abstraction library.
//!
//! The snapshot engine never talks to a cloud directly. It goes through
//! [`CloudProvider`], a small synchronous contract covering instance/disk
//! lookup and snapshot create/list/delete. Every call is a blocking round trip
//! that either returns a usable result or a definitive failure for that step;
//! retries and backoff are out of scope.

// Standard library
use std::collections::BTreeSet;

// External crates
use chrono::{DateTime, Utc};
use dsnap_core::error::{Result, SnapError};

// Internal imports
use dsnap_config::labels::{render_labels, LabelSet};

pub use context::ProviderContext;

pub mod context;

#[cfg(feature = "gcloud")]
pub mod gcloud;

// When the `test-helpers` feature is enabled, include the mock provider.
#[cfg(feature = "test-helpers")]
pub mod mock;

/// One disk attached to an instance, as reported by `describe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedDisk {
    /// Full resource path of the disk, e.g. `.../zones/z/disks/web-01`
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceDescription {
    pub disks: Vec<AttachedDisk>,
}

/// Everything needed for one create-snapshot call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSnapshotRequest {
    pub project: String,
    pub zone: String,
    pub disk_name: String,
    pub snapshot_name: String,
    pub description: String,
    pub labels: LabelSet,
    pub storage_location: Option<String>,
}

impl CreateSnapshotRequest {
    pub fn labels_arg(&self) -> String {
        render_labels(&self.labels)
    }
}

/// A snapshot carrying our bookkeeping label, as seen by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedSnapshot {
    pub name: String,
    pub creation_timestamp: DateTime<Utc>,
    /// Raw `retention-days` label; validated by the sweeper
    pub retention_days_label: Option<String>,
    pub project: String,
}

/// Select snapshots whose label `key` equals `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFilter {
    pub key: String,
    pub value: String,
}

impl LabelFilter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn created_by(tag: &str) -> Self {
        Self::new("created-by", tag)
    }

    pub fn matches(&self, labels: &LabelSet) -> bool {
        labels.get(&self.key).is_some_and(|v| v == &self.value)
    }
}

/// The contract the snapshot engine consumes from a cloud.
///
/// Lookups scoped to a `(project, zone)` pair take both; `list_*_zones_by_name`
/// search a whole project. "Not found" is a normal answer (`None`, `false`,
/// empty set), not an error.
pub trait CloudProvider {
    /// Get the name of the provider (e.g., "gcloud").
    fn name(&self) -> &'static str;

    /// Project the provider's own tooling is pointed at, if any.
    fn active_project(&self) -> Result<Option<String>> {
        Ok(None)
    }

    /// Zones containing an instance named exactly `name`.
    fn list_instance_zones_by_name(&self, project: &str, name: &str) -> Result<BTreeSet<String>>;

    fn describe_instance(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<Option<InstanceDescription>>;

    /// Zones containing a disk named exactly `name`.
    fn list_disk_zones_by_name(&self, project: &str, name: &str) -> Result<BTreeSet<String>>;

    fn describe_disk(&self, project: &str, zone: &str, name: &str) -> Result<bool>;

    fn create_snapshot(&self, request: &CreateSnapshotRequest) -> Result<()>;

    fn list_snapshots(&self, project: &str, filter: &LabelFilter) -> Result<Vec<ManagedSnapshot>>;

    fn delete_snapshot(&self, project: &str, snapshot_name: &str) -> Result<()>;

    /// Human-readable form of a create call, printed under dry-run.
    fn render_create(&self, request: &CreateSnapshotRequest) -> String {
        format!(
            "create snapshot {} of disk {} (project={}, zone={}, labels={})",
            request.snapshot_name,
            request.disk_name,
            request.project,
            request.zone,
            request.labels_arg()
        )
    }

    /// Human-readable form of a delete call, printed under dry-run.
    fn render_delete(&self, project: &str, snapshot_name: &str) -> String {
        format!("delete snapshot {} (project={})", snapshot_name, project)
    }
}

/// Creates a provider instance by name.
///
/// # Arguments
/// * `name` - Provider name from configuration (`gcloud`, or `mock` with `test-helpers`)
/// * `context` - Runtime options such as the per-call timeout
pub fn get_provider(name: &str, context: ProviderContext) -> Result<Box<dyn CloudProvider>> {
    #[cfg(feature = "test-helpers")]
    if name == "mock" {
        return Ok(Box::new(mock::MockProvider::new()));
    }

    #[cfg(not(feature = "gcloud"))]
    let _ = &context;

    match name {
        #[cfg(feature = "gcloud")]
        "gcloud" => Ok(Box::new(gcloud::GcloudProvider::new(context)?)),
        _ => Err(SnapError::Config(format!("Unknown provider: {name}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_provider_unknown() {
        let result = get_provider("azure", ProviderContext::default());
        match result {
            Ok(_) => panic!("unknown provider should not be created"),
            Err(error) => {
                assert!(error.is_fatal());
                assert!(error.to_string().contains("Unknown provider: azure"));
            }
        }
    }

    #[test]
    #[cfg(feature = "gcloud")]
    fn test_get_provider_gcloud() {
        match get_provider("gcloud", ProviderContext::default()) {
            Ok(provider) => assert_eq!(provider.name(), "gcloud"),
            Err(error) => {
                // If gcloud is not available, we should get a dependency error
                assert!(error.to_string().contains("Dependency not found"));
            }
        }
    }

    #[test]
    #[cfg(feature = "test-helpers")]
    fn test_get_provider_mock() {
        let provider = get_provider("mock", ProviderContext::default()).expect("mock provider");
        assert_eq!(provider.name(), "mock");
    }

    #[test]
    fn test_label_filter_matches() {
        let mut labels = LabelSet::new();
        labels.insert("created-by".into(), "dsnap".into());
        assert!(LabelFilter::created_by("dsnap").matches(&labels));
        assert!(!LabelFilter::created_by("other").matches(&labels));
        assert!(!LabelFilter::new("env", "prod").matches(&labels));
    }
}
