use crate::{
    AttachedDisk, CloudProvider, CreateSnapshotRequest, InstanceDescription, LabelFilter,
    ManagedSnapshot,
};
use chrono::{DateTime, Utc};
use dsnap_config::labels::LabelSet;
use dsnap_core::error::{Result, SnapError};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone)]
struct MockInstance {
    project: String,
    zone: String,
    name: String,
    disk_sources: Vec<String>,
}

#[derive(Debug, Clone)]
struct MockDisk {
    project: String,
    zone: String,
    name: String,
}

#[derive(Debug, Clone)]
struct MockSnapshot {
    snapshot: ManagedSnapshot,
    labels: LabelSet,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<String>,
    created: Vec<CreateSnapshotRequest>,
    deleted: Vec<String>,
}

/// In-memory cloud used by tests. Inventory is set up with the `with_*`
/// builders; every call is recorded and can be inspected afterwards.
#[derive(Debug, Default)]
pub struct MockProvider {
    active_project: Option<String>,
    instances: Vec<MockInstance>,
    disks: Vec<MockDisk>,
    snapshots: Vec<MockSnapshot>,
    failing_creates: HashSet<String>,
    failing_deletes: HashSet<String>,
    fail_listing: bool,
    state: RefCell<MockState>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_active_project(mut self, project: &str) -> Self {
        self.active_project = Some(project.to_string());
        self
    }

    /// Add an instance whose attached disks are given by full `source` paths.
    pub fn with_instance(mut self, project: &str, zone: &str, name: &str, sources: &[&str]) -> Self {
        self.instances.push(MockInstance {
            project: project.to_string(),
            zone: zone.to_string(),
            name: name.to_string(),
            disk_sources: sources.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn with_disk(mut self, project: &str, zone: &str, name: &str) -> Self {
        self.disks.push(MockDisk {
            project: project.to_string(),
            zone: zone.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn with_snapshot(
        mut self,
        project: &str,
        name: &str,
        created: DateTime<Utc>,
        labels: &[(&str, &str)],
    ) -> Self {
        let labels: LabelSet = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.snapshots.push(MockSnapshot {
            snapshot: ManagedSnapshot {
                name: name.to_string(),
                creation_timestamp: created,
                retention_days_label: labels.get("retention-days").cloned(),
                project: project.to_string(),
            },
            labels,
        });
        self
    }

    /// Make `create_snapshot` fail for this disk.
    pub fn fail_create_for(mut self, disk_name: &str) -> Self {
        self.failing_creates.insert(disk_name.to_string());
        self
    }

    /// Make `delete_snapshot` fail for this snapshot.
    pub fn fail_delete_for(mut self, snapshot_name: &str) -> Self {
        self.failing_deletes.insert(snapshot_name.to_string());
        self
    }

    /// Make `list_snapshots` fail.
    pub fn fail_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn created(&self) -> Vec<CreateSnapshotRequest> {
        self.state.borrow().created.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.borrow().deleted.clone()
    }

    fn record(&self, call: String) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl CloudProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn active_project(&self) -> Result<Option<String>> {
        Ok(self.active_project.clone())
    }

    fn list_instance_zones_by_name(&self, project: &str, name: &str) -> Result<BTreeSet<String>> {
        self.record(format!("list_instance_zones {project} {name}"));
        Ok(self
            .instances
            .iter()
            .filter(|i| i.project == project && i.name == name)
            .map(|i| i.zone.clone())
            .collect())
    }

    fn describe_instance(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<Option<InstanceDescription>> {
        self.record(format!("describe_instance {project} {zone} {name}"));
        Ok(self
            .instances
            .iter()
            .find(|i| i.project == project && i.zone == zone && i.name == name)
            .map(|i| InstanceDescription {
                disks: i
                    .disk_sources
                    .iter()
                    .map(|source| AttachedDisk {
                        source: source.clone(),
                    })
                    .collect(),
            }))
    }

    fn list_disk_zones_by_name(&self, project: &str, name: &str) -> Result<BTreeSet<String>> {
        self.record(format!("list_disk_zones {project} {name}"));
        Ok(self
            .disks
            .iter()
            .filter(|d| d.project == project && d.name == name)
            .map(|d| d.zone.clone())
            .collect())
    }

    fn describe_disk(&self, project: &str, zone: &str, name: &str) -> Result<bool> {
        self.record(format!("describe_disk {project} {zone} {name}"));
        Ok(self
            .disks
            .iter()
            .any(|d| d.project == project && d.zone == zone && d.name == name))
    }

    fn create_snapshot(&self, request: &CreateSnapshotRequest) -> Result<()> {
        self.record(format!(
            "create_snapshot {} {}",
            request.disk_name, request.snapshot_name
        ));
        if self.failing_creates.contains(&request.disk_name) {
            return Err(SnapError::Provider(format!(
                "quota exceeded creating {}",
                request.snapshot_name
            )));
        }
        self.state.borrow_mut().created.push(request.clone());
        Ok(())
    }

    fn list_snapshots(&self, project: &str, filter: &LabelFilter) -> Result<Vec<ManagedSnapshot>> {
        self.record(format!("list_snapshots {project} {}={}", filter.key, filter.value));
        if self.fail_listing {
            return Err(SnapError::Provider("snapshot listing unavailable".into()));
        }
        Ok(self
            .snapshots
            .iter()
            .filter(|s| s.snapshot.project == project && filter.matches(&s.labels))
            .map(|s| s.snapshot.clone())
            .collect())
    }

    fn delete_snapshot(&self, project: &str, snapshot_name: &str) -> Result<()> {
        self.record(format!("delete_snapshot {project} {snapshot_name}"));
        if self.failing_deletes.contains(snapshot_name) {
            return Err(SnapError::Provider(format!(
                "snapshot {} is in use",
                snapshot_name
            )));
        }
        self.state
            .borrow_mut()
            .deleted
            .push(snapshot_name.to_string());
        Ok(())
    }
}
