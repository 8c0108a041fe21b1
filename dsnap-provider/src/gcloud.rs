//! Google Cloud provider backed by the `gcloud` CLI.
//!
//! Every operation shells out to `gcloud compute ... --format=json` and parses
//! the JSON it prints. A non-zero exit from a `describe` means "not found";
//! from anything else it is a failure of that one call.

// Standard library
use std::collections::{BTreeSet, HashMap};

// External crates
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

// Internal imports
use crate::{
    AttachedDisk, CloudProvider, CreateSnapshotRequest, InstanceDescription, LabelFilter,
    ManagedSnapshot, ProviderContext,
};
use dsnap_core::command::{is_tool_installed, render_command, run_capture, CommandOutput};
use dsnap_core::error::{Result, SnapError};

const GCLOUD: &str = "gcloud";

#[derive(Debug, Deserialize)]
struct ZonedResource {
    name: String,
    #[serde(default)]
    zone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstanceResource {
    #[serde(default)]
    disks: Vec<DiskAttachment>,
}

#[derive(Debug, Deserialize)]
struct DiskAttachment {
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotResource {
    name: String,
    creation_timestamp: String,
    #[serde(default)]
    labels: HashMap<String, String>,
}

fn last_path_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn json_or_empty(stdout: &str) -> &str {
    if stdout.trim().is_empty() {
        "[]"
    } else {
        stdout
    }
}

/// Distinct zones of the resources in a `list` result named exactly `name`.
pub(crate) fn parse_zones(stdout: &str, name: &str) -> Result<BTreeSet<String>> {
    let resources: Vec<ZonedResource> = serde_json::from_str(json_or_empty(stdout))?;
    Ok(resources
        .into_iter()
        .filter(|r| r.name == name)
        .filter_map(|r| r.zone)
        .map(|zone| last_path_segment(&zone).to_string())
        .filter(|zone| !zone.is_empty())
        .collect())
}

pub(crate) fn parse_instance(stdout: &str) -> Result<InstanceDescription> {
    let instance: InstanceResource = serde_json::from_str(stdout)?;
    Ok(InstanceDescription {
        disks: instance
            .disks
            .into_iter()
            .filter_map(|d| d.source)
            .map(|source| AttachedDisk { source })
            .collect(),
    })
}

/// Snapshots from a `list` result; entries with an unreadable timestamp are
/// skipped so one odd snapshot cannot stall the whole sweep.
pub(crate) fn parse_snapshots(stdout: &str, project: &str) -> Result<Vec<ManagedSnapshot>> {
    let resources: Vec<SnapshotResource> = serde_json::from_str(json_or_empty(stdout))?;
    let mut snapshots = Vec::with_capacity(resources.len());

    for mut resource in resources {
        match DateTime::parse_from_rfc3339(&resource.creation_timestamp) {
            Ok(created) => snapshots.push(ManagedSnapshot {
                retention_days_label: resource.labels.remove("retention-days"),
                name: resource.name,
                creation_timestamp: created.with_timezone(&Utc),
                project: project.to_string(),
            }),
            Err(e) => warn!(
                snapshot = %resource.name,
                "Skipping snapshot with unreadable creationTimestamp '{}': {}",
                resource.creation_timestamp,
                e
            ),
        }
    }

    Ok(snapshots)
}

pub(crate) fn create_args(request: &CreateSnapshotRequest) -> Vec<String> {
    let mut args = vec![
        "compute".to_string(),
        "disks".to_string(),
        "snapshot".to_string(),
        request.disk_name.clone(),
        format!("--project={}", request.project),
        format!("--zone={}", request.zone),
        format!("--snapshot-names={}", request.snapshot_name),
        "--description".to_string(),
        request.description.clone(),
        format!("--labels={}", request.labels_arg()),
    ];
    if let Some(location) = &request.storage_location {
        args.push(format!("--storage-location={}", location));
    }
    args
}

pub(crate) fn delete_args(project: &str, snapshot_name: &str) -> Vec<String> {
    vec![
        "compute".to_string(),
        "snapshots".to_string(),
        "delete".to_string(),
        snapshot_name.to_string(),
        format!("--project={}", project),
        "--quiet".to_string(),
    ]
}

/// Cloud provider that drives the `gcloud` command-line tool.
#[derive(Debug, Clone)]
pub struct GcloudProvider {
    context: ProviderContext,
}

impl GcloudProvider {
    pub fn new(context: ProviderContext) -> Result<Self> {
        if !is_tool_installed(GCLOUD) {
            return Err(SnapError::Dependency(
                "gcloud CLI not found in PATH. Install the Google Cloud SDK".to_string(),
            ));
        }
        Ok(Self { context })
    }

    fn run(&self, mut args: Vec<String>) -> Result<CommandOutput> {
        if let Some(flag) = self.context.gcloud_verbosity() {
            args.push(flag.to_string());
        }
        run_capture(GCLOUD, &args, self.context.command_timeout_secs)
    }

    /// Run and require success; the error names the command and gcloud's message.
    fn run_checked(&self, args: Vec<String>) -> Result<String> {
        let rendered = render_command(GCLOUD, &args);
        let output = self.run(args)?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(SnapError::Provider(format!(
                "'{}' failed: {}",
                rendered,
                output.error_summary()
            )))
        }
    }

    fn list_zones(&self, resource: &str, project: &str, name: &str) -> Result<BTreeSet<String>> {
        let stdout = self.run_checked(vec![
            "compute".into(),
            resource.into(),
            "list".into(),
            format!("--project={}", project),
            format!("--filter=name={}", name),
            "--format=json".into(),
        ])?;
        parse_zones(&stdout, name)
    }
}

impl CloudProvider for GcloudProvider {
    fn name(&self) -> &'static str {
        "gcloud"
    }

    fn active_project(&self) -> Result<Option<String>> {
        let output = self.run(vec!["config".into(), "get-value".into(), "project".into()])?;
        let project = output.stdout.trim();
        if !output.success || project.is_empty() || project == "(unset)" {
            return Ok(None);
        }
        Ok(Some(project.to_string()))
    }

    fn list_instance_zones_by_name(&self, project: &str, name: &str) -> Result<BTreeSet<String>> {
        self.list_zones("instances", project, name)
    }

    fn describe_instance(
        &self,
        project: &str,
        zone: &str,
        name: &str,
    ) -> Result<Option<InstanceDescription>> {
        let output = self.run(vec![
            "compute".into(),
            "instances".into(),
            "describe".into(),
            name.into(),
            format!("--project={}", project),
            format!("--zone={}", zone),
            "--format=json".into(),
        ])?;
        if !output.success || output.stdout.trim().is_empty() {
            debug!(instance = name, zone, "describe: {}", output.error_summary());
            return Ok(None);
        }
        parse_instance(&output.stdout).map(Some)
    }

    fn list_disk_zones_by_name(&self, project: &str, name: &str) -> Result<BTreeSet<String>> {
        self.list_zones("disks", project, name)
    }

    fn describe_disk(&self, project: &str, zone: &str, name: &str) -> Result<bool> {
        let output = self.run(vec![
            "compute".into(),
            "disks".into(),
            "describe".into(),
            name.into(),
            format!("--project={}", project),
            format!("--zone={}", zone),
            "--format=value(name)".into(),
        ])?;
        if !output.success {
            debug!(disk = name, zone, "describe: {}", output.error_summary());
        }
        Ok(output.success && !output.stdout.trim().is_empty())
    }

    fn create_snapshot(&self, request: &CreateSnapshotRequest) -> Result<()> {
        self.run_checked(create_args(request)).map(|_| ())
    }

    fn list_snapshots(&self, project: &str, filter: &LabelFilter) -> Result<Vec<ManagedSnapshot>> {
        let stdout = self.run_checked(vec![
            "compute".into(),
            "snapshots".into(),
            "list".into(),
            format!("--project={}", project),
            format!("--filter=labels.{}={}", filter.key, filter.value),
            "--format=json".into(),
        ])?;
        parse_snapshots(&stdout, project)
    }

    fn delete_snapshot(&self, project: &str, snapshot_name: &str) -> Result<()> {
        self.run_checked(delete_args(project, snapshot_name))
            .map(|_| ())
    }

    fn render_create(&self, request: &CreateSnapshotRequest) -> String {
        render_command(GCLOUD, &create_args(request))
    }

    fn render_delete(&self, project: &str, snapshot_name: &str) -> String {
        render_command(GCLOUD, &delete_args(project, snapshot_name))
    }
}
