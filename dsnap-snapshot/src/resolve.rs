//! Turning an inventory entry into concrete disk references.
//!
//! A name is tried as a compute instance first and as a standalone disk
//! second. Zone discovery happens by listing when the entry leaves the zone
//! out.

// External crates
use tracing::{debug, info};

// Internal imports
use crate::error::ResolveError;
use crate::inventory::TargetDescriptor;
use dsnap_config::SnapConfig;
use dsnap_provider::CloudProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Instance,
    Disk,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Instance => "instance",
            TargetKind::Disk => "disk",
        }
    }
}

/// An entry pinned to a project and zone, with the disks to snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub project: String,
    pub zone: String,
    pub kind: TargetKind,
    pub canonical_name: String,
    /// Never empty; for a disk target this is `[canonical_name]`
    pub disk_refs: Vec<String>,
    /// Entry override or the global default
    pub retention_days: u32,
}

/// Last path segment of an attached disk `source`.
pub fn disk_name_from_source(source: &str) -> Option<&str> {
    let name = source.rsplit('/').next().unwrap_or(source).trim();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

pub struct Resolver<'a> {
    provider: &'a dyn CloudProvider,
    config: &'a SnapConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(provider: &'a dyn CloudProvider, config: &'a SnapConfig) -> Self {
        Self { provider, config }
    }

    pub fn resolve(&self, target: &TargetDescriptor) -> Result<ResolvedTarget, ResolveError> {
        let project = target.project().unwrap_or(self.config.project.as_str());
        let name = target.name();
        let retention_days = target.retention.unwrap_or(self.config.retention_days);

        let instance_zone = match target.zone() {
            Some(zone) => Some(zone.to_string()),
            None => {
                let zones = self.provider.list_instance_zones_by_name(project, name)?;
                match zones.len() {
                    0 => {
                        debug!("No instance named '{}' in project {}", name, project);
                        None
                    }
                    1 => zones.into_iter().next(),
                    _ => {
                        info!(
                            "Instance name '{}' exists in several zones ({}), trying it as a disk",
                            name,
                            zones.into_iter().collect::<Vec<_>>().join(", ")
                        );
                        None
                    }
                }
            }
        };

        if let Some(zone) = instance_zone {
            if let Some(description) = self.provider.describe_instance(project, &zone, name)? {
                let disk_refs: Vec<String> = description
                    .disks
                    .iter()
                    .filter_map(|disk| disk_name_from_source(&disk.source))
                    .map(str::to_string)
                    .collect();
                if disk_refs.is_empty() {
                    return Err(ResolveError::NoAttachedDisks {
                        zone,
                        name: name.to_string(),
                    });
                }
                return Ok(ResolvedTarget {
                    project: project.to_string(),
                    zone,
                    kind: TargetKind::Instance,
                    canonical_name: name.to_string(),
                    disk_refs,
                    retention_days,
                });
            }
            debug!("'{}' is not an instance in {}, trying it as a disk", name, zone);
        }

        let zone = match target.zone() {
            Some(zone) => zone.to_string(),
            None => {
                let zones = self.provider.list_disk_zones_by_name(project, name)?;
                let mut zones: Vec<String> = zones.into_iter().collect();
                match zones.len() {
                    0 => {
                        return Err(ResolveError::NotFound {
                            project: project.to_string(),
                            name: name.to_string(),
                        })
                    }
                    1 => zones.remove(0),
                    _ => {
                        return Err(ResolveError::AmbiguousDisk {
                            name: name.to_string(),
                            zones,
                        })
                    }
                }
            }
        };

        if !self.provider.describe_disk(project, &zone, name)? {
            return Err(ResolveError::DiskMissing {
                project: project.to_string(),
                zone,
                name: name.to_string(),
            });
        }

        Ok(ResolvedTarget {
            project: project.to_string(),
            zone,
            kind: TargetKind::Disk,
            canonical_name: name.to_string(),
            disk_refs: vec![name.to_string()],
            retention_days,
        })
    }
}
