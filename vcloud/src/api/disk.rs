//! Independent disks

use std::fmt;

use serde::{Deserialize, Serialize};

use super::common::{find_link, mime, rel, Link, Reference, Tasks, XmlBody, XMLNS_VCLOUD};
use super::error::ApiError;
use super::href::require_href;
use super::metadata::MetadataHolder;
use super::task::Task;
use super::Client;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "Disk")]
pub struct DiskType {
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@type", default)]
    pub type_: Option<String>,
    #[serde(rename = "@status", default)]
    pub status: Option<i32>,
    #[serde(rename = "@sizeMb", default)]
    pub size_mb: Option<i64>,
    #[serde(rename = "@busType", default)]
    pub bus_type: Option<String>,
    #[serde(rename = "@busSubType", default)]
    pub bus_sub_type: Option<String>,
    #[serde(rename = "@iops", default)]
    pub iops: Option<i64>,
    #[serde(rename = "Link", default)]
    pub links: Vec<Link>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Tasks", default)]
    pub tasks: Option<Tasks>,
    #[serde(rename = "StorageProfile", default)]
    pub storage_profile: Option<Reference>,
    #[serde(rename = "Owner", default)]
    pub owner: Option<DiskOwner>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskOwner {
    #[serde(rename = "User", default)]
    pub user: Option<Reference>,
}

/// Settings of a disk to create or update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskSpec {
    pub name: String,
    pub size_mb: i64,
    pub description: Option<String>,
    /// Bus type code, e.g. `6` for SCSI
    pub bus_type: Option<String>,
    pub bus_sub_type: Option<String>,
    pub storage_profile: Option<Reference>,
}

impl DiskSpec {
    pub fn new(name: impl Into<String>, size_mb: i64) -> Self {
        Self {
            name: name.into(),
            size_mb,
            ..Default::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ApiError> {
        if self.name.is_empty() {
            return Err(ApiError::InvalidRequest("disk name is empty".to_string()));
        }
        if self.size_mb <= 0 {
            return Err(ApiError::InvalidRequest(format!(
                "disk size must be positive, got {} MB",
                self.size_mb
            )));
        }
        Ok(())
    }
}

/// The `Disk` element as sent to vCD
#[derive(Debug, Serialize)]
#[serde(rename = "Disk")]
pub(crate) struct DiskBody {
    #[serde(rename = "@xmlns", skip_serializing_if = "Option::is_none")]
    xmlns: Option<String>,
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@sizeMb")]
    size_mb: i64,
    #[serde(rename = "@busType", skip_serializing_if = "Option::is_none")]
    bus_type: Option<String>,
    #[serde(rename = "@busSubType", skip_serializing_if = "Option::is_none")]
    bus_sub_type: Option<String>,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "StorageProfile", skip_serializing_if = "Option::is_none")]
    storage_profile: Option<Reference>,
}

impl DiskBody {
    fn new(spec: &DiskSpec, xmlns: Option<String>) -> Self {
        Self {
            xmlns,
            name: spec.name.clone(),
            size_mb: spec.size_mb,
            bus_type: spec.bus_type.clone(),
            bus_sub_type: spec.bus_sub_type.clone(),
            description: spec.description.clone(),
            storage_profile: spec.storage_profile.clone(),
        }
    }
}

impl XmlBody for DiskBody {
    fn xml_namespace(&self) -> &str {
        self.xmlns.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename = "DiskCreateParams")]
pub(crate) struct DiskCreateParams {
    #[serde(rename = "@xmlns")]
    xmlns: String,
    #[serde(rename = "Disk")]
    disk: DiskBody,
}

impl DiskCreateParams {
    pub fn new(spec: &DiskSpec) -> Self {
        Self {
            xmlns: XMLNS_VCLOUD.to_string(),
            disk: DiskBody::new(spec, None),
        }
    }
}

impl XmlBody for DiskCreateParams {
    fn xml_namespace(&self) -> &str {
        &self.xmlns
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttachedVms {
    #[serde(rename = "VmReference", default)]
    pub vms: Vec<Reference>,
}

#[derive(Clone)]
pub struct Disk {
    pub disk: DiskType,
    client: Client,
}

impl fmt::Debug for Disk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disk").field("disk", &self.disk).finish()
    }
}

impl Disk {
    pub fn new(client: Client, disk: DiskType) -> Self {
        Self { disk, client }
    }

    pub fn name(&self) -> &str {
        &self.disk.name
    }

    pub fn href(&self) -> &str {
        &self.disk.href
    }

    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        require_href(&self.disk.href, "disk")?;
        self.disk = self.client.get_xml(&self.disk.href).await?;
        Ok(())
    }

    /// Renames, resizes or moves the disk
    pub async fn update(&self, spec: &DiskSpec) -> Result<Task, ApiError> {
        spec.validate()?;
        let href = require_href(&self.disk.href, "disk")?;
        let body = DiskBody::new(spec, Some(XMLNS_VCLOUD.to_string()));
        self.client.put_xml_task(href, mime::DISK, &body).await
    }

    pub async fn delete(&self) -> Result<Task, ApiError> {
        tracing::info!("Deleting disk {}", self.disk.name);
        self.client
            .delete_task(require_href(&self.disk.href, "disk")?)
            .await
    }

    /// VMs the disk is attached to
    pub async fn attached_vms(&self) -> Result<Vec<Reference>, ApiError> {
        let href = match find_link(&self.disk.links, rel::ATTACHED_VMS, None) {
            Some(link) => link.href.clone(),
            None => format!("{}/attachedVms", require_href(&self.disk.href, "disk")?),
        };
        let attached: AttachedVms = self.client.get_xml(&href).await?;
        Ok(attached.vms)
    }
}

impl MetadataHolder for Disk {
    fn metadata_client(&self) -> &Client {
        &self.client
    }

    fn metadata_href(&self) -> &str {
        &self.disk.href
    }
}
