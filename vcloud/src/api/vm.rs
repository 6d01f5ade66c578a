//! Virtual machines inside vApps

use std::fmt;

use serde::{Deserialize, Serialize};

use super::common::{
    mime, status_name, Link, Reference, Tasks, XmlBody, XMLNS_OVF, XMLNS_RASD, XMLNS_VCLOUD,
    XMLNS_VMW,
};
use super::error::ApiError;
use super::href::require_href;
use super::metadata::MetadataHolder;
use super::task::Task;
use super::vapp::{UndeployAction, UndeployVAppParams};
use super::Client;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "Vm")]
pub struct VmType {
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
    #[serde(rename = "@deployed", default)]
    pub deployed: Option<bool>,
    #[serde(rename = "Link", default)]
    pub links: Vec<Link>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Tasks", default)]
    pub tasks: Option<Tasks>,
    #[serde(rename = "NetworkConnectionSection", default)]
    pub network_connection_section: Option<NetworkConnectionSection>,
    #[serde(rename = "VAppScopedLocalId", default)]
    pub vapp_scoped_local_id: Option<String>,
    #[serde(rename = "DateCreated", default)]
    pub date_created: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConnectionSection {
    #[serde(rename = "@href", default)]
    pub href: Option<String>,
    #[serde(rename = "PrimaryNetworkConnectionIndex", default)]
    pub primary_network_connection_index: Option<i32>,
    #[serde(rename = "NetworkConnection", default)]
    pub connections: Vec<NetworkConnection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConnection {
    #[serde(rename = "@network", default)]
    pub network: String,
    #[serde(rename = "@needsCustomization", default)]
    pub needs_customization: Option<bool>,
    #[serde(rename = "NetworkConnectionIndex", default)]
    pub index: i32,
    #[serde(rename = "IpAddress", default)]
    pub ip_address: Option<String>,
    #[serde(rename = "ExternalIpAddress", default)]
    pub external_ip_address: Option<String>,
    #[serde(rename = "IsConnected", default)]
    pub is_connected: bool,
    #[serde(rename = "MACAddress", default)]
    pub mac_address: Option<String>,
    #[serde(rename = "IpAddressAllocationMode", default)]
    pub allocation_mode: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename = "DiskAttachOrDetachParams")]
struct DiskAttachOrDetachParams {
    #[serde(rename = "@xmlns")]
    xmlns: String,
    #[serde(rename = "Disk")]
    disk: Reference,
    #[serde(rename = "BusNumber", skip_serializing_if = "Option::is_none")]
    bus_number: Option<i32>,
    #[serde(rename = "UnitNumber", skip_serializing_if = "Option::is_none")]
    unit_number: Option<i32>,
}

impl XmlBody for DiskAttachOrDetachParams {
    fn xml_namespace(&self) -> &str {
        &self.xmlns
    }
}

#[derive(Debug, Serialize)]
#[serde(rename = "MediaInsertOrEjectParams")]
struct MediaInsertOrEjectParams {
    #[serde(rename = "@xmlns")]
    xmlns: String,
    #[serde(rename = "Media")]
    media: Reference,
}

impl XmlBody for MediaInsertOrEjectParams {
    fn xml_namespace(&self) -> &str {
        &self.xmlns
    }
}

/// Where an independent disk is plugged in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskSlot {
    pub bus_number: Option<i32>,
    pub unit_number: Option<i32>,
}

#[derive(Debug, Serialize)]
struct CoresPerSocket {
    #[serde(rename = "@ovf:required")]
    required: bool,
    #[serde(rename = "$text")]
    value: u32,
}

/// A virtual hardware item of the CPU or memory section
#[derive(Debug, Serialize)]
#[serde(rename = "ovf:Item")]
struct RasdItem {
    #[serde(rename = "@xmlns:ovf")]
    xmlns_ovf: String,
    #[serde(rename = "@xmlns:rasd")]
    xmlns_rasd: String,
    #[serde(rename = "@xmlns:vcloud")]
    xmlns_vcloud: String,
    #[serde(rename = "@xmlns:vmw")]
    xmlns_vmw: String,
    #[serde(rename = "@vcloud:href")]
    href: String,
    #[serde(rename = "@vcloud:type")]
    type_: String,
    #[serde(rename = "rasd:AllocationUnits")]
    allocation_units: String,
    #[serde(rename = "rasd:Description")]
    description: String,
    #[serde(rename = "rasd:ElementName")]
    element_name: String,
    #[serde(rename = "rasd:InstanceID")]
    instance_id: u32,
    #[serde(rename = "rasd:Reservation")]
    reservation: u32,
    #[serde(rename = "rasd:ResourceType")]
    resource_type: u32,
    #[serde(rename = "rasd:VirtualQuantity")]
    virtual_quantity: u64,
    #[serde(rename = "rasd:Weight")]
    weight: u32,
    #[serde(rename = "vmw:CoresPerSocket", skip_serializing_if = "Option::is_none")]
    cores_per_socket: Option<CoresPerSocket>,
}

impl RasdItem {
    fn new(href: String) -> Self {
        Self {
            xmlns_ovf: XMLNS_OVF.to_string(),
            xmlns_rasd: XMLNS_RASD.to_string(),
            xmlns_vcloud: XMLNS_VCLOUD.to_string(),
            xmlns_vmw: XMLNS_VMW.to_string(),
            href,
            type_: mime::RASD_ITEM.to_string(),
            allocation_units: String::new(),
            description: String::new(),
            element_name: String::new(),
            instance_id: 0,
            reservation: 0,
            resource_type: 0,
            virtual_quantity: 0,
            weight: 0,
            cores_per_socket: None,
        }
    }

    fn cpu(href: String, cpus: u32, cores_per_socket: u32) -> Self {
        Self {
            allocation_units: "hertz * 10^6".to_string(),
            description: "Number of Virtual CPUs".to_string(),
            element_name: format!("{} virtual CPU(s)", cpus),
            instance_id: 4,
            resource_type: 3,
            virtual_quantity: u64::from(cpus),
            cores_per_socket: Some(CoresPerSocket {
                required: false,
                value: cores_per_socket,
            }),
            ..Self::new(href)
        }
    }

    fn memory(href: String, size_mb: u64) -> Self {
        Self {
            allocation_units: "byte * 2^20".to_string(),
            description: "Memory Size".to_string(),
            element_name: format!("{} MB of memory", size_mb),
            instance_id: 5,
            resource_type: 4,
            virtual_quantity: size_mb,
            ..Self::new(href)
        }
    }
}

impl XmlBody for RasdItem {
    fn xml_namespace(&self) -> &str {
        &self.xmlns_ovf
    }
}

#[derive(Clone)]
pub struct Vm {
    pub vm: VmType,
    client: Client,
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm").field("vm", &self.vm).finish()
    }
}

impl Vm {
    pub fn new(client: Client, vm: VmType) -> Self {
        Self { vm, client }
    }

    pub fn name(&self) -> &str {
        &self.vm.name
    }

    pub fn href(&self) -> &str {
        &self.vm.href
    }

    pub fn status(&self) -> &'static str {
        status_name(self.vm.status.unwrap_or(0))
    }

    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        require_href(&self.vm.href, "VM")?;
        self.vm = self.client.get_xml(&self.vm.href).await?;
        Ok(())
    }

    fn action_href(&self, path: &str) -> Result<String, ApiError> {
        Ok(format!("{}{}", require_href(&self.vm.href, "VM")?, path))
    }

    async fn power_action(&self, action: &str) -> Result<Task, ApiError> {
        tracing::debug!("VM {}: {}", self.vm.name, action);
        let href = self.action_href(&format!("/power/action/{}", action))?;
        self.client.post_action(&href).await
    }

    pub async fn power_on(&self) -> Result<Task, ApiError> {
        self.power_action("powerOn").await
    }

    pub async fn power_off(&self) -> Result<Task, ApiError> {
        self.power_action("powerOff").await
    }

    pub async fn reboot(&self) -> Result<Task, ApiError> {
        self.power_action("reboot").await
    }

    pub async fn shutdown(&self) -> Result<Task, ApiError> {
        self.power_action("shutdown").await
    }

    pub async fn undeploy(&self, action: UndeployAction) -> Result<Task, ApiError> {
        let href = self.action_href("/action/undeploy")?;
        self.client
            .post_xml_task(&href, mime::UNDEPLOY_VAPP_PARAMS, &UndeployVAppParams::new(action))
            .await
    }

    async fn disk_action(&self, action: &str, disk_href: &str, slot: DiskSlot) -> Result<Task, ApiError> {
        let href = self.action_href(&format!("/disk/action/{}", action))?;
        let params = DiskAttachOrDetachParams {
            xmlns: XMLNS_VCLOUD.to_string(),
            disk: Reference::new(require_href(disk_href, "disk")?),
            bus_number: slot.bus_number,
            unit_number: slot.unit_number,
        };
        self.client
            .post_xml_task(&href, mime::DISK_ATTACH_OR_DETACH_PARAMS, &params)
            .await
    }

    pub async fn attach_disk(&self, disk_href: &str, slot: DiskSlot) -> Result<Task, ApiError> {
        self.disk_action("attach", disk_href, slot).await
    }

    pub async fn detach_disk(&self, disk_href: &str) -> Result<Task, ApiError> {
        self.disk_action("detach", disk_href, DiskSlot::default()).await
    }

    async fn media_action(&self, action: &str, media_href: &str) -> Result<Task, ApiError> {
        let href = self.action_href(&format!("/media/action/{}", action))?;
        let params = MediaInsertOrEjectParams {
            xmlns: XMLNS_VCLOUD.to_string(),
            media: Reference::new(require_href(media_href, "media")?),
        };
        self.client
            .post_xml_task(&href, mime::MEDIA_INSERT_OR_EJECT_PARAMS, &params)
            .await
    }

    pub async fn insert_media(&self, media_href: &str) -> Result<Task, ApiError> {
        self.media_action("insertMedia", media_href).await
    }

    pub async fn eject_media(&self, media_href: &str) -> Result<Task, ApiError> {
        self.media_action("ejectMedia", media_href).await
    }

    pub async fn change_cpu_count(&self, cpus: u32, cores_per_socket: u32) -> Result<Task, ApiError> {
        if cpus == 0 || cores_per_socket == 0 || cpus % cores_per_socket != 0 {
            return Err(ApiError::InvalidRequest(format!(
                "{} CPUs cannot be split into sockets of {} cores",
                cpus, cores_per_socket
            )));
        }
        let href = self.action_href("/virtualHardwareSection/cpu")?;
        let item = RasdItem::cpu(href.clone(), cpus, cores_per_socket);
        self.client.put_xml_task(&href, mime::RASD_ITEM, &item).await
    }

    pub async fn change_memory_size(&self, size_mb: u64) -> Result<Task, ApiError> {
        if size_mb == 0 {
            return Err(ApiError::InvalidRequest("memory size must be positive".to_string()));
        }
        let href = self.action_href("/virtualHardwareSection/memory")?;
        let item = RasdItem::memory(href.clone(), size_mb);
        self.client.put_xml_task(&href, mime::RASD_ITEM, &item).await
    }

    pub async fn get_network_connection_section(&self) -> Result<NetworkConnectionSection, ApiError> {
        let href = self.action_href("/networkConnectionSection/")?;
        self.client.get_xml(&href).await
    }

    /// Addresses of the VM's NICs, primary connection first
    pub fn ip_addresses(&self) -> Vec<String> {
        let Some(section) = self.vm.network_connection_section.as_ref() else {
            return Vec::new();
        };
        let mut connections: Vec<&NetworkConnection> = section.connections.iter().collect();
        let primary = section.primary_network_connection_index;
        connections.sort_by_key(|c| (Some(c.index) != primary, c.index));
        connections
            .into_iter()
            .filter_map(|c| c.ip_address.clone())
            .filter(|ip| !ip.is_empty())
            .collect()
    }
}

impl MetadataHolder for Vm {
    fn metadata_client(&self) -> &Client {
        &self.client
    }

    fn metadata_href(&self) -> &str {
        &self.vm.href
    }
}

impl Client {
    pub async fn get_vm_by_href(&self, href: &str) -> Result<Vm, ApiError> {
        let vm: VmType = self.get_xml(href).await?;
        Ok(Vm::new(self.clone(), vm))
    }
}

#[cfg(test)]
#[path = "./vm_test.rs"]
mod vm_test;
