//! Virtual data centers and the vApps, disks and gateways they hold

use std::fmt;

use serde::{Deserialize, Serialize};

use super::common::{find_link, mime, rel, Link, Reference, Tasks, XmlBody, XMLNS_OVF, XMLNS_VCLOUD};
use super::disk::{Disk, DiskCreateParams, DiskSpec, DiskType};
use super::edge_gateway::EdgeGateway;
use super::error::ApiError;
use super::filter::{FilterDef, FilterKey, QueryItem};
use super::href::{extract_uuid, require_href, same_id};
use super::lookup::{get_entity_by_name_or_id, unique_by_name};
use super::metadata::MetadataHolder;
use super::query::{
    escape_filter_value, Query, QueryDiskRecord, QueryEdgeGatewayRecord, QueryResultRecords,
    QueryType, QueryVmRecord,
};
use super::task::wait_embedded;
use super::vapp::{VApp, VAppType};
use super::Client;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "Vdc")]
pub struct VdcType {
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
    #[serde(rename = "Link", default)]
    pub links: Vec<Link>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Tasks", default)]
    pub tasks: Option<Tasks>,
    #[serde(rename = "AllocationModel", default)]
    pub allocation_model: Option<String>,
    #[serde(rename = "ResourceEntities", default)]
    pub resource_entities: Option<ResourceEntities>,
    #[serde(rename = "AvailableNetworks", default)]
    pub available_networks: Option<AvailableNetworks>,
    #[serde(rename = "IsEnabled", default)]
    pub is_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceEntities {
    #[serde(rename = "ResourceEntity", default)]
    pub entities: Vec<Reference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailableNetworks {
    #[serde(rename = "Network", default)]
    pub networks: Vec<Reference>,
}

#[derive(Debug, Serialize)]
#[serde(rename = "ComposeVAppParams")]
struct ComposeVAppParams {
    #[serde(rename = "@xmlns")]
    xmlns: String,
    #[serde(rename = "@xmlns:ovf")]
    xmlns_ovf: String,
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@deploy")]
    deploy: bool,
    #[serde(rename = "@powerOn")]
    power_on: bool,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl XmlBody for ComposeVAppParams {
    fn xml_namespace(&self) -> &str {
        &self.xmlns
    }
}

#[derive(Clone)]
pub struct Vdc {
    pub vdc: VdcType,
    client: Client,
}

impl fmt::Debug for Vdc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vdc").field("vdc", &self.vdc).finish()
    }
}

impl Vdc {
    pub fn new(client: Client, vdc: VdcType) -> Self {
        Self { vdc, client }
    }

    pub fn name(&self) -> &str {
        &self.vdc.name
    }

    pub fn href(&self) -> &str {
        &self.vdc.href
    }

    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        require_href(&self.vdc.href, "VDC")?;
        self.vdc = self.client.get_xml(&self.vdc.href).await?;
        Ok(())
    }

    fn entities_of_type<'a>(&'a self, media_type: &'a str) -> impl Iterator<Item = &'a Reference> {
        self.vdc
            .resource_entities
            .iter()
            .flat_map(|r| r.entities.iter())
            .filter(move |e| e.type_.as_deref() == Some(media_type))
    }

    pub fn vapp_references(&self) -> Vec<&Reference> {
        self.entities_of_type(mime::VAPP).collect()
    }

    pub async fn get_vapp_by_name(&self, name: &str) -> Result<VApp, ApiError> {
        let refs = self.vapp_references();
        let reference = unique_by_name(&refs, "vApp", name, |r| r.name_or_empty())?;
        self.client.get_vapp_by_href(&reference.href).await
    }

    pub async fn get_vapp_by_id(&self, id: &str) -> Result<VApp, ApiError> {
        let reference = self
            .entities_of_type(mime::VAPP)
            .find(|r| same_id(&r.href, id))
            .ok_or_else(|| ApiError::not_found("vApp", id))?;
        self.client.get_vapp_by_href(&reference.href).await
    }

    pub async fn get_vapp_by_name_or_id(&self, identifier: &str) -> Result<VApp, ApiError> {
        get_entity_by_name_or_id(
            identifier,
            |id| self.get_vapp_by_id(id),
            |name| self.get_vapp_by_name(name),
        )
        .await
    }

    /// Creates a vApp with no VMs and waits until vCD has built it
    pub async fn compose_empty_vapp(&self, name: &str, description: &str) -> Result<VApp, ApiError> {
        if name.is_empty() {
            return Err(ApiError::InvalidRequest("vApp name is empty".to_string()));
        }
        let href = format!("{}/action/composeVApp", require_href(&self.vdc.href, "VDC")?);
        let params = ComposeVAppParams {
            xmlns: XMLNS_VCLOUD.to_string(),
            xmlns_ovf: XMLNS_OVF.to_string(),
            name: name.to_string(),
            deploy: false,
            power_on: false,
            description: (!description.is_empty()).then(|| description.to_string()),
        };
        tracing::info!("Composing vApp {} in VDC {}", name, self.vdc.name);
        let created: VAppType = self
            .client
            .post_xml(&href, mime::COMPOSE_VAPP_PARAMS, &params)
            .await?;
        wait_embedded(&self.client, created.tasks.as_ref()).await?;

        let mut vapp = VApp::new(self.client.clone(), created);
        vapp.refresh().await?;
        Ok(vapp)
    }

    /// Edge gateway records of this VDC
    pub async fn query_edge_gateways(&self) -> Result<Vec<QueryEdgeGatewayRecord>, ApiError> {
        let href = match find_link(&self.vdc.links, rel::EDGE_GATEWAYS, None) {
            Some(link) => link.href.clone(),
            None => {
                let uuid = extract_uuid(&self.vdc.href)
                    .ok_or_else(|| ApiError::InvalidRequest(format!("VDC HREF '{}' has no ID", self.vdc.href)))?;
                self.client.href(&format!("/admin/vdc/{}/edgeGateways", uuid))
            }
        };
        let records: QueryResultRecords = self.client.get_xml(&href).await?;
        Ok(records.edge_gateways)
    }

    pub async fn get_edge_gateway_by_name(&self, name: &str) -> Result<EdgeGateway, ApiError> {
        let records = self.query_edge_gateways().await?;
        let record = unique_by_name(&records, "edge gateway", name, |r| r.name.as_str())?;
        self.client.get_edge_gateway_by_href(&record.href).await
    }

    pub async fn get_edge_gateway_by_id(&self, id: &str) -> Result<EdgeGateway, ApiError> {
        if extract_uuid(id).is_none() {
            return Err(ApiError::not_found("edge gateway", id));
        }
        let records = self.query_edge_gateways().await?;
        let record = records
            .iter()
            .find(|r| same_id(&r.href, id))
            .ok_or_else(|| ApiError::not_found("edge gateway", id))?;
        self.client.get_edge_gateway_by_href(&record.href).await
    }

    pub async fn get_edge_gateway_by_name_or_id(
        &self,
        identifier: &str,
    ) -> Result<EdgeGateway, ApiError> {
        get_entity_by_name_or_id(
            identifier,
            |id| self.get_edge_gateway_by_id(id),
            |name| self.get_edge_gateway_by_name(name),
        )
        .await
    }

    /// Creates an independent disk and waits for it to be ready
    pub async fn create_disk(&self, spec: &DiskSpec) -> Result<Disk, ApiError> {
        spec.validate()?;
        let href = format!("{}/disk", require_href(&self.vdc.href, "VDC")?);
        let params = DiskCreateParams::new(spec);
        tracing::info!("Creating disk {} ({} MB)", spec.name, spec.size_mb);
        let created: DiskType = self
            .client
            .post_xml(&href, mime::DISK_CREATE_PARAMS, &params)
            .await?;
        wait_embedded(&self.client, created.tasks.as_ref()).await?;

        let mut disk = Disk::new(self.client.clone(), created);
        disk.refresh().await?;
        Ok(disk)
    }

    pub async fn get_disk_by_href(&self, href: &str) -> Result<Disk, ApiError> {
        let disk: DiskType = self.client.get_xml(href).await?;
        Ok(Disk::new(self.client.clone(), disk))
    }

    /// Disk records of this VDC named `name`
    pub async fn query_disks(&self, name: &str) -> Result<Vec<QueryDiskRecord>, ApiError> {
        let query = Query::new(QueryType::Disk).with_filter(format!(
            "name=={};vdc=={}",
            escape_filter_value(name),
            escape_filter_value(&self.vdc.href)
        ));
        Ok(self.client.query_with_admin(query).await?.disks)
    }

    /// VM records of this VDC, excluding VMs inside vApp templates
    pub async fn query_vms(&self) -> Result<Vec<QueryVmRecord>, ApiError> {
        let query = Query::new(QueryType::Vm).with_filter(format!(
            "vdc=={};isVAppTemplate==false",
            escape_filter_value(&self.vdc.href)
        ));
        Ok(self.client.query_with_admin(query).await?.vms)
    }

    /// Filter search restricted to items whose parent is this VDC
    pub async fn search_by_filter(
        &self,
        query_type: QueryType,
        def: &FilterDef,
    ) -> Result<Vec<QueryItem>, ApiError> {
        match query_type.parent_name_field() {
            Some("vdcName") | Some("orgVdcName") => {}
            _ => {
                return Err(ApiError::InvalidRequest(format!(
                    "{} items are not contained in a VDC",
                    query_type
                )))
            }
        }
        let scoped = def.clone().with_filter(FilterKey::Parent, &self.vdc.name)?;
        self.client.search_by_filter(query_type, &scoped).await
    }
}

impl MetadataHolder for Vdc {
    fn metadata_client(&self) -> &Client {
        &self.client
    }

    fn metadata_href(&self) -> &str {
        &self.vdc.href
    }
}

#[cfg(test)]
#[path = "./vdc_test.rs"]
mod vdc_test;
