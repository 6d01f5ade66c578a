//! vApps and their lifecycle operations

use std::fmt;

use serde::{Deserialize, Serialize};

use super::common::{mime, status_name, Link, Reference, Tasks, XmlBody, XMLNS_VCLOUD};
use super::error::ApiError;
use super::href::{require_href, same_id};
use super::lookup::{get_entity_by_name_or_id, unique_by_name};
use super::metadata::MetadataHolder;
use super::task::Task;
use super::vm::{Vm, VmType};
use super::Client;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "VApp")]
pub struct VAppType {
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
    #[serde(rename = "Owner", default)]
    pub owner: Option<VAppOwner>,
    #[serde(rename = "Children", default)]
    pub children: Option<VAppChildren>,
    #[serde(rename = "DateCreated", default)]
    pub date_created: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VAppOwner {
    #[serde(rename = "User", default)]
    pub user: Option<Reference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VAppChildren {
    #[serde(rename = "Vm", default)]
    pub vms: Vec<VmType>,
}

#[derive(Debug, Serialize)]
#[serde(rename = "DeployVAppParams")]
struct DeployVAppParams {
    #[serde(rename = "@xmlns")]
    xmlns: String,
    #[serde(rename = "@powerOn")]
    power_on: bool,
}

impl XmlBody for DeployVAppParams {
    fn xml_namespace(&self) -> &str {
        &self.xmlns
    }
}

/// How VMs are stopped when undeployed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndeployAction {
    #[default]
    PowerOff,
    Suspend,
    Shutdown,
    Force,
}

impl UndeployAction {
    fn as_str(&self) -> &'static str {
        match self {
            UndeployAction::PowerOff => "powerOff",
            UndeployAction::Suspend => "suspend",
            UndeployAction::Shutdown => "shutdown",
            UndeployAction::Force => "force",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename = "UndeployVAppParams")]
pub(crate) struct UndeployVAppParams {
    #[serde(rename = "@xmlns")]
    xmlns: String,
    #[serde(rename = "UndeployPowerAction")]
    action: String,
}

impl UndeployVAppParams {
    pub fn new(action: UndeployAction) -> Self {
        Self {
            xmlns: XMLNS_VCLOUD.to_string(),
            action: action.as_str().to_string(),
        }
    }
}

impl XmlBody for UndeployVAppParams {
    fn xml_namespace(&self) -> &str {
        &self.xmlns
    }
}

#[derive(Clone)]
pub struct VApp {
    pub vapp: VAppType,
    client: Client,
}

impl fmt::Debug for VApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VApp").field("vapp", &self.vapp).finish()
    }
}

impl VApp {
    pub fn new(client: Client, vapp: VAppType) -> Self {
        Self { vapp, client }
    }

    pub fn name(&self) -> &str {
        &self.vapp.name
    }

    pub fn href(&self) -> &str {
        &self.vapp.href
    }

    pub fn status(&self) -> &'static str {
        status_name(self.vapp.status.unwrap_or(0))
    }

    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        require_href(&self.vapp.href, "vApp")?;
        self.vapp = self.client.get_xml(&self.vapp.href).await?;
        Ok(())
    }

    fn action_href(&self, path: &str) -> Result<String, ApiError> {
        Ok(format!("{}{}", require_href(&self.vapp.href, "vApp")?, path))
    }

    async fn power_action(&self, action: &str) -> Result<Task, ApiError> {
        tracing::debug!("vApp {}: {}", self.vapp.name, action);
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

    pub async fn reset(&self) -> Result<Task, ApiError> {
        self.power_action("reset").await
    }

    pub async fn suspend(&self) -> Result<Task, ApiError> {
        self.power_action("suspend").await
    }

    pub async fn shutdown(&self) -> Result<Task, ApiError> {
        self.power_action("shutdown").await
    }

    pub async fn deploy(&self, power_on: bool) -> Result<Task, ApiError> {
        let href = self.action_href("/action/deploy")?;
        let params = DeployVAppParams {
            xmlns: XMLNS_VCLOUD.to_string(),
            power_on,
        };
        self.client
            .post_xml_task(&href, mime::DEPLOY_VAPP_PARAMS, &params)
            .await
    }

    pub async fn undeploy(&self, action: UndeployAction) -> Result<Task, ApiError> {
        let href = self.action_href("/action/undeploy")?;
        self.client
            .post_xml_task(&href, mime::UNDEPLOY_VAPP_PARAMS, &UndeployVAppParams::new(action))
            .await
    }

    /// Deletes the vApp; it must be undeployed first
    pub async fn delete(&self) -> Result<Task, ApiError> {
        tracing::info!("Deleting vApp {}", self.vapp.name);
        self.client
            .delete_task(require_href(&self.vapp.href, "vApp")?)
            .await
    }

    pub fn vm_references(&self) -> Vec<Reference> {
        self.vapp
            .children
            .iter()
            .flat_map(|c| c.vms.iter())
            .map(|vm| Reference {
                href: vm.href.clone(),
                id: vm.id.clone(),
                name: Some(vm.name.clone()),
                type_: vm.type_.clone(),
            })
            .collect()
    }

    pub async fn get_vm_by_name(&self, name: &str) -> Result<Vm, ApiError> {
        let refs = self.vm_references();
        let reference = unique_by_name(&refs, "VM", name, |r| r.name_or_empty())?;
        self.client.get_vm_by_href(&reference.href).await
    }

    pub async fn get_vm_by_id(&self, id: &str) -> Result<Vm, ApiError> {
        let refs = self.vm_references();
        let reference = refs
            .iter()
            .find(|r| same_id(&r.href, id))
            .ok_or_else(|| ApiError::not_found("VM", id))?;
        self.client.get_vm_by_href(&reference.href).await
    }

    pub async fn get_vm_by_name_or_id(&self, identifier: &str) -> Result<Vm, ApiError> {
        get_entity_by_name_or_id(
            identifier,
            |id| self.get_vm_by_id(id),
            |name| self.get_vm_by_name(name),
        )
        .await
    }
}

impl MetadataHolder for VApp {
    fn metadata_client(&self) -> &Client {
        &self.client
    }

    fn metadata_href(&self) -> &str {
        &self.vapp.href
    }
}

impl Client {
    pub async fn get_vapp_by_href(&self, href: &str) -> Result<VApp, ApiError> {
        let vapp: VAppType = self.get_xml(href).await?;
        Ok(VApp::new(self.clone(), vapp))
    }
}
