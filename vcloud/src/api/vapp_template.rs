use std::fmt;

use serde::{Deserialize, Serialize};

use super::common::{status_name, Files, Link, Reference, Tasks};
use super::error::ApiError;
use super::href::require_href;
use super::metadata::MetadataHolder;
use super::task::{Task, TaskType};
use super::Client;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "VAppTemplate")]
pub struct VAppTemplateType {
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
    #[serde(rename = "@ovfDescriptorUploaded", default)]
    pub ovf_descriptor_uploaded: Option<bool>,
    #[serde(rename = "@goldMaster", default)]
    pub gold_master: Option<bool>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Link", default)]
    pub links: Vec<Link>,
    #[serde(rename = "Tasks", default)]
    pub tasks: Option<Tasks>,
    #[serde(rename = "Files", default)]
    pub files: Option<Files>,
    #[serde(rename = "Owner", default)]
    pub owner: Option<TemplateOwner>,
    #[serde(rename = "Children", default)]
    pub children: Option<TemplateChildren>,
    #[serde(rename = "DateCreated", default)]
    pub date_created: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateOwner {
    #[serde(rename = "User", default)]
    pub user: Option<Reference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateChildren {
    #[serde(rename = "Vm", default)]
    pub vms: Vec<TemplateVm>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateVm {
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@status", default)]
    pub status: Option<i32>,
}

impl VAppTemplateType {
    pub fn first_task(&self) -> Option<&TaskType> {
        self.tasks.as_ref().and_then(|t| t.task.first())
    }

    /// Upload link of the file named `name`
    pub fn file_upload_link(&self, name: &str) -> Option<&str> {
        self.files
            .as_ref()?
            .file
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.upload_link())
            .map(|l| l.href.as_str())
    }
}

#[derive(Clone)]
pub struct VAppTemplate {
    pub vapp_template: VAppTemplateType,
    client: Client,
}

impl fmt::Debug for VAppTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VAppTemplate").field("vapp_template", &self.vapp_template).finish()
    }
}

impl VAppTemplate {
    pub fn new(client: Client, vapp_template: VAppTemplateType) -> Self {
        Self {
            vapp_template,
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.vapp_template.name
    }

    pub fn href(&self) -> &str {
        &self.vapp_template.href
    }

    pub fn status(&self) -> &'static str {
        status_name(self.vapp_template.status.unwrap_or(0))
    }

    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        require_href(&self.vapp_template.href, "vApp template")?;
        self.vapp_template = self.client.get_xml(&self.vapp_template.href).await?;
        Ok(())
    }

    pub async fn delete(&self) -> Result<Task, ApiError> {
        tracing::debug!("Deleting vApp template {}", self.vapp_template.name);
        self.client.delete_task(&self.vapp_template.href).await
    }
}

impl MetadataHolder for VAppTemplate {
    fn metadata_client(&self) -> &Client {
        &self.client
    }

    fn metadata_href(&self) -> &str {
        &self.vapp_template.href
    }
}

impl Client {
    pub async fn get_vapp_template_by_href(&self, href: &str) -> Result<VAppTemplate, ApiError> {
        let template: VAppTemplateType = self.get_xml(href).await?;
        Ok(VAppTemplate::new(self.clone(), template))
    }
}
