use std::fmt;

use serde::{Deserialize, Serialize};

use super::common::{mime, Link, Reference};
use super::error::ApiError;
use super::href::require_href;
use super::media::Media;
use super::metadata::MetadataHolder;
use super::vapp_template::VAppTemplate;
use super::Client;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "CatalogItem")]
pub struct CatalogItemType {
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@type", default)]
    pub type_: Option<String>,
    #[serde(rename = "@size", default)]
    pub size: Option<i64>,
    #[serde(rename = "Link", default)]
    pub links: Vec<Link>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Entity", default)]
    pub entity: Reference,
    #[serde(rename = "DateCreated", default)]
    pub date_created: Option<String>,
    #[serde(rename = "VersionNumber", default)]
    pub version_number: Option<i64>,
}

#[derive(Clone)]
pub struct CatalogItem {
    pub catalog_item: CatalogItemType,
    client: Client,
}

impl fmt::Debug for CatalogItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogItem").field("catalog_item", &self.catalog_item).finish()
    }
}

impl CatalogItem {
    pub fn new(client: Client, catalog_item: CatalogItemType) -> Self {
        Self {
            catalog_item,
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.catalog_item.name
    }

    pub fn href(&self) -> &str {
        &self.catalog_item.href
    }

    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        require_href(&self.catalog_item.href, "catalog item")?;
        self.catalog_item = self.client.get_xml(&self.catalog_item.href).await?;
        Ok(())
    }

    fn entity_of_type(&self, media_type: &str, kind: &str) -> Result<&str, ApiError> {
        let entity = &self.catalog_item.entity;
        if entity.type_.as_deref() != Some(media_type) {
            return Err(ApiError::InvalidRequest(format!(
                "catalog item '{}' does not hold a {}",
                self.catalog_item.name, kind
            )));
        }
        require_href(&entity.href, kind)
    }

    pub async fn get_vapp_template(&self) -> Result<VAppTemplate, ApiError> {
        let href = self.entity_of_type(mime::VAPP_TEMPLATE, "vApp template")?;
        self.client.get_vapp_template_by_href(href).await
    }

    pub async fn get_media(&self) -> Result<Media, ApiError> {
        let href = self.entity_of_type(mime::MEDIA, "media")?;
        self.client.get_media_by_href(href).await
    }

    /// Removes the item and the entity it holds
    pub async fn delete(&self) -> Result<(), ApiError> {
        let href = require_href(&self.catalog_item.href, "catalog item")?;
        tracing::info!("Deleting catalog item {}", self.catalog_item.name);
        self.client.delete_no_content(href).await
    }
}

impl MetadataHolder for CatalogItem {
    fn metadata_client(&self) -> &Client {
        &self.client
    }

    fn metadata_href(&self) -> &str {
        &self.catalog_item.href
    }
}
