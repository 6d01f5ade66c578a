//! Catalogs and the media and vApp templates they hold

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::catalog_item::{CatalogItem, CatalogItemType};
use super::common::{find_link, mime, rel, Link, Reference, Tasks, XmlBody, XMLNS_VCLOUD};
use super::error::ApiError;
use super::filter::{FilterDef, FilterKey, QueryItem};
use super::href::{admin_href, extract_uuid, non_admin_href, require_href, same_id};
use super::lookup::{get_entity_by_name_or_id, unique_by_name};
use super::media::Media;
use super::metadata::MetadataHolder;
use super::query::{escape_filter_value, Query, QueryMediaRecord, QueryType, QueryVAppTemplateRecord};
use super::task::wait_embedded;
use super::upload::{upload_media, upload_ovf, UploadTask};
use super::Client;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "Catalog")]
pub struct CatalogType {
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@type", default)]
    pub type_: Option<String>,
    #[serde(rename = "Link", default)]
    pub links: Vec<Link>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Tasks", default)]
    pub tasks: Option<Tasks>,
    #[serde(rename = "Owner", default)]
    pub owner: Option<CatalogOwner>,
    #[serde(rename = "CatalogItems", default)]
    pub catalog_items: Option<CatalogItems>,
    #[serde(rename = "IsPublished", default)]
    pub is_published: Option<bool>,
    #[serde(rename = "DateCreated", default)]
    pub date_created: Option<String>,
    #[serde(rename = "VersionNumber", default)]
    pub version_number: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogOwner {
    #[serde(rename = "User", default)]
    pub user: Option<Reference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogItems {
    #[serde(rename = "CatalogItem", default)]
    pub items: Vec<Reference>,
}

impl CatalogType {
    pub fn item_references(&self) -> &[Reference] {
        self.catalog_items
            .as_ref()
            .map(|c| c.items.as_slice())
            .unwrap_or_default()
    }
}

/// Body used to create or update an admin catalog
#[derive(Debug, Serialize)]
#[serde(rename = "AdminCatalog")]
pub(crate) struct AdminCatalogParams {
    #[serde(rename = "@xmlns")]
    pub xmlns: String,
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AdminCatalogParams {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            xmlns: XMLNS_VCLOUD.to_string(),
            name: name.to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
        }
    }
}

impl XmlBody for AdminCatalogParams {
    fn xml_namespace(&self) -> &str {
        &self.xmlns
    }
}

/// A catalog, reached through its tenant HREF
#[derive(Clone)]
pub struct Catalog {
    pub catalog: CatalogType,
    client: Client,
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog").field("catalog", &self.catalog).finish()
    }
}

impl Catalog {
    pub fn new(client: Client, catalog: CatalogType) -> Self {
        Self { catalog, client }
    }

    pub fn name(&self) -> &str {
        &self.catalog.name
    }

    pub fn href(&self) -> &str {
        &self.catalog.href
    }

    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        require_href(&self.catalog.href, "catalog")?;
        self.catalog = self.client.get_xml(&self.catalog.href).await?;
        Ok(())
    }

    pub async fn get_catalog_item_by_name(&self, name: &str) -> Result<CatalogItem, ApiError> {
        let reference = unique_by_name(
            self.catalog.item_references(),
            "catalog item",
            name,
            |r| r.name_or_empty(),
        )?;
        self.fetch_item(&reference.href).await
    }

    pub async fn get_catalog_item_by_id(&self, id: &str) -> Result<CatalogItem, ApiError> {
        let reference = self
            .catalog
            .item_references()
            .iter()
            .find(|r| same_id(&r.href, id) || r.id.as_deref().is_some_and(|rid| same_id(rid, id)))
            .ok_or_else(|| ApiError::not_found("catalog item", id))?;
        self.fetch_item(&reference.href).await
    }

    pub async fn get_catalog_item_by_name_or_id(
        &self,
        identifier: &str,
    ) -> Result<CatalogItem, ApiError> {
        get_entity_by_name_or_id(
            identifier,
            |id| self.get_catalog_item_by_id(id),
            |name| self.get_catalog_item_by_name(name),
        )
        .await
    }

    async fn fetch_item(&self, href: &str) -> Result<CatalogItem, ApiError> {
        let item: CatalogItemType = self.client.get_xml(href).await?;
        Ok(CatalogItem::new(self.client.clone(), item))
    }

    /// Media records of this catalog, optionally restricted to one name
    pub async fn query_media_list(
        &self,
        name: Option<&str>,
    ) -> Result<Vec<QueryMediaRecord>, ApiError> {
        let mut query = Query::new(QueryType::Media).with_filter(format!(
            "catalogName=={}",
            escape_filter_value(&self.catalog.name)
        ));
        if let Some(name) = name {
            query = query.and_filter(format!("name=={}", escape_filter_value(name)));
        }
        let records = self.client.query_with_admin(query).await?;
        Ok(records
            .media
            .into_iter()
            .filter(|m| m.catalog.as_deref().map_or(true, |c| same_id(c, &self.catalog.href)))
            .collect())
    }

    pub async fn query_vapp_template_list(&self) -> Result<Vec<QueryVAppTemplateRecord>, ApiError> {
        let query = Query::new(QueryType::VAppTemplate).with_filter(format!(
            "catalogName=={}",
            escape_filter_value(&self.catalog.name)
        ));
        let records = self.client.query_with_admin(query).await?;
        Ok(records.vapp_templates)
    }

    pub async fn get_media_by_name(&self, name: &str) -> Result<Media, ApiError> {
        let records = self.query_media_list(Some(name)).await?;
        let record = unique_by_name(&records, "media", name, |m| m.name.as_str())?;
        self.client.get_media_by_href(&record.href).await
    }

    pub async fn get_media_by_id(&self, id: &str) -> Result<Media, ApiError> {
        if extract_uuid(id).is_none() {
            return Err(ApiError::not_found("media", id));
        }
        let records = self.query_media_list(None).await?;
        let record = records
            .iter()
            .find(|m| same_id(&m.href, id))
            .ok_or_else(|| ApiError::not_found("media", id))?;
        self.client.get_media_by_href(&record.href).await
    }

    pub async fn get_media_by_name_or_id(&self, identifier: &str) -> Result<Media, ApiError> {
        get_entity_by_name_or_id(
            identifier,
            |id| self.get_media_by_id(id),
            |name| self.get_media_by_name(name),
        )
        .await
    }

    fn add_link(&self, media_type: &str) -> Result<&str, ApiError> {
        find_link(&self.catalog.links, rel::ADD, Some(media_type))
            .map(|l| l.href.as_str())
            .ok_or_else(|| {
                ApiError::InvalidRequest(format!(
                    "catalog '{}' has no link to add {}",
                    self.catalog.name, media_type
                ))
            })
    }

    /// Uploads an ISO image as a new media item
    pub async fn upload_media_image(
        &self,
        name: &str,
        description: &str,
        path: &Path,
        piece_size: u64,
    ) -> Result<UploadTask, ApiError> {
        let add_href = self.add_link(mime::MEDIA)?;
        match self.get_media_by_name(name).await {
            Ok(_) => {
                return Err(ApiError::InvalidRequest(format!(
                    "media '{}' already exists in catalog '{}'",
                    name, self.catalog.name
                )))
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
        upload_media(&self.client, add_href, name, description, path, piece_size).await
    }

    /// Uploads an OVA or OVF package as a new vApp template
    pub async fn upload_ovf(
        &self,
        path: &Path,
        name: &str,
        description: &str,
        piece_size: u64,
    ) -> Result<UploadTask, ApiError> {
        let add_href = self.add_link(mime::UPLOAD_VAPP_TEMPLATE_PARAMS)?;
        if self
            .catalog
            .item_references()
            .iter()
            .any(|r| r.name_or_empty() == name)
        {
            return Err(ApiError::InvalidRequest(format!(
                "item '{}' already exists in catalog '{}'",
                name, self.catalog.name
            )));
        }
        upload_ovf(&self.client, add_href, name, description, path, piece_size).await
    }

    /// Deletes the catalog through its admin HREF
    pub async fn delete(&self, force: bool, recursive: bool) -> Result<(), ApiError> {
        delete_catalog(&self.client, &self.catalog, force, recursive).await
    }

    /// Filter search restricted to this catalog
    pub async fn search_by_filter(
        &self,
        query_type: QueryType,
        def: &FilterDef,
    ) -> Result<Vec<QueryItem>, ApiError> {
        if query_type.parent_name_field() != Some("catalogName") {
            return Err(ApiError::InvalidRequest(format!(
                "{} items are not contained in a catalog",
                query_type
            )));
        }
        let scoped = def.clone().with_filter(FilterKey::Parent, &self.catalog.name)?;
        self.client.search_by_filter(query_type, &scoped).await
    }
}

impl MetadataHolder for Catalog {
    fn metadata_client(&self) -> &Client {
        &self.client
    }

    fn metadata_href(&self) -> &str {
        &self.catalog.href
    }
}

async fn delete_catalog(
    client: &Client,
    catalog: &CatalogType,
    force: bool,
    recursive: bool,
) -> Result<(), ApiError> {
    let href = admin_href(require_href(&catalog.href, "catalog")?)?;
    let href = format!("{}?force={}&recursive={}", href, force, recursive);
    tracing::info!("Deleting catalog {}", catalog.name);
    client.delete_task(&href).await?.wait_completion().await
}

/// A catalog reached through its admin HREF, as owned by an organization
#[derive(Clone)]
pub struct AdminCatalog {
    pub admin_catalog: CatalogType,
    client: Client,
}

impl fmt::Debug for AdminCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCatalog").field("admin_catalog", &self.admin_catalog).finish()
    }
}

impl AdminCatalog {
    pub fn new(client: Client, admin_catalog: CatalogType) -> Self {
        Self {
            admin_catalog,
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.admin_catalog.name
    }

    pub fn href(&self) -> &str {
        &self.admin_catalog.href
    }

    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        require_href(&self.admin_catalog.href, "catalog")?;
        self.admin_catalog = self.client.get_xml(&self.admin_catalog.href).await?;
        Ok(())
    }

    /// Renames the catalog or changes its description
    pub async fn update(&mut self, name: &str, description: &str) -> Result<(), ApiError> {
        let href = admin_href(require_href(&self.admin_catalog.href, "catalog")?)?;
        let params = AdminCatalogParams::new(name, description);
        let updated: CatalogType = self
            .client
            .put_xml(&href, mime::ADMIN_CATALOG, &params)
            .await?;
        wait_embedded(&self.client, updated.tasks.as_ref()).await?;
        self.refresh().await
    }

    pub async fn delete(&self, force: bool, recursive: bool) -> Result<(), ApiError> {
        delete_catalog(&self.client, &self.admin_catalog, force, recursive).await
    }

    /// The tenant view of this catalog
    pub async fn catalog(&self) -> Result<Catalog, ApiError> {
        let href = non_admin_href(&self.admin_catalog.href);
        let catalog: CatalogType = self.client.get_xml(&href).await?;
        Ok(Catalog::new(self.client.clone(), catalog))
    }
}

impl MetadataHolder for AdminCatalog {
    fn metadata_client(&self) -> &Client {
        &self.client
    }

    fn metadata_href(&self) -> &str {
        &self.admin_catalog.href
    }
}
