//! Organizations, as seen by a tenant user

use std::fmt;

use serde::{Deserialize, Serialize};

use super::catalog::{Catalog, CatalogType};
use super::common::{mime, rel, Link, Reference};
use super::error::ApiError;
use super::href::{extract_uuid, require_href, same_id};
use super::lookup::{get_entity_by_name_or_id, unique_by_name};
use super::metadata::MetadataHolder;
use super::vdc::{Vdc, VdcType};
use super::Client;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "OrgList")]
pub struct OrgList {
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "Org", default)]
    pub orgs: Vec<Reference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "Org")]
pub struct OrgType {
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
    #[serde(rename = "FullName", default)]
    pub full_name: Option<String>,
    #[serde(rename = "IsEnabled", default)]
    pub is_enabled: Option<bool>,
}

#[derive(Clone)]
pub struct Org {
    pub org: OrgType,
    client: Client,
}

impl fmt::Debug for Org {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Org").field("org", &self.org).finish()
    }
}

impl Org {
    pub fn new(client: Client, org: OrgType) -> Self {
        Self { org, client }
    }

    pub fn name(&self) -> &str {
        &self.org.name
    }

    pub fn href(&self) -> &str {
        &self.org.href
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        require_href(&self.org.href, "organization")?;
        self.org = self.client.get_xml(&self.org.href).await?;
        Ok(())
    }

    fn links_of_type(&self, media_type: &str) -> impl Iterator<Item = &Link> + '_ {
        let media_type = media_type.to_string();
        self.org
            .links
            .iter()
            .filter(move |l| l.rel == rel::DOWN && l.type_.as_deref() == Some(media_type.as_str()))
    }

    /// Catalogs visible to the organization, including shared ones
    pub fn catalog_references(&self) -> Vec<Reference> {
        self.links_of_type(mime::CATALOG).map(link_reference).collect()
    }

    pub fn vdc_references(&self) -> Vec<Reference> {
        self.links_of_type(mime::VDC).map(link_reference).collect()
    }

    pub async fn get_catalog_by_name(&self, name: &str) -> Result<Catalog, ApiError> {
        let links: Vec<&Link> = self.links_of_type(mime::CATALOG).collect();
        let link = unique_by_name(&links, "catalog", name, |l| l.name.as_deref().unwrap_or_default())?;
        self.fetch_catalog(&link.href).await
    }

    pub async fn get_catalog_by_id(&self, id: &str) -> Result<Catalog, ApiError> {
        let link = self
            .links_of_type(mime::CATALOG)
            .find(|l| same_id(&l.href, id))
            .ok_or_else(|| ApiError::not_found("catalog", id))?;
        self.fetch_catalog(&link.href).await
    }

    pub async fn get_catalog_by_name_or_id(&self, identifier: &str) -> Result<Catalog, ApiError> {
        get_entity_by_name_or_id(
            identifier,
            |id| self.get_catalog_by_id(id),
            |name| self.get_catalog_by_name(name),
        )
        .await
    }

    async fn fetch_catalog(&self, href: &str) -> Result<Catalog, ApiError> {
        let catalog: CatalogType = self.client.get_xml(href).await?;
        Ok(Catalog::new(self.client.clone(), catalog))
    }

    pub async fn get_vdc_by_name(&self, name: &str) -> Result<Vdc, ApiError> {
        let links: Vec<&Link> = self.links_of_type(mime::VDC).collect();
        let link = unique_by_name(&links, "VDC", name, |l| l.name.as_deref().unwrap_or_default())?;
        self.fetch_vdc(&link.href).await
    }

    pub async fn get_vdc_by_id(&self, id: &str) -> Result<Vdc, ApiError> {
        let link = self
            .links_of_type(mime::VDC)
            .find(|l| same_id(&l.href, id))
            .ok_or_else(|| ApiError::not_found("VDC", id))?;
        self.fetch_vdc(&link.href).await
    }

    pub async fn get_vdc_by_name_or_id(&self, identifier: &str) -> Result<Vdc, ApiError> {
        get_entity_by_name_or_id(
            identifier,
            |id| self.get_vdc_by_id(id),
            |name| self.get_vdc_by_name(name),
        )
        .await
    }

    async fn fetch_vdc(&self, href: &str) -> Result<Vdc, ApiError> {
        let vdc: VdcType = self.client.get_xml(href).await?;
        Ok(Vdc::new(self.client.clone(), vdc))
    }
}

fn link_reference(link: &Link) -> Reference {
    Reference {
        href: link.href.clone(),
        id: None,
        name: link.name.clone(),
        type_: link.type_.clone(),
    }
}

impl MetadataHolder for Org {
    fn metadata_client(&self) -> &Client {
        &self.client
    }

    fn metadata_href(&self) -> &str {
        &self.org.href
    }
}

impl Client {
    /// Organizations the session can see
    pub async fn get_org_list(&self) -> Result<OrgList, ApiError> {
        self.get_xml(&self.href("/org")).await
    }

    pub async fn get_org_by_name(&self, name: &str) -> Result<Org, ApiError> {
        let list = self.get_org_list().await?;
        let reference = unique_by_name(&list.orgs, "organization", name, |r| r.name_or_empty())?;
        self.get_org_by_href(&reference.href).await
    }

    pub async fn get_org_by_id(&self, id: &str) -> Result<Org, ApiError> {
        if extract_uuid(id).is_none() {
            return Err(ApiError::not_found("organization", id));
        }
        let list = self.get_org_list().await?;
        let reference = list
            .orgs
            .iter()
            .find(|r| same_id(&r.href, id))
            .ok_or_else(|| ApiError::not_found("organization", id))?;
        self.get_org_by_href(&reference.href).await
    }

    pub async fn get_org_by_name_or_id(&self, identifier: &str) -> Result<Org, ApiError> {
        get_entity_by_name_or_id(
            identifier,
            |id| self.get_org_by_id(id),
            |name| self.get_org_by_name(name),
        )
        .await
    }

    pub async fn get_org_by_href(&self, href: &str) -> Result<Org, ApiError> {
        let org: OrgType = self.get_xml(href).await?;
        Ok(Org::new(self.clone(), org))
    }
}
