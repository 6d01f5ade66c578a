//! Organizations through the admin API: catalogs, roles and users

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::catalog::{AdminCatalog, AdminCatalogParams, CatalogType};
use super::common::{mime, Link, Reference};
use super::error::ApiError;
use super::href::{admin_href, extract_uuid, require_href, same_id};
use super::lookup::{get_entity_by_name_or_id, unique_by_name};
use super::query::{escape_filter_value, Query, QueryType};
use super::task::wait_embedded;
use super::user::{OrgUser, OrgUserConfiguration, OrgUserType, UserBody};
use super::Client;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "AdminOrg")]
pub struct AdminOrgType {
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
    #[serde(rename = "Users", default)]
    pub users: Option<UserReferences>,
    #[serde(rename = "Catalogs", default)]
    pub catalogs: Option<CatalogReferences>,
    #[serde(rename = "Vdcs", default)]
    pub vdcs: Option<VdcReferences>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserReferences {
    #[serde(rename = "UserReference", default)]
    pub users: Vec<Reference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogReferences {
    #[serde(rename = "CatalogReference", default)]
    pub catalogs: Vec<Reference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VdcReferences {
    #[serde(rename = "Vdc", default)]
    pub vdcs: Vec<Reference>,
}

#[derive(Clone)]
pub struct AdminOrg {
    pub admin_org: AdminOrgType,
    client: Client,
}

impl fmt::Debug for AdminOrg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminOrg").field("admin_org", &self.admin_org).finish()
    }
}

impl AdminOrg {
    pub fn new(client: Client, admin_org: AdminOrgType) -> Self {
        Self { admin_org, client }
    }

    pub fn name(&self) -> &str {
        &self.admin_org.name
    }

    pub fn href(&self) -> &str {
        &self.admin_org.href
    }

    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        require_href(&self.admin_org.href, "organization")?;
        self.admin_org = self.client.get_xml(&self.admin_org.href).await?;
        Ok(())
    }

    pub fn catalog_references(&self) -> &[Reference] {
        self.admin_org
            .catalogs
            .as_ref()
            .map(|c| c.catalogs.as_slice())
            .unwrap_or_default()
    }

    pub fn user_references(&self) -> &[Reference] {
        self.admin_org
            .users
            .as_ref()
            .map(|u| u.users.as_slice())
            .unwrap_or_default()
    }

    pub fn vdc_references(&self) -> &[Reference] {
        self.admin_org
            .vdcs
            .as_ref()
            .map(|v| v.vdcs.as_slice())
            .unwrap_or_default()
    }

    /// Creates a catalog and waits for vCD to finish building it
    pub async fn create_catalog(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<AdminCatalog, ApiError> {
        if name.is_empty() {
            return Err(ApiError::InvalidRequest("catalog name is empty".to_string()));
        }
        let href = format!("{}/catalogs", require_href(&self.admin_org.href, "organization")?);
        tracing::info!("Creating catalog {} in organization {}", name, self.admin_org.name);
        let created: CatalogType = self
            .client
            .post_xml(&href, mime::ADMIN_CATALOG, &AdminCatalogParams::new(name, description))
            .await?;
        wait_embedded(&self.client, created.tasks.as_ref()).await?;

        let mut catalog = AdminCatalog::new(self.client.clone(), created);
        catalog.refresh().await?;
        self.refresh().await?;
        Ok(catalog)
    }

    async fn get_admin_catalog_by_href(&self, href: &str) -> Result<AdminCatalog, ApiError> {
        let catalog: CatalogType = self.client.get_xml(&admin_href(href)?).await?;
        Ok(AdminCatalog::new(self.client.clone(), catalog))
    }

    pub async fn get_admin_catalog_by_name(&self, name: &str) -> Result<AdminCatalog, ApiError> {
        let reference = unique_by_name(self.catalog_references(), "catalog", name, |r| {
            r.name_or_empty()
        })?;
        self.get_admin_catalog_by_href(&reference.href).await
    }

    pub async fn get_admin_catalog_by_id(&self, id: &str) -> Result<AdminCatalog, ApiError> {
        let reference = self
            .catalog_references()
            .iter()
            .find(|r| same_id(&r.href, id))
            .ok_or_else(|| ApiError::not_found("catalog", id))?;
        self.get_admin_catalog_by_href(&reference.href).await
    }

    pub async fn get_admin_catalog_by_name_or_id(
        &self,
        identifier: &str,
    ) -> Result<AdminCatalog, ApiError> {
        get_entity_by_name_or_id(
            identifier,
            |id| self.get_admin_catalog_by_id(id),
            |name| self.get_admin_catalog_by_name(name),
        )
        .await
    }

    /// Reference to the role named `name`, as needed in a user body
    pub async fn get_role_reference(&self, name: &str) -> Result<Reference, ApiError> {
        let query = Query::new(QueryType::Role)
            .with_filter(format!("name=={}", escape_filter_value(name)));
        let records = self.client.cumulative_query(&query).await?;
        let record = unique_by_name(&records.roles, "role", name, |r| r.name.as_str())?;
        Ok(Reference {
            href: record.href.clone(),
            id: None,
            name: Some(record.name.clone()),
            type_: Some(mime::ADMIN_ROLE.to_string()),
        })
    }

    /// Creates a user and returns it once vCD lets it be read back
    pub async fn create_user(&mut self, config: &OrgUserConfiguration) -> Result<OrgUser, ApiError> {
        config.validate()?;
        let role = self.get_role_reference(&config.role_name).await?;
        let href = format!("{}/users", require_href(&self.admin_org.href, "organization")?);
        tracing::info!(
            "Creating user {} with role {} in organization {}",
            config.name,
            config.role_name,
            self.admin_org.name
        );
        let created: OrgUserType = self
            .client
            .post_xml(&href, mime::ADMIN_USER, &UserBody::from_configuration(config, role))
            .await?;
        let user_href = require_href(&created.href, "created user")?.to_string();

        let settings = self.client.config();
        let started = Instant::now();
        let user = loop {
            match self.client.get_user_by_href(&user_href).await {
                Ok(user) => break user,
                Err(e) if started.elapsed() < settings.max_retry_timeout => {
                    tracing::debug!("User {} not readable yet: {}", config.name, e);
                    tokio::time::sleep(settings.busy_retry_interval).await;
                }
                Err(e) => return Err(e),
            }
        };
        self.refresh().await?;
        Ok(user)
    }

    pub async fn get_user_by_name(&self, name: &str) -> Result<OrgUser, ApiError> {
        let reference = unique_by_name(self.user_references(), "user", name, |r| {
            r.name_or_empty()
        })?;
        self.client.get_user_by_href(&reference.href).await
    }

    pub async fn get_user_by_id(&self, id: &str) -> Result<OrgUser, ApiError> {
        let reference = self
            .user_references()
            .iter()
            .find(|r| same_id(&r.href, id))
            .ok_or_else(|| ApiError::not_found("user", id))?;
        self.client.get_user_by_href(&reference.href).await
    }

    pub async fn get_user_by_name_or_id(&self, identifier: &str) -> Result<OrgUser, ApiError> {
        get_entity_by_name_or_id(
            identifier,
            |id| self.get_user_by_id(id),
            |name| self.get_user_by_name(name),
        )
        .await
    }

    /// Deletes the user named or identified by `identifier`
    pub async fn delete_user(&mut self, identifier: &str) -> Result<(), ApiError> {
        self.get_user_by_name_or_id(identifier).await?.delete().await?;
        self.refresh().await
    }
}

impl Client {
    pub async fn get_admin_org_by_href(&self, href: &str) -> Result<AdminOrg, ApiError> {
        let org: AdminOrgType = self.get_xml(&admin_href(href)?).await?;
        Ok(AdminOrg::new(self.clone(), org))
    }

    pub async fn get_admin_org_by_name(&self, name: &str) -> Result<AdminOrg, ApiError> {
        let list = self.get_org_list().await?;
        let reference = unique_by_name(&list.orgs, "organization", name, |r| r.name_or_empty())?;
        self.get_admin_org_by_href(&reference.href).await
    }

    pub async fn get_admin_org_by_id(&self, id: &str) -> Result<AdminOrg, ApiError> {
        if extract_uuid(id).is_none() {
            return Err(ApiError::not_found("organization", id));
        }
        let list = self.get_org_list().await?;
        let reference = list
            .orgs
            .iter()
            .find(|r| same_id(&r.href, id))
            .ok_or_else(|| ApiError::not_found("organization", id))?;
        self.get_admin_org_by_href(&reference.href).await
    }

    pub async fn get_admin_org_by_name_or_id(&self, identifier: &str) -> Result<AdminOrg, ApiError> {
        get_entity_by_name_or_id(
            identifier,
            |id| self.get_admin_org_by_id(id),
            |name| self.get_admin_org_by_name(name),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_client, task_xml, CATALOG_ID, ORG_ID, TASK_ID};
    use crate::api::user::PROVIDER_INTEGRATED;
    use mockito::{Matcher, Server};

    const USER_ID: &str = "77777777-7777-7777-7777-777777777777";

    fn admin_org_xml(base: &str, with_user: bool) -> String {
        let users = if with_user {
            format!(r#"<UserReference href="{base}/api/admin/user/{USER_ID}" name="alice" type="application/vnd.vmware.admin.user+xml"/>"#)
        } else {
            String::new()
        };
        format!(
            r#"<AdminOrg xmlns="http://www.vmware.com/vcloud/v1.5" href="{base}/api/admin/org/{ORG_ID}" name="acme">
    <FullName>Acme Corp</FullName>
    <IsEnabled>true</IsEnabled>
    <Users>{users}</Users>
    <Catalogs>
        <CatalogReference href="{base}/api/admin/catalog/{CATALOG_ID}" name="library" type="application/vnd.vmware.admin.catalog+xml"/>
    </Catalogs>
    <Vdcs>
        <Vdc href="{base}/api/vdc/v1" name="dev-vdc" type="application/vnd.vmware.vcloud.vdc+xml"/>
    </Vdcs>
</AdminOrg>"#
        )
    }

    fn user_xml(base: &str) -> String {
        format!(
            r#"<User xmlns="http://www.vmware.com/vcloud/v1.5" href="{base}/api/admin/user/{USER_ID}" name="alice">
    <IsEnabled>true</IsEnabled>
    <ProviderType>INTEGRATED</ProviderType>
    <Role href="{base}/api/admin/role/r1" name="vApp Author"/>
</User>"#
        )
    }

    fn admin_org(base: &str, with_user: bool) -> AdminOrg {
        AdminOrg::new(
            create_test_client(base),
            crate::api::response::decode_xml(&admin_org_xml(base, with_user)).unwrap(),
        )
    }

    #[tokio::test]
    async fn admin_org_by_name_uses_admin_href() {
        let mut server = Server::new_async().await;
        let base = server.url();
        server
            .mock("GET", "/api/org")
            .with_status(200)
            .with_body(format!(
                r#"<OrgList xmlns="http://www.vmware.com/vcloud/v1.5"><Org href="{base}/api/org/{ORG_ID}" name="acme"/></OrgList>"#
            ))
            .create_async()
            .await;
        let get = server
            .mock("GET", format!("/api/admin/org/{}", ORG_ID).as_str())
            .with_status(200)
            .with_body(admin_org_xml(&base, true))
            .create_async()
            .await;

        let org = create_test_client(&base)
            .get_admin_org_by_name_or_id("acme")
            .await
            .unwrap();
        assert_eq!(org.admin_org.full_name.as_deref(), Some("Acme Corp"));
        assert_eq!(org.catalog_references().len(), 1);
        assert_eq!(org.vdc_references()[0].name_or_empty(), "dev-vdc");
        get.assert_async().await;
    }

    #[tokio::test]
    async fn create_catalog_waits_for_task() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let create = server
            .mock("POST", format!("/api/admin/org/{}/catalogs", ORG_ID).as_str())
            .match_header("content-type", "application/vnd.vmware.admin.catalog+xml")
            .match_body(Matcher::Regex(r#"<AdminCatalog xmlns="[^"]+" name="images""#.to_string()))
            .with_status(201)
            .with_body(format!(
                r#"<AdminCatalog xmlns="http://www.vmware.com/vcloud/v1.5" href="{base}/api/admin/catalog/{CATALOG_ID}" name="images">
    <Tasks><Task href="{base}/api/task/{TASK_ID}" status="running"/></Tasks>
</AdminCatalog>"#
            ))
            .create_async()
            .await;
        server
            .mock("GET", format!("/api/task/{}", TASK_ID).as_str())
            .with_status(200)
            .with_body(task_xml(&base, TASK_ID, "success"))
            .create_async()
            .await;
        server
            .mock("GET", format!("/api/admin/catalog/{}", CATALOG_ID).as_str())
            .with_status(200)
            .with_body(format!(
                r#"<AdminCatalog xmlns="http://www.vmware.com/vcloud/v1.5" href="{base}/api/admin/catalog/{CATALOG_ID}" name="images"/>"#
            ))
            .create_async()
            .await;
        server
            .mock("GET", format!("/api/admin/org/{}", ORG_ID).as_str())
            .with_status(200)
            .with_body(admin_org_xml(&base, false))
            .create_async()
            .await;

        let mut org = admin_org(&base, false);
        let catalog = org.create_catalog("images", "").await.unwrap();
        assert_eq!(catalog.name(), "images");
        assert!(org.create_catalog("", "").await.is_err());
        create.assert_async().await;
    }

    #[tokio::test]
    async fn role_reference_from_query() {
        let mut server = Server::new_async().await;
        let base = server.url();
        server
            .mock("GET", "/api/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "role".into()),
                Matcher::UrlEncoded("filter".into(), "name==vApp Author".into()),
            ]))
            .with_status(200)
            .with_body(format!(
                r#"<QueryResultRecords xmlns="http://www.vmware.com/vcloud/v1.5" total="1" page="1" pageSize="128">
    <RoleRecord name="vApp Author" href="{base}/api/admin/role/r1" isReadOnly="true"/>
</QueryResultRecords>"#
            ))
            .create_async()
            .await;

        let role = admin_org(&base, false)
            .get_role_reference("vApp Author")
            .await
            .unwrap();
        assert_eq!(role.href, format!("{}/api/admin/role/r1", base));
        assert_eq!(role.type_.as_deref(), Some(mime::ADMIN_ROLE));
    }

    #[tokio::test]
    async fn create_user_retries_until_readable() {
        let mut server = Server::new_async().await;
        let base = server.url();
        server
            .mock("GET", "/api/query")
            .match_query(Matcher::UrlEncoded("type".into(), "role".into()))
            .with_status(200)
            .with_body(format!(
                r#"<QueryResultRecords xmlns="http://www.vmware.com/vcloud/v1.5" total="1" page="1" pageSize="128">
    <RoleRecord name="vApp Author" href="{base}/api/admin/role/r1"/>
</QueryResultRecords>"#
            ))
            .create_async()
            .await;
        let create = server
            .mock("POST", format!("/api/admin/org/{}/users", ORG_ID).as_str())
            .match_header("content-type", "application/vnd.vmware.admin.user+xml")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"<User xmlns="[^"]+" name="alice">"#.to_string()),
                Matcher::Regex(format!("<ProviderType>{}</ProviderType>", PROVIDER_INTEGRATED)),
                Matcher::Regex("<Password>pw</Password>".to_string()),
            ]))
            .with_status(201)
            .with_body(user_xml(&base))
            .create_async()
            .await;
        // mocks are consumed in creation order until their expected hits are reached
        let missing = server
            .mock("GET", format!("/api/admin/user/{}", USER_ID).as_str())
            .with_status(404)
            .with_body(r#"<Error xmlns="http://www.vmware.com/vcloud/v1.5" majorErrorCode="404" minorErrorCode="RESOURCE_NOT_FOUND" message="not yet"/>"#)
            .expect(1)
            .create_async()
            .await;
        let found = server
            .mock("GET", format!("/api/admin/user/{}", USER_ID).as_str())
            .with_status(200)
            .with_body(user_xml(&base))
            .create_async()
            .await;
        server
            .mock("GET", format!("/api/admin/org/{}", ORG_ID).as_str())
            .with_status(200)
            .with_body(admin_org_xml(&base, true))
            .create_async()
            .await;

        let mut org = admin_org(&base, false);
        let config = OrgUserConfiguration::new("alice", "vApp Author").with_password("pw");
        let user = org.create_user(&config).await.unwrap();
        assert_eq!(user.name(), "alice");
        assert_eq!(org.user_references().len(), 1);
        create.assert_async().await;
        missing.assert_async().await;
        found.assert_async().await;
    }

    #[tokio::test]
    async fn user_lookup_by_name_or_id() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let get = server
            .mock("GET", format!("/api/admin/user/{}", USER_ID).as_str())
            .with_status(200)
            .with_body(user_xml(&base))
            .expect(2)
            .create_async()
            .await;

        let org = admin_org(&base, true);
        org.get_user_by_name_or_id("alice").await.unwrap();
        org.get_user_by_name_or_id(USER_ID).await.unwrap();
        assert!(org
            .get_user_by_name_or_id("bob")
            .await
            .unwrap_err()
            .is_not_found());
        get.assert_async().await;
    }
}
