//! Typed query service (`GET /api/query?type=...&format=records`)

use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::{ApiQueryParams, Link};
use super::error::ApiError;
use super::metadata::Metadata;
use super::Client;

pub const DEFAULT_PAGE_SIZE: u32 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Media,
    AdminMedia,
    VAppTemplate,
    AdminVAppTemplate,
    CatalogItem,
    AdminCatalogItem,
    Catalog,
    AdminCatalog,
    EdgeGateway,
    Vm,
    AdminVm,
    VApp,
    AdminVApp,
    OrgVdcNetwork,
    OrgVdc,
    AdminOrgVdc,
    Role,
    Disk,
    AdminDisk,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Media => "media",
            QueryType::AdminMedia => "adminMedia",
            QueryType::VAppTemplate => "vAppTemplate",
            QueryType::AdminVAppTemplate => "adminVAppTemplate",
            QueryType::CatalogItem => "catalogItem",
            QueryType::AdminCatalogItem => "adminCatalogItem",
            QueryType::Catalog => "catalog",
            QueryType::AdminCatalog => "adminCatalog",
            QueryType::EdgeGateway => "edgeGateway",
            QueryType::Vm => "vm",
            QueryType::AdminVm => "adminVM",
            QueryType::VApp => "vApp",
            QueryType::AdminVApp => "adminVApp",
            QueryType::OrgVdcNetwork => "orgVdcNetwork",
            QueryType::OrgVdc => "orgVdc",
            QueryType::AdminOrgVdc => "adminOrgVdc",
            QueryType::Role => "role",
            QueryType::Disk => "disk",
            QueryType::AdminDisk => "adminDisk",
        }
    }

    /// The system administrator flavor of this query, where one exists
    pub fn admin(self) -> Self {
        match self {
            QueryType::Media => QueryType::AdminMedia,
            QueryType::VAppTemplate => QueryType::AdminVAppTemplate,
            QueryType::CatalogItem => QueryType::AdminCatalogItem,
            QueryType::Catalog => QueryType::AdminCatalog,
            QueryType::Vm => QueryType::AdminVm,
            QueryType::VApp => QueryType::AdminVApp,
            QueryType::OrgVdc => QueryType::AdminOrgVdc,
            QueryType::Disk => QueryType::AdminDisk,
            other => other,
        }
    }

    /// Attribute holding the parent's name, used in scoped query filters
    pub fn parent_name_field(&self) -> Option<&'static str> {
        match self {
            QueryType::Media
            | QueryType::AdminMedia
            | QueryType::VAppTemplate
            | QueryType::AdminVAppTemplate
            | QueryType::CatalogItem
            | QueryType::AdminCatalogItem => Some("catalogName"),
            QueryType::Vm | QueryType::AdminVm => Some("containerName"),
            QueryType::VApp | QueryType::AdminVApp | QueryType::Disk | QueryType::AdminDisk => {
                Some("vdcName")
            }
            QueryType::EdgeGateway => Some("orgVdcName"),
            QueryType::OrgVdcNetwork => Some("vdcName"),
            QueryType::Catalog | QueryType::AdminCatalog => Some("orgName"),
            QueryType::OrgVdc | QueryType::AdminOrgVdc => Some("orgName"),
            QueryType::Role => None,
        }
    }

    /// Attributes requested through `fields` when metadata columns are added
    pub fn default_fields(&self) -> &'static [&'static str] {
        match self {
            QueryType::Media | QueryType::AdminMedia => &[
                "name",
                "catalog",
                "catalogName",
                "catalogItem",
                "creationDate",
                "status",
                "storageB",
                "vdc",
                "vdcName",
                "ownerName",
                "isBusy",
            ],
            QueryType::VAppTemplate | QueryType::AdminVAppTemplate => &[
                "name",
                "catalogName",
                "creationDate",
                "status",
                "vdc",
                "vdcName",
                "ownerName",
                "isExpired",
            ],
            QueryType::CatalogItem | QueryType::AdminCatalogItem => &[
                "name",
                "catalog",
                "catalogName",
                "creationDate",
                "entity",
                "entityName",
                "entityType",
                "status",
                "vdc",
                "vdcName",
            ],
            QueryType::Catalog | QueryType::AdminCatalog => &[
                "name",
                "orgName",
                "creationDate",
                "isPublished",
                "isShared",
                "numberOfMedia",
                "numberOfVAppTemplates",
                "ownerName",
            ],
            QueryType::EdgeGateway => &[
                "name",
                "vdc",
                "orgVdcName",
                "gatewayStatus",
                "haStatus",
                "numberOfExtNetworks",
                "numberOfOrgNetworks",
            ],
            QueryType::Vm | QueryType::AdminVm => &[
                "name",
                "container",
                "containerName",
                "vdc",
                "status",
                "ipAddress",
                "guestOs",
                "numberOfCpus",
                "memoryMB",
                "isVAppTemplate",
                "dateCreated",
            ],
            QueryType::VApp | QueryType::AdminVApp => &[
                "name",
                "vdc",
                "vdcName",
                "creationDate",
                "status",
                "ownerName",
                "numberOfVMs",
            ],
            QueryType::OrgVdcNetwork => &[
                "name",
                "vdc",
                "vdcName",
                "defaultGateway",
                "netmask",
                "linkType",
                "connectedTo",
                "isShared",
            ],
            QueryType::OrgVdc | QueryType::AdminOrgVdc => &[
                "name",
                "org",
                "orgName",
                "providerVdcName",
                "numberOfVApps",
                "isEnabled",
            ],
            QueryType::Role => &["name", "isReadOnly"],
            QueryType::Disk | QueryType::AdminDisk => &[
                "name",
                "vdc",
                "vdcName",
                "sizeMb",
                "datastoreName",
                "storageProfileName",
                "isAttached",
                "status",
                "ownerName",
            ],
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryMediaRecord {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@catalog", default)]
    pub catalog: Option<String>,
    #[serde(rename = "@catalogName", default)]
    pub catalog_name: Option<String>,
    #[serde(rename = "@catalogItem", default)]
    pub catalog_item: Option<String>,
    #[serde(rename = "@creationDate", default)]
    pub creation_date: Option<String>,
    #[serde(rename = "@status", default)]
    pub status: Option<String>,
    #[serde(rename = "@storageB", default)]
    pub storage_b: Option<i64>,
    #[serde(rename = "@vdc", default)]
    pub vdc: Option<String>,
    #[serde(rename = "@vdcName", default)]
    pub vdc_name: Option<String>,
    #[serde(rename = "@ownerName", default)]
    pub owner_name: Option<String>,
    #[serde(rename = "@isBusy", default)]
    pub is_busy: Option<bool>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryVAppTemplateRecord {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@catalog", default)]
    pub catalog: Option<String>,
    #[serde(rename = "@catalogName", default)]
    pub catalog_name: Option<String>,
    #[serde(rename = "@creationDate", default)]
    pub creation_date: Option<String>,
    #[serde(rename = "@status", default)]
    pub status: Option<String>,
    #[serde(rename = "@vdc", default)]
    pub vdc: Option<String>,
    #[serde(rename = "@vdcName", default)]
    pub vdc_name: Option<String>,
    #[serde(rename = "@ownerName", default)]
    pub owner_name: Option<String>,
    #[serde(rename = "@isExpired", default)]
    pub is_expired: Option<bool>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryCatalogItemRecord {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@catalog", default)]
    pub catalog: Option<String>,
    #[serde(rename = "@catalogName", default)]
    pub catalog_name: Option<String>,
    #[serde(rename = "@creationDate", default)]
    pub creation_date: Option<String>,
    #[serde(rename = "@entity", default)]
    pub entity: Option<String>,
    #[serde(rename = "@entityName", default)]
    pub entity_name: Option<String>,
    #[serde(rename = "@entityType", default)]
    pub entity_type: Option<String>,
    #[serde(rename = "@status", default)]
    pub status: Option<String>,
    #[serde(rename = "@vdc", default)]
    pub vdc: Option<String>,
    #[serde(rename = "@vdcName", default)]
    pub vdc_name: Option<String>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryCatalogRecord {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@orgName", default)]
    pub org_name: Option<String>,
    #[serde(rename = "@creationDate", default)]
    pub creation_date: Option<String>,
    #[serde(rename = "@isPublished", default)]
    pub is_published: Option<bool>,
    #[serde(rename = "@isShared", default)]
    pub is_shared: Option<bool>,
    #[serde(rename = "@numberOfMedia", default)]
    pub number_of_media: Option<i64>,
    #[serde(rename = "@numberOfVAppTemplates", default)]
    pub number_of_vapp_templates: Option<i64>,
    #[serde(rename = "@ownerName", default)]
    pub owner_name: Option<String>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryEdgeGatewayRecord {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@vdc", default)]
    pub vdc: Option<String>,
    #[serde(rename = "@orgVdcName", default)]
    pub org_vdc_name: Option<String>,
    #[serde(rename = "@gatewayStatus", default)]
    pub gateway_status: Option<String>,
    #[serde(rename = "@haStatus", default)]
    pub ha_status: Option<String>,
    #[serde(rename = "@numberOfExtNetworks", default)]
    pub number_of_ext_networks: Option<i64>,
    #[serde(rename = "@numberOfOrgNetworks", default)]
    pub number_of_org_networks: Option<i64>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryVmRecord {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@container", default)]
    pub container: Option<String>,
    #[serde(rename = "@containerName", default)]
    pub container_name: Option<String>,
    #[serde(rename = "@vdc", default)]
    pub vdc: Option<String>,
    #[serde(rename = "@status", default)]
    pub status: Option<String>,
    #[serde(rename = "@ipAddress", default)]
    pub ip_address: Option<String>,
    #[serde(rename = "@guestOs", default)]
    pub guest_os: Option<String>,
    #[serde(rename = "@numberOfCpus", default)]
    pub number_of_cpus: Option<i64>,
    #[serde(rename = "@memoryMB", default)]
    pub memory_mb: Option<i64>,
    #[serde(rename = "@isVAppTemplate", default)]
    pub is_vapp_template: Option<bool>,
    #[serde(rename = "@dateCreated", default)]
    pub date_created: Option<String>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryVAppRecord {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@vdc", default)]
    pub vdc: Option<String>,
    #[serde(rename = "@vdcName", default)]
    pub vdc_name: Option<String>,
    #[serde(rename = "@creationDate", default)]
    pub creation_date: Option<String>,
    #[serde(rename = "@status", default)]
    pub status: Option<String>,
    #[serde(rename = "@ownerName", default)]
    pub owner_name: Option<String>,
    #[serde(rename = "@numberOfVMs", default)]
    pub number_of_vms: Option<i64>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryOrgVdcNetworkRecord {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@vdc", default)]
    pub vdc: Option<String>,
    #[serde(rename = "@vdcName", default)]
    pub vdc_name: Option<String>,
    #[serde(rename = "@defaultGateway", default)]
    pub default_gateway: Option<String>,
    #[serde(rename = "@netmask", default)]
    pub netmask: Option<String>,
    #[serde(rename = "@linkType", default)]
    pub link_type: Option<i32>,
    #[serde(rename = "@connectedTo", default)]
    pub connected_to: Option<String>,
    #[serde(rename = "@isShared", default)]
    pub is_shared: Option<bool>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryOrgVdcRecord {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@org", default)]
    pub org: Option<String>,
    #[serde(rename = "@orgName", default)]
    pub org_name: Option<String>,
    #[serde(rename = "@providerVdcName", default)]
    pub provider_vdc_name: Option<String>,
    #[serde(rename = "@numberOfVApps", default)]
    pub number_of_vapps: Option<i64>,
    #[serde(rename = "@isEnabled", default)]
    pub is_enabled: Option<bool>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRoleRecord {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@isReadOnly", default)]
    pub is_read_only: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryDiskRecord {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@vdc", default)]
    pub vdc: Option<String>,
    #[serde(rename = "@vdcName", default)]
    pub vdc_name: Option<String>,
    #[serde(rename = "@sizeMb", default)]
    pub size_mb: Option<i64>,
    #[serde(rename = "@datastoreName", default)]
    pub datastore_name: Option<String>,
    #[serde(rename = "@storageProfileName", default)]
    pub storage_profile_name: Option<String>,
    #[serde(rename = "@isAttached", default)]
    pub is_attached: Option<bool>,
    #[serde(rename = "@status", default)]
    pub status: Option<String>,
    #[serde(rename = "@ownerName", default)]
    pub owner_name: Option<String>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Option<Metadata>,
}

/// One page (or several accumulated pages) of query results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "QueryResultRecords")]
pub struct QueryResultRecords {
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "@href", default)]
    pub href: Option<String>,
    #[serde(rename = "@page", default)]
    pub page: u32,
    #[serde(rename = "@pageSize", default)]
    pub page_size: u32,
    #[serde(rename = "@total", default)]
    pub total: u64,
    #[serde(rename = "Link", default)]
    pub links: Vec<Link>,
    #[serde(rename = "MediaRecord", alias = "AdminMediaRecord", default)]
    pub media: Vec<QueryMediaRecord>,
    #[serde(
        rename = "VAppTemplateRecord",
        alias = "AdminVAppTemplateRecord",
        default
    )]
    pub vapp_templates: Vec<QueryVAppTemplateRecord>,
    #[serde(rename = "CatalogItemRecord", alias = "AdminCatalogItemRecord", default)]
    pub catalog_items: Vec<QueryCatalogItemRecord>,
    #[serde(rename = "CatalogRecord", alias = "AdminCatalogRecord", default)]
    pub catalogs: Vec<QueryCatalogRecord>,
    #[serde(rename = "EdgeGatewayRecord", default)]
    pub edge_gateways: Vec<QueryEdgeGatewayRecord>,
    #[serde(rename = "VMRecord", alias = "AdminVMRecord", default)]
    pub vms: Vec<QueryVmRecord>,
    #[serde(rename = "VAppRecord", alias = "AdminVAppRecord", default)]
    pub vapps: Vec<QueryVAppRecord>,
    #[serde(rename = "OrgVdcNetworkRecord", default)]
    pub org_vdc_networks: Vec<QueryOrgVdcNetworkRecord>,
    #[serde(rename = "OrgVdcRecord", alias = "AdminVdcRecord", default)]
    pub org_vdcs: Vec<QueryOrgVdcRecord>,
    #[serde(rename = "RoleRecord", default)]
    pub roles: Vec<QueryRoleRecord>,
    #[serde(rename = "DiskRecord", alias = "AdminDiskRecord", default)]
    pub disks: Vec<QueryDiskRecord>,
}

impl QueryResultRecords {
    /// Number of records held, across all record kinds
    pub fn len(&self) -> usize {
        self.media.len()
            + self.vapp_templates.len()
            + self.catalog_items.len()
            + self.catalogs.len()
            + self.edge_gateways.len()
            + self.vms.len()
            + self.vapps.len()
            + self.org_vdc_networks.len()
            + self.org_vdcs.len()
            + self.roles.len()
            + self.disks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn append(&mut self, mut other: QueryResultRecords) {
        self.media.append(&mut other.media);
        self.vapp_templates.append(&mut other.vapp_templates);
        self.catalog_items.append(&mut other.catalog_items);
        self.catalogs.append(&mut other.catalogs);
        self.edge_gateways.append(&mut other.edge_gateways);
        self.vms.append(&mut other.vms);
        self.vapps.append(&mut other.vapps);
        self.org_vdc_networks.append(&mut other.org_vdc_networks);
        self.org_vdcs.append(&mut other.org_vdcs);
        self.roles.append(&mut other.roles);
        self.disks.append(&mut other.disks);
    }
}

/// Parameters of a records query
#[derive(Debug, Clone)]
pub struct Query {
    pub query_type: QueryType,
    pub filter: Option<String>,
    pub fields: Option<String>,
    pub sort_asc: Option<String>,
    pub page_size: u32,
}

impl Query {
    pub fn new(query_type: QueryType) -> Self {
        Self {
            query_type,
            filter: None,
            fields: None,
            sort_asc: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Adds `clause` to the filter, joined with `;` (AND)
    pub fn and_filter(mut self, clause: impl Into<String>) -> Self {
        let clause = clause.into();
        self.filter = Some(match self.filter.take() {
            Some(existing) if !existing.is_empty() => format!("{};{}", existing, clause),
            _ => clause,
        });
        self
    }

    pub fn with_fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = Some(fields.into());
        self
    }

    pub fn with_sort_asc(mut self, field: impl Into<String>) -> Self {
        self.sort_asc = Some(field.into());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn params(&self, page: u32) -> ApiQueryParams {
        ApiQueryParams::new()
            .add("type", self.query_type.as_str())
            .add("format", "records")
            .add("page", page)
            .add("pageSize", self.page_size)
            .add_optional("filter", self.filter.as_deref())
            .add_optional("fields", self.fields.as_deref())
            .add_optional("sortAsc", self.sort_asc.as_deref())
    }
}

/// Escapes characters with a meaning in FIQL filters
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | ';' | '(' | ')' | '=' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Client {
    /// Runs a single page of a query
    pub async fn query_page(
        &self,
        query: &Query,
        page: u32,
    ) -> Result<QueryResultRecords, ApiError> {
        self.get_xml_with_params(&self.href("/query"), &query.params(page))
            .await
    }

    /// Runs a query and follows its pages until every record has been read
    pub async fn cumulative_query(&self, query: &Query) -> Result<QueryResultRecords, ApiError> {
        let mut page = 1;
        let mut results = self.query_page(query, page).await?;
        tracing::debug!(
            "Query {} returned {} of {} records",
            query.query_type,
            results.len(),
            results.total
        );

        while (results.len() as u64) < results.total {
            page += 1;
            let next = self.query_page(query, page).await?;
            if next.is_empty() {
                tracing::warn!(
                    "Query {} stopped at page {} with {} of {} records",
                    query.query_type,
                    page,
                    results.len(),
                    results.total
                );
                break;
            }
            results.append(next);
        }

        Ok(results)
    }

    /// Cumulative query with the admin flavor of `query_type` when logged in as sysadmin
    pub async fn query_with_admin(&self, query: Query) -> Result<QueryResultRecords, ApiError> {
        let query = if self.is_sys_admin() {
            Query {
                query_type: query.query_type.admin(),
                ..query
            }
        } else {
            query
        };
        self.cumulative_query(&query).await
    }
}
