use crate::api::metadata::Metadata;
use crate::api::query::{
    QueryCatalogItemRecord, QueryCatalogRecord, QueryDiskRecord, QueryEdgeGatewayRecord,
    QueryMediaRecord, QueryOrgVdcNetworkRecord, QueryOrgVdcRecord, QueryResultRecords,
    QueryVAppRecord, QueryVAppTemplateRecord, QueryVmRecord,
};

/// A query record that filters can be evaluated against
#[derive(Debug, Clone)]
pub enum QueryItem {
    Media(QueryMediaRecord),
    VAppTemplate(QueryVAppTemplateRecord),
    CatalogItem(QueryCatalogItemRecord),
    Catalog(QueryCatalogRecord),
    EdgeGateway(QueryEdgeGatewayRecord),
    Vm(QueryVmRecord),
    VApp(QueryVAppRecord),
    OrgVdcNetwork(QueryOrgVdcNetworkRecord),
    OrgVdc(QueryOrgVdcRecord),
    Disk(QueryDiskRecord),
}

impl QueryItem {
    pub fn name(&self) -> &str {
        match self {
            QueryItem::Media(r) => &r.name,
            QueryItem::VAppTemplate(r) => &r.name,
            QueryItem::CatalogItem(r) => &r.name,
            QueryItem::Catalog(r) => &r.name,
            QueryItem::EdgeGateway(r) => &r.name,
            QueryItem::Vm(r) => &r.name,
            QueryItem::VApp(r) => &r.name,
            QueryItem::OrgVdcNetwork(r) => &r.name,
            QueryItem::OrgVdc(r) => &r.name,
            QueryItem::Disk(r) => &r.name,
        }
    }

    pub fn href(&self) -> &str {
        match self {
            QueryItem::Media(r) => &r.href,
            QueryItem::VAppTemplate(r) => &r.href,
            QueryItem::CatalogItem(r) => &r.href,
            QueryItem::Catalog(r) => &r.href,
            QueryItem::EdgeGateway(r) => &r.href,
            QueryItem::Vm(r) => &r.href,
            QueryItem::VApp(r) => &r.href,
            QueryItem::OrgVdcNetwork(r) => &r.href,
            QueryItem::OrgVdc(r) => &r.href,
            QueryItem::Disk(r) => &r.href,
        }
    }

    /// Creation date as reported by vCD; record kinds without one return `None`
    pub fn date(&self) -> Option<&str> {
        match self {
            QueryItem::Media(r) => r.creation_date.as_deref(),
            QueryItem::VAppTemplate(r) => r.creation_date.as_deref(),
            QueryItem::CatalogItem(r) => r.creation_date.as_deref(),
            QueryItem::Catalog(r) => r.creation_date.as_deref(),
            QueryItem::Vm(r) => r.date_created.as_deref(),
            QueryItem::VApp(r) => r.creation_date.as_deref(),
            QueryItem::EdgeGateway(_)
            | QueryItem::OrgVdcNetwork(_)
            | QueryItem::OrgVdc(_)
            | QueryItem::Disk(_) => None,
        }
        .filter(|d| !d.is_empty())
    }

    /// VM address or network gateway
    pub fn ip(&self) -> Option<&str> {
        match self {
            QueryItem::Vm(r) => r.ip_address.as_deref(),
            QueryItem::OrgVdcNetwork(r) => r.default_gateway.as_deref(),
            _ => None,
        }
        .filter(|ip| !ip.is_empty())
    }

    pub fn item_type(&self) -> &'static str {
        match self {
            QueryItem::Media(_) => "media",
            QueryItem::VAppTemplate(_) => "vapp_template",
            QueryItem::CatalogItem(_) => "catalog_item",
            QueryItem::Catalog(_) => "catalog",
            QueryItem::EdgeGateway(_) => "edge_gateway",
            QueryItem::Vm(_) => "vm",
            QueryItem::VApp(_) => "vapp",
            QueryItem::OrgVdcNetwork(_) => "network",
            QueryItem::OrgVdc(_) => "vdc",
            QueryItem::Disk(_) => "disk",
        }
    }

    /// Name of the containing catalog, vApp, VDC or org
    pub fn parent_name(&self) -> Option<&str> {
        match self {
            QueryItem::Media(r) => r.catalog_name.as_deref(),
            QueryItem::VAppTemplate(r) => r.catalog_name.as_deref(),
            QueryItem::CatalogItem(r) => r.catalog_name.as_deref(),
            QueryItem::Catalog(r) => r.org_name.as_deref(),
            QueryItem::EdgeGateway(r) => r.org_vdc_name.as_deref(),
            QueryItem::Vm(r) => r.container_name.as_deref(),
            QueryItem::VApp(r) => r.vdc_name.as_deref(),
            QueryItem::OrgVdcNetwork(r) => r.vdc_name.as_deref(),
            QueryItem::OrgVdc(r) => r.org_name.as_deref(),
            QueryItem::Disk(r) => r.vdc_name.as_deref(),
        }
    }

    /// HREF of the container, when the record carries it
    pub fn parent_id(&self) -> Option<&str> {
        match self {
            QueryItem::Media(r) => r.catalog.as_deref(),
            QueryItem::VAppTemplate(r) => r.vdc.as_deref(),
            QueryItem::CatalogItem(r) => r.catalog.as_deref(),
            QueryItem::Catalog(_) => None,
            QueryItem::EdgeGateway(r) => r.vdc.as_deref(),
            QueryItem::Vm(r) => r.container.as_deref(),
            QueryItem::VApp(r) => r.vdc.as_deref(),
            QueryItem::OrgVdcNetwork(r) => r.vdc.as_deref(),
            QueryItem::OrgVdc(r) => r.org.as_deref(),
            QueryItem::Disk(r) => r.vdc.as_deref(),
        }
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        match self {
            QueryItem::Media(r) => r.metadata.as_ref(),
            QueryItem::VAppTemplate(r) => r.metadata.as_ref(),
            QueryItem::CatalogItem(r) => r.metadata.as_ref(),
            QueryItem::Catalog(r) => r.metadata.as_ref(),
            QueryItem::EdgeGateway(r) => r.metadata.as_ref(),
            QueryItem::Vm(r) => r.metadata.as_ref(),
            QueryItem::VApp(r) => r.metadata.as_ref(),
            QueryItem::OrgVdcNetwork(r) => r.metadata.as_ref(),
            QueryItem::OrgVdc(r) => r.metadata.as_ref(),
            QueryItem::Disk(r) => r.metadata.as_ref(),
        }
    }

    pub fn metadata_value(&self, key: &str, is_system: bool) -> Option<&str> {
        self.metadata().and_then(|m| m.value(key, is_system))
    }
}

impl QueryResultRecords {
    /// Flattens every record into filterable items
    pub fn into_items(self) -> Vec<QueryItem> {
        let mut items = Vec::with_capacity(self.len());
        items.extend(self.media.into_iter().map(QueryItem::Media));
        items.extend(self.vapp_templates.into_iter().map(QueryItem::VAppTemplate));
        items.extend(self.catalog_items.into_iter().map(QueryItem::CatalogItem));
        items.extend(self.catalogs.into_iter().map(QueryItem::Catalog));
        items.extend(self.edge_gateways.into_iter().map(QueryItem::EdgeGateway));
        items.extend(self.vms.into_iter().map(QueryItem::Vm));
        items.extend(self.vapps.into_iter().map(QueryItem::VApp));
        items.extend(self.org_vdc_networks.into_iter().map(QueryItem::OrgVdcNetwork));
        items.extend(self.org_vdcs.into_iter().map(QueryItem::OrgVdc));
        items.extend(self.disks.into_iter().map(QueryItem::Disk));
        items
    }
}
