//! Common types and utilities for the vCloud Director API

use serde::{Deserialize, Serialize};

use super::task::TaskType;

pub const XMLNS_VCLOUD: &str = "http://www.vmware.com/vcloud/v1.5";
pub const XMLNS_OVF: &str = "http://schemas.dmtf.org/ovf/envelope/1";
pub const XMLNS_RASD: &str =
    "http://schemas.dmtf.org/wbem/wscim/1/cim-schema/2/CIM_ResourceAllocationSettingData";
pub const XMLNS_VMW: &str = "http://www.vmware.com/schema/ovf";
pub const XMLNS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

pub const DEFAULT_API_VERSION: &str = "32.0";

/// Media types used in `Accept` and `Content-Type` headers and link lookups
pub mod mime {
    pub const ORG_LIST: &str = "application/vnd.vmware.vcloud.orgList+xml";
    pub const ORG: &str = "application/vnd.vmware.vcloud.org+xml";
    pub const ADMIN_ORG: &str = "application/vnd.vmware.admin.organization+xml";
    pub const CATALOG: &str = "application/vnd.vmware.vcloud.catalog+xml";
    pub const ADMIN_CATALOG: &str = "application/vnd.vmware.admin.catalog+xml";
    pub const CATALOG_ITEM: &str = "application/vnd.vmware.vcloud.catalogItem+xml";
    pub const VDC: &str = "application/vnd.vmware.vcloud.vdc+xml";
    pub const VAPP: &str = "application/vnd.vmware.vcloud.vApp+xml";
    pub const VM: &str = "application/vnd.vmware.vcloud.vm+xml";
    pub const VAPP_TEMPLATE: &str = "application/vnd.vmware.vcloud.vAppTemplate+xml";
    pub const MEDIA: &str = "application/vnd.vmware.vcloud.media+xml";
    pub const TASK: &str = "application/vnd.vmware.vcloud.task+xml";
    pub const DISK: &str = "application/vnd.vmware.vcloud.disk+xml";
    pub const DISK_CREATE_PARAMS: &str = "application/vnd.vmware.vcloud.diskCreateParams+xml";
    pub const DISK_ATTACH_OR_DETACH_PARAMS: &str =
        "application/vnd.vmware.vcloud.diskAttachOrDetachParams+xml";
    pub const MEDIA_INSERT_OR_EJECT_PARAMS: &str =
        "application/vnd.vmware.vcloud.mediaInsertOrEjectParams+xml";
    pub const UPLOAD_VAPP_TEMPLATE_PARAMS: &str =
        "application/vnd.vmware.vcloud.uploadVAppTemplateParams+xml";
    pub const COMPOSE_VAPP_PARAMS: &str = "application/vnd.vmware.vcloud.composeVAppParams+xml";
    pub const DEPLOY_VAPP_PARAMS: &str = "application/vnd.vmware.vcloud.deployVAppParams+xml";
    pub const UNDEPLOY_VAPP_PARAMS: &str = "application/vnd.vmware.vcloud.undeployVAppParams+xml";
    pub const METADATA: &str = "application/vnd.vmware.vcloud.metadata+xml";
    pub const METADATA_VALUE: &str = "application/vnd.vmware.vcloud.metadata.value+xml";
    pub const RASD_ITEM: &str = "application/vnd.vmware.vcloud.rasdItem+xml";
    pub const EDGE_GATEWAY: &str = "application/vnd.vmware.admin.edgeGateway+xml";
    pub const ADMIN_USER: &str = "application/vnd.vmware.admin.user+xml";
    pub const ADMIN_ROLE: &str = "application/vnd.vmware.admin.role+xml";
    pub const QUERY_RECORDS: &str = "application/vnd.vmware.vcloud.query.records+xml";
    pub const SESSION: &str = "application/vnd.vmware.vcloud.session+xml";
    pub const NSX_XML: &str = "application/xml";
}

/// Link relations
pub mod rel {
    pub const DOWN: &str = "down";
    pub const UP: &str = "up";
    pub const ADD: &str = "add";
    pub const EDIT: &str = "edit";
    pub const REMOVE: &str = "remove";
    pub const UPLOAD_DEFAULT: &str = "upload:default";
    pub const TASK_CANCEL: &str = "task:cancel";
    pub const NEXT_PAGE: &str = "nextPage";
    pub const EDGE_GATEWAYS: &str = "edgeGateways";
    pub const ATTACHED_VMS: &str = "attachedVms";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "@rel", default)]
    pub rel: String,
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(rename = "@name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Finds the first link with the given relation and, when given, media type
pub fn find_link<'a>(links: &'a [Link], rel: &str, media_type: Option<&str>) -> Option<&'a Link> {
    links.iter().find(|link| {
        link.rel == rel && media_type.map_or(true, |mt| link.type_.as_deref() == Some(mt))
    })
}

pub fn find_link_by_name<'a>(
    links: &'a [Link],
    rel: &str,
    media_type: &str,
    name: &str,
) -> Option<&'a Link> {
    links.iter().find(|link| {
        link.rel == rel
            && link.type_.as_deref() == Some(media_type)
            && link.name.as_deref() == Some(name)
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "@name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
}

impl Reference {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Default::default()
        }
    }

    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

/// Tasks embedded in an entity while it is being created or modified
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tasks {
    #[serde(rename = "Task", default)]
    pub task: Vec<TaskType>,
}

/// Files of a Media or vApp template, each carrying its upload link
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Files {
    #[serde(rename = "File", default)]
    pub file: Vec<FileEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileEntry {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@href", default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(rename = "@size", default)]
    pub size: i64,
    #[serde(rename = "@bytesTransferred", default)]
    pub bytes_transferred: i64,
    #[serde(rename = "@checksum", default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(rename = "Link", default)]
    pub links: Vec<Link>,
}

impl FileEntry {
    pub fn upload_link(&self) -> Option<&Link> {
        find_link(&self.links, rel::UPLOAD_DEFAULT, None)
    }
}

/// Body of a vCD error response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "Error")]
pub struct VcdErrorXml {
    #[serde(rename = "@majorErrorCode", default)]
    pub major_error_code: Option<String>,
    #[serde(rename = "@minorErrorCode", default)]
    pub minor_error_code: Option<String>,
    #[serde(rename = "@vendorSpecificErrorCode", default)]
    pub vendor_specific_error_code: Option<String>,
    #[serde(rename = "@message", default)]
    pub message: Option<String>,
    #[serde(rename = "@stackTrace", default, skip_serializing)]
    pub stack_trace: Option<String>,
}

#[derive(Debug, Default, thiserror::Error)]
#[error("vCD error: major={major_error_code:?}, minor={minor_error_code:?}, message={message:?}")]
pub struct VcdErrorDetails {
    pub major_error_code: Option<String>,
    pub minor_error_code: Option<String>,
    pub vendor_specific_error_code: Option<String>,
    pub message: Option<String>,
}

impl From<VcdErrorXml> for VcdErrorDetails {
    fn from(xml: VcdErrorXml) -> Self {
        Self {
            major_error_code: xml.major_error_code,
            minor_error_code: xml.minor_error_code,
            vendor_specific_error_code: xml.vendor_specific_error_code,
            message: xml.message,
        }
    }
}

/// A request payload; vCD rejects bodies without their XML namespace.
pub trait XmlBody: Serialize {
    fn xml_namespace(&self) -> &str;
}

/// Human readable name of a vApp / VM status code
pub fn status_name(code: i32) -> &'static str {
    match code {
        -1 => "FAILED_CREATION",
        0 => "UNRESOLVED",
        1 => "RESOLVED",
        2 => "DEPLOYED",
        3 => "SUSPENDED",
        4 => "POWERED_ON",
        5 => "WAITING_FOR_INPUT",
        6 => "UNKNOWN",
        7 => "UNRECOGNIZED",
        8 => "POWERED_OFF",
        9 => "INCONSISTENT_STATE",
        10 => "MIXED",
        11 => "DESCRIPTOR_PENDING",
        12 => "COPYING_CONTENTS",
        13 => "DISK_CONTENTS_PENDING",
        14 => "QUARANTINED",
        15 => "QUARANTINE_EXPIRED",
        16 => "REJECTED",
        17 => "TRANSFER_TIMEOUT",
        18 => "VAPP_UNDEPLOYED",
        19 => "VAPP_PARTIALLY_DEPLOYED",
        _ => "UNRECOGNIZED",
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn apply(&self, params: ApiQueryParams) -> ApiQueryParams {
        params
            .add_optional("page", self.page)
            .add_optional("pageSize", self.page_size)
    }
}
