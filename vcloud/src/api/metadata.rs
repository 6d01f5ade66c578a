//! Metadata entries attached to vCD entities

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::{mime, Link, XmlBody, XMLNS_VCLOUD, XMLNS_XSI};
use super::error::ApiError;
use super::Client;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataType {
    #[default]
    String,
    Number,
    Boolean,
    DateTime,
}

impl MetadataType {
    pub fn xsi_type(&self) -> &'static str {
        match self {
            MetadataType::String => "MetadataStringValue",
            MetadataType::Number => "MetadataNumberValue",
            MetadataType::Boolean => "MetadataBooleanValue",
            MetadataType::DateTime => "MetadataDateTimeValue",
        }
    }

    /// Name used in query filters (`metadata:key==STRING:value`)
    pub fn query_name(&self) -> &'static str {
        match self {
            MetadataType::String => "STRING",
            MetadataType::Number => "NUMBER",
            MetadataType::Boolean => "BOOLEAN",
            MetadataType::DateTime => "DATETIME",
        }
    }

    /// Accepts both the `xsi:type` and the short query spelling, case-insensitively
    pub fn parse(value: &str) -> Result<Self, ApiError> {
        match value.to_ascii_lowercase().as_str() {
            "metadatastringvalue" | "string" => Ok(MetadataType::String),
            "metadatanumbervalue" | "number" | "int" => Ok(MetadataType::Number),
            "metadatabooleanvalue" | "boolean" | "bool" => Ok(MetadataType::Boolean),
            "metadatadatetimevalue" | "datetime" | "date" => Ok(MetadataType::DateTime),
            _ => Err(ApiError::InvalidRequest(format!(
                "unknown metadata type '{}'",
                value
            ))),
        }
    }
}

impl fmt::Display for MetadataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.xsi_type())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypedValue {
    #[serde(rename = "@xsi:type", alias = "@type", default)]
    pub xsi_type: String,
    #[serde(rename = "Value", default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataDomain {
    #[serde(rename = "@visibility", default)]
    pub visibility: Option<String>,
    #[serde(rename = "$text", default)]
    pub domain: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataEntry {
    #[serde(rename = "@href", default)]
    pub href: Option<String>,
    #[serde(rename = "Domain", default)]
    pub domain: Option<MetadataDomain>,
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "TypedValue")]
    pub typed_value: TypedValue,
}

impl MetadataEntry {
    pub fn is_system(&self) -> bool {
        self.domain
            .as_ref()
            .is_some_and(|d| d.domain.eq_ignore_ascii_case("SYSTEM"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "Metadata")]
pub struct Metadata {
    #[serde(rename = "@href", default)]
    pub href: Option<String>,
    #[serde(rename = "Link", default)]
    pub links: Vec<Link>,
    #[serde(rename = "MetadataEntry", default)]
    pub entries: Vec<MetadataEntry>,
}

impl Metadata {
    /// Value of `key`, looking in the general domain unless `system` is set
    pub fn value(&self, key: &str, system: bool) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key && e.is_system() == system)
            .map(|e| e.typed_value.value.as_str())
    }
}

/// Body of PUT `<href>/metadata/<key>`
#[derive(Debug, Clone, Serialize)]
#[serde(rename = "MetadataValue")]
pub struct MetadataValue {
    #[serde(rename = "@xmlns")]
    pub xmlns: String,
    #[serde(rename = "@xmlns:xsi")]
    pub xmlns_xsi: String,
    #[serde(rename = "TypedValue")]
    pub typed_value: TypedValue,
}

impl MetadataValue {
    pub fn new(value: impl Into<String>, kind: MetadataType) -> Self {
        Self {
            xmlns: XMLNS_VCLOUD.to_string(),
            xmlns_xsi: XMLNS_XSI.to_string(),
            typed_value: TypedValue {
                xsi_type: kind.xsi_type().to_string(),
                value: value.into(),
            },
        }
    }
}

impl XmlBody for MetadataValue {
    fn xml_namespace(&self) -> &str {
        &self.xmlns
    }
}

fn entry_href(href: &str, key: &str) -> String {
    format!("{}/metadata/{}", href, urlencoding::encode(key))
}

impl Client {
    pub async fn get_metadata(&self, href: &str) -> Result<Metadata, ApiError> {
        self.get_xml(&format!("{}/metadata", href)).await
    }

    pub async fn set_metadata(
        &self,
        href: &str,
        key: &str,
        value: &str,
        kind: MetadataType,
    ) -> Result<(), ApiError> {
        if key.is_empty() {
            return Err(ApiError::InvalidRequest(
                "metadata key cannot be empty".to_string(),
            ));
        }
        let body = MetadataValue::new(value, kind);
        let mut task = self
            .put_xml_task(&entry_href(href, key), mime::METADATA_VALUE, &body)
            .await?;
        task.wait_completion().await
    }

    pub async fn delete_metadata(&self, href: &str, key: &str) -> Result<(), ApiError> {
        let mut task = self.delete_task(&entry_href(href, key)).await?;
        task.wait_completion().await
    }
}

/// Entities that carry metadata at `<href>/metadata`
#[async_trait]
pub trait MetadataHolder: Sync {
    fn metadata_client(&self) -> &Client;
    fn metadata_href(&self) -> &str;

    async fn get_metadata(&self) -> Result<Metadata, ApiError> {
        self.metadata_client()
            .get_metadata(self.metadata_href())
            .await
    }

    async fn add_metadata_entry(
        &self,
        key: &str,
        value: &str,
        kind: MetadataType,
    ) -> Result<(), ApiError> {
        self.metadata_client()
            .set_metadata(self.metadata_href(), key, value, kind)
            .await
    }

    async fn delete_metadata_entry(&self, key: &str) -> Result<(), ApiError> {
        self.metadata_client()
            .delete_metadata(self.metadata_href(), key)
            .await
    }
}
