//! Media (ISO images) stored in catalogs

use std::fmt;

use serde::{Deserialize, Serialize};

use super::common::{Files, Link, Reference, Tasks};
use super::error::ApiError;
use super::href::require_href;
use super::metadata::MetadataHolder;
use super::task::Task;
use super::Client;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "Media")]
pub struct MediaType {
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@type", default)]
    pub type_: Option<String>,
    #[serde(rename = "@imageType", default)]
    pub image_type: Option<String>,
    #[serde(rename = "@size", default)]
    pub size: i64,
    #[serde(rename = "@status", default)]
    pub status: Option<i32>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Link", default)]
    pub links: Vec<Link>,
    #[serde(rename = "Tasks", default)]
    pub tasks: Option<Tasks>,
    #[serde(rename = "Files", default)]
    pub files: Option<Files>,
    #[serde(rename = "Owner", default)]
    pub owner: Option<MediaOwner>,
    #[serde(rename = "VdcStorageProfile", default)]
    pub storage_profile: Option<Reference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaOwner {
    #[serde(rename = "User", default)]
    pub user: Option<Reference>,
}

impl MediaType {
    /// Upload link of the image file, once vCD has prepared it
    pub fn upload_link(&self) -> Option<&str> {
        self.files
            .as_ref()
            .and_then(|f| f.file.first())
            .and_then(|f| f.upload_link())
            .map(|l| l.href.as_str())
    }

    pub fn first_task(&self) -> Option<&super::task::TaskType> {
        self.tasks.as_ref().and_then(|t| t.task.first())
    }
}

/// A media image
#[derive(Clone)]
pub struct Media {
    pub media: MediaType,
    client: Client,
}

impl fmt::Debug for Media {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Media").field("media", &self.media).finish()
    }
}

impl Media {
    pub fn new(client: Client, media: MediaType) -> Self {
        Self { media, client }
    }

    pub fn name(&self) -> &str {
        &self.media.name
    }

    pub fn href(&self) -> &str {
        &self.media.href
    }

    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        require_href(&self.media.href, "media")?;
        self.media = self.client.get_xml(&self.media.href).await?;
        Ok(())
    }

    /// Deletes the image; the returned task removes its catalog item too
    pub async fn delete(&self) -> Result<Task, ApiError> {
        tracing::debug!("Deleting media {}", self.media.name);
        self.client.delete_task(&self.media.href).await
    }
}

impl MetadataHolder for Media {
    fn metadata_client(&self) -> &Client {
        &self.client
    }

    fn metadata_href(&self) -> &str {
        &self.media.href
    }
}

impl Client {
    pub async fn get_media_by_href(&self, href: &str) -> Result<Media, ApiError> {
        let media: MediaType = self.get_xml(href).await?;
        Ok(Media::new(self.clone(), media))
    }
}
