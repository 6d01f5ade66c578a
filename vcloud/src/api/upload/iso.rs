use std::io::SeekFrom;
use std::path::Path;

use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::{cancel_after_failure, poll_until, spawn_worker, upload_file, UploadProgress, UploadTask};
use crate::api::common::{mime, XmlBody, XMLNS_VCLOUD};
use crate::api::error::ApiError;
use crate::api::media::MediaType;
use crate::api::task::Task;
use crate::api::Client;

/// Primary volume descriptor identifier of ISO 9660 images
const ISO_MAGIC: &[u8; 5] = b"CD001";
const ISO_MAGIC_OFFSET: u64 = 32769;

/// Checks that `path` is an ISO 9660 image and returns its size
pub async fn verify_iso(path: &Path) -> Result<u64, ApiError> {
    let mut file = tokio::fs::File::open(path).await?;
    let size = file.metadata().await?.len();
    if size < ISO_MAGIC_OFFSET + ISO_MAGIC.len() as u64 {
        return Err(ApiError::UploadError(format!(
            "{} is too small to be an ISO image",
            path.display()
        )));
    }

    file.seek(SeekFrom::Start(ISO_MAGIC_OFFSET)).await?;
    let mut magic = [0u8; 5];
    file.read_exact(&mut magic).await?;
    if &magic != ISO_MAGIC {
        return Err(ApiError::UploadError(format!(
            "{} is not an ISO image",
            path.display()
        )));
    }
    Ok(size)
}

#[derive(Debug, Serialize)]
#[serde(rename = "Media")]
struct CreateMediaParams {
    #[serde(rename = "@xmlns")]
    xmlns: String,
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@imageType")]
    image_type: String,
    #[serde(rename = "@size")]
    size: u64,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl XmlBody for CreateMediaParams {
    fn xml_namespace(&self) -> &str {
        &self.xmlns
    }
}

/// Creates a Media entry through `add_href` and starts sending the image
pub(crate) async fn upload_media(
    client: &Client,
    add_href: &str,
    name: &str,
    description: &str,
    path: &Path,
    piece_size: u64,
) -> Result<UploadTask, ApiError> {
    if piece_size == 0 {
        return Err(ApiError::InvalidRequest(
            "upload piece size must be greater than zero".to_string(),
        ));
    }
    let size = verify_iso(path).await?;

    let params = CreateMediaParams {
        xmlns: XMLNS_VCLOUD.to_string(),
        name: name.to_string(),
        image_type: "iso".to_string(),
        size,
        description: (!description.is_empty()).then(|| description.to_string()),
    };
    tracing::info!("Creating media {} ({} bytes)", name, size);
    let media: MediaType = client.post_xml(add_href, mime::MEDIA, &params).await?;
    let mut task = media.first_task().map(|t| Task::new(client.clone(), t.clone()));

    let media_href = media.href.as_str();
    let link = poll_until(client, "media upload link", move || async move {
        let current: MediaType = client.get_xml(media_href).await?;
        Ok(current.upload_link().map(String::from))
    })
    .await;
    let link = match link {
        Ok(link) => link,
        Err(e) => {
            if let Some(task) = task.as_mut() {
                cancel_after_failure(task).await;
            }
            return Err(e);
        }
    };

    let progress = UploadProgress::new();
    let reporter = progress.clone();
    let worker_client = client.clone();
    let source = path.to_path_buf();
    let worker = spawn_worker(progress.clone(), task.clone(), async move {
        upload_file(&worker_client, &source, &link, piece_size, |done, total| {
            reporter.set_bytes(done, total)
        })
        .await
        .map(|_| ())
    });

    Ok(UploadTask::new(
        task,
        progress,
        worker,
        client.config().upload_progress_interval,
    ))
}
