use std::path::{Path, PathBuf};

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use super::{cancel_after_failure, poll_until, spawn_worker, upload_file, UploadProgress, UploadTask};
use crate::api::common::{mime, XmlBody, XMLNS_OVF, XMLNS_VCLOUD};
use crate::api::error::ApiError;
use crate::api::response::decode_xml;
use crate::api::task::Task;
use crate::api::vapp_template::VAppTemplateType;
use crate::api::Client;

const DESCRIPTOR_NAME: &str = "descriptor.ovf";

#[derive(Debug, Default, Deserialize)]
struct OvfEnvelope {
    #[serde(rename = "References", alias = "ovf:References", default)]
    references: OvfReferences,
}

#[derive(Debug, Default, Deserialize)]
struct OvfReferences {
    #[serde(rename = "File", alias = "ovf:File", default)]
    files: Vec<OvfFile>,
}

#[derive(Debug, Deserialize)]
struct OvfFile {
    #[serde(rename = "@href", alias = "@ovf:href")]
    href: String,
}

#[derive(Debug, Serialize)]
#[serde(rename = "UploadVAppTemplateParams")]
struct UploadVAppTemplateParams {
    #[serde(rename = "@xmlns")]
    xmlns: String,
    #[serde(rename = "@xmlns:ovf")]
    xmlns_ovf: String,
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@manifestRequired")]
    manifest_required: bool,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl XmlBody for UploadVAppTemplateParams {
    fn xml_namespace(&self) -> &str {
        &self.xmlns
    }
}

/// A descriptor and the local files it references
struct OvfPackage {
    descriptor: String,
    files: Vec<PackageFile>,
    // extracted OVA contents live until the upload ends
    _workdir: Option<TempDir>,
}

struct PackageFile {
    name: String,
    path: PathBuf,
    size: u64,
}

impl OvfPackage {
    async fn open(path: &Path) -> Result<Self, ApiError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let (descriptor_path, workdir) = match extension.as_deref() {
            Some("ova") => {
                let workdir = tempfile::Builder::new().prefix("vcd-ova-").tempdir()?;
                let archive = path.to_path_buf();
                let target = workdir.path().to_path_buf();
                let descriptor = tokio::task::spawn_blocking(move || extract_ova(&archive, &target))
                    .await
                    .map_err(|e| ApiError::UploadError(format!("OVA extraction stopped: {}", e)))??;
                (descriptor, Some(workdir))
            }
            Some("ovf") => (path.to_path_buf(), None),
            _ => {
                return Err(ApiError::InvalidRequest(format!(
                    "{} is neither an OVA nor an OVF file",
                    path.display()
                )))
            }
        };

        let descriptor = tokio::fs::read_to_string(&descriptor_path).await?;
        let envelope: OvfEnvelope = decode_xml(&descriptor)?;
        let dir = descriptor_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut files = Vec::with_capacity(envelope.references.files.len());
        for file in envelope.references.files {
            let local = dir.join(&file.href);
            let size = match tokio::fs::metadata(&local).await {
                Ok(meta) => meta.len(),
                Err(_) => {
                    return Err(ApiError::UploadError(format!(
                        "file {} referenced by the OVF descriptor is missing",
                        file.href
                    )))
                }
            };
            files.push(PackageFile {
                name: file.href,
                path: local,
                size,
            });
        }

        Ok(Self {
            descriptor,
            files,
            _workdir: workdir,
        })
    }

    fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Unpacks an OVA into `target` and returns the path of its descriptor
fn extract_ova(archive: &Path, target: &Path) -> Result<PathBuf, ApiError> {
    let file = std::fs::File::open(archive)?;
    tar::Archive::new(file).unpack(target)?;

    for entry in std::fs::read_dir(target)? {
        let path = entry?.path();
        if path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("ovf"))
        {
            return Ok(path);
        }
    }
    Err(ApiError::UploadError(format!(
        "{} contains no OVF descriptor",
        archive.display()
    )))
}

/// Creates a vApp template through `add_href`, sends its descriptor and starts
/// sending the referenced files
pub(crate) async fn upload_ovf(
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
    let package = OvfPackage::open(path).await?;

    let params = UploadVAppTemplateParams {
        xmlns: XMLNS_VCLOUD.to_string(),
        xmlns_ovf: XMLNS_OVF.to_string(),
        name: name.to_string(),
        manifest_required: false,
        description: (!description.is_empty()).then(|| description.to_string()),
    };
    tracing::info!(
        "Creating vApp template {} with {} file(s)",
        name,
        package.files.len()
    );
    let template: VAppTemplateType = client
        .post_xml(add_href, mime::UPLOAD_VAPP_TEMPLATE_PARAMS, &params)
        .await?;
    let mut task = template
        .first_task()
        .map(|t| Task::new(client.clone(), t.clone()));

    let links = match send_descriptor(client, &template.href, &package).await {
        Ok(links) => links,
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
    let worker = spawn_worker(progress.clone(), task.clone(), async move {
        let total = package.total_size();
        let mut sent = 0u64;
        for (file, link) in package.files.iter().zip(links) {
            tracing::debug!("Uploading {} of vApp template", file.name);
            let offset = sent;
            upload_file(&worker_client, &file.path, &link, piece_size, |done, _| {
                reporter.set_bytes(offset + done, total)
            })
            .await?;
            sent += file.size;
        }
        reporter.set(100.0);
        Ok(())
    });

    Ok(UploadTask::new(
        task,
        progress,
        worker,
        client.config().upload_progress_interval,
    ))
}

/// PUTs the descriptor and returns the upload link of every referenced file,
/// in reference order
async fn send_descriptor(
    client: &Client,
    template_href: &str,
    package: &OvfPackage,
) -> Result<Vec<String>, ApiError> {
    let descriptor_link = poll_until(client, "OVF descriptor upload link", move || async move {
        let current: VAppTemplateType = client.get_xml(template_href).await?;
        Ok(current.file_upload_link(DESCRIPTOR_NAME).map(String::from))
    })
    .await?;

    client
        .execute_raw(
            Method::PUT,
            &descriptor_link,
            Some("text/xml"),
            Some(package.descriptor.clone()),
        )
        .await?;

    let names: Vec<&str> = package.files.iter().map(|f| f.name.as_str()).collect();
    let names = names.as_slice();
    poll_until(client, "vApp template file upload links", move || async move {
        let current: VAppTemplateType = client.get_xml(template_href).await?;
        Ok(names
            .iter()
            .map(|name| current.file_upload_link(name).map(String::from))
            .collect::<Option<Vec<_>>>())
    })
    .await
}
