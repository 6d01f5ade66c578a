//! Chunked uploads of ISO media and OVA/OVF templates
//!
//! Files are sent in pieces with `Content-Range` PUTs to the upload links vCD
//! hands out. The transfer runs on a spawned worker while the caller follows
//! [`UploadTask::progress`]; a failed transfer cancels the server task that
//! created the catalog entry.

mod iso;
mod ovf;
mod progress;

use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::task::JoinHandle;

use super::error::ApiError;
use super::href::require_href;
use super::task::Task;
use super::Client;

pub(crate) use iso::upload_media;
pub use iso::verify_iso;
pub(crate) use ovf::upload_ovf;
pub use progress::UploadProgress;

pub const DEFAULT_PIECE_SIZE: u64 = 1024 * 1024;

/// Uploads `path` to `upload_href` in `piece_size` pieces.
///
/// `callback` receives `(bytes_uploaded, total_bytes)` after every piece.
/// Returns the number of bytes sent.
pub async fn upload_file<F>(
    client: &Client,
    path: &Path,
    upload_href: &str,
    piece_size: u64,
    mut callback: F,
) -> Result<u64, ApiError>
where
    F: FnMut(u64, u64),
{
    if piece_size == 0 {
        return Err(ApiError::InvalidRequest(
            "upload piece size must be greater than zero".to_string(),
        ));
    }
    let upload_href = require_href(upload_href, "upload link")?;

    let mut file = tokio::fs::File::open(path).await?;
    let total = file.metadata().await?.len();
    tracing::debug!(
        "Uploading {} ({} bytes) to {} in pieces of {}",
        path.display(),
        total,
        upload_href,
        piece_size
    );

    let mut buffer = vec![0u8; piece_size.min(total.max(1)) as usize];
    let mut uploaded = 0u64;

    while uploaded < total {
        let len = piece_size.min(total - uploaded) as usize;
        file.read_exact(&mut buffer[..len]).await?;
        client
            .put_file_piece(upload_href, uploaded, buffer[..len].to_vec(), total)
            .await?;
        uploaded += len as u64;
        callback(uploaded, total);
    }

    if total == 0 {
        callback(0, 0);
    }

    Ok(uploaded)
}

/// Runs `job` on its own task; on failure records the error and cancels `task`
pub(crate) fn spawn_worker<Fut>(
    progress: UploadProgress,
    task: Option<Task>,
    job: Fut,
) -> JoinHandle<Result<(), ApiError>>
where
    Fut: Future<Output = Result<(), ApiError>> + Send + 'static,
{
    tokio::spawn(async move {
        let result = job.await;
        if let Err(e) = &result {
            tracing::error!("Upload failed: {}", e);
            progress.fail(e.to_string());
            if let Some(mut task) = task {
                cancel_after_failure(&mut task).await;
            }
        }
        result
    })
}

/// Calls `check` every poll interval until it yields a value or the retry timeout passes
pub(crate) async fn poll_until<T, F, Fut>(
    client: &Client,
    what: &str,
    mut check: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ApiError>>,
{
    let deadline = Instant::now() + client.config().max_retry_timeout;
    loop {
        if let Some(value) = check().await? {
            return Ok(value);
        }
        if Instant::now() >= deadline {
            return Err(ApiError::UploadError(format!("timed out waiting for {}", what)));
        }
        tracing::debug!("Waiting for {}", what);
        tokio::time::sleep(client.config().task_poll_interval).await;
    }
}

pub(crate) async fn cancel_after_failure(task: &mut Task) {
    if let Err(e) = task.cancel().await {
        tracing::warn!(
            "Could not cancel task {} after failed upload: {}",
            task.href(),
            e
        );
    }
}

/// A running upload and the server task that owns the new catalog entry
pub struct UploadTask {
    task: Option<Task>,
    progress: UploadProgress,
    worker: JoinHandle<Result<(), ApiError>>,
    report_interval: Duration,
}

impl UploadTask {
    pub(crate) fn new(
        task: Option<Task>,
        progress: UploadProgress,
        worker: JoinHandle<Result<(), ApiError>>,
        report_interval: Duration,
    ) -> Self {
        Self {
            task,
            progress,
            worker,
            report_interval,
        }
    }

    pub fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    /// Percentage of bytes sent so far
    pub fn progress(&self) -> f64 {
        self.progress.get()
    }

    pub fn progress_string(&self) -> String {
        format!("{:.2}", self.progress())
    }

    pub fn error(&self) -> Option<String> {
        self.progress.error()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Logs progress until the transfer ends
    pub async fn show_progress(&self) -> Result<(), ApiError> {
        loop {
            tracing::info!("Upload progress {}%", self.progress_string());
            if self.is_finished() {
                break;
            }
            tokio::time::sleep(self.report_interval).await;
        }
        match self.error() {
            Some(message) => Err(ApiError::UploadError(message)),
            None => Ok(()),
        }
    }

    /// Waits for the transfer, then for the server task to finish
    pub async fn wait_completion(self) -> Result<(), ApiError> {
        self.worker
            .await
            .map_err(|e| ApiError::UploadError(format!("upload worker stopped: {}", e)))??;

        match self.task {
            Some(mut task) => task.wait_completion().await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "./upload_test.rs"]
mod upload_test;
