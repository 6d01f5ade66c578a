//! Asynchronous server-side tasks and completion polling

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use super::common::{find_link, rel, Link, Reference, VcdErrorXml};
use super::error::ApiError;
use super::Client;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "Task")]
pub struct TaskType {
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "@type", default)]
    pub type_: Option<String>,
    #[serde(rename = "@operation", default)]
    pub operation: Option<String>,
    #[serde(rename = "@operationName", default)]
    pub operation_name: Option<String>,
    #[serde(rename = "@status", default)]
    pub status: String,
    #[serde(rename = "@startTime", default)]
    pub start_time: Option<String>,
    #[serde(rename = "@endTime", default)]
    pub end_time: Option<String>,
    #[serde(rename = "@expiryTime", default)]
    pub expiry_time: Option<String>,
    #[serde(rename = "@cancelRequested", default)]
    pub cancel_requested: Option<bool>,
    #[serde(rename = "Link", default)]
    pub links: Vec<Link>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Owner", default)]
    pub owner: Option<Reference>,
    #[serde(rename = "Error", default)]
    pub error: Option<VcdErrorXml>,
    #[serde(rename = "User", default)]
    pub user: Option<Reference>,
    #[serde(rename = "Organization", default)]
    pub organization: Option<Reference>,
    #[serde(rename = "Progress", default)]
    pub progress: Option<u32>,
    #[serde(rename = "Details", default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    PreRunning,
    Running,
    Success,
    Error,
    Canceled,
    Aborted,
    Unknown(String),
}

impl TaskStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "queued" => TaskStatus::Queued,
            "preRunning" => TaskStatus::PreRunning,
            "running" => TaskStatus::Running,
            "success" => TaskStatus::Success,
            "error" => TaskStatus::Error,
            "canceled" => TaskStatus::Canceled,
            "aborted" => TaskStatus::Aborted,
            other => TaskStatus::Unknown(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Error | TaskStatus::Canceled | TaskStatus::Aborted
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Queued => "queued",
            TaskStatus::PreRunning => "preRunning",
            TaskStatus::Running => "running",
            TaskStatus::Success => "success",
            TaskStatus::Error => "error",
            TaskStatus::Canceled => "canceled",
            TaskStatus::Aborted => "aborted",
            TaskStatus::Unknown(s) => s,
        };
        f.write_str(s)
    }
}

/// A server-side task handle
#[derive(Clone)]
pub struct Task {
    pub task: TaskType,
    client: Client,
}

impl Task {
    pub fn new(client: Client, task: TaskType) -> Self {
        Self { task, client }
    }

    pub fn status(&self) -> TaskStatus {
        TaskStatus::parse(&self.task.status)
    }

    pub fn progress(&self) -> u32 {
        self.task.progress.unwrap_or(0)
    }

    pub fn href(&self) -> &str {
        &self.task.href
    }

    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        self.task = self.client.get_xml(&self.task.href).await?;
        Ok(())
    }

    /// Polls the task until it reaches a terminal status
    pub async fn wait_completion(&mut self) -> Result<(), ApiError> {
        self.wait_inspect(|_| {}).await
    }

    /// Like `wait_completion`, calling `inspect` after every poll
    pub async fn wait_inspect<F>(&mut self, mut inspect: F) -> Result<(), ApiError>
    where
        F: FnMut(&TaskType),
    {
        let interval = self.client.config().task_poll_interval;
        let timeout = self.client.config().task_timeout;
        let started = Instant::now();

        loop {
            self.refresh().await?;
            inspect(&self.task);

            let status = self.status();
            tracing::debug!(
                "Task {} ({}) status {} progress {}%",
                self.task.href,
                self.operation(),
                status,
                self.progress()
            );

            if status.is_terminal() {
                return self.outcome();
            }

            if let Some(limit) = timeout {
                if started.elapsed() >= limit {
                    return Err(ApiError::TaskTimeout {
                        href: self.task.href.clone(),
                        seconds: limit.as_secs(),
                    });
                }
            }

            tokio::time::sleep(interval).await;
        }
    }

    /// Requests cancellation of the task
    pub async fn cancel(&mut self) -> Result<(), ApiError> {
        let href = match find_link(&self.task.links, rel::TASK_CANCEL, None) {
            Some(link) => link.href.clone(),
            None => format!("{}/action/cancel", self.task.href),
        };
        tracing::debug!("Cancelling task {}", self.task.href);
        self.client.post_no_content(&href).await
    }

    fn operation(&self) -> &str {
        self.task
            .operation_name
            .as_deref()
            .or(self.task.operation.as_deref())
            .unwrap_or("task")
    }

    fn outcome(&self) -> Result<(), ApiError> {
        match self.status() {
            TaskStatus::Success => Ok(()),
            status => {
                let message = self
                    .task
                    .error
                    .as_ref()
                    .and_then(|e| e.message.clone())
                    .or_else(|| self.task.details.clone())
                    .unwrap_or_else(|| "no error details".to_string());
                Err(ApiError::TaskFailed {
                    operation: self.operation().to_string(),
                    status: status.to_string(),
                    message,
                })
            }
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("task", &self.task).finish()
    }
}

/// Waits for the first embedded task of a freshly created entity, if any
pub(crate) async fn wait_embedded(
    client: &Client,
    tasks: Option<&super::common::Tasks>,
) -> Result<(), ApiError> {
    if let Some(task) = tasks.and_then(|t| t.task.first()) {
        Task::new(client.clone(), task.clone())
            .wait_completion()
            .await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "./task_test.rs"]
mod task_test;
