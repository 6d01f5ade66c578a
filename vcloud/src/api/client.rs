use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_RANGE, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use super::common::{ApiQueryParams, XmlBody};
use super::config::{AuthType, ClientConfig};
use super::error::ApiError;
use super::href::require_href;
use super::pool::{ConnectionPoolManager, ConnectionStats, RequestOutcome};
use super::response::{encode_xml, VcdResponseHandler};
use super::task::{Task, TaskType};
use crate::logging;

pub const HEADER_VCLOUD_AUTHORIZATION: &str = "x-vcloud-authorization";
pub const HEADER_ACCESS_TOKEN: &str = "x-vmware-vcloud-access-token";

/// vCloud Director API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth: RwLock<Option<AuthToken>>,
    is_sys_admin: AtomicBool,
    config: ClientConfig,
    pool_manager: ConnectionPoolManager,
}

#[derive(Clone)]
pub(crate) enum AuthToken {
    Session(String),
    Bearer(String),
}

impl Client {
    /// Create a new API client authenticated with a session token
    pub fn new(endpoint: &str, token: &str, insecure: bool) -> Result<Self, ApiError> {
        let config = ClientConfig::new(endpoint)
            .with_token(token, AuthType::Token)
            .with_insecure(insecure);
        Self::with_config(config)
    }

    /// Create a new API client from a full configuration, without logging in
    pub fn with_config(config: ClientConfig) -> Result<Self, ApiError> {
        let parsed = url::Url::parse(&config.endpoint)?;
        if parsed.host_str().is_none() {
            return Err(ApiError::InvalidRequest(format!(
                "endpoint '{}' has no host",
                config.endpoint
            )));
        }

        let mut base_url = config.endpoint.trim_end_matches('/').to_string();
        if !base_url.ends_with("/api") {
            base_url.push_str("/api");
        }

        let pool_manager = ConnectionPoolManager::new(config.pool.clone());
        let http_client = pool_manager.build_client(config.insecure)?;

        let auth = config.token.as_ref().map(|token| match config.auth_type {
            AuthType::Token => AuthToken::Session(token.clone()),
            AuthType::Bearer => AuthToken::Bearer(token.clone()),
        });

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                auth: RwLock::new(auth),
                is_sys_admin: AtomicBool::new(false),
                config,
                pool_manager,
            }),
        })
    }

    /// Create a client and authenticate with the configured token or credentials
    pub async fn connect(config: ClientConfig) -> Result<Self, ApiError> {
        let client = Self::with_config(config)?;

        if client.config().token.is_some() {
            client.refresh_session_info().await?;
            return Ok(client);
        }

        let credentials = (
            client.config().user.clone(),
            client.config().password.clone(),
            client.config().org.clone(),
        );
        match credentials {
            (Some(user), Some(password), Some(org)) => {
                client.authenticate(&user, &password, &org).await?;
                Ok(client)
            }
            _ => Err(ApiError::InvalidRequest(
                "either a token or user, password and org are required".to_string(),
            )),
        }
    }

    /// API root, e.g. `https://vcd.example.com/api`
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// `scheme://host[:port]` of the endpoint
    pub fn host_url(&self) -> String {
        self.inner
            .base_url
            .strip_suffix("/api")
            .unwrap_or(&self.inner.base_url)
            .to_string()
    }

    pub fn api_version(&self) -> &str {
        &self.inner.config.api_version
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn is_sys_admin(&self) -> bool {
        self.inner.is_sys_admin.load(Ordering::Relaxed)
    }

    pub(crate) fn set_sys_admin(&self, value: bool) {
        self.inner.is_sys_admin.store(value, Ordering::Relaxed);
    }

    /// Absolute HREF for a path below the API root
    pub fn href(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http_client
    }

    pub(crate) fn accept_header(&self) -> String {
        format!("application/*+xml;version={}", self.api_version())
    }

    pub(crate) fn set_auth(&self, token: Option<AuthToken>) {
        match self.inner.auth.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_token().is_some()
    }

    fn auth_token(&self) -> Option<AuthToken> {
        match self.inner.auth.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Get connection pool statistics
    pub async fn get_connection_stats(&self) -> ConnectionStats {
        self.inner.pool_manager.get_stats().await
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .inner
            .http_client
            .request(method, url)
            .header(ACCEPT, self.accept_header())
            .timeout(self.inner.config.pool.request_timeout);

        match self.auth_token() {
            Some(AuthToken::Session(token)) => builder.header(HEADER_VCLOUD_AUTHORIZATION, token),
            Some(AuthToken::Bearer(token)) => {
                builder.header(AUTHORIZATION, format!("Bearer {}", token))
            }
            None => builder,
        }
    }

    /// Execute a GET request with retry logic and decode the XML body
    pub async fn get_xml<T: DeserializeOwned>(&self, href: &str) -> Result<T, ApiError> {
        let href = require_href(href, "GET target")?;
        let response = self
            .execute_with_retry(
                || async {
                    tracing::debug!("GET request to: {}", href);
                    self.request(Method::GET, href).send().await
                },
                href,
                true,
            )
            .await?;
        VcdResponseHandler::extract_response(response).await
    }

    /// Execute a GET request with query parameters
    pub async fn get_xml_with_params<T: DeserializeOwned>(
        &self,
        href: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let full = format!("{}{}", href, params.to_query_string());
        self.get_xml(&full).await
    }

    /// Execute a POST request with an XML body
    pub async fn post_xml<T: DeserializeOwned, B: XmlBody>(
        &self,
        href: &str,
        content_type: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let payload = encode_xml(body)?;
        let response = self
            .send_body(Method::POST, href, Some(content_type), Some(payload))
            .await?;
        VcdResponseHandler::extract_response(response).await
    }

    /// Execute a PUT request with an XML body
    pub async fn put_xml<T: DeserializeOwned, B: XmlBody>(
        &self,
        href: &str,
        content_type: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let payload = encode_xml(body)?;
        let response = self
            .send_body(Method::PUT, href, Some(content_type), Some(payload))
            .await?;
        VcdResponseHandler::extract_response(response).await
    }

    /// POST an XML body to an action link and wrap the returned task
    pub async fn post_xml_task<B: XmlBody>(
        &self,
        href: &str,
        content_type: &str,
        body: &B,
    ) -> Result<Task, ApiError> {
        let task: TaskType = self.post_xml(href, content_type, body).await?;
        Ok(Task::new(self.clone(), task))
    }

    /// PUT an XML body and wrap the returned task
    pub async fn put_xml_task<B: XmlBody>(
        &self,
        href: &str,
        content_type: &str,
        body: &B,
    ) -> Result<Task, ApiError> {
        let task: TaskType = self.put_xml(href, content_type, body).await?;
        Ok(Task::new(self.clone(), task))
    }

    /// POST to an action link that takes no body (power operations, cancel, ...)
    pub async fn post_action(&self, href: &str) -> Result<Task, ApiError> {
        let response = self.send_body(Method::POST, href, None, None).await?;
        let task: TaskType = VcdResponseHandler::extract_response(response).await?;
        Ok(Task::new(self.clone(), task))
    }

    /// POST with no body to an endpoint that answers with no content
    pub async fn post_no_content(&self, href: &str) -> Result<(), ApiError> {
        let response = self.send_body(Method::POST, href, None, None).await?;
        VcdResponseHandler::extract_empty_response(response).await
    }

    /// Execute a DELETE request that returns a task
    pub async fn delete_task(&self, href: &str) -> Result<Task, ApiError> {
        let response = self.send_body(Method::DELETE, href, None, None).await?;
        let task: TaskType = VcdResponseHandler::extract_response(response).await?;
        Ok(Task::new(self.clone(), task))
    }

    /// Execute a DELETE request that returns no content
    pub async fn delete_no_content(&self, href: &str) -> Result<(), ApiError> {
        let response = self.send_body(Method::DELETE, href, None, None).await?;
        VcdResponseHandler::extract_empty_response(response).await
    }

    /// Send a raw body and hand back the successful response, for callers that
    /// need headers (e.g. `Location`) or bodies in other formats
    pub async fn execute_raw(
        &self,
        method: Method,
        href: &str,
        content_type: Option<&str>,
        body: Option<String>,
    ) -> Result<reqwest::Response, ApiError> {
        self.send_body(method, href, content_type, body).await
    }

    /// PUT one piece of a file to an upload link
    pub async fn put_file_piece(
        &self,
        href: &str,
        start: u64,
        piece: Vec<u8>,
        total: u64,
    ) -> Result<(), ApiError> {
        let href = require_href(href, "upload link")?;
        let len = piece.len() as u64;
        if len == 0 {
            return Ok(());
        }
        let range = format!("bytes {}-{}/{}", start, start + len - 1, total);
        let timeout = self.inner.config.pool.upload_timeout;

        let response = self
            .execute_with_retry(
                || async {
                    tracing::debug!("PUT {} to: {}", range, href);
                    self.request(Method::PUT, href)
                        .timeout(timeout)
                        .header(CONTENT_TYPE, "application/octet-stream")
                        .header(CONTENT_RANGE, range.as_str())
                        .body(piece.clone())
                        .send()
                        .await
                },
                href,
                true,
            )
            .await?;
        self.inner.pool_manager.record_upload_piece(len).await;
        VcdResponseHandler::extract_empty_response(response).await
    }

    async fn send_body(
        &self,
        method: Method,
        href: &str,
        content_type: Option<&str>,
        body: Option<String>,
    ) -> Result<reqwest::Response, ApiError> {
        let href = require_href(href, "request target")?;
        let idempotent = method != Method::POST;

        if let Some(payload) = body.as_deref() {
            if logging::log_http_bodies() {
                tracing::debug!("{} body: {}", method, logging::sanitize_body(payload));
            }
        }

        self.execute_with_retry(
            || async {
                tracing::debug!("{} request to: {}", method, href);
                let mut builder = self.request(method.clone(), href);
                if let Some(content_type) = content_type {
                    builder = builder.header(CONTENT_TYPE, content_type);
                }
                match body.clone() {
                    Some(payload) => builder.body(payload).send().await,
                    None => builder.body(Vec::new()).send().await,
                }
            },
            href,
            idempotent,
        )
        .await
    }

    /// Execute request with retry logic, returning the successful response.
    ///
    /// Non-idempotent requests are only retried when the server cannot have
    /// acted on them (rate limiting, connection failures).
    async fn execute_with_retry<F, Fut>(
        &self,
        request_fn: F,
        path: &str,
        idempotent: bool,
    ) -> Result<reqwest::Response, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let retry = &self.inner.config.retry;
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= retry.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    retry.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    retry.max_backoff_ms,
                );
                tracing::warn!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff)).await;
            }

            let error = match request_fn().await {
                Ok(response) if response.status().is_success() => {
                    self.inner.pool_manager.record(RequestOutcome::Succeeded).await;
                    return Ok(response);
                }
                Ok(response) => {
                    let status = response.status();
                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        self.inner.pool_manager.record(RequestOutcome::Failed).await;
                        return Err(ApiError::AuthError);
                    }
                    let text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    let error = VcdResponseHandler::extract_error(status.as_u16(), &text);
                    let retryable = status == reqwest::StatusCode::TOO_MANY_REQUESTS
                        || (status.is_server_error() && idempotent);
                    if !retryable {
                        self.inner.pool_manager.record(RequestOutcome::Failed).await;
                        return Err(error);
                    }
                    error
                }
                Err(e) if e.is_timeout() => ApiError::Timeout(retry.timeout_seconds),
                Err(e) if e.is_connect() => ApiError::ServiceUnavailable,
                Err(e) => {
                    self.inner.pool_manager.record(RequestOutcome::Failed).await;
                    return Err(ApiError::RequestError(e));
                }
            };

            let outcome = if attempt < retry.max_retries {
                RequestOutcome::Retried
            } else {
                RequestOutcome::Failed
            };
            self.inner.pool_manager.record(outcome).await;
            last_error = Some(error);
            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }
}

#[cfg(test)]
#[path = "./client_test.rs"]
mod client_test;
