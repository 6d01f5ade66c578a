use thiserror::Error;

use super::common::VcdErrorDetails;

/// vCD minor error codes that mean "no such entity" for lookup purposes.
const NOT_FOUND_MINOR_CODES: &[&str] = &["RESOURCE_NOT_FOUND", "ACCESS_TO_RESOURCE_IS_FORBIDDEN"];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        #[source]
        details: Option<Box<VcdErrorDetails>>,
    },

    #[error("NSX API returned error (HTTP {status}, code {code}): {message}")]
    NsxError {
        status: u16,
        code: String,
        message: String,
    },

    #[error("[ENF] entity not found: {kind} '{identifier}'")]
    EntityNotFound { kind: &'static str, identifier: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Failed to encode request body: {0}")]
    EncodeError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid filter: {0}")]
    FilterError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("Task '{operation}' finished with status '{status}': {message}")]
    TaskFailed {
        operation: String,
        status: String,
        message: String,
    },

    #[error("Timed out after {seconds} seconds waiting for task {href}")]
    TaskTimeout { href: String, seconds: u64 },

    #[error("Upload failed: {0}")]
    UploadError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    pub fn not_found(kind: &'static str, identifier: impl Into<String>) -> Self {
        ApiError::EntityNotFound {
            kind,
            identifier: identifier.into(),
        }
    }

    /// True for the `[ENF]` sentinel and for vCD answers that mean the same thing.
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::EntityNotFound { .. } => true,
            ApiError::ApiError {
                status, details, ..
            } => {
                *status == 404
                    || details
                        .as_ref()
                        .and_then(|d| d.minor_error_code.as_deref())
                        .is_some_and(|code| NOT_FOUND_MINOR_CODES.contains(&code))
            }
            _ => false,
        }
    }

    /// Message text used for matching server-side conditions such as "busy".
    pub fn server_message(&self) -> String {
        match self {
            ApiError::ApiError {
                message, details, ..
            } => details
                .as_ref()
                .and_then(|d| d.message.clone())
                .unwrap_or_else(|| message.clone()),
            ApiError::NsxError { message, .. } => message.clone(),
            ApiError::TaskFailed { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
