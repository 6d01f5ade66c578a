//! HREF and entity ID helpers
//!
//! vCD identifies entities both by URN (`urn:vcloud:catalog:<uuid>`) and by the
//! HREF that addresses them (`https://host/api/catalog/<uuid>`). These helpers
//! move between the two forms.

use std::sync::OnceLock;

use regex::Regex;

use super::error::ApiError;

fn uuid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
            .unwrap_or_else(|e| panic!("invalid uuid pattern: {}", e))
    })
}

/// Returns the last UUID found in an HREF or URN.
pub fn extract_uuid(input: &str) -> Option<String> {
    uuid_regex()
        .find_iter(input)
        .last()
        .map(|m| m.as_str().to_lowercase())
}

pub fn is_uuid(input: &str) -> bool {
    uuid::Uuid::parse_str(input).is_ok()
}

pub fn is_urn(input: &str) -> bool {
    input.starts_with("urn:vcloud:")
}

/// Strips `urn:vcloud:<kind>:` from a URN, leaving the bare UUID.
pub fn bare_id(input: &str) -> Result<String, ApiError> {
    if is_uuid(input) {
        return Ok(input.to_lowercase());
    }
    if is_urn(input) {
        if let Some(uuid) = input.rsplit(':').next().filter(|s| is_uuid(s)) {
            return Ok(uuid.to_lowercase());
        }
    }
    Err(ApiError::InvalidRequest(format!(
        "'{}' is not a valid vCD ID",
        input
    )))
}

pub fn build_urn(kind: &str, uuid: &str) -> String {
    format!("urn:vcloud:{}:{}", kind, uuid)
}

/// True when both identifiers point at the same UUID, whichever form they use.
pub fn same_id(a: &str, b: &str) -> bool {
    match (extract_uuid(a), extract_uuid(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// `https://host/api/org/x` -> `https://host/api/admin/org/x`
pub fn admin_href(href: &str) -> Result<String, ApiError> {
    if href.contains("/api/admin/") {
        return Ok(href.to_string());
    }
    match href.find("/api/") {
        Some(pos) => Ok(format!("{}/api/admin/{}", &href[..pos], &href[pos + 5..])),
        None => Err(ApiError::InvalidRequest(format!(
            "HREF '{}' does not contain /api/",
            href
        ))),
    }
}

/// `https://host/api/admin/org/x` -> `https://host/api/org/x`
pub fn non_admin_href(href: &str) -> String {
    href.replacen("/api/admin/", "/api/", 1)
}

pub fn require_href<'a>(href: &'a str, what: &str) -> Result<&'a str, ApiError> {
    if href.is_empty() {
        Err(ApiError::InvalidRequest(format!("{} has an empty HREF", what)))
    } else {
        Ok(href)
    }
}
