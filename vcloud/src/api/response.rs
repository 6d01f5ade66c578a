//! XML encoding and response handling for the vCD API

use serde::de::DeserializeOwned;

use super::common::{VcdErrorDetails, VcdErrorXml, XmlBody};
use super::error::ApiError;
use crate::logging;

const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Serializes a request body, refusing bodies without a namespace.
pub fn encode_xml<B: XmlBody>(body: &B) -> Result<String, ApiError> {
    if body.xml_namespace().is_empty() {
        return Err(ApiError::InvalidRequest(
            "XML namespace must be set before serialization".to_string(),
        ));
    }
    let xml = quick_xml::se::to_string(body).map_err(|e| ApiError::EncodeError(e.to_string()))?;
    Ok(format!("{}{}", XML_HEADER, xml))
}

pub fn decode_xml<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    quick_xml::de::from_str::<T>(text).map_err(|e| {
        tracing::error!(
            "Failed to deserialize response: {}, body: {}",
            e,
            logging::sanitize_body(text)
        );
        ApiError::ParseError(format!("Failed to parse response: {}", e))
    })
}

#[derive(Debug, serde::Deserialize)]
struct NsxErrorXml {
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(rename = "moduleName", default)]
    module_name: Option<String>,
}

pub struct VcdResponseHandler;

impl VcdResponseHandler {
    pub async fn extract_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            if logging::log_http_bodies() {
                tracing::debug!("API response body: {}", logging::sanitize_body(&text));
            }
            decode_xml(&text)
        } else {
            Err(Self::extract_error(status.as_u16(), &text))
        }
    }

    pub async fn extract_empty_response(response: reqwest::Response) -> Result<(), ApiError> {
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(Self::extract_error(status.as_u16(), &text))
        }
    }

    /// Decodes a failed response into the matching error variant.
    pub fn extract_error(status: u16, text: &str) -> ApiError {
        if status == 401 {
            return ApiError::AuthError;
        }

        if status == 429 {
            return ApiError::RateLimited;
        }

        if text.contains("<errorCode>") {
            if let Ok(nsx) = quick_xml::de::from_str::<NsxErrorXml>(text) {
                let message = match (nsx.module_name, nsx.details) {
                    (Some(module), Some(details)) => format!("[{}] {}", module, details),
                    (None, Some(details)) => details,
                    (_, None) => text.to_string(),
                };
                return ApiError::NsxError {
                    status,
                    code: nsx.error_code.unwrap_or_default(),
                    message,
                };
            }
        }

        let details = quick_xml::de::from_str::<VcdErrorXml>(text)
            .ok()
            .filter(|e| e.message.is_some() || e.minor_error_code.is_some())
            .map(|e| Box::new(VcdErrorDetails::from(e)));

        let message = details
            .as_ref()
            .and_then(|d| d.message.clone())
            .unwrap_or_else(|| text.to_string());

        ApiError::ApiError {
            status,
            message,
            details,
        }
    }
}
