use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::Client;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "SupportedVersions")]
pub struct SupportedVersions {
    #[serde(rename = "VersionInfo", default)]
    pub versions: Vec<VersionInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "@deprecated", default)]
    pub deprecated: Option<bool>,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "LoginUrl", default)]
    pub login_url: Option<String>,
}

/// Parses `major.minor` into a comparable pair
pub fn parse_version(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    Some((major, minor))
}

impl SupportedVersions {
    pub fn contains(&self, version: &str) -> bool {
        let wanted = parse_version(version);
        wanted.is_some()
            && self
                .versions
                .iter()
                .any(|v| parse_version(&v.version) == wanted)
    }

    /// Highest version the server advertises
    pub fn max_version(&self) -> Option<&str> {
        self.versions
            .iter()
            .filter_map(|v| parse_version(&v.version).map(|p| (p, v.version.as_str())))
            .max_by_key(|(p, _)| *p)
            .map(|(_, v)| v)
    }
}

impl Client {
    /// GET /api/versions, which needs no authentication
    pub async fn supported_versions(&self) -> Result<SupportedVersions, ApiError> {
        self.get_xml(&self.href("/versions")).await
    }

    pub async fn api_version_supported(&self, version: &str) -> Result<bool, ApiError> {
        Ok(self.supported_versions().await?.contains(version))
    }
}
