use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

use super::date::DateExpr;
use crate::api::error::ApiError;
use crate::api::metadata::MetadataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterKey {
    /// Regular expression on the item name
    NameRegex,
    /// Date expression such as `> 2023-01-01`
    Date,
    /// Regular expression on the IP address
    Ip,
    Latest,
    Earliest,
    /// Exact name of the containing entity
    Parent,
    /// ID or HREF of the containing entity
    ParentId,
}

impl FilterKey {
    pub const ALL: [FilterKey; 7] = [
        FilterKey::NameRegex,
        FilterKey::Date,
        FilterKey::Ip,
        FilterKey::Latest,
        FilterKey::Earliest,
        FilterKey::Parent,
        FilterKey::ParentId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::NameRegex => "name_regex",
            FilterKey::Date => "date",
            FilterKey::Ip => "ip",
            FilterKey::Latest => "latest",
            FilterKey::Earliest => "earliest",
            FilterKey::Parent => "parent",
            FilterKey::ParentId => "parent_id",
        }
    }

    pub fn parse(key: &str) -> Result<Self, ApiError> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == key)
            .ok_or_else(|| {
                ApiError::FilterError(format!(
                    "unsupported filter '{}' (supported: {})",
                    key,
                    Self::ALL.map(|k| k.as_str()).join(", ")
                ))
            })
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metadata criterion: `value` is a regular expression unless the
/// metadata API filter is used, in which case it is matched literally by vCD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataDef {
    pub key: String,
    pub value: String,
    pub kind: MetadataType,
    pub is_system: bool,
}

/// Search criteria, validated as they are added
#[derive(Debug, Clone, Default)]
pub struct FilterDef {
    filters: BTreeMap<FilterKey, String>,
    metadata: Vec<MetadataDef>,
    use_metadata_api_filter: bool,
}

fn parse_flag(key: FilterKey, value: &str) -> Result<bool, ApiError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ApiError::FilterError(format!(
            "filter '{}' requires 'true' or 'false', got '{}'",
            key, value
        ))),
    }
}

/// Compiles a filter value, naming the offending key on failure
pub(super) fn compile(key: &str, pattern: &str) -> Result<Regex, ApiError> {
    Regex::new(pattern)
        .map_err(|e| ApiError::FilterError(format!("invalid regex for '{}': {}", key, e)))
}

impl FilterDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a criterion by its key name
    pub fn add_filter(&mut self, key: &str, value: &str) -> Result<(), ApiError> {
        let key = FilterKey::parse(key)?;
        self.set(key, value)
    }

    pub fn set(&mut self, key: FilterKey, value: &str) -> Result<(), ApiError> {
        if value.is_empty() {
            return Err(ApiError::FilterError(format!(
                "filter '{}' needs a value",
                key
            )));
        }

        match key {
            FilterKey::NameRegex | FilterKey::Ip => {
                compile(key.as_str(), value)?;
            }
            FilterKey::Date => {
                DateExpr::parse(value)?;
            }
            FilterKey::Latest | FilterKey::Earliest => {
                let other = if key == FilterKey::Latest {
                    FilterKey::Earliest
                } else {
                    FilterKey::Latest
                };
                if parse_flag(key, value)? && self.flag(other) {
                    return Err(ApiError::FilterError(format!(
                        "'{}' and '{}' cannot be used together",
                        key, other
                    )));
                }
            }
            FilterKey::Parent | FilterKey::ParentId => {}
        }

        self.filters.insert(key, value.to_string());
        Ok(())
    }

    pub fn with_filter(mut self, key: FilterKey, value: &str) -> Result<Self, ApiError> {
        self.set(key, value)?;
        Ok(self)
    }

    pub fn add_metadata_filter(
        &mut self,
        key: &str,
        value: &str,
        kind: MetadataType,
        is_system: bool,
    ) -> Result<(), ApiError> {
        if key.is_empty() {
            return Err(ApiError::FilterError(
                "metadata filter needs a key".to_string(),
            ));
        }
        compile(key, value)?;
        self.metadata.push(MetadataDef {
            key: key.to_string(),
            value: value.to_string(),
            kind,
            is_system,
        });
        Ok(())
    }

    pub fn with_metadata_filter(
        mut self,
        key: &str,
        value: &str,
        kind: MetadataType,
        is_system: bool,
    ) -> Result<Self, ApiError> {
        self.add_metadata_filter(key, value, kind, is_system)?;
        Ok(self)
    }

    /// Let vCD match metadata in the query instead of matching locally
    pub fn with_metadata_api_filter(mut self, enabled: bool) -> Self {
        self.use_metadata_api_filter = enabled;
        self
    }

    pub fn get(&self, key: FilterKey) -> Option<&str> {
        self.filters.get(&key).map(String::as_str)
    }

    pub fn flag(&self, key: FilterKey) -> bool {
        self.get(key) == Some("true")
    }

    pub fn filters(&self) -> impl Iterator<Item = (FilterKey, &str)> {
        self.filters.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn metadata(&self) -> &[MetadataDef] {
        &self.metadata
    }

    pub fn use_metadata_api_filter(&self) -> bool {
        self.use_metadata_api_filter
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.metadata.is_empty()
    }

    /// Human readable summary, used in "nothing found" errors
    pub fn describe(&self) -> String {
        let mut parts: Vec<String> = self
            .filters
            .iter()
            .map(|(k, v)| format!("{}='{}'", k, v))
            .collect();
        for m in &self.metadata {
            let domain = if m.is_system { "@SYSTEM" } else { "" };
            parts.push(format!(
                "metadata{}[{}]={}:'{}'",
                domain,
                m.key,
                m.kind.query_name(),
                m.value
            ));
        }
        if self.use_metadata_api_filter {
            parts.push("(metadata matched by vCD)".to_string());
        }
        parts.join(", ")
    }
}
