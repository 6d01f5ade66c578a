use regex::Regex;

use super::date::DateExpr;
use super::item::QueryItem;
use crate::api::error::ApiError;
use crate::api::href::same_id;

/// A single compiled criterion
#[derive(Debug, Clone)]
pub enum Condition {
    Name(Regex),
    Ip(Regex),
    Date(DateExpr),
    Parent(String),
    ParentId(String),
    Metadata {
        key: String,
        value: Regex,
        is_system: bool,
    },
}

impl Condition {
    /// Whether `item` satisfies this condition.
    ///
    /// Fails only when a date comparison meets an unparseable item date.
    pub fn matches(&self, item: &QueryItem) -> Result<bool, ApiError> {
        match self {
            Condition::Name(re) => Ok(re.is_match(item.name())),
            Condition::Ip(re) => Ok(item.ip().is_some_and(|ip| re.is_match(ip))),
            Condition::Date(expr) => match item.date() {
                Some(date) => expr.matches(date).map_err(|e| {
                    ApiError::FilterError(format!(
                        "{} '{}': {}",
                        item.item_type(),
                        item.name(),
                        e
                    ))
                }),
                None => Ok(false),
            },
            Condition::Parent(name) => Ok(item.parent_name() == Some(name.as_str())),
            Condition::ParentId(id) => Ok(item.parent_id().is_some_and(|p| same_id(p, id))),
            Condition::Metadata {
                key,
                value,
                is_system,
            } => Ok(item
                .metadata_value(key, *is_system)
                .is_some_and(|v| value.is_match(v))),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Condition::Name(re) => format!("name matches '{}'", re.as_str()),
            Condition::Ip(re) => format!("ip matches '{}'", re.as_str()),
            Condition::Date(expr) => format!("date {}", expr),
            Condition::Parent(name) => format!("parent is '{}'", name),
            Condition::ParentId(id) => format!("parent ID is '{}'", id),
            Condition::Metadata {
                key,
                value,
                is_system,
            } => format!(
                "{}metadata '{}' matches '{}'",
                if *is_system { "system " } else { "" },
                key,
                value.as_str()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::query::{QueryMediaRecord, QueryVmRecord};

    fn vm(name: &str, ip: Option<&str>, date: Option<&str>) -> QueryItem {
        QueryItem::Vm(QueryVmRecord {
            name: name.to_string(),
            href: format!("https://h/api/vApp/vm-{}", name),
            container: Some(
                "https://h/api/vApp/vapp-1c0c3ef8-4f1e-4ab5-a48d-3bb55e1b4c8a".to_string(),
            ),
            container_name: Some("app".to_string()),
            ip_address: ip.map(String::from),
            date_created: date.map(String::from),
            ..Default::default()
        })
    }

    #[test]
    fn ip_condition_needs_an_address() {
        let cond = Condition::Ip(Regex::new(r"^10\.").unwrap());
        assert!(cond.matches(&vm("a", Some("10.0.0.1"), None)).unwrap());
        assert!(!cond.matches(&vm("b", Some("192.168.1.1"), None)).unwrap());
        assert!(!cond.matches(&vm("c", None, None)).unwrap());
    }

    #[test]
    fn date_condition_reports_bad_item_dates() {
        let cond = Condition::Date(DateExpr::parse("> 2023-01-01").unwrap());
        assert!(cond.matches(&vm("a", None, Some("2023-06-01T00:00:00Z"))).unwrap());
        assert!(!cond.matches(&vm("b", None, None)).unwrap());
        let err = cond.matches(&vm("c", None, Some("whenever"))).unwrap_err();
        assert!(err.to_string().contains("vm 'c'"));
    }

    #[test]
    fn parent_conditions() {
        let item = vm("a", None, None);
        assert!(Condition::Parent("app".to_string()).matches(&item).unwrap());
        assert!(!Condition::Parent("App".to_string()).matches(&item).unwrap());
        assert!(Condition::ParentId(
            "urn:vcloud:vapp:1c0c3ef8-4f1e-4ab5-a48d-3bb55e1b4c8a".to_string()
        )
        .matches(&item)
        .unwrap());
    }

    #[test]
    fn metadata_condition_needs_the_key() {
        let cond = Condition::Metadata {
            key: "os".to_string(),
            value: Regex::new("^lin").unwrap(),
            is_system: false,
        };
        let media = QueryItem::Media(QueryMediaRecord {
            name: "boot.iso".to_string(),
            ..Default::default()
        });
        assert!(!cond.matches(&media).unwrap());
        assert_eq!(cond.describe(), "metadata 'os' matches '^lin'");
    }
}
