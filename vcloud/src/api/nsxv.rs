//! NAT and firewall rules of advanced edge gateways, through the NSX-V API proxied by vCD

use reqwest::header::LOCATION;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::edge_gateway::EdgeGateway;
use super::error::ApiError;
use super::response::decode_xml;

const NSX_CONTENT_TYPE: &str = "application/xml";

const NAT_CONFIG: &str = "nat/config";
const NAT_RULES: &str = "nat/config/rules";
const FIREWALL_CONFIG: &str = "firewall/config";
const FIREWALL_RULES: &str = "firewall/config/rules";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename = "nat")]
pub struct NatConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(rename = "natRules", default)]
    pub rules: Option<NatRules>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "natRules")]
pub struct NatRules {
    #[serde(rename = "natRule", default)]
    pub rules: Vec<NatRule>,
}

/// One SNAT or DNAT rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "natRule")]
pub struct NatRule {
    #[serde(rename = "ruleId", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "ruleTag", default, skip_serializing_if = "Option::is_none")]
    pub rule_tag: Option<String>,
    #[serde(rename = "loggingEnabled", default)]
    pub logging_enabled: bool,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "translatedAddress", default)]
    pub translated_address: String,
    /// `user` or `internal_high`; only user rules can be changed
    #[serde(rename = "ruleType", default, skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<String>,
    /// `snat` or `dnat`
    #[serde(default)]
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnic: Option<String>,
    #[serde(rename = "originalAddress", default)]
    pub original_address: String,
    #[serde(
        rename = "dnatMatchSourceAddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dnat_match_source_address: Option<String>,
    #[serde(
        rename = "snatMatchDestinationAddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub snat_match_destination_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(rename = "icmpType", default, skip_serializing_if = "Option::is_none")]
    pub icmp_type: Option<String>,
    #[serde(rename = "originalPort", default, skip_serializing_if = "Option::is_none")]
    pub original_port: Option<String>,
    #[serde(
        rename = "dnatMatchSourcePort",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dnat_match_source_port: Option<String>,
    #[serde(
        rename = "snatMatchDestinationPort",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub snat_match_destination_port: Option<String>,
    #[serde(rename = "translatedPort", default, skip_serializing_if = "Option::is_none")]
    pub translated_port: Option<String>,
}

impl NatRule {
    fn with_action(
        action: &str,
        vnic: &str,
        original_address: impl Into<String>,
        translated_address: impl Into<String>,
    ) -> Self {
        Self {
            enabled: true,
            action: action.to_string(),
            vnic: Some(vnic.to_string()),
            original_address: original_address.into(),
            translated_address: translated_address.into(),
            ..Default::default()
        }
    }

    /// Destination NAT on interface `vnic`
    pub fn dnat(
        vnic: &str,
        original_address: impl Into<String>,
        translated_address: impl Into<String>,
    ) -> Self {
        Self::with_action("dnat", vnic, original_address, translated_address)
    }

    /// Source NAT on interface `vnic`
    pub fn snat(
        vnic: &str,
        original_address: impl Into<String>,
        translated_address: impl Into<String>,
    ) -> Self {
        Self::with_action("snat", vnic, original_address, translated_address)
    }

    fn validate(&self) -> Result<(), ApiError> {
        if self.action != "snat" && self.action != "dnat" {
            return Err(ApiError::InvalidRequest(format!(
                "NAT rule action must be 'snat' or 'dnat', got '{}'",
                self.action
            )));
        }
        if self.original_address.is_empty() {
            return Err(ApiError::InvalidRequest(
                "NAT rule original address is empty".to_string(),
            ));
        }
        if self.translated_address.is_empty() {
            return Err(ApiError::InvalidRequest(
                "NAT rule translated address is empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename = "firewall")]
pub struct FirewallConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(rename = "firewallRules", default)]
    pub rules: Option<FirewallRules>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "firewallRules")]
pub struct FirewallRules {
    #[serde(rename = "firewallRule", default)]
    pub rules: Vec<FirewallRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "firewallRule")]
pub struct FirewallRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "ruleTag", default, skip_serializing_if = "Option::is_none")]
    pub rule_tag: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "ruleType", default, skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<FirewallEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<FirewallEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<FirewallApplication>,
    #[serde(rename = "matchTranslated", default, skip_serializing_if = "Option::is_none")]
    pub match_translated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// `accept`, `deny` or `reject`
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(rename = "loggingEnabled", default)]
    pub logging_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Source or destination of a firewall rule; empty means any
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallEndpoint {
    #[serde(default)]
    pub exclude: bool,
    #[serde(rename = "vnicGroupId", default, skip_serializing_if = "Vec::is_empty")]
    pub vnic_group_ids: Vec<String>,
    #[serde(rename = "groupingObjectId", default, skip_serializing_if = "Vec::is_empty")]
    pub grouping_object_ids: Vec<String>,
    #[serde(rename = "ipAddress", default, skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<String>,
}

impl FirewallEndpoint {
    pub fn ip_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ip_addresses: addresses.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallApplication {
    #[serde(rename = "applicationId", default, skip_serializing_if = "Vec::is_empty")]
    pub application_ids: Vec<String>,
    #[serde(rename = "service", default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<FirewallService>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallService {
    #[serde(default)]
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(rename = "sourcePort", default, skip_serializing_if = "Option::is_none")]
    pub source_port: Option<String>,
    #[serde(rename = "icmpType", default, skip_serializing_if = "Option::is_none")]
    pub icmp_type: Option<String>,
}

impl FirewallRule {
    pub fn new(name: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: action.into(),
            enabled: true,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), ApiError> {
        match self.action.as_str() {
            "accept" | "deny" | "reject" => Ok(()),
            other => Err(ApiError::InvalidRequest(format!(
                "firewall rule action must be accept, deny or reject, got '{}'",
                other
            ))),
        }
    }
}

fn encode_nsx<T: Serialize>(body: &T) -> Result<String, ApiError> {
    quick_xml::se::to_string(body).map_err(|e| ApiError::EncodeError(e.to_string()))
}

/// Rule ID from a `Location` header like `/network/edges/edge-1/nat/config/rules/197157`
fn rule_id_from_location(response: &reqwest::Response) -> Result<String, ApiError> {
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::ParseError("NSX response has no Location header".to_string()))?;
    location
        .split('?')
        .next()
        .unwrap_or_default()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::ParseError(format!("no rule ID in Location '{}'", location)))
}

fn require_rule_id<'a>(id: Option<&'a str>, kind: &str) -> Result<&'a str, ApiError> {
    id.filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest(format!("{} has no ID", kind)))
}

impl EdgeGateway {
    fn nsx_href(&self, path: &str) -> Result<String, ApiError> {
        Ok(format!("{}/{}", self.nsx_base_url()?, path))
    }

    async fn nsx_get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let href = self.nsx_href(path)?;
        let response = self
            .client()
            .execute_raw(Method::GET, &href, None, None)
            .await?;
        decode_xml(&response.text().await?)
    }

    /// Sends a change to the NSX API, retrying while the gateway is busy
    async fn nsx_send(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<reqwest::Response, ApiError> {
        let href = self.nsx_href(path)?;
        let href = href.as_str();
        let body = body.as_deref();
        let client = self.client();
        self.retry_on_busy(move || {
            let method = method.clone();
            async move {
                client
                    .execute_raw(
                        method,
                        href,
                        body.map(|_| NSX_CONTENT_TYPE),
                        body.map(str::to_string),
                    )
                    .await
            }
        })
        .await
    }

    fn require_advanced(&self) -> Result<(), ApiError> {
        if self.has_advanced_networking() {
            Ok(())
        } else {
            Err(ApiError::InvalidRequest(format!(
                "edge gateway '{}' does not have advanced networking enabled",
                self.name()
            )))
        }
    }

    pub async fn get_nat_rules(&self) -> Result<Vec<NatRule>, ApiError> {
        self.require_advanced()?;
        let config: NatConfig = self.nsx_get(NAT_CONFIG).await?;
        Ok(config.rules.map(|r| r.rules).unwrap_or_default())
    }

    pub async fn get_nat_rule_by_id(&self, id: &str) -> Result<NatRule, ApiError> {
        let id = require_rule_id(Some(id), "NAT rule lookup")?;
        self.get_nat_rules()
            .await?
            .into_iter()
            .find(|rule| rule.id.as_deref() == Some(id))
            .ok_or_else(|| ApiError::not_found("NAT rule", id))
    }

    /// Creates `rule` and returns it as stored, with its new ID
    pub async fn create_nat_rule(&self, rule: &NatRule) -> Result<NatRule, ApiError> {
        self.require_advanced()?;
        rule.validate()?;
        let body = encode_nsx(&NatRules {
            rules: vec![NatRule {
                id: None,
                ..rule.clone()
            }],
        })?;
        let response = self
            .nsx_send(Method::POST, NAT_RULES, Some(body))
            .await?;
        let id = rule_id_from_location(&response)?;
        tracing::info!(
            "Created {} rule {} on edge gateway {}",
            rule.action,
            id,
            self.name()
        );
        self.get_nat_rule_by_id(&id).await
    }

    pub async fn update_nat_rule(&self, rule: &NatRule) -> Result<NatRule, ApiError> {
        self.require_advanced()?;
        let id = require_rule_id(rule.id.as_deref(), "NAT rule")?;
        rule.validate()?;
        let body = encode_nsx(rule)?;
        self.nsx_send(Method::PUT, &format!("{}/{}", NAT_RULES, id), Some(body))
            .await?;
        self.get_nat_rule_by_id(id).await
    }

    pub async fn delete_nat_rule_by_id(&self, id: &str) -> Result<(), ApiError> {
        self.require_advanced()?;
        let id = require_rule_id(Some(id), "NAT rule")?;
        tracing::info!("Deleting NAT rule {} on edge gateway {}", id, self.name());
        self.nsx_send(Method::DELETE, &format!("{}/{}", NAT_RULES, id), None)
            .await?;
        Ok(())
    }

    pub async fn get_firewall_rules(&self) -> Result<Vec<FirewallRule>, ApiError> {
        self.require_advanced()?;
        let config: FirewallConfig = self.nsx_get(FIREWALL_CONFIG).await?;
        Ok(config.rules.map(|r| r.rules).unwrap_or_default())
    }

    pub async fn get_firewall_rule_by_id(&self, id: &str) -> Result<FirewallRule, ApiError> {
        let id = require_rule_id(Some(id), "firewall rule lookup")?;
        self.get_firewall_rules()
            .await?
            .into_iter()
            .find(|rule| rule.id.as_deref() == Some(id))
            .ok_or_else(|| ApiError::not_found("firewall rule", id))
    }

    /// Creates `rule`, placed above `above_rule_id` when given, else last among user rules
    pub async fn create_firewall_rule(
        &self,
        rule: &FirewallRule,
        above_rule_id: Option<&str>,
    ) -> Result<FirewallRule, ApiError> {
        self.require_advanced()?;
        rule.validate()?;
        let body = encode_nsx(&FirewallRules {
            rules: vec![FirewallRule {
                id: None,
                ..rule.clone()
            }],
        })?;
        let path = match above_rule_id.filter(|id| !id.is_empty()) {
            Some(above) => format!(
                "{}?aboveRuleId={}",
                FIREWALL_RULES,
                urlencoding::encode(above)
            ),
            None => FIREWALL_RULES.to_string(),
        };
        let response = self.nsx_send(Method::POST, &path, Some(body)).await?;
        let id = rule_id_from_location(&response)?;
        tracing::info!(
            "Created firewall rule {} ({}) on edge gateway {}",
            id,
            rule.name,
            self.name()
        );
        self.get_firewall_rule_by_id(&id).await
    }

    pub async fn update_firewall_rule(&self, rule: &FirewallRule) -> Result<FirewallRule, ApiError> {
        self.require_advanced()?;
        let id = require_rule_id(rule.id.as_deref(), "firewall rule")?;
        rule.validate()?;
        let body = encode_nsx(rule)?;
        self.nsx_send(Method::PUT, &format!("{}/{}", FIREWALL_RULES, id), Some(body))
            .await?;
        self.get_firewall_rule_by_id(id).await
    }

    pub async fn delete_firewall_rule_by_id(&self, id: &str) -> Result<(), ApiError> {
        self.require_advanced()?;
        let id = require_rule_id(Some(id), "firewall rule")?;
        tracing::info!(
            "Deleting firewall rule {} on edge gateway {}",
            id,
            self.name()
        );
        self.nsx_send(Method::DELETE, &format!("{}/{}", FIREWALL_RULES, id), None)
            .await?;
        Ok(())
    }
}
