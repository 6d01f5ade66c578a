//! Edge gateways and their busy-aware operations

use std::fmt;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Instant;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::common::{Link, Reference, Tasks};
use super::error::ApiError;
use super::href::{extract_uuid, require_href};
use super::metadata::MetadataHolder;
use super::task::Task;
use super::Client;

fn busy_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"is busy completing an operation")
            .unwrap_or_else(|e| panic!("invalid busy pattern: {}", e))
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "EdgeGateway")]
pub struct EdgeGatewayType {
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@type", default)]
    pub type_: Option<String>,
    #[serde(rename = "@status", default)]
    pub status: Option<i32>,
    #[serde(rename = "Link", default)]
    pub links: Vec<Link>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Tasks", default)]
    pub tasks: Option<Tasks>,
    #[serde(rename = "Configuration", default)]
    pub configuration: GatewayConfiguration,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfiguration {
    #[serde(rename = "GatewayBackingConfig", default)]
    pub backing_config: Option<String>,
    #[serde(rename = "GatewayInterfaces", default)]
    pub interfaces: Option<GatewayInterfaces>,
    #[serde(rename = "HaEnabled", default)]
    pub ha_enabled: Option<bool>,
    #[serde(rename = "UseDefaultRouteForDnsRelay", default)]
    pub use_default_route_for_dns_relay: Option<bool>,
    #[serde(rename = "AdvancedNetworkingEnabled", default)]
    pub advanced_networking_enabled: Option<bool>,
    #[serde(rename = "DistributedRoutingEnabled", default)]
    pub distributed_routing_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayInterfaces {
    #[serde(rename = "GatewayInterface", default)]
    pub interfaces: Vec<GatewayInterface>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayInterface {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "DisplayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "Network", default)]
    pub network: Option<Reference>,
    #[serde(rename = "InterfaceType", default)]
    pub interface_type: Option<String>,
    #[serde(rename = "SubnetParticipation", default)]
    pub subnets: Vec<SubnetParticipation>,
    #[serde(rename = "UseForDefaultRoute", default)]
    pub use_for_default_route: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubnetParticipation {
    #[serde(rename = "Gateway", default)]
    pub gateway: Option<String>,
    #[serde(rename = "Netmask", default)]
    pub netmask: Option<String>,
    #[serde(rename = "IpAddress", default)]
    pub ip_address: Option<String>,
}

#[derive(Clone)]
pub struct EdgeGateway {
    pub edge_gateway: EdgeGatewayType,
    client: Client,
}

impl fmt::Debug for EdgeGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeGateway").field("edge_gateway", &self.edge_gateway).finish()
    }
}

impl EdgeGateway {
    pub fn new(client: Client, edge_gateway: EdgeGatewayType) -> Self {
        Self {
            edge_gateway,
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.edge_gateway.name
    }

    pub fn href(&self) -> &str {
        &self.edge_gateway.href
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        require_href(&self.edge_gateway.href, "edge gateway")?;
        self.edge_gateway = self.client.get_xml(&self.edge_gateway.href).await?;
        Ok(())
    }

    pub fn has_advanced_networking(&self) -> bool {
        self.edge_gateway
            .configuration
            .advanced_networking_enabled
            .unwrap_or(false)
    }

    pub fn interfaces(&self) -> &[GatewayInterface] {
        self.edge_gateway
            .configuration
            .interfaces
            .as_ref()
            .map(|i| i.interfaces.as_slice())
            .unwrap_or_default()
    }

    /// Root of this gateway's NSX-V API, `{host}/network/edges/{uuid}`
    pub fn nsx_base_url(&self) -> Result<String, ApiError> {
        let uuid = extract_uuid(&self.edge_gateway.href).ok_or_else(|| {
            ApiError::InvalidRequest(format!(
                "edge gateway HREF '{}' has no ID",
                self.edge_gateway.href
            ))
        })?;
        Ok(format!("{}/network/edges/{}", self.client.host_url(), uuid))
    }

    /// Runs `op`, retrying while vCD reports the gateway busy with another operation
    pub async fn retry_on_busy<T, F, Fut>(&self, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let config = self.client.config();
        let started = Instant::now();
        loop {
            match op().await {
                Err(e) if is_busy(&e) && started.elapsed() < config.max_retry_timeout => {
                    tracing::warn!(
                        "Edge gateway {} is busy, retrying in {:?}",
                        self.edge_gateway.name,
                        config.busy_retry_interval
                    );
                    tokio::time::sleep(config.busy_retry_interval).await;
                }
                other => return other,
            }
        }
    }

    async fn busy_action(&self, action: &str) -> Result<(), ApiError> {
        let href = format!(
            "{}/action/{}",
            require_href(&self.edge_gateway.href, "edge gateway")?,
            action
        );
        let href = href.as_str();
        let client = &self.client;
        let mut task: Task = self
            .retry_on_busy(move || async move { client.post_action(href).await })
            .await?;
        task.wait_completion().await
    }

    pub async fn redeploy(&self) -> Result<(), ApiError> {
        self.busy_action("redeploy").await
    }

    pub async fn sync_syslog_settings(&self) -> Result<(), ApiError> {
        self.busy_action("syncSyslogServerSettings").await
    }
}

fn is_busy(error: &ApiError) -> bool {
    busy_regex().is_match(&error.server_message())
}

impl MetadataHolder for EdgeGateway {
    fn metadata_client(&self) -> &Client {
        &self.client
    }

    fn metadata_href(&self) -> &str {
        &self.edge_gateway.href
    }
}

impl Client {
    pub async fn get_edge_gateway_by_href(&self, href: &str) -> Result<EdgeGateway, ApiError> {
        let gateway: EdgeGatewayType = self.get_xml(href).await?;
        Ok(EdgeGateway::new(self.clone(), gateway))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::response::decode_xml;
    use crate::api::test_helpers::{create_test_client, task_xml, TASK_ID};
    use mockito::Server;

    const EDGE_ID: &str = "55555555-5555-5555-5555-555555555555";

    fn gateway(base: &str) -> EdgeGateway {
        let xml = format!(
            r#"<EdgeGateway xmlns="http://www.vmware.com/vcloud/v1.5" href="{base}/api/admin/edgeGateway/{EDGE_ID}" name="edge-1" status="1">
    <Configuration>
        <GatewayBackingConfig>compact</GatewayBackingConfig>
        <GatewayInterfaces>
            <GatewayInterface>
                <Name>uplink</Name>
                <Network href="{base}/api/admin/network/n1" name="ext"/>
                <InterfaceType>uplink</InterfaceType>
                <SubnetParticipation>
                    <Gateway>10.0.0.1</Gateway>
                    <Netmask>255.255.255.0</Netmask>
                    <IpAddress>10.0.0.2</IpAddress>
                </SubnetParticipation>
                <UseForDefaultRoute>true</UseForDefaultRoute>
            </GatewayInterface>
        </GatewayInterfaces>
        <HaEnabled>false</HaEnabled>
        <AdvancedNetworkingEnabled>true</AdvancedNetworkingEnabled>
    </Configuration>
</EdgeGateway>"#
        );
        EdgeGateway::new(create_test_client(base), decode_xml(&xml).unwrap())
    }

    fn busy_error() -> String {
        r#"<Error xmlns="http://www.vmware.com/vcloud/v1.5" majorErrorCode="400" minorErrorCode="BUSY_ENTITY" message="The entity gateway edge-1 is busy completing an operation."/>"#.to_string()
    }

    #[test]
    fn decodes_configuration() {
        let gw = gateway("https://vcd.example.com");
        assert!(gw.has_advanced_networking());
        assert_eq!(gw.interfaces().len(), 1);
        assert_eq!(
            gw.interfaces()[0].subnets[0].ip_address.as_deref(),
            Some("10.0.0.2")
        );
        assert_eq!(
            gw.nsx_base_url().unwrap(),
            format!("https://vcd.example.com/network/edges/{}", EDGE_ID)
        );
    }

    #[tokio::test]
    async fn redeploy_retries_while_busy() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let path = format!("/api/admin/edgeGateway/{}/action/redeploy", EDGE_ID);
        // mocks are consumed in creation order until their expected hits are reached
        let busy = server
            .mock("POST", path.as_str())
            .with_status(400)
            .with_body(busy_error())
            .expect(2)
            .create_async()
            .await;
        let accepted = server
            .mock("POST", path.as_str())
            .with_status(202)
            .with_body(task_xml(&base, TASK_ID, "running"))
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", format!("/api/task/{}", TASK_ID).as_str())
            .with_status(200)
            .with_body(task_xml(&base, TASK_ID, "success"))
            .create_async()
            .await;

        gateway(&base).redeploy().await.unwrap();
        busy.assert_async().await;
        accepted.assert_async().await;
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let mock = server
            .mock(
                "POST",
                format!("/api/admin/edgeGateway/{}/action/syncSyslogServerSettings", EDGE_ID).as_str(),
            )
            .with_status(400)
            .with_body(
                r#"<Error xmlns="http://www.vmware.com/vcloud/v1.5" majorErrorCode="400" minorErrorCode="BAD_REQUEST" message="no syslog server configured"/>"#,
            )
            .expect(1)
            .create_async()
            .await;

        let result = gateway(&base).sync_syslog_settings().await;
        assert!(matches!(result, Err(ApiError::ApiError { status: 400, .. })));
        mock.assert_async().await;
    }
}
