//! Integration tests against a live vCloud Director
//!
//! Configure with the `VCD_*` variables read by `ClientConfig::from_env`, plus
//! `VCD_TEST_CATALOG`, `VCD_TEST_VDC` and `VCD_TEST_EDGE_GATEWAY` where needed.

use vcloud::api::query::QueryType;
use vcloud::api::{Client, ClientConfig, FilterDef, FilterKey};

async fn connect() -> Client {
    vcloud::logging::init_logging();
    let config = ClientConfig::from_env().expect("VCD_URL not set");
    Client::connect(config).await.expect("Failed to connect")
}

fn org_name() -> String {
    std::env::var("VCD_ORG").expect("VCD_ORG not set")
}

#[tokio::test]
#[ignore] // Only run with an actual vCD instance
async fn test_versions_and_session() {
    let client = connect().await;

    let versions = client.supported_versions().await.unwrap();
    assert!(versions.max_version().is_some());
    assert!(client
        .api_version_supported(&client.config().api_version)
        .await
        .unwrap());

    client.disconnect().await.unwrap();
}

#[tokio::test]
#[ignore] // Only run with an actual vCD instance
async fn test_org_and_vdc_lookup() {
    let client = connect().await;
    let org = client.get_org_by_name_or_id(&org_name()).await.unwrap();
    let by_id = client
        .get_org_by_name_or_id(org.org.id.as_deref().unwrap_or(org.href()))
        .await
        .unwrap();
    assert_eq!(org.name(), by_id.name());

    if let Ok(vdc_name) = std::env::var("VCD_TEST_VDC") {
        let vdc = org.get_vdc_by_name_or_id(&vdc_name).await.unwrap();
        let vms = vdc.query_vms().await.unwrap();
        println!("VDC {} holds {} VMs", vdc.name(), vms.len());
    }
}

#[tokio::test]
#[ignore] // Only run with an actual vCD instance
async fn test_catalog_search_by_filter() {
    let catalog_name = std::env::var("VCD_TEST_CATALOG").expect("VCD_TEST_CATALOG not set");
    let client = connect().await;
    let org = client.get_org_by_name_or_id(&org_name()).await.unwrap();
    let catalog = org.get_catalog_by_name_or_id(&catalog_name).await.unwrap();

    let def = FilterDef::new().with_filter(FilterKey::NameRegex, ".*").unwrap();
    let items = catalog
        .search_by_filter(QueryType::VAppTemplate, &def)
        .await
        .unwrap();
    for item in &items {
        println!("{} {}", item.item_type(), item.name());
    }

    let latest = FilterDef::new()
        .with_filter(FilterKey::Latest, "true")
        .unwrap();
    let newest = catalog
        .search_by_filter(QueryType::VAppTemplate, &latest)
        .await
        .unwrap();
    assert!(newest.len() <= 1);
}

#[tokio::test]
#[ignore] // Only run with an actual vCD instance
async fn test_edge_gateway_nat_rules() {
    let (vdc_name, edge_name) = match (
        std::env::var("VCD_TEST_VDC"),
        std::env::var("VCD_TEST_EDGE_GATEWAY"),
    ) {
        (Ok(vdc), Ok(edge)) => (vdc, edge),
        _ => return,
    };
    let client = connect().await;
    let org = client.get_org_by_name_or_id(&org_name()).await.unwrap();
    let vdc = org.get_vdc_by_name_or_id(&vdc_name).await.unwrap();
    let edge = vdc.get_edge_gateway_by_name_or_id(&edge_name).await.unwrap();

    if edge.has_advanced_networking() {
        let rules = edge.get_nat_rules().await.unwrap();
        println!("Edge gateway {} has {} NAT rules", edge.name(), rules.len());
        let firewall = edge.get_firewall_rules().await.unwrap();
        println!("Edge gateway {} has {} firewall rules", edge.name(), firewall.len());
    }
}
