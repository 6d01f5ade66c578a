//! Test helpers for the vCD API

#![cfg(test)]
#![allow(dead_code)]

use std::time::Duration;

use super::config::{AuthType, ClientConfig, RetryConfig};
use super::Client;

pub const TEST_TOKEN: &str = "test-session-token";
pub const ORG_ID: &str = "5e6f4b1a-0000-4c1a-9d47-1f2a3b4c5d6e";
pub const CATALOG_ID: &str = "7a1b2c3d-1111-4e5f-8a9b-0c1d2e3f4a5b";
pub const VDC_ID: &str = "9f8e7d6c-2222-4b5a-9c8d-7e6f5a4b3c2d";
pub const TASK_ID: &str = "0a1b2c3d-3333-4e5f-a6b7-c8d9e0f1a2b3";

pub fn test_config(url: &str) -> ClientConfig {
    ClientConfig::new(url)
        .with_token(TEST_TOKEN, AuthType::Token)
        .with_insecure(true)
        .with_task_poll_interval(Duration::from_millis(5))
        .with_busy_retry_interval(Duration::from_millis(5))
        .with_upload_progress_interval(Duration::from_millis(5))
        .with_max_retry_timeout(Duration::from_secs(2))
        .with_retry(RetryConfig {
            max_retries: 1,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            timeout_seconds: 5,
        })
}

pub fn create_test_client(url: &str) -> Client {
    Client::with_config(test_config(url)).unwrap()
}

pub fn task_xml(base: &str, id: &str, status: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Task xmlns="http://www.vmware.com/vcloud/v1.5" href="{base}/api/task/{id}" id="urn:vcloud:task:{id}" name="task" operation="Running" operationName="testOperation" status="{status}" type="application/vnd.vmware.vcloud.task+xml">
    <Link rel="task:cancel" href="{base}/api/task/{id}/action/cancel"/>
    <Owner href="{base}/api/vApp/vapp-1" name="owner" type="application/vnd.vmware.vcloud.vApp+xml"/>
    <Progress>50</Progress>
</Task>"#,
        base = base,
        id = id,
        status = status
    )
}

pub fn failed_task_xml(base: &str, id: &str, message: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Task xmlns="http://www.vmware.com/vcloud/v1.5" href="{base}/api/task/{id}" id="urn:vcloud:task:{id}" operationName="testOperation" status="error">
    <Error majorErrorCode="500" message="{message}" minorErrorCode="INTERNAL_SERVER_ERROR"/>
</Task>"#,
        base = base,
        id = id,
        message = message
    )
}

#[cfg(test)]
mod tests {
    use super::super::*;
    use super::*;

    #[test]
    fn test_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.max_backoff_ms, 10000);
        assert_eq!(config.timeout_seconds, 60);
    }

    #[test]
    fn test_api_query_params() {
        use common::ApiQueryParams;

        let params = ApiQueryParams::new()
            .add("type", "media")
            .add("filter", "name==my iso;catalogName==lib")
            .add_optional("page", Some(2))
            .add_optional("none", None::<String>);

        let query = params.to_query_string();
        assert!(query.starts_with("?type=media"));
        assert!(query.contains("filter=name%3D%3Dmy%20iso%3BcatalogName%3D%3Dlib"));
        assert!(query.contains("page=2"));
        assert!(!query.contains("none="));
        assert_eq!(ApiQueryParams::new().to_query_string(), "");
    }

    #[test]
    fn test_page_params() {
        use common::{ApiQueryParams, PageParams};

        let params = PageParams::new().with_page(3).with_page_size(25);
        let query = params.apply(ApiQueryParams::new()).to_query_string();

        assert!(query.contains("page=3"));
        assert!(query.contains("pageSize=25"));
    }

    #[test]
    fn pool_defaults_keep_uploads_longer() {
        let config = pool::ConnectionPoolConfig::default();
        assert_eq!(config.max_idle_per_host, 10);
        assert_eq!(config.connect_timeout.as_secs(), 10);
        assert!(config.upload_timeout > config.request_timeout);
        assert!(config.tcp_keepalive.is_some());
    }

    #[tokio::test]
    async fn stats_count_outcomes_and_pieces() {
        use pool::{ConnectionPoolConfig, ConnectionPoolManager, RequestOutcome};

        let manager = ConnectionPoolManager::new(ConnectionPoolConfig::default());
        assert!(manager.get_stats().await.last_request.is_none());

        manager.record(RequestOutcome::Retried).await;
        manager.record(RequestOutcome::Succeeded).await;
        manager.record(RequestOutcome::Failed).await;
        manager.record_upload_piece(1024).await;
        manager.record_upload_piece(512).await;

        let stats = manager.get_stats().await;
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.retried_requests, 1);
        assert_eq!(stats.failed_requests, 1);
        assert_eq!(stats.uploaded_pieces, 2);
        assert_eq!(stats.uploaded_bytes, 1536);
        assert!(stats.last_request.is_some());
    }

    #[test]
    fn test_status_names() {
        assert_eq!(common::status_name(4), "POWERED_ON");
        assert_eq!(common::status_name(8), "POWERED_OFF");
        assert_eq!(common::status_name(-1), "FAILED_CREATION");
        assert_eq!(common::status_name(99), "UNRECOGNIZED");
    }

    #[test]
    fn test_find_link() {
        use common::{find_link, find_link_by_name, mime, rel, Link};

        let links = vec![
            Link {
                rel: rel::DOWN.to_string(),
                href: "https://h/api/catalog/1".to_string(),
                type_: Some(mime::CATALOG.to_string()),
                name: Some("lib".to_string()),
                id: None,
            },
            Link {
                rel: rel::DOWN.to_string(),
                href: "https://h/api/vdc/2".to_string(),
                type_: Some(mime::VDC.to_string()),
                name: Some("vdc".to_string()),
                id: None,
            },
        ];

        assert_eq!(
            find_link(&links, rel::DOWN, Some(mime::VDC)).unwrap().href,
            "https://h/api/vdc/2"
        );
        assert_eq!(
            find_link(&links, rel::DOWN, None).unwrap().href,
            "https://h/api/catalog/1"
        );
        assert!(find_link(&links, rel::UP, None).is_none());
        assert!(find_link_by_name(&links, rel::DOWN, mime::CATALOG, "lib").is_some());
        assert!(find_link_by_name(&links, rel::DOWN, mime::CATALOG, "vdc").is_none());
    }
}
