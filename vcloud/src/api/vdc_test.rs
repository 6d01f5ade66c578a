#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::api::filter::{FilterDef, FilterKey};
    use crate::api::response::decode_xml;
    use crate::api::test_helpers::{create_test_client, task_xml, TASK_ID, VDC_ID};
    use mockito::{Matcher, Server};

    const VAPP_ID: &str = "66666666-6666-6666-6666-666666666666";
    const EDGE_ID: &str = "55555555-5555-5555-5555-555555555555";

    fn vdc(base: &str) -> Vdc {
        let xml = format!(
            r#"<Vdc xmlns="http://www.vmware.com/vcloud/v1.5" href="{base}/api/vdc/{VDC_ID}" id="urn:vcloud:vdc:{VDC_ID}" name="dev-vdc" status="1">
    <Link rel="edgeGateways" href="{base}/api/admin/vdc/{VDC_ID}/edgeGateways" type="application/vnd.vmware.vcloud.query.records+xml"/>
    <AllocationModel>AllocationVApp</AllocationModel>
    <ResourceEntities>
        <ResourceEntity href="{base}/api/vApp/vapp-{VAPP_ID}" name="web" type="application/vnd.vmware.vcloud.vApp+xml"/>
        <ResourceEntity href="{base}/api/vAppTemplate/vappTemplate-t1" name="web" type="application/vnd.vmware.vcloud.vAppTemplate+xml"/>
        <ResourceEntity href="{base}/api/media/m1" name="tools.iso" type="application/vnd.vmware.vcloud.media+xml"/>
    </ResourceEntities>
    <AvailableNetworks>
        <Network href="{base}/api/network/n1" name="backend" type="application/vnd.vmware.vcloud.network+xml"/>
    </AvailableNetworks>
    <IsEnabled>true</IsEnabled>
</Vdc>"#
        );
        Vdc::new(create_test_client(base), decode_xml(&xml).unwrap())
    }

    fn vapp_xml(base: &str, with_task: bool) -> String {
        let tasks = if with_task {
            format!(
                r#"<Tasks><Task href="{base}/api/task/{TASK_ID}" status="running" operationName="vdcComposeVapp"/></Tasks>"#
            )
        } else {
            String::new()
        };
        format!(
            r#"<VApp xmlns="http://www.vmware.com/vcloud/v1.5" href="{base}/api/vApp/vapp-{VAPP_ID}" name="web" status="8">{tasks}</VApp>"#
        )
    }

    #[test]
    fn only_vapps_are_listed() {
        let vdc = vdc("https://vcd.example.com");
        let refs = vdc.vapp_references();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name_or_empty(), "web");
        assert_eq!(
            vdc.vdc.available_networks.as_ref().unwrap().networks.len(),
            1
        );
    }

    #[tokio::test]
    async fn vapp_lookup_by_name_or_id() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let get = server
            .mock("GET", format!("/api/vApp/vapp-{}", VAPP_ID).as_str())
            .with_status(200)
            .with_body(vapp_xml(&base, false))
            .expect(2)
            .create_async()
            .await;

        let vdc = vdc(&base);
        let by_name = vdc.get_vapp_by_name_or_id("web").await.unwrap();
        let by_id = vdc.get_vapp_by_name_or_id(VAPP_ID).await.unwrap();
        assert_eq!(by_name.href(), by_id.href());
        assert!(vdc
            .get_vapp_by_name_or_id("missing")
            .await
            .unwrap_err()
            .is_not_found());
        get.assert_async().await;
    }

    #[tokio::test]
    async fn compose_waits_for_creation_task() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let compose = server
            .mock("POST", format!("/api/vdc/{}/action/composeVApp", VDC_ID).as_str())
            .match_header(
                "content-type",
                "application/vnd.vmware.vcloud.composeVAppParams+xml",
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="web""#.to_string()),
                Matcher::Regex("<Description>web tier</Description>".to_string()),
            ]))
            .with_status(201)
            .with_body(vapp_xml(&base, true))
            .create_async()
            .await;
        let task = server
            .mock("GET", format!("/api/task/{}", TASK_ID).as_str())
            .with_status(200)
            .with_body(task_xml(&base, TASK_ID, "success"))
            .create_async()
            .await;
        let refreshed = server
            .mock("GET", format!("/api/vApp/vapp-{}", VAPP_ID).as_str())
            .with_status(200)
            .with_body(vapp_xml(&base, false))
            .create_async()
            .await;

        let vdc = vdc(&base);
        let vapp = vdc.compose_empty_vapp("web", "web tier").await.unwrap();
        assert_eq!(vapp.name(), "web");
        assert!(vapp.vapp.tasks.is_none());
        assert!(matches!(
            vdc.compose_empty_vapp("", "").await,
            Err(ApiError::InvalidRequest(_))
        ));
        compose.assert_async().await;
        task.assert_async().await;
        refreshed.assert_async().await;
    }

    #[tokio::test]
    async fn edge_gateways_through_link() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let records = server
            .mock("GET", format!("/api/admin/vdc/{}/edgeGateways", VDC_ID).as_str())
            .with_status(200)
            .with_body(format!(
                r#"<QueryResultRecords xmlns="http://www.vmware.com/vcloud/v1.5" total="1" page="1" pageSize="25">
    <EdgeGatewayRecord name="edge-1" href="{base}/api/admin/edgeGateway/{EDGE_ID}" orgVdcName="dev-vdc" gatewayStatus="READY"/>
</QueryResultRecords>"#
            ))
            .expect(3)
            .create_async()
            .await;
        let gateway = server
            .mock("GET", format!("/api/admin/edgeGateway/{}", EDGE_ID).as_str())
            .with_status(200)
            .with_body(format!(
                r#"<EdgeGateway xmlns="http://www.vmware.com/vcloud/v1.5" href="{base}/api/admin/edgeGateway/{EDGE_ID}" name="edge-1"><Configuration/></EdgeGateway>"#
            ))
            .expect(2)
            .create_async()
            .await;

        let vdc = vdc(&base);
        let found = vdc.query_edge_gateways().await.unwrap();
        assert_eq!(found.len(), 1);
        // a plain name skips the ID scan and lists the gateways once
        let edge = vdc.get_edge_gateway_by_name_or_id("edge-1").await.unwrap();
        assert_eq!(edge.name(), "edge-1");
        let urn = format!("urn:vcloud:gateway:{}", EDGE_ID);
        let by_id = vdc.get_edge_gateway_by_name_or_id(&urn).await.unwrap();
        assert_eq!(by_id.href(), edge.href());
        records.assert_async().await;
        gateway.assert_async().await;
    }

    #[tokio::test]
    async fn create_disk_waits_and_refreshes() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let create = server
            .mock("POST", format!("/api/vdc/{}/disk", VDC_ID).as_str())
            .match_header(
                "content-type",
                "application/vnd.vmware.vcloud.diskCreateParams+xml",
            )
            .match_body(Matcher::Regex(r#"sizeMb="100""#.to_string()))
            .with_status(201)
            .with_body(format!(
                r#"<Disk xmlns="http://www.vmware.com/vcloud/v1.5" href="{base}/api/disk/d1" name="scratch" sizeMb="100" status="0">
    <Tasks><Task href="{base}/api/task/{TASK_ID}" status="running"/></Tasks>
</Disk>"#
            ))
            .create_async()
            .await;
        server
            .mock("GET", format!("/api/task/{}", TASK_ID).as_str())
            .with_status(200)
            .with_body(task_xml(&base, TASK_ID, "success"))
            .create_async()
            .await;
        let refreshed = server
            .mock("GET", "/api/disk/d1")
            .with_status(200)
            .with_body(format!(
                r#"<Disk xmlns="http://www.vmware.com/vcloud/v1.5" href="{base}/api/disk/d1" name="scratch" sizeMb="100" status="1"/>"#
            ))
            .create_async()
            .await;

        let vdc = vdc(&base);
        let disk = vdc.create_disk(&DiskSpec::new("scratch", 100)).await.unwrap();
        assert_eq!(disk.disk.status, Some(1));
        assert!(vdc.create_disk(&DiskSpec::new("bad", 0)).await.is_err());
        create.assert_async().await;
        refreshed.assert_async().await;
    }

    #[tokio::test]
    async fn query_disks_filters_by_vdc() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let query = server
            .mock("GET", "/api/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "disk".into()),
                Matcher::UrlEncoded(
                    "filter".into(),
                    format!("name==scratch;vdc=={}/api/vdc/{}", base, VDC_ID),
                ),
            ]))
            .with_status(200)
            .with_body(format!(
                r#"<QueryResultRecords xmlns="http://www.vmware.com/vcloud/v1.5" total="1" page="1" pageSize="128">
    <DiskRecord name="scratch" href="{base}/api/disk/d1" vdcName="dev-vdc" sizeMb="100"/>
</QueryResultRecords>"#
            ))
            .create_async()
            .await;

        let disks = vdc(&base).query_disks("scratch").await.unwrap();
        assert_eq!(disks.len(), 1);
        query.assert_async().await;
    }

    #[tokio::test]
    async fn search_is_scoped_to_the_vdc() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let query = server
            .mock("GET", "/api/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "vApp".into()),
                Matcher::UrlEncoded("filter".into(), "vdcName==dev-vdc".into()),
            ]))
            .with_status(200)
            .with_body(format!(
                r#"<QueryResultRecords xmlns="http://www.vmware.com/vcloud/v1.5" total="3" page="1" pageSize="128">
    <VAppRecord name="web" href="{base}/api/vApp/vapp-{VAPP_ID}" vdcName="dev-vdc"/>
    <VAppRecord name="worker" href="{base}/api/vApp/vapp-2" vdcName="dev-vdc"/>
    <VAppRecord name="web-copy" href="{base}/api/vApp/vapp-3" vdcName="prod-vdc"/>
</QueryResultRecords>"#
            ))
            .create_async()
            .await;

        let def = FilterDef::new()
            .with_filter(FilterKey::NameRegex, "^web")
            .unwrap();
        let found = vdc(&base).search_by_filter(QueryType::VApp, &def).await.unwrap();
        let names: Vec<&str> = found.iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["web"]);
        query.assert_async().await;
    }

    #[tokio::test]
    async fn search_rejects_types_outside_vdc() {
        let vdc = vdc("https://vcd.example.com");
        let result = vdc
            .search_by_filter(QueryType::Media, &FilterDef::new())
            .await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }
}
