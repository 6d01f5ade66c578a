#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::api::metadata::{Metadata, MetadataEntry, MetadataType, TypedValue};
    use crate::api::query::{QueryMediaRecord, QueryVmRecord};
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    fn media(name: &str, date: Option<&str>, os: Option<&str>) -> QueryItem {
        let metadata = os.map(|value| Metadata {
            entries: vec![MetadataEntry {
                key: "os".to_string(),
                typed_value: TypedValue {
                    xsi_type: "MetadataStringValue".to_string(),
                    value: value.to_string(),
                },
                ..Default::default()
            }],
            ..Default::default()
        });
        QueryItem::Media(QueryMediaRecord {
            name: name.to_string(),
            href: format!("https://h/api/media/{}", name),
            catalog_name: Some("lib".to_string()),
            creation_date: date.map(String::from),
            metadata,
            ..Default::default()
        })
    }

    fn names(items: &[QueryItem]) -> Vec<&str> {
        items.iter().map(|i| i.name()).collect()
    }

    fn sample() -> Vec<QueryItem> {
        vec![
            media("photon-3.iso", Some("2022-05-01T10:00:00Z"), Some("linux")),
            media("photon-4.iso", Some("2023-02-01T10:00:00Z"), Some("linux")),
            media("photon-5.iso", Some("garbage"), None),
            media("windows.iso", Some("2023-06-01T10:00:00Z"), Some("windows")),
        ]
    }

    #[test]
    fn all_conditions_must_match() {
        let def = FilterDef::new()
            .with_filter(FilterKey::NameRegex, "^photon")
            .unwrap()
            .with_metadata_filter("os", "^lin", MetadataType::String, false)
            .unwrap();

        let found = select_items(sample(), &def).unwrap();
        assert_eq!(names(&found), vec!["photon-3.iso", "photon-4.iso"]);
    }

    #[test]
    fn latest_skips_unparseable_dates() {
        let def = FilterDef::new()
            .with_filter(FilterKey::NameRegex, "^photon")
            .unwrap()
            .with_filter(FilterKey::Latest, "true")
            .unwrap();

        let found = select_items(sample(), &def).unwrap();
        assert_eq!(names(&found), vec!["photon-4.iso"]);
    }

    #[test]
    fn earliest_picks_oldest() {
        let def = FilterDef::new()
            .with_filter(FilterKey::Earliest, "true")
            .unwrap();
        let found = select_items(sample(), &def).unwrap();
        assert_eq!(names(&found), vec!["photon-3.iso"]);
    }

    #[test]
    fn latest_without_dates_selects_nothing() {
        let def = FilterDef::new()
            .with_filter(FilterKey::Latest, "true")
            .unwrap();
        let items = vec![media("a", None, None), media("b", Some("n/a"), None)];
        assert!(select_items(items, &def).unwrap().is_empty());
    }

    #[test]
    fn date_filter_fails_on_bad_item_date() {
        let def = FilterDef::new()
            .with_filter(FilterKey::Date, ">= 2023-01-01")
            .unwrap();
        assert!(matches!(
            select_items(sample(), &def),
            Err(ApiError::FilterError(_))
        ));

        let def = FilterDef::new()
            .with_filter(FilterKey::NameRegex, "^(photon-4|windows)")
            .unwrap()
            .with_filter(FilterKey::Date, ">= 2023-03-01")
            .unwrap();
        let found = select_items(sample(), &def).unwrap();
        assert_eq!(names(&found), vec!["windows.iso"]);
    }

    #[test]
    fn ip_filter_ignores_items_without_ip() {
        let def = FilterDef::new()
            .with_filter(FilterKey::Ip, r"^10\.")
            .unwrap();
        let items = vec![
            QueryItem::Vm(QueryVmRecord {
                name: "web".to_string(),
                ip_address: Some("10.1.1.1".to_string()),
                ..Default::default()
            }),
            QueryItem::Vm(QueryVmRecord {
                name: "db".to_string(),
                ..Default::default()
            }),
        ];
        assert_eq!(names(&select_items(items, &def).unwrap()), vec!["web"]);
    }

    #[test]
    fn metadata_api_filter_moves_matching_to_query() {
        let def = FilterDef::new()
            .with_filter(FilterKey::Parent, "my lib")
            .unwrap()
            .with_metadata_filter("os", "linux", MetadataType::String, false)
            .unwrap()
            .with_metadata_api_filter(true);

        let query = query_for(QueryType::Media, &def);
        assert_eq!(
            query.filter.as_deref(),
            Some("catalogName==my lib;metadata:os==STRING:linux")
        );
        assert!(query.fields.is_none());

        // vCD already matched the metadata, items without it are kept
        let conditions = build_conditions(&def).unwrap();
        assert_eq!(conditions.len(), 1);
    }

    #[test]
    fn local_metadata_matching_requests_fields() {
        let def = FilterDef::new()
            .with_metadata_filter("owner", ".*", MetadataType::String, true)
            .unwrap();
        let query = query_for(QueryType::Vm, &def);
        let fields = query.fields.unwrap();
        assert!(fields.starts_with("name,"));
        assert!(fields.ends_with(",metadata@SYSTEM:owner"));
    }

    #[tokio::test]
    async fn search_by_filter_runs_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "media".into()),
                Matcher::UrlEncoded("filter".into(), "catalogName==lib".into()),
                Matcher::UrlEncoded("format".into(), "records".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"<QueryResultRecords xmlns="http://www.vmware.com/vcloud/v1.5" total="3" page="1" pageSize="128">
    <MediaRecord name="photon-3.iso" href="https://h/api/media/1" catalogName="lib" creationDate="2022-05-01T10:00:00.000Z"/>
    <MediaRecord name="photon-4.iso" href="https://h/api/media/2" catalogName="lib" creationDate="2023-02-01T10:00:00.000Z"/>
    <MediaRecord name="ubuntu.iso" href="https://h/api/media/3" catalogName="lib" creationDate="2024-02-01T10:00:00.000Z"/>
</QueryResultRecords>"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let def = FilterDef::new()
            .with_filter(FilterKey::Parent, "lib")
            .unwrap()
            .with_filter(FilterKey::NameRegex, "photon")
            .unwrap()
            .with_filter(FilterKey::Latest, "true")
            .unwrap();

        let found = client.search_by_filter(QueryType::Media, &def).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].href(), "https://h/api/media/2");
        mock.assert_async().await;
    }
}
