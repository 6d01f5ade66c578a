#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::api::test_helpers::{create_test_client, task_xml, CATALOG_ID, TASK_ID};
    use mockito::{Matcher, Server};
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    fn temp_file(suffix: &str, contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    fn iso_bytes() -> Vec<u8> {
        let mut bytes = vec![0u8; 40 * 1024];
        bytes[32769..32774].copy_from_slice(b"CD001");
        bytes
    }

    fn media_xml(base: &str, with_link: bool) -> String {
        let files = if with_link {
            format!(
                r#"<Files><File name="file" size="40960" bytesTransferred="0"><Link rel="upload:default" href="{base}/transfer/t1/file"/></File></Files>"#
            )
        } else {
            String::new()
        };
        format!(
            r#"<Media xmlns="http://www.vmware.com/vcloud/v1.5" href="{base}/api/media/m1" name="boot.iso" imageType="iso" size="40960">
    <Tasks>
        <Task href="{base}/api/task/{TASK_ID}" status="running" operationName="mediaUpload">
            <Link rel="task:cancel" href="{base}/api/task/{TASK_ID}/action/cancel"/>
        </Task>
    </Tasks>
    {files}
</Media>"#
        )
    }

    #[tokio::test]
    async fn upload_file_sends_ranged_pieces() {
        let mut server = Server::new_async().await;
        let ranges = ["bytes 0-3/10", "bytes 4-7/10", "bytes 8-9/10"];
        let mut mocks = Vec::new();
        for range in ranges {
            mocks.push(
                server
                    .mock("PUT", "/transfer/t1/file")
                    .match_header("content-range", range)
                    .with_status(200)
                    .create_async()
                    .await,
            );
        }

        let client = create_test_client(&server.url());
        let file = temp_file(".bin", b"0123456789");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();

        let sent = upload_file(
            &client,
            file.path(),
            &format!("{}/transfer/t1/file", server.url()),
            4,
            |done, total| recorder.lock().unwrap().push((done, total)),
        )
        .await
        .unwrap();

        assert_eq!(sent, 10);
        assert_eq!(*seen.lock().unwrap(), vec![(4, 10), (8, 10), (10, 10)]);
        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn upload_file_rejects_zero_piece_size() {
        let client = create_test_client("https://vcd.example.com");
        let file = temp_file(".bin", b"abc");
        let result = upload_file(&client, file.path(), "https://vcd.example.com/t", 0, |_, _| {}).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn verify_iso_checks_magic() {
        let good = temp_file(".iso", &iso_bytes());
        assert_eq!(verify_iso(good.path()).await.unwrap(), 40 * 1024);

        let bad = temp_file(".iso", &vec![0u8; 40 * 1024]);
        assert!(matches!(
            verify_iso(bad.path()).await,
            Err(ApiError::UploadError(_))
        ));

        let tiny = temp_file(".iso", b"CD001");
        assert!(matches!(
            verify_iso(tiny.path()).await,
            Err(ApiError::UploadError(_))
        ));
    }

    #[tokio::test]
    async fn media_upload_completes() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let add_href = format!("{}/api/catalog/{}/action/upload", base, CATALOG_ID);

        let create = server
            .mock("POST", format!("/api/catalog/{}/action/upload", CATALOG_ID).as_str())
            .match_header("content-type", "application/vnd.vmware.vcloud.media+xml")
            .match_body(Matcher::Regex(r#"imageType="iso""#.to_string()))
            .with_status(201)
            .with_body(media_xml(&base, false))
            .create_async()
            .await;
        let media = server
            .mock("GET", "/api/media/m1")
            .with_status(200)
            .with_body(media_xml(&base, true))
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/transfer/t1/file")
            .match_header("content-range", "bytes 0-40959/40960")
            .with_status(200)
            .create_async()
            .await;
        let task = server
            .mock("GET", format!("/api/task/{}", TASK_ID).as_str())
            .with_status(200)
            .with_body(task_xml(&base, TASK_ID, "success"))
            .create_async()
            .await;

        let client = create_test_client(&base);
        let iso = temp_file(".iso", &iso_bytes());
        let upload = upload_media(&client, &add_href, "boot.iso", "", iso.path(), 1024 * 1024)
            .await
            .unwrap();

        upload.show_progress().await.unwrap();
        assert_eq!(upload.progress_string(), "100.00");
        upload.wait_completion().await.unwrap();

        create.assert_async().await;
        media.assert_async().await;
        put.assert_async().await;
        task.assert_async().await;
    }

    #[tokio::test]
    async fn failed_transfer_cancels_task() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let add_href = format!("{}/api/catalog/{}/action/upload", base, CATALOG_ID);

        server
            .mock("POST", format!("/api/catalog/{}/action/upload", CATALOG_ID).as_str())
            .with_status(201)
            .with_body(media_xml(&base, true))
            .create_async()
            .await;
        server
            .mock("GET", "/api/media/m1")
            .with_status(200)
            .with_body(media_xml(&base, true))
            .create_async()
            .await;
        server
            .mock("PUT", "/transfer/t1/file")
            .with_status(403)
            .with_body("transfer session expired")
            .create_async()
            .await;
        let cancel = server
            .mock("POST", format!("/api/task/{}/action/cancel", TASK_ID).as_str())
            .with_status(204)
            .create_async()
            .await;

        let client = create_test_client(&base);
        let iso = temp_file(".iso", &iso_bytes());
        let upload = upload_media(&client, &add_href, "boot.iso", "", iso.path(), 4096)
            .await
            .unwrap();

        assert!(upload.show_progress().await.is_err());
        assert!(upload.error().is_some());
        assert!(upload.wait_completion().await.is_err());
        cancel.assert_async().await;
    }

    #[tokio::test]
    async fn missing_upload_link_cancels_task() {
        let mut server = Server::new_async().await;
        let base = server.url();

        server
            .mock("POST", "/api/catalog/c1/action/upload")
            .with_status(201)
            .with_body(media_xml(&base, false))
            .create_async()
            .await;
        server
            .mock("GET", "/api/media/m1")
            .with_status(200)
            .with_body(media_xml(&base, false))
            .create_async()
            .await;
        let cancel = server
            .mock("POST", format!("/api/task/{}/action/cancel", TASK_ID).as_str())
            .with_status(204)
            .create_async()
            .await;

        let config = crate::api::test_helpers::test_config(&base)
            .with_max_retry_timeout(std::time::Duration::from_millis(30));
        let client = Client::with_config(config).unwrap();
        let iso = temp_file(".iso", &iso_bytes());
        let result = upload_media(
            &client,
            &format!("{}/api/catalog/c1/action/upload", base),
            "boot.iso",
            "",
            iso.path(),
            4096,
        )
        .await;

        assert!(matches!(result, Err(ApiError::UploadError(_))));
        cancel.assert_async().await;
    }

    #[tokio::test]
    async fn ovf_upload_sends_descriptor_then_disks() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = r#"<?xml version="1.0" encoding="UTF-8"?>
<ovf:Envelope xmlns:ovf="http://schemas.dmtf.org/ovf/envelope/1">
    <ovf:References>
        <ovf:File ovf:href="disk1.vmdk" ovf:id="file1" ovf:size="6"/>
    </ovf:References>
</ovf:Envelope>"#;
        std::fs::write(dir.path().join("photon.ovf"), descriptor).unwrap();
        std::fs::write(dir.path().join("disk1.vmdk"), b"vmdk!!").unwrap();

        let mut server = Server::new_async().await;
        let base = server.url();
        let template = format!(
            r#"<VAppTemplate xmlns="http://www.vmware.com/vcloud/v1.5" href="{base}/api/vAppTemplate/vappTemplate-1" name="photon" status="0">
    <Tasks><Task href="{base}/api/task/{TASK_ID}" status="running"/></Tasks>
    <Files>
        <File name="descriptor.ovf" size="-1" bytesTransferred="0"><Link rel="upload:default" href="{base}/transfer/t2/descriptor.ovf"/></File>
        <File name="disk1.vmdk" size="6" bytesTransferred="0"><Link rel="upload:default" href="{base}/transfer/t2/disk1.vmdk"/></File>
    </Files>
</VAppTemplate>"#
        );

        let create = server
            .mock("POST", "/api/catalog/c1/action/upload")
            .match_header(
                "content-type",
                "application/vnd.vmware.vcloud.uploadVAppTemplateParams+xml",
            )
            .match_body(Matcher::Regex(r#"name="photon""#.to_string()))
            .with_status(201)
            .with_body(template.clone())
            .create_async()
            .await;
        server
            .mock("GET", "/api/vAppTemplate/vappTemplate-1")
            .with_status(200)
            .with_body(template)
            .create_async()
            .await;
        let put_descriptor = server
            .mock("PUT", "/transfer/t2/descriptor.ovf")
            .match_body(Matcher::Regex("disk1.vmdk".to_string()))
            .with_status(200)
            .create_async()
            .await;
        let put_disk = server
            .mock("PUT", "/transfer/t2/disk1.vmdk")
            .match_header("content-range", "bytes 0-5/6")
            .with_status(200)
            .create_async()
            .await;
        server
            .mock("GET", format!("/api/task/{}", TASK_ID).as_str())
            .with_status(200)
            .with_body(task_xml(&base, TASK_ID, "success"))
            .create_async()
            .await;

        let client = create_test_client(&base);
        let upload = upload_ovf(
            &client,
            &format!("{}/api/catalog/c1/action/upload", base),
            "photon",
            "photon OS",
            &dir.path().join("photon.ovf"),
            DEFAULT_PIECE_SIZE,
        )
        .await
        .unwrap();
        upload.wait_completion().await.unwrap();

        create.assert_async().await;
        put_descriptor.assert_async().await;
        put_disk.assert_async().await;
    }

    #[tokio::test]
    async fn ovf_upload_rejects_missing_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("broken.ovf"),
            r#"<Envelope xmlns="http://schemas.dmtf.org/ovf/envelope/1"><References><File href="gone.vmdk"/></References></Envelope>"#,
        )
        .unwrap();

        let client = create_test_client("https://vcd.example.com");
        let result = upload_ovf(
            &client,
            "https://vcd.example.com/api/catalog/c1/action/upload",
            "broken",
            "",
            &dir.path().join("broken.ovf"),
            DEFAULT_PIECE_SIZE,
        )
        .await;
        assert!(matches!(result, Err(ApiError::UploadError(_))));
    }

    #[tokio::test]
    async fn unknown_package_type_is_rejected() {
        let client = create_test_client("https://vcd.example.com");
        let file = temp_file(".zip", b"PK");
        let result = upload_ovf(
            &client,
            "https://vcd.example.com/api/catalog/c1/action/upload",
            "zip",
            "",
            file.path(),
            DEFAULT_PIECE_SIZE,
        )
        .await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }
}
