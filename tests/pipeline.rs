use chrono::NaiveDate;
use edinet_yuho::edinet::{generate_date_sequence, ListingType};
use edinet_yuho::{Config, Pipeline, RunSummary};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn test_config(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config {
        database_path: dir.path().join("data").join("edinet_submissions.db"),
        download_dir: dir.path().join("downloads"),
        log_dir: dir.path().join("logs"),
        ..Config::default()
    };
    config.api.base_url = format!("{}/api/v2", server.uri());
    config.rate_limits.edinet_request_delay_ms = 0;
    config.http.timeout_seconds = 5;
    config
}

fn report(doc_id: &str, filer_name: &str, sec_code: Option<&str>) -> serde_json::Value {
    json!({
        "docID": doc_id,
        "filerName": filer_name,
        "secCode": sec_code,
        "ordinanceCode": "010",
        "formCode": "030000",
        "docDescription": "有価証券報告書"
    })
}

async fn mount_listing(server: &MockServer, date: &str, status: u16, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v2/documents.json"))
        .and(query_param("date", date))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_document(server: &MockServer, doc_id: &str, status: u16, body: &[u8], calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v2/documents/{}", doc_id)))
        .and(query_param("type", "1"))
        .respond_with(ResponseTemplate::new(status).set_body_bytes(body.to_vec()))
        .expect(calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_report_scenario() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_listing(
        &server,
        "2024-03-25",
        200,
        json!({ "results": [report("S100ABCD", "Acme Co", Some("1234"))] }),
    )
    .await;
    mount_document(&server, "S100ABCD", 200, b"PK\x03\x04acme", 1).await;

    let config = test_config(&server, &dir);
    let pipeline = Pipeline::new(config.clone()).await.unwrap();
    let dates = generate_date_sequence(ymd(2024, 3, 25), Some(ymd(2024, 3, 25))).unwrap();

    let summary = pipeline.run(&dates, ListingType::MetadataOnly).await.unwrap();

    assert_eq!(
        summary,
        RunSummary {
            dates: 1,
            reports: 1,
            recorded: 1,
            ..Default::default()
        }
    );

    let archive = config
        .download_dir
        .join("2024")
        .join("03")
        .join("25")
        .join("S100ABCD.zip");
    assert_eq!(std::fs::read(archive).unwrap(), b"PK\x03\x04acme");
    assert!(pipeline.ledger().is_downloaded("S100ABCD").await.unwrap());
    assert_eq!(pipeline.ledger().downloaded_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_failures_are_contained_and_rerun_is_idempotent() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_listing(
        &server,
        "2024-03-25",
        200,
        json!({ "results": [
            report("S100ABCD", "Acme Co", Some("1234")),
            report("BADID", "Broken Co", Some("2345")),
            report("S100UNLS", "Private Co", None),
            report("S100EFGH", "Beta Co", Some("3456")),
        ]}),
    )
    .await;
    mount_listing(&server, "2024-03-26", 500, json!({ "message": "down" })).await;
    mount_listing(&server, "2024-03-27", 200, json!({ "metadata": { "status": "200" } })).await;

    // each good archive is requested once across both runs
    mount_document(&server, "S100ABCD", 200, b"acme", 1).await;
    mount_document(&server, "S100EFGH", 200, b"beta", 1).await;
    mount_document(&server, "BADID", 404, b"", 2).await;
    mount_document(&server, "S100UNLS", 200, b"never", 0).await;

    let config = test_config(&server, &dir);
    let dates = generate_date_sequence(ymd(2024, 3, 25), Some(ymd(2024, 3, 27))).unwrap();

    let pipeline = Pipeline::new(config.clone()).await.unwrap();
    let first = pipeline.run(&dates, ListingType::MetadataOnly).await.unwrap();
    assert_eq!(
        first,
        RunSummary {
            dates: 3,
            listing_failures: 1,
            reports: 3,
            recorded: 2,
            failed: 1,
            ..Default::default()
        }
    );

    let day_dir = config.download_dir.join("2024").join("03").join("25");
    assert!(day_dir.join("S100ABCD.zip").is_file());
    assert!(day_dir.join("S100EFGH.zip").is_file());
    assert!(!day_dir.join("BADID.zip").exists());
    assert!(!day_dir.join("BADID.zip.part").exists());
    assert!(!pipeline.ledger().is_downloaded("BADID").await.unwrap());
    pipeline.ledger().close().await;

    // a fresh process over the same ledger
    let pipeline = Pipeline::new(config.clone()).await.unwrap();
    let second = pipeline.run(&dates, ListingType::MetadataOnly).await.unwrap();
    assert_eq!(
        second,
        RunSummary {
            dates: 3,
            listing_failures: 1,
            reports: 3,
            already_downloaded: 2,
            failed: 1,
            ..Default::default()
        }
    );
    assert_eq!(pipeline.ledger().downloaded_count().await.unwrap(), 2);
    assert_eq!(pipeline.ledger().company_count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_orphan_file_is_backfilled_without_download() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_listing(
        &server,
        "2024-03-25",
        200,
        json!({ "results": [report("S100ABCD", "Acme Co", Some("1234"))] }),
    )
    .await;
    mount_document(&server, "S100ABCD", 200, b"fresh", 0).await;

    let config = test_config(&server, &dir);
    let archive = config
        .download_dir
        .join("2024")
        .join("03")
        .join("25")
        .join("S100ABCD.zip");
    std::fs::create_dir_all(archive.parent().unwrap()).unwrap();
    std::fs::write(&archive, b"from a crashed run").unwrap();

    let pipeline = Pipeline::new(config).await.unwrap();
    let summary = pipeline
        .run(&[ymd(2024, 3, 25)], ListingType::MetadataOnly)
        .await
        .unwrap();

    assert_eq!(summary.file_exists, 1);
    assert_eq!(summary.recorded, 0);
    assert_eq!(std::fs::read(&archive).unwrap(), b"from a crashed run");
    assert!(pipeline.ledger().is_downloaded("S100ABCD").await.unwrap());
}

#[tokio::test]
async fn test_slow_document_is_skipped_and_siblings_continue() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_listing(
        &server,
        "2024-03-25",
        200,
        json!({ "results": [
            report("S100SLOW", "Slow Co", Some("1111")),
            report("S100ABCD", "Acme Co", Some("1234")),
        ]}),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/documents/S100SLOW"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"late".to_vec())
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    mount_document(&server, "S100ABCD", 200, b"acme", 1).await;

    let mut config = test_config(&server, &dir);
    config.http.timeout_seconds = 1;
    let pipeline = Pipeline::new(config.clone()).await.unwrap();
    let summary = pipeline
        .run(&[ymd(2024, 3, 25)], ListingType::MetadataOnly)
        .await
        .unwrap();

    assert_eq!(summary.reports, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.recorded, 1);
    let day_dir = config.download_dir.join("2024").join("03").join("25");
    assert!(!day_dir.join("S100SLOW.zip").exists());
    assert!(!pipeline.ledger().is_downloaded("S100SLOW").await.unwrap());
    assert!(pipeline.ledger().is_downloaded("S100ABCD").await.unwrap());
}

#[tokio::test]
async fn test_malformed_document_ids_are_never_requested() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_listing(
        &server,
        "2024-03-25",
        200,
        json!({ "results": [
            report("../../escape", "Evil Co", Some("6666")),
            report("S100ABCD", "Acme Co", Some("1234")),
        ]}),
    )
    .await;
    mount_document(&server, "S100ABCD", 200, b"acme", 1).await;

    let config = test_config(&server, &dir);
    let pipeline = Pipeline::new(config.clone()).await.unwrap();
    let summary = pipeline
        .run(&[ymd(2024, 3, 25)], ListingType::MetadataOnly)
        .await
        .unwrap();

    assert_eq!(
        summary,
        RunSummary {
            dates: 1,
            reports: 1,
            recorded: 1,
            ..Default::default()
        }
    );
    assert!(!dir.path().join("escape.zip").exists());
    assert_eq!(pipeline.ledger().company_count().await.unwrap(), 1);
}
