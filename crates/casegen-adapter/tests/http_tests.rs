/*
[INPUT]:  Mock HTTP responses
[OUTPUT]: Test results for HTTP client
[POS]:    Integration tests - HTTP endpoints
[UPDATE]: When HTTP endpoints change
*/

mod common;

use casegen_adapter::{
    CasegenClient, CasegenError, ClientConfig, DirectorySink, FALLBACK_FILENAME, ModelChoice,
    NewTask, SPREADSHEET_MIME, TaskStatus,
};
use common::{setup_mock_server, signed_in_client, task_json, temp_dir};
use tokio_test::assert_ok;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[test]
fn test_client_creation() {
    let client = assert_ok!(CasegenClient::new());
    assert!(!client.session().is_signed_in());
    assert_eq!(client.base_url().as_str(), "http://127.0.0.1:8000/api/v1/");
}

#[test]
fn test_client_with_config() {
    let config = ClientConfig {
        base_url: "https://cases.example.com/api/v1".to_string(),
        ..ClientConfig::default()
    };
    let client = assert_ok!(CasegenClient::with_config(config));
    assert_eq!(client.base_url().path(), "/api/v1/");

    let bad = ClientConfig {
        base_url: "not a url".to_string(),
        ..ClientConfig::default()
    };
    assert!(CasegenClient::with_config(bad).is_err());
}

#[tokio::test]
async fn test_upload_file_then_create() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "file_path": "uploads/5f2a.docx",
            "original_filename": "requirements.docx",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/task/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_json(21, 0)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = temp_dir("upload");
    let source = dir.join("requirements.docx");
    assert_ok!(std::fs::write(&source, b"PK\x03\x04"));

    let client = signed_in_client(&server);
    let uploaded = assert_ok!(client.upload_file(&source).await);
    assert_eq!(uploaded.original_filename, "requirements.docx");

    let model: ModelChoice = assert_ok!("deepseek:deepseek-chat".parse());
    let task = NewTask::new(uploaded, "Login cases", &model)
        .template(Some(2))
        .advanced_parsing(true);
    let created = assert_ok!(client.create_task(&task).await);
    assert_eq!(created.id, 21);
    assert_eq!(created.status, TaskStatus::Running);

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_upload_missing_file_is_io_error() {
    let client = assert_ok!(CasegenClient::new());
    let err = client
        .upload_file("/definitely/not/here.pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, CasegenError::Io(_)));
}

#[tokio::test]
async fn test_download_to_directory() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/download/8"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "content-disposition",
                    "attachment; filename=\"cases.xlsx\"; filename*=UTF-8''%E7%99%BB%E5%BD%95.xlsx",
                )
                .set_body_bytes(b"xlsx-bytes".to_vec()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/download/9"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"xlsx".to_vec()))
        .mount(&server)
        .await;

    let client = signed_in_client(&server);

    let artifact = assert_ok!(client.download_artifact(8).await);
    assert_eq!(artifact.filename, "登录.xlsx");
    assert_eq!(artifact.content_type, SPREADSHEET_MIME);

    let dir = temp_dir("download");
    let sink = DirectorySink::new(&dir);
    let saved = assert_ok!(client.download_to(8, &sink).await);
    assert_eq!(saved, dir.join("登录.xlsx"));
    assert_eq!(assert_ok!(std::fs::read(&saved)), b"xlsx-bytes");

    let fallback = assert_ok!(client.download_to(9, &sink).await);
    assert_eq!(fallback, dir.join(FALLBACK_FILENAME));

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_download_service_error_writes_nothing() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/download/3"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({"detail": "任务尚未完成"})),
        )
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    let dir = temp_dir("download-error");
    let sink = DirectorySink::new(&dir);

    let err = client.download_to(3, &sink).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(assert_ok!(std::fs::read_dir(&dir)).count(), 0);

    let _ = std::fs::remove_dir_all(dir);
}
