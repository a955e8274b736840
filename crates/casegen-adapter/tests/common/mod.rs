/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for casegen-adapter tests

#![allow(dead_code)]

use casegen_adapter::{CasegenClient, ClientConfig, Session};
use wiremock::MockServer;

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Mock bearer token for testing
pub fn mock_token() -> String {
    "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.test.signature".to_string()
}

/// Client pointed at the mock server's API root
pub fn client_for(server: &MockServer, session: Session) -> CasegenClient {
    let config = ClientConfig {
        base_url: format!("{}/api/v1", server.uri()),
        ..ClientConfig::default()
    };
    CasegenClient::with_session(config, session).expect("client init")
}

/// Client with a signed-in session
pub fn signed_in_client(server: &MockServer) -> CasegenClient {
    client_for(server, Session::with_token(mock_token(), "admin"))
}

/// Wire representation of a task
pub fn task_json(id: i64, status: u8) -> serde_json::Value {
    let mut task = serde_json::json!({
        "task_id": id,
        "original_filename": format!("doc-{id}.pdf"),
        "status": status,
        "created_at": "2026-10-01T08:30:00",
    });
    match status {
        1 => task["clarification_message"] = serde_json::json!("Which endpoint?"),
        2 => task["finished_at"] = serde_json::json!("2026-10-01T09:00:00"),
        3 => {
            task["finished_at"] = serde_json::json!("2026-10-01T09:00:00");
            task["error_message"] = serde_json::json!("parse error");
        }
        _ => {}
    }
    task
}

pub fn page_json(total: u64, tasks: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({ "total": total, "tasks": tasks })
}

/// Unique scratch directory under the system temp dir
pub fn temp_dir(label: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("casegen-{label}-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
