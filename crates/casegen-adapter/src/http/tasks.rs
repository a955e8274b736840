/*
[INPUT]:  Task identifiers, NewTask specs, clarification replies, local files
[OUTPUT]: Task snapshots, task pages, summaries, upload references
[POS]:    HTTP layer - task resource endpoints (require bearer auth)
[UPDATE]: When adding task endpoints or changing request validation
*/

use std::path::Path;

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use crate::http::{CasegenClient, CasegenError, Result};
use crate::types::{
    ClarificationReply, NewTask, SummaryResponse, Task, TaskId, TaskList, UploadedFile,
};

impl CasegenClient {
    /// List one page of tasks (1-based page)
    ///
    /// GET /tasks?page={page}&page_size={page_size}
    pub async fn list_tasks(&self, page: u32, page_size: u32) -> Result<TaskList> {
        if page == 0 || page_size == 0 {
            return Err(CasegenError::validation(format!(
                "page and page size must be positive (page={page}, page_size={page_size})"
            )));
        }
        let endpoint = format!("tasks?page={page}&page_size={page_size}");
        let builder = self.request(Method::GET, &endpoint)?;
        self.send_json(builder).await
    }

    /// Submit a new generation task
    ///
    /// POST /task/create
    pub async fn create_task(&self, task: &NewTask) -> Result<Task> {
        let body = task.validate()?;
        let builder = self.request(Method::POST, "task/create")?.json(&body);
        let created: Task = self.send_json(builder).await?;
        info!(
            task_id = created.id,
            filename = %created.original_filename,
            provider = %body.provider,
            model = %body.model,
            "task created"
        );
        Ok(created)
    }

    /// Answer a clarification request
    ///
    /// POST /task/{id}/clarify
    pub async fn clarify_task(&self, task_id: TaskId, reply: ClarificationReply) -> Result<Task> {
        let body = reply.into_request()?;
        let endpoint = format!("task/{task_id}/clarify");
        let builder = self.request(Method::POST, &endpoint)?.json(&body);
        let task: Task = self.send_json(builder).await?;
        info!(task_id, status = %task.status, "clarification submitted");
        Ok(task)
    }

    /// Fetch the human-readable report of a finished task
    ///
    /// GET /task/{id}/summary
    pub async fn fetch_summary(&self, task_id: TaskId) -> Result<String> {
        let endpoint = format!("task/{task_id}/summary");
        let builder = self.request(Method::GET, &endpoint)?;
        let response: SummaryResponse = self.send_json(builder).await?;
        Ok(response.summary)
    }

    /// Delete a task. A task that is already gone counts as deleted.
    ///
    /// DELETE /tasks/{id}
    pub async fn delete_task(&self, task_id: TaskId) -> Result<()> {
        let endpoint = format!("tasks/{task_id}");
        let builder = self.request(Method::DELETE, &endpoint)?;
        match self.send_empty(builder).await {
            Err(err) if err.is_not_found() => {
                debug!(task_id, "task already deleted");
                Ok(())
            }
            other => other,
        }
    }

    /// Upload a source document from disk
    ///
    /// POST /upload (multipart, field `file`)
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> Result<UploadedFile> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                CasegenError::validation(format!("'{}' is not a file path", path.display()))
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        self.upload_bytes(&filename, bytes).await
    }

    /// Upload an in-memory document
    pub async fn upload_bytes(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadedFile> {
        if filename.trim().is_empty() {
            return Err(CasegenError::validation("upload needs a filename"));
        }
        let size = bytes.len();
        let form = Form::new().part("file", Part::bytes(bytes).file_name(filename.to_string()));
        let builder = self.request(Method::POST, "upload")?.multipart(form);
        let uploaded: UploadedFile = self.send_json(builder).await?;
        debug!(filename, size, file_path = %uploaded.file_path, "file uploaded");
        Ok(uploaded)
    }
}

#[cfg(test)]
mod tests {
    use crate::auth::Session;
    use crate::http::{CasegenClient, CasegenError, ClientConfig};
    use crate::types::{ClarificationReply, ModelChoice, NewTask, TaskStatus, UploadedFile};
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> CasegenClient {
        let config = ClientConfig {
            base_url: format!("{}/api/v1/", server.uri()),
            ..ClientConfig::default()
        };
        CasegenClient::with_session(config, Session::with_token("tok", "admin"))
            .expect("client init")
    }

    fn task_json(id: i64, status: u8) -> serde_json::Value {
        serde_json::json!({
            "task_id": id,
            "original_filename": "spec.pdf",
            "status": status,
            "created_at": "2026-10-01T08:30:00",
        })
    }

    #[tokio::test]
    async fn test_create_task_sends_split_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/task/create"))
            .and(body_json(serde_json::json!({
                "file_path": "uploads/abc.pdf",
                "original_filename": "spec.pdf",
                "download_filename": "Cases",
                "provider": "openai",
                "model": "gpt-4o",
                "advanced_parsing": false,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(task_json(7, 0)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let upload = UploadedFile {
            file_path: "uploads/abc.pdf".to_string(),
            original_filename: "spec.pdf".to_string(),
        };
        let task = client
            .create_task(&NewTask::new(upload, "Cases", &ModelChoice::new("openai", "gpt-4o")))
            .await
            .expect("create_task failed");

        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(task.original_filename, "spec.pdf");
    }

    #[tokio::test]
    async fn test_create_task_validation_never_hits_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let upload = UploadedFile {
            file_path: "uploads/abc.pdf".to_string(),
            original_filename: "spec.pdf".to_string(),
        };
        let mut task = NewTask::new(upload, "Cases", &ModelChoice::new("openai", "gpt-4o"));
        task.model = "gpt-4o".to_string();

        let err = client.create_task(&task).await.unwrap_err();
        assert!(matches!(err, CasegenError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_tasks_passes_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/tasks"))
            .and(query_param("page", "2"))
            .and(query_param("page_size", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total": 11,
                "tasks": [task_json(11, 2)],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let page = client.list_tasks(2, 10).await.expect("list_tasks failed");
        assert_eq!(page.total, 11);
        assert_eq!(page.tasks.len(), 1);

        let err = client.list_tasks(0, 10).await.unwrap_err();
        assert!(matches!(err, CasegenError::Validation(_)));
    }

    #[tokio::test]
    async fn test_clarify_task_posts_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/task/5/clarify"))
            .and(body_json(serde_json::json!({"clarification_input": "use /v2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(task_json(5, 0)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let task = client
            .clarify_task(5, ClarificationReply::answer("use /v2"))
            .await
            .expect("clarify failed");
        assert_eq!(task.status, TaskStatus::Running);
    }

    #[tokio::test]
    async fn test_clarify_out_of_state_surfaces_service_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/task/5/clarify"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"detail": "任务不在澄清状态"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .clarify_task(5, ClarificationReply::Skip)
            .await
            .unwrap_err();
        match err {
            CasegenError::Service { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "任务不在澄清状态");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_missing_task_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/tasks/9"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(serde_json::json!({"detail": "任务不存在"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.delete_task(9).await.expect("404 should count as deleted");
    }

    #[tokio::test]
    async fn test_delete_server_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/tasks/9"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.delete_task(9).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_fetch_summary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/task/3/summary"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"summary": "# 12 cases"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.fetch_summary(3).await.unwrap(), "# 12 cases");
    }

    #[tokio::test]
    async fn test_upload_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "file_path": "uploads/0b1c.pdf",
                "original_filename": "spec.pdf",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let uploaded = client
            .upload_bytes("spec.pdf", b"%PDF-1.7".to_vec())
            .await
            .expect("upload failed");
        assert_eq!(uploaded.original_filename, "spec.pdf");
        assert_eq!(uploaded.file_path, "uploads/0b1c.pdf");

        let requests = server.received_requests().await.expect("recording enabled");
        let content_type = requests[0]
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("multipart/form-data"));
    }
}
