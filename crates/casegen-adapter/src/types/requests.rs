/*
[INPUT]:  Caller-supplied task parameters and clarification replies
[OUTPUT]: Validated request bodies with serialization support
[POS]:    Data layer - request types and client-side pre-flight checks
[UPDATE]: When API schema changes or validation rules change
*/

use serde::{Deserialize, Serialize};

use super::models::{ModelChoice, UploadedFile};
use crate::http::{CasegenError, Result};

/// Reserved reply telling the generator to ignore open questions and continue
pub const SKIP_CLARIFICATION_PHRASE: &str = "忽略待澄清内容，继续生成";
/// Reserved reply telling the generator to abort
pub const STOP_GENERATION_PHRASE: &str = "停止生成";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Wire body of `POST /task/create`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub file_path: String,
    pub original_filename: String,
    pub download_filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<i64>,
    pub provider: String,
    pub model: String,
    pub advanced_parsing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarifyRequest {
    pub clarification_input: String,
}

/// Everything needed to submit a task, checked before any request is made
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub upload: UploadedFile,
    pub output_filename: String,
    pub template_id: Option<i64>,
    /// `provider:model`
    pub model: String,
    pub advanced_parsing: bool,
}

impl NewTask {
    pub fn new(upload: UploadedFile, output_filename: impl Into<String>, model: &ModelChoice) -> Self {
        Self {
            upload,
            output_filename: output_filename.into(),
            template_id: None,
            model: model.to_string(),
            advanced_parsing: false,
        }
    }

    pub fn template(mut self, template_id: Option<i64>) -> Self {
        self.template_id = template_id;
        self
    }

    pub fn advanced_parsing(mut self, enabled: bool) -> Self {
        self.advanced_parsing = enabled;
        self
    }

    /// Run the pre-flight checks and build the wire body
    pub fn validate(&self) -> Result<CreateTaskRequest> {
        if self.upload.file_path.trim().is_empty() {
            return Err(CasegenError::validation("no uploaded file selected"));
        }
        if self.upload.original_filename.trim().is_empty() {
            return Err(CasegenError::validation("uploaded file has no original filename"));
        }
        if self.output_filename.trim().is_empty() {
            return Err(CasegenError::validation("output filename is required"));
        }
        if self.model.trim().is_empty() {
            return Err(CasegenError::validation("no model selected"));
        }
        let choice: ModelChoice = self.model.parse()?;

        Ok(CreateTaskRequest {
            file_path: self.upload.file_path.clone(),
            original_filename: self.upload.original_filename.clone(),
            download_filename: self.output_filename.trim().to_string(),
            template_id: self.template_id,
            provider: choice.provider,
            model: choice.model,
            advanced_parsing: self.advanced_parsing,
        })
    }
}

/// A reply to a clarification prompt.
///
/// `Skip` and `Stop` are sent as the service's reserved phrases; the wire
/// format is the same free-text field as an ordinary answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarificationReply {
    Answer(String),
    Skip,
    Stop,
}

impl ClarificationReply {
    pub fn answer(text: impl Into<String>) -> Self {
        ClarificationReply::Answer(text.into())
    }

    pub fn into_request(self) -> Result<ClarifyRequest> {
        let clarification_input = match self {
            ClarificationReply::Answer(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(CasegenError::validation("clarification reply must not be empty"));
                }
                text.to_string()
            }
            ClarificationReply::Skip => SKIP_CLARIFICATION_PHRASE.to_string(),
            ClarificationReply::Stop => STOP_GENERATION_PHRASE.to_string(),
        };
        Ok(ClarifyRequest { clarification_input })
    }
}
