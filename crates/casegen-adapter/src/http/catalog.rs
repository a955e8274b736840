/*
[INPUT]:  Bearer-authenticated client
[OUTPUT]: Template summaries and provider/model groups for task creation
[POS]:    HTTP layer - read-only views of collaborator resources
[UPDATE]: When template or model configuration endpoints change
*/

use crate::http::{CasegenClient, Result};
use crate::types::{ModelGroup, TemplateSummary};
use reqwest::Method;

impl CasegenClient {
    /// List case templates
    ///
    /// GET /templates
    pub async fn list_templates(&self) -> Result<Vec<TemplateSummary>> {
        let builder = self.request(Method::GET, "templates")?;
        self.send_json(builder).await
    }

    /// List configured providers with their selectable models
    ///
    /// GET /llm-configs/model-groups
    pub async fn list_model_groups(&self) -> Result<Vec<ModelGroup>> {
        let builder = self.request(Method::GET, "llm-configs/model-groups")?;
        self.send_json(builder).await
    }
}
