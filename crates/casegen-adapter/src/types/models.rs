/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::enums::TaskStatus;
use crate::http::CasegenError;

/// Server-assigned task identifier
pub type TaskId = i64;

/// One document-to-spreadsheet generation job as reported by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "task_id")]
    pub id: TaskId,
    pub original_filename: String,
    pub status: TaskStatus,
    #[serde(with = "serde_helpers::timestamp")]
    pub created_at: NaiveDateTime,
    #[serde(default, with = "serde_helpers::timestamp_option")]
    pub finished_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_content: Option<String>,
}

/// One page of tasks; `total` counts every task on the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    pub total: u64,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// Server-side storage reference returned by the upload endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_path: String,
    pub original_filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_system: bool,
}

/// The template marked as default, if any
pub fn default_template(templates: &[TemplateSummary]) -> Option<&TemplateSummary> {
    templates.iter().find(|template| template.is_default)
}

/// Models offered by one configured provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelGroup {
    pub provider: String,
    pub name: String,
    #[serde(default)]
    pub models: Vec<String>,
}

impl ModelGroup {
    pub fn choices(&self) -> impl Iterator<Item = ModelChoice> + '_ {
        self.models.iter().map(|model| ModelChoice {
            provider: self.provider.clone(),
            model: model.clone(),
        })
    }

    pub fn offers(&self, choice: &ModelChoice) -> bool {
        self.provider == choice.provider && self.models.iter().any(|m| *m == choice.model)
    }
}

/// Provider/model pair, written as `provider:model`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelChoice {
    pub provider: String,
    pub model: String,
}

impl ModelChoice {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

impl FromStr for ModelChoice {
    type Err = CasegenError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (provider, model) = raw
            .split_once(':')
            .map(|(p, m)| (p.trim(), m.trim()))
            .filter(|(p, m)| !p.is_empty() && !m.is_empty())
            .ok_or_else(|| {
                CasegenError::validation(format!(
                    "invalid model selection '{raw}', expected provider:model"
                ))
            })?;
        Ok(Self::new(provider, model))
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

/// Pick the model to preselect: the remembered one if still offered,
/// otherwise the first model of the first group.
pub fn select_model(remembered: Option<&str>, groups: &[ModelGroup]) -> Option<ModelChoice> {
    let remembered = remembered
        .and_then(|raw| raw.parse::<ModelChoice>().ok())
        .filter(|choice| groups.iter().any(|group| group.offers(choice)));

    remembered.or_else(|| groups.first().and_then(|group| group.choices().next()))
}

mod serde_helpers {
    use chrono::{DateTime, NaiveDateTime};

    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    /// Accepts both naive ISO-8601 (as the service emits) and RFC 3339 with offset.
    pub fn parse(raw: &str) -> Result<NaiveDateTime, String> {
        let raw = raw.trim();
        if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
            return Ok(with_offset.naive_utc());
        }
        NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .map_err(|e| format!("invalid timestamp '{raw}': {e}"))
    }

    pub mod timestamp {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = String::deserialize(deserializer)?;
            super::parse(&raw).map_err(serde::de::Error::custom)
        }

        pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(&value.format(super::NAIVE_FORMAT).to_string())
        }
    }

    pub mod timestamp_option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) if !raw.trim().is_empty() => {
                    super::parse(&raw).map(Some).map_err(serde::de::Error::custom)
                }
                _ => Ok(None),
            }
        }

        pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(value) => super::timestamp::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }
    }
}
