use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

/// Choices remembered between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Last used model as `provider:model`
    #[serde(default)]
    pub last_model: Option<String>,
    #[serde(default)]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Storage manager for local CLI state
#[derive(Debug)]
pub struct Storage {
    path: PathBuf,
    preferences: Mutex<Preferences>,
}

impl Storage {
    /// Open `<data dir>/casegen/state.json`
    pub async fn new() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?
            .join("casegen");
        Self::at(data_dir.join("state.json")).await
    }

    /// Open a state file at an explicit path
    pub async fn at(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let preferences = Self::load(&path).await?;
        Ok(Self {
            path,
            preferences: Mutex::new(preferences),
        })
    }

    async fn load(path: &Path) -> Result<Preferences> {
        if !path.exists() {
            return Ok(Preferences::default());
        }
        let content = fs::read_to_string(path).await?;
        serde_json::from_str(&content).with_context(|| format!("parse {}", path.display()))
    }

    pub async fn last_model(&self) -> Option<String> {
        self.preferences.lock().await.last_model.clone()
    }

    pub async fn remember_model(&self, model: &str) -> Result<()> {
        let mut preferences = self.preferences.lock().await;
        if preferences.last_model.as_deref() == Some(model) {
            return Ok(());
        }
        preferences.last_model = Some(model.to_string());
        preferences.updated_at = Some(chrono::Utc::now());
        self.save(&preferences).await
    }

    async fn save(&self, preferences: &Preferences) -> Result<()> {
        let content = serde_json::to_string_pretty(preferences)?;

        // Atomic write: write to temp file then rename
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}
