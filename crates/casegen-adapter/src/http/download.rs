/*
[INPUT]:  Task identifier, Content-Disposition metadata, target directory
[OUTPUT]: Downloaded spreadsheet artifact and the saved local path
[POS]:    HTTP layer - artifact download and filename resolution
[UPDATE]: When download endpoint, filename rules, or save semantics change
*/

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use reqwest::Method;
use reqwest::header::CONTENT_DISPOSITION;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::http::{CasegenClient, Result};
use crate::types::TaskId;

/// Name used when the response carries no usable filename
pub const FALLBACK_FILENAME: &str = "test_cases.xlsx";

/// MIME type attached to every downloaded artifact
pub const SPREADSHEET_MIME: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Generated spreadsheet held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub task_id: TaskId,
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl CasegenClient {
    /// Fetch the generated spreadsheet of a finished task
    ///
    /// GET /download/{id}
    pub async fn download_artifact(&self, task_id: TaskId) -> Result<Artifact> {
        let endpoint = format!("download/{task_id}");
        let builder = self.request(Method::GET, &endpoint)?;
        let response = self.send(builder).await?;

        // header bytes may be raw UTF-8, which `to_str` rejects
        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
        let bytes = response.bytes().await?.to_vec();
        let filename = resolve_filename(disposition.as_deref());

        debug!(task_id, %filename, size = bytes.len(), "artifact downloaded");
        Ok(Artifact {
            task_id,
            filename,
            content_type: SPREADSHEET_MIME,
            bytes,
        })
    }

    /// Download a task's artifact and hand it to `sink`
    pub async fn download_to(&self, task_id: TaskId, sink: &dyn ArtifactSink) -> Result<PathBuf> {
        let artifact = self.download_artifact(task_id).await?;
        sink.save(&artifact).await
    }
}

/// Resolve the save name from a Content-Disposition value.
///
/// Priority: `filename*` (RFC 5987), then `filename`, then [`FALLBACK_FILENAME`].
pub fn resolve_filename(disposition: Option<&str>) -> String {
    disposition
        .and_then(filename_from_disposition)
        .and_then(|name| sanitize_filename(&name))
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

fn filename_from_disposition(header: &str) -> Option<String> {
    let params = disposition_params(header);

    let extended = params
        .iter()
        .find(|(key, _)| key == "filename*")
        .and_then(|(_, value)| decode_extended_value(value));

    extended.or_else(|| {
        params
            .into_iter()
            .find(|(key, _)| key == "filename")
            .map(|(_, value)| value)
    })
}

/// Split `attachment; key=value; key="quoted; value"` into lowercase keys and
/// unquoted values. Segments without `=` (the disposition type) are skipped.
fn disposition_params(header: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut rest = header;

    loop {
        rest = rest.trim_start_matches(|c: char| c == ';' || c.is_whitespace());
        if rest.is_empty() {
            break;
        }

        let eq = rest.find('=');
        let semi = rest.find(';');
        let eq = match (eq, semi) {
            (Some(eq), Some(semi)) if semi < eq => {
                rest = &rest[semi..];
                continue;
            }
            (Some(eq), _) => eq,
            (None, _) => break,
        };

        let key = rest[..eq].trim().to_ascii_lowercase();
        rest = rest[eq + 1..].trim_start();

        let value = if let Some(quoted) = rest.strip_prefix('"') {
            let mut value = String::new();
            let mut escaped = false;
            let mut end = quoted.len();
            for (idx, c) in quoted.char_indices() {
                if escaped {
                    value.push(c);
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    end = idx + 1;
                    break;
                } else {
                    value.push(c);
                }
            }
            let after = &quoted[end..];
            rest = after.find(';').map_or("", |idx| &after[idx..]);
            value
        } else {
            let end = rest.find(';').unwrap_or(rest.len());
            let value = rest[..end].trim().trim_matches('"').to_string();
            rest = &rest[end..];
            value
        };

        params.push((key, value));
    }

    params
}

/// Decode `charset'language'percent-encoded`
fn decode_extended_value(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?.trim();
    let _language = parts.next()?;
    let encoded = parts.next()?;

    if !charset.eq_ignore_ascii_case("utf-8") {
        warn!(charset, "unsupported filename* charset");
        return None;
    }
    percent_decode_str(encoded)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Keep only the final path component; reject empty names
fn sanitize_filename(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    if last.is_empty() || last == "." || last == ".." {
        None
    } else {
        Some(last.to_string())
    }
}

/// Platform save mechanism for downloaded artifacts
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Persist the artifact and return where it ended up
    async fn save(&self, artifact: &Artifact) -> Result<PathBuf>;
}

/// Saves artifacts into a directory without overwriting existing files
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ArtifactSink for DirectorySink {
    async fn save(&self, artifact: &Artifact) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).await?;

        let staging = StagingFile::new(
            self.dir
                .join(format!(".{}.{}.partial", artifact.filename, Uuid::new_v4())),
        );
        fs::write(staging.path(), &artifact.bytes).await?;

        // the claimed name is an empty placeholder owned by this save
        let target = claim_path(&self.dir, &artifact.filename).await?;
        if let Err(err) = fs::rename(staging.path(), &target).await {
            let _ = fs::remove_file(&target).await;
            return Err(err.into());
        }

        info!(task_id = artifact.task_id, path = %target.display(), "artifact saved");
        Ok(target)
    }
}

/// Create the first of `name`, `stem (1).ext`, `stem (2).ext`, ... that does
/// not exist yet. Creation is exclusive, so concurrent saves never share a name.
async fn claim_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    let mut counter = 0u32;
    loop {
        let candidate = match (counter, ext) {
            (0, _) => dir.join(name),
            (n, Some(ext)) => dir.join(format!("{stem} ({n}).{ext}")),
            (n, None) => dir.join(format!("{stem} ({n})")),
        };
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(_) => return Ok(candidate),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => counter += 1,
            Err(err) => return Err(err.into()),
        }
    }
}

/// Temporary file removed on drop
#[derive(Debug)]
struct StagingFile {
    path: PathBuf,
}

impl StagingFile {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        // gone already once renamed into place
        let _ = std::fs::remove_file(&self.path);
    }
}
