/*
[INPUT]:  HTTP client configuration, session, and API endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod catalog;
pub mod client;
pub mod download;
pub mod error;
pub mod tasks;

pub use error::{CasegenError, Result};

pub use client::{CasegenClient, ClientConfig, DEFAULT_BASE_URL};
pub use download::{
    Artifact, ArtifactSink, DirectorySink, FALLBACK_FILENAME, SPREADSHEET_MIME, resolve_filename,
};
