/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public case generation client crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod board;
pub mod http;
pub mod lifecycle;
pub mod poller;
pub mod types;

// Re-export commonly used types from auth
pub use auth::{AuthManager, Session, SessionState, SignOutReason, TokenData};

// Re-export commonly used types from http
pub use http::{
    Artifact,
    ArtifactSink,
    CasegenClient,
    CasegenError,
    ClientConfig,
    DEFAULT_BASE_URL,
    DirectorySink,
    FALLBACK_FILENAME,
    Result,
    SPREADSHEET_MIME,
    resolve_filename,
};

// Task list state and lifecycle
pub use board::{DEFAULT_PAGE_SIZE, PageSnapshot, Pagination, RefreshTicket, TaskBoard};
pub use lifecycle::{
    LifecycleTracker,
    MISSING_ERROR_MESSAGE,
    TaskAction,
    TaskEntry,
    TaskEvent,
    TaskPhase,
};
pub use poller::{DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL, PollerHandle, TaskPoller};

// Re-export all types
pub use types::*;
