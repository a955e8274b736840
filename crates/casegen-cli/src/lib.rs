/*
[INPUT]:  Public API exports for the casegen CLI crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod cli;
pub mod config;
pub mod state;
pub mod ui;

// Re-export main types for convenience
pub use cli::interactive::{ClarificationPrompter, DialoguerPrompter};
pub use cli::watch::{WatchExit, WatchOptions, run_watch};
pub use config::CliConfig;
pub use state::storage::Storage;
