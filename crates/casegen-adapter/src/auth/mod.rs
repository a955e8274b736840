/*
[INPUT]:  Login credentials and authorization failures
[OUTPUT]: Session context carrying the bearer token
[POS]:    Auth layer - handles service authentication
[UPDATE]: When auth flow or session lifecycle changes
*/

pub mod manager;
pub mod session;

pub use manager::AuthManager;
pub use session::{Session, SessionState, SignOutReason, TokenData};
