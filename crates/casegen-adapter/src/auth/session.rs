/*
[INPUT]:  Bearer tokens issued by login, sign-out triggers (401, explicit logout)
[OUTPUT]: Current credential and session state notifications
[POS]:    Auth layer - session context shared by transport and consumers
[UPDATE]: When changing session lifecycle or notification semantics
*/

use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tracing::info;

/// Stored credential with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenData {
    pub token: String,
    pub username: String,
    pub issued_at: DateTime<Utc>,
}

/// Observable session lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    SignedIn { username: String },
    SignedOut { reason: SignOutReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    /// No login has happened yet
    Initial,
    /// The server answered 401
    Unauthorized,
    /// The consumer logged out explicitly
    Logout,
}

#[derive(Debug)]
struct SessionInner {
    data: RwLock<Option<TokenData>>,
    state: watch::Sender<SessionState>,
}

/// Thread-safe session context.
///
/// Clones share the same credential; the transport reads the token from here
/// for every request and is the only component that signs out on 401.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Create a new signed-out session
    pub fn new() -> Self {
        let (state, _rx) = watch::channel(SessionState::SignedOut {
            reason: SignOutReason::Initial,
        });
        Self {
            inner: Arc::new(SessionInner {
                data: RwLock::new(None),
                state,
            }),
        }
    }

    /// Create a session that already holds a token
    pub fn with_token(token: impl Into<String>, username: impl Into<String>) -> Self {
        let session = Self::new();
        session.sign_in(token.into(), username.into());
        session
    }

    /// Store a freshly issued token
    pub fn sign_in(&self, token: String, username: String) {
        let token_data = TokenData {
            token,
            username: username.clone(),
            issued_at: Utc::now(),
        };

        {
            let mut guard = self.inner.data.write().unwrap_or_else(|e| e.into_inner());
            *guard = Some(token_data);
        }
        self.inner
            .state
            .send_replace(SessionState::SignedIn { username });
    }

    /// Drop the credential and notify observers
    pub fn sign_out(&self, reason: SignOutReason) {
        let had_token = {
            let mut guard = self.inner.data.write().unwrap_or_else(|e| e.into_inner());
            guard.take().is_some()
        };
        if had_token {
            info!(?reason, "session signed out");
        }
        self.inner
            .state
            .send_replace(SessionState::SignedOut { reason });
    }

    /// Get the current token if available
    pub fn token(&self) -> Option<String> {
        let guard = self.inner.data.read().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().map(|data| data.token.clone())
    }

    /// Get token data if available
    pub fn token_data(&self) -> Option<TokenData> {
        let guard = self.inner.data.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.token().is_some()
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to session state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
