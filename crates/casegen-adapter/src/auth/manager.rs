/*
[INPUT]:  Username/password and HTTP client
[OUTPUT]: Signed-in Session (bearer token)
[POS]:    Auth layer - login and logout flow
[UPDATE]: When auth endpoints or flow steps change
*/

use reqwest::Method;
use tracing::info;

use crate::http::{CasegenClient, CasegenError, Result};
use crate::types::{LoginRequest, LoginResponse};

use super::{Session, SignOutReason};

/// Drives login/logout against the service and records the result in the
/// client's session.
#[derive(Debug, Clone)]
pub struct AuthManager {
    client: CasegenClient,
}

impl AuthManager {
    pub fn new(client: CasegenClient) -> Self {
        Self { client }
    }

    pub fn session(&self) -> &Session {
        self.client.session()
    }

    /// POST /auth/login
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(CasegenError::validation("username and password are required"));
        }

        let body = LoginRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        let builder = self.client.request(Method::POST, "auth/login")?.json(&body);

        // A 401 here means bad credentials; the transport already leaves the
        // session signed out in that case.
        let response: LoginResponse = self.client.send_json(builder).await?;
        if response.token.trim().is_empty() {
            return Err(CasegenError::InvalidResponse(
                "login returned an empty token".to_string(),
            ));
        }

        self.session()
            .sign_in(response.token.clone(), response.username.clone());
        info!(username = %response.username, "signed in");
        Ok(response)
    }

    pub fn logout(&self) {
        self.session().sign_out(SignOutReason::Logout);
    }
}
