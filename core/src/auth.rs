use crate::credentials::{CredentialStore, TokenKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Endpoint that exchanges credentials for a token pair.
pub const TOKEN_PATH: &str = "/api/auth/token/";

const GENERIC_LOGIN_FAILURE: &str = "Authentication failed";

/// Authenticated identity as reported by the issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub username: String,
    pub display_name: String,
    pub role: String,
}

/// Full issuer response to a successful login. Token fields may be absent;
/// they are persisted as empty strings so the store always holds both keys.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl LoginPayload {
    /// Principal for UI display, falling back to the submitted username
    /// where the issuer omitted fields.
    pub fn principal(&self, submitted_username: &str) -> Principal {
        let username = self
            .username
            .clone()
            .unwrap_or_else(|| submitted_username.to_string());
        let display_name = self.display_name.clone().unwrap_or_else(|| username.clone());
        Principal {
            username,
            display_name,
            role: self.role.clone().unwrap_or_default(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    /// Credentials rejected or request malformed; the message is suitable
    /// for inline display next to the login form.
    #[error("{0}")]
    Rejected(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Login and logout on top of the credential store. Login talks to the
/// issuer directly, without bearer headers; tier transitions are the
/// caller's decision.
#[derive(Clone)]
pub struct AuthFlow {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
}

impl AuthFlow {
    pub fn new(base_url: impl Into<String>, store: Arc<dyn CredentialStore>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            store,
        }
    }

    /// Exchanges credentials for a token pair and persists it.
    ///
    /// # Errors
    /// `AuthError::Rejected` with the issuer's `detail` message (or a
    /// generic fallback) when the issuer answers non-2xx;
    /// `AuthError::Network` for connection-level failures.
    pub async fn login(&self, username: &str, passphrase: &str) -> Result<LoginPayload, AuthError> {
        let response = self
            .http
            .post(format!("{}{TOKEN_PATH}", self.base_url))
            .json(&serde_json::json!({
                "username": username,
                "passphrase": passphrase,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = rejection_detail(response).await;
            info!("username" = username, "status" = %status, "login rejected");
            return Err(AuthError::Rejected(detail));
        }

        let payload: LoginPayload = response.json().await?;
        self.store
            .set(TokenKind::Access, payload.access.as_deref().unwrap_or_default());
        self.store
            .set(TokenKind::Refresh, payload.refresh.as_deref().unwrap_or_default());
        info!("username" = username, "login succeeded");
        Ok(payload)
    }

    /// Drops both stored tokens. No network call; the issuer is never told.
    pub fn logout(&self) {
        self.store.clear();
        info!("logged out, credentials cleared");
    }
}

async fn rejection_detail(response: reqwest::Response) -> String {
    #[derive(Deserialize)]
    struct RejectionBody {
        #[serde(default)]
        detail: Option<String>,
    }

    response
        .json::<RejectionBody>()
        .await
        .ok()
        .and_then(|body| body.detail)
        .unwrap_or_else(|| GENERIC_LOGIN_FAILURE.to_string())
}

/// Display label for an issuer role id.
///
/// The issuer uses internal identifiers; known ones map to their public
/// label and unknown ones pass through unchanged so new roles render
/// without a client update.
pub fn role_label(role: &str) -> &str {
    match role {
        "OBSERVER" => "OVERLOOKER",
        other => other,
    }
}
