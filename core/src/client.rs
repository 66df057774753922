use crate::credentials::{CredentialStore, TokenKind};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Endpoint that exchanges a refresh token for a fresh access token.
pub const REFRESH_PATH: &str = "/api/auth/token/refresh/";

/// Caller-controlled pieces of an outgoing request.
///
/// Headers listed here override the JSON content-type default but never the
/// bearer header, which is computed from the store last so the current
/// token always wins.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// HTTP client that carries the stored access token as a bearer credential
/// and recovers from exactly one class of failure: a 401 from the server.
///
/// A rejected request triggers at most one refresh and at most one retry,
/// so a single `request` call is bounded by two round trips plus the
/// refresh. All other statuses pass through untouched for the caller to
/// interpret.
///
/// Two calls that observe a 401 concurrently will each refresh on their
/// own; the store simply keeps the last token written. Deduplicating that
/// is out of scope here.
#[derive(Clone)]
pub struct SessionClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
}

impl SessionClient {
    pub fn new(base_url: impl Into<String>, store: Arc<dyn CredentialStore>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            store,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issues `path` with bearer auth, refreshing the access token once if
    /// the server answers 401.
    ///
    /// # Errors
    /// Returns an error only for connection-level failures; HTTP error
    /// statuses are returned as responses.
    pub async fn request(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Response, reqwest::Error> {
        let first = self.send(path, &options).await?;
        if first.status() != StatusCode::UNAUTHORIZED {
            return Ok(first);
        }

        let refresh = self.store.get(TokenKind::Refresh);
        if refresh.is_empty() {
            debug!("path" = path, "unauthorized with no refresh token stored");
            return Ok(first);
        }

        if !self.refresh_access(&refresh).await? {
            return Ok(first);
        }

        // The rebuilt headers read the store again, so the retry carries
        // whatever token the refresh just persisted.
        self.send(path, &options).await
    }

    async fn send(&self, path: &str, options: &RequestOptions) -> Result<Response, reqwest::Error> {
        let mut request = self
            .http
            .request(options.method.clone(), self.url(path))
            .headers(self.build_headers(&options.headers));
        if let Some(body) = &options.body {
            request = request.body(body.to_string());
        }
        request.send().await
    }

    /// Exchanges the refresh token for a new access token. Returns `false`
    /// when the issuer rejects the exchange; the caller then falls back to
    /// the original unauthorized response.
    async fn refresh_access(&self, refresh: &str) -> Result<bool, reqwest::Error> {
        let response = self
            .http
            .post(self.url(REFRESH_PATH))
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::json!({ "refresh": refresh }).to_string())
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("status" = %response.status(), "token refresh rejected");
            return Ok(false);
        }

        let payload: RefreshResponse = response.json().await?;
        match payload.access {
            Some(access) if !access.is_empty() => {
                self.store.set(TokenKind::Access, &access);
                debug!("access token refreshed");
            }
            _ => warn!("refresh succeeded without a new access token"),
        }
        Ok(true)
    }

    fn build_headers(&self, extra: &[(String, String)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in extra {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!("header" = name.as_str(), "dropping malformed request header"),
            }
        }
        let access = self.store.get(TokenKind::Access);
        if !access.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {access}")) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access: Option<String>,
}
