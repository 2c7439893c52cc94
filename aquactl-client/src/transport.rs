//! Bearer-token HTTP transport.
//!
//! All endpoint shims go through [`ApiClient`] instead of calling reqwest
//! directly. The client re-authenticates once on a 401 (tokens expire
//! mid-run on long drains) and retries the request; a second 401 is a
//! hard authentication failure.

use crate::auth::Authenticator;
use aquactl_core::{CredentialSet, Secret};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::sync::RwLock;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Error type for transport-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or the response not read.
    #[error("request failed: {0}")]
    Request(String),

    /// Sign-in was rejected, or the platform kept answering 401 after a
    /// token refresh.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The response body was not the expected JSON.
    #[error("invalid response body: {0}")]
    Body(String),

    /// A URL could not be constructed.
    #[error("invalid URL '{url}': {message}")]
    Url { url: String, message: String },
}

/// Status and body of one API response.
#[derive(Debug)]
pub struct ApiResponse {
    status: StatusCode,
    text: String,
}

impl ApiResponse {
    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn json(&self) -> Result<Value, TransportError> {
        serde_json::from_str(&self.text).map_err(|err| TransportError::Body(err.to_string()))
    }

    /// Short form for error context: `HTTP 500: body`.
    pub fn describe(&self) -> String {
        format!("HTTP {}: {}", self.status(), self.text.trim())
    }
}

/// Bearer-token API client bound to one tenant endpoint.
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    csp_endpoint: Url,
    auth_endpoint: Option<String>,
    token: RwLock<Secret>,
    reauth: Option<(Authenticator, CredentialSet)>,
}

impl ApiClient {
    /// Authenticate with the given credentials and build a client bound
    /// to their CSP endpoint.
    pub async fn connect(credentials: CredentialSet) -> Result<Self, TransportError> {
        let csp_endpoint =
            Url::parse(&credentials.csp_endpoint).map_err(|err| TransportError::Url {
                url: credentials.csp_endpoint.clone(),
                message: err.to_string(),
            })?;

        let authenticator = Authenticator::new();
        let token = authenticator
            .authenticate(&credentials)
            .await
            .map_err(|err| TransportError::Auth(err.to_string()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            csp_endpoint,
            auth_endpoint: credentials.auth_endpoint.clone(),
            token: RwLock::new(token),
            reauth: Some((authenticator, credentials)),
        })
    }

    /// Build a client around a pre-issued token. No re-authentication on
    /// 401; mainly for tests and short-lived scripted use.
    pub fn with_static_token(csp_endpoint: Url, token: Secret) -> Self {
        Self {
            http: reqwest::Client::new(),
            csp_endpoint,
            auth_endpoint: None,
            token: RwLock::new(token),
            reauth: None,
        }
    }

    pub fn csp_endpoint(&self) -> &Url {
        &self.csp_endpoint
    }

    /// Auth endpoint of the credentials this client was built from, used
    /// for region derivation by the supply-chain shim.
    pub fn auth_endpoint(&self) -> Option<&str> {
        self.auth_endpoint.as_deref()
    }

    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse, TransportError> {
        self.send(Method::GET, path, query, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<ApiResponse, TransportError> {
        self.send(Method::POST, path, &[], Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, TransportError> {
        self.send(Method::DELETE, path, &[], None).await
    }

    /// Resolve a path against the CSP endpoint; absolute URLs pass
    /// through untouched (the supply-chain API lives on its own host).
    fn resolve(&self, path: &str) -> Result<Url, TransportError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(|err| TransportError::Url {
                url: path.to_string(),
                message: err.to_string(),
            });
        }
        self.csp_endpoint
            .join(path)
            .map_err(|err| TransportError::Url {
                url: path.to_string(),
                message: err.to_string(),
            })
    }

    fn current_token(&self) -> Result<Secret, TransportError> {
        self.token
            .read()
            .map(|t| t.clone())
            .map_err(|_| TransportError::Request("token lock poisoned".to_string()))
    }

    fn replace_token(&self, fresh: Secret) -> Result<(), TransportError> {
        let mut guard = self
            .token
            .write()
            .map_err(|_| TransportError::Request("token lock poisoned".to_string()))?;
        *guard = fresh;
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.resolve(path)?;
        let mut reauthed = false;

        loop {
            let token = self.current_token()?;
            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .bearer_auth(token.expose());
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!(%method, %url, "--> request");
            let response = request
                .send()
                .await
                .map_err(|err| TransportError::Request(err.to_string()))?;
            let status = response.status();
            debug!(%method, %url, status = status.as_u16(), "<-- response");

            if status == StatusCode::UNAUTHORIZED {
                if !reauthed {
                    if let Some((authenticator, credentials)) = &self.reauth {
                        debug!("token expired, re-authenticating");
                        let fresh = authenticator
                            .authenticate(credentials)
                            .await
                            .map_err(|err| TransportError::Auth(err.to_string()))?;
                        self.replace_token(fresh)?;
                        reauthed = true;
                        continue;
                    }
                }

                // A 401 that will not be retried (fresh token already
                // rejected, or no credentials to refresh with) is a hard
                // authentication failure, not an ordinary response.
                let text = response.text().await.unwrap_or_default();
                return Err(TransportError::Auth(format!(
                    "HTTP 401: {}",
                    text.trim()
                )));
            }

            let text = response.text().await.unwrap_or_default();
            return Ok(ApiResponse { status, text });
        }
    }
}
