//! Credential-to-token exchange.
//!
//! The platform has three sign-in flows; which one applies is determined
//! by the resolved credential set:
//! - API key: `POST {auth_endpoint}/v2/tokens`
//! - username/password (SaaS): `POST {auth_endpoint}/v2/signin`
//! - username/password (on-prem, no auth endpoint): `POST {csp_endpoint}/api/v1/login`
//!
//! The issued bearer token shape differs per flow, so extraction probes
//! the known response layouts.

use aquactl_core::{ApiCredentials, CredentialSet, Secret};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Authentication failed; carries the platform's message where available.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AuthError {
    pub message: String,
}

impl AuthError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(format!("request failed: {}", err))
    }
}

/// Exchanges a resolved credential set for a bearer token.
#[derive(Debug)]
pub struct Authenticator {
    http: reqwest::Client,
}

impl Default for Authenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl Authenticator {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Authenticate and return the bearer token.
    pub async fn authenticate(&self, credentials: &CredentialSet) -> Result<Secret, AuthError> {
        match &credentials.credentials {
            ApiCredentials::ApiKey {
                key,
                secret,
                role,
                methods,
            } => {
                let auth_endpoint = credentials.auth_endpoint.as_deref().ok_or_else(|| {
                    AuthError::new(
                        "API key authentication requires an auth endpoint (AQUA_ENDPOINT)",
                    )
                })?;
                let url = join(auth_endpoint, "/v2/tokens")?;
                let body = json!({
                    "key": key,
                    "secret": secret.expose(),
                    "csp_roles": role.as_ref().map(|r| vec![r.clone()]).unwrap_or_default(),
                    "allowed_endpoints": methods
                        .clone()
                        .unwrap_or_else(|| vec!["ANY".to_string()]),
                });
                self.sign_in(url, &body).await
            }
            ApiCredentials::UsernamePassword { user, password } => {
                match credentials.auth_endpoint.as_deref() {
                    Some(auth_endpoint) => {
                        // SaaS sign-in.
                        let url = join(auth_endpoint, "/v2/signin")?;
                        let body = json!({
                            "email": user,
                            "password": password.expose(),
                        });
                        self.sign_in(url, &body).await
                    }
                    None => {
                        // On-prem console login.
                        let url = join(&credentials.csp_endpoint, "/api/v1/login")?;
                        let body = json!({
                            "id": user,
                            "password": password.expose(),
                        });
                        self.sign_in(url, &body).await
                    }
                }
            }
        }
    }

    async fn sign_in(&self, url: Url, body: &Value) -> Result<Secret, AuthError> {
        debug!(%url, "authenticating");
        let res = self.http.post(url).json(body).send().await?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(AuthError::new(format!(
                "platform rejected credentials (HTTP {}): {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: Value = serde_json::from_str(&text)
            .map_err(|_| AuthError::new("sign-in response is not valid JSON"))?;

        extract_token(&parsed)
            .map(Secret::new)
            .ok_or_else(|| AuthError::new("sign-in response did not contain a token"))
    }
}

/// Probe the known response layouts for the bearer token.
fn extract_token(body: &Value) -> Option<String> {
    if let Some(token) = body.get("data").and_then(Value::as_str) {
        return Some(token.to_string());
    }
    if let Some(token) = body
        .get("data")
        .and_then(|d| d.get("token"))
        .and_then(Value::as_str)
    {
        return Some(token.to_string());
    }
    body.get("token")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn join(base: &str, path: &str) -> Result<Url, AuthError> {
    Url::parse(&format!("{}{}", base.trim_end_matches('/'), path))
        .map_err(|err| AuthError::new(format!("invalid endpoint '{}': {}", base, err)))
}
