//! Credential resolution.
//!
//! Resolution order, first match wins:
//! 1. caller-specified profile name;
//! 2. the store's default profile, when one is set;
//! 3. recognized `AQUA_*` / `CSP_ENDPOINT` environment variables.
//!
//! A partially populated environment (e.g. `AQUA_KEY` without
//! `AQUA_SECRET`) is an error naming the missing variables; it never
//! silently falls through to a different method.

use crate::model::{ApiCredentials, CredentialSet, Secret};
use crate::profile::{ProfileStore, StoreError};
use thiserror::Error;
use tracing::debug;

/// API key id. Presence of this or [`ENV_SECRET`] selects the API-key flow.
pub const ENV_KEY: &str = "AQUA_KEY";
/// API key secret.
pub const ENV_SECRET: &str = "AQUA_SECRET";
/// Optional CSP role requested for the issued token.
pub const ENV_ROLE: &str = "AQUA_ROLE";
/// Optional comma-separated allowed API methods for the issued token.
pub const ENV_METHODS: &str = "AQUA_METHODS";
/// Username. Presence of this or [`ENV_PASSWORD`] selects the
/// username/password flow.
pub const ENV_USER: &str = "AQUA_USER";
/// Password.
pub const ENV_PASSWORD: &str = "AQUA_PASSWORD";
/// Authentication endpoint (token exchange).
pub const ENV_AUTH_ENDPOINT: &str = "AQUA_ENDPOINT";
/// Tenant CSP endpoint all API calls are issued against.
pub const ENV_CSP_ENDPOINT: &str = "CSP_ENDPOINT";

/// Error type for credential resolution.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Nothing resolvable: no profile, no default, no environment.
    #[error(
        "no credentials found: run 'setup' to create a profile or set the \
         AQUA_* environment variables"
    )]
    NoCredentials,

    /// An environment-variable set was started but not completed.
    #[error("incomplete credentials: missing {}", missing.join(", "))]
    IncompleteCredentials { missing: Vec<&'static str> },

    /// Error from the underlying profile store (not found, no default,
    /// undecryptable payload, ...).
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Resolves a credential set for one command invocation.
pub struct CredentialResolver<'a> {
    store: &'a ProfileStore,
}

impl<'a> CredentialResolver<'a> {
    pub fn new(store: &'a ProfileStore) -> Self {
        Self { store }
    }

    /// Resolve credentials, trying the explicit profile, then the default
    /// profile, then the environment.
    pub fn resolve(&self, profile: Option<&str>) -> Result<CredentialSet, CredentialError> {
        if let Some(name) = profile {
            debug!(profile = name, "resolving credentials from explicit profile");
            let (_, credentials) = self.store.get(Some(name))?;
            return Ok(credentials);
        }

        if self.store.default_name()?.is_some() {
            debug!("resolving credentials from default profile");
            let (_, credentials) = self.store.get(None)?;
            return Ok(credentials);
        }

        debug!("resolving credentials from environment");
        resolve_env(|name| std::env::var(name).ok())
    }
}

/// Resolve credentials from an environment lookup.
///
/// Split out from [`CredentialResolver`] so tests can inject a fake
/// environment instead of mutating process state.
pub fn resolve_env(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<CredentialSet, CredentialError> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let key = get(ENV_KEY);
    let secret = get(ENV_SECRET);
    let user = get(ENV_USER);
    let password = get(ENV_PASSWORD);
    let auth_endpoint = get(ENV_AUTH_ENDPOINT);
    let csp_endpoint = get(ENV_CSP_ENDPOINT);

    if key.is_some() || secret.is_some() {
        let mut missing = Vec::new();
        if key.is_none() {
            missing.push(ENV_KEY);
        }
        if secret.is_none() {
            missing.push(ENV_SECRET);
        }
        if auth_endpoint.is_none() {
            missing.push(ENV_AUTH_ENDPOINT);
        }
        if csp_endpoint.is_none() {
            missing.push(ENV_CSP_ENDPOINT);
        }
        if !missing.is_empty() {
            return Err(CredentialError::IncompleteCredentials { missing });
        }

        let methods = get(ENV_METHODS)
            .map(|raw| raw.split(',').map(|m| m.trim().to_string()).collect());

        return Ok(CredentialSet {
            credentials: ApiCredentials::ApiKey {
                key: key.unwrap_or_default(),
                secret: Secret::new(secret.unwrap_or_default()),
                role: get(ENV_ROLE),
                methods,
            },
            csp_endpoint: csp_endpoint.unwrap_or_default(),
            auth_endpoint,
        });
    }

    if user.is_some() || password.is_some() {
        let mut missing = Vec::new();
        if user.is_none() {
            missing.push(ENV_USER);
        }
        if password.is_none() {
            missing.push(ENV_PASSWORD);
        }
        if csp_endpoint.is_none() {
            missing.push(ENV_CSP_ENDPOINT);
        }
        if !missing.is_empty() {
            return Err(CredentialError::IncompleteCredentials { missing });
        }

        return Ok(CredentialSet {
            credentials: ApiCredentials::UsernamePassword {
                user: user.unwrap_or_default(),
                password: Secret::new(password.unwrap_or_default()),
            },
            csp_endpoint: csp_endpoint.unwrap_or_default(),
            auth_endpoint,
        });
    }

    Err(CredentialError::NoCredentials)
}
