//! Domain model types shared across the aquactl crates.
//!
//! This module defines:
//! - [`Secret`] - A wrapper for sensitive values that prevents accidental logging
//! - [`AuthMethod`] / [`ApiCredentials`] / [`CredentialSet`] - Resolved credentials
//! - [`ItemId`] / [`ListItem`] - Generic records returned by paginated endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use zeroize::Zeroize;

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the value,
/// and the buffer is zeroed on drop.
#[derive(Clone, Serialize, Deserialize)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

/// How a profile authenticates against the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// API key id/secret pair.
    ApiKey,

    /// Username and password.
    UsernamePassword,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey => write!(f, "api_key"),
            Self::UsernamePassword => write!(f, "username_password"),
        }
    }
}

/// The secret material for one authentication method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ApiCredentials {
    ApiKey {
        key: String,
        secret: Secret,
        /// CSP role requested when exchanging the key for a token.
        role: Option<String>,
        /// Allowed API methods for the issued token.
        methods: Option<Vec<String>>,
    },
    UsernamePassword {
        user: String,
        password: Secret,
    },
}

impl ApiCredentials {
    pub fn method(&self) -> AuthMethod {
        match self {
            Self::ApiKey { .. } => AuthMethod::ApiKey,
            Self::UsernamePassword { .. } => AuthMethod::UsernamePassword,
        }
    }
}

/// A fully resolved credential set, valid for one command invocation.
///
/// Never persisted unencrypted; the profile store serializes this structure
/// to JSON and encrypts the result before it touches disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSet {
    #[serde(flatten)]
    pub credentials: ApiCredentials,

    /// Tenant CSP endpoint all API calls are issued against.
    pub csp_endpoint: String,

    /// Authentication endpoint (token exchange); optional because the
    /// on-prem username/password flow signs in at the CSP endpoint itself.
    pub auth_endpoint: Option<String>,
}

impl CredentialSet {
    pub fn method(&self) -> AuthMethod {
        self.credentials.method()
    }
}

/// Identity of a record from a paginated endpoint.
///
/// The platform uses int64 ids for some resources (Hub inventory images)
/// and opaque strings for others (repositories, enforcer groups).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Int(i64),
    Str(String),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ItemId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// A generic record fetched from a paginated list endpoint.
///
/// Immutable once fetched; the core never mutates fetched records, only
/// filters and copies references into result sequences. Attributes are an
/// open mapping because the API JSON varies in shape per endpoint; filters
/// treat a missing attribute as non-matching rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListItem {
    pub identity: ItemId,

    #[serde(default)]
    pub attributes: Map<String, Value>,

    pub created_at: Option<DateTime<Utc>>,
}

impl ListItem {
    pub fn new(identity: impl Into<ItemId>) -> Self {
        Self {
            identity: identity.into(),
            attributes: Map::new(),
            created_at: None,
        }
    }

    /// Build a list item directly from an API response object.
    pub fn from_object(identity: impl Into<ItemId>, attributes: Map<String, Value>) -> Self {
        Self {
            identity: identity.into(),
            attributes,
            created_at: None,
        }
    }

    pub fn with_attr(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn attr_bool(&self, key: &str) -> Option<bool> {
        self.attributes.get(key).and_then(Value::as_bool)
    }

    pub fn attr_u64(&self, key: &str) -> Option<u64> {
        self.attributes.get(key).and_then(Value::as_u64)
    }

    /// Human-readable name for verbose output: `registry/repository:tag`
    /// when those attributes are present, otherwise the identity.
    pub fn display_name(&self) -> String {
        match (self.attr_str("registry"), self.attr_str("repository")) {
            (Some(registry), Some(repository)) => {
                let tag = self.attr_str("tag").unwrap_or("");
                if tag.is_empty() {
                    format!("{}/{}", registry, repository)
                } else {
                    format!("{}/{}:{}", registry, repository, tag)
                }
            }
            _ => self.identity.to_string(),
        }
    }
}
