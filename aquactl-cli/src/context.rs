//! Shared command plumbing: store access and authenticated clients.

use anyhow::Result;
use aquactl_client::{ApiClient, TransportError};
use aquactl_core::{AquactlError, CredentialResolver, ProfileStore};

pub fn open_store() -> Result<ProfileStore> {
    Ok(ProfileStore::open()?)
}

/// Resolve credentials (explicit profile, then default, then environment)
/// and authenticate against the platform.
pub async fn connect(profile: Option<&str>) -> Result<ApiClient> {
    let store = open_store()?;
    let resolver = CredentialResolver::new(&store);
    let credentials = resolver
        .resolve(profile)
        .map_err(AquactlError::Credential)?;

    match ApiClient::connect(credentials).await {
        Ok(client) => Ok(client),
        Err(TransportError::Auth(message)) => Err(AquactlError::authentication(message).into()),
        Err(other) => Err(other.into()),
    }
}
