//! Encrypted multi-profile credential persistence.
//!
//! This module provides disk-backed storage for named credential profiles
//! using JSON serialization and platform-specific configuration directories.
//! Credential payloads are encrypted via [`SecretCodec`] before they are
//! written; only profile metadata is stored in the clear.
//!
//! # Storage Location
//!
//! Profiles are stored at `~/.config/aquactl/profiles.json` on Linux/macOS
//! and `%APPDATA%\aquactl\profiles.json` on Windows, with the key salt in
//! `key.salt` alongside. `AQUACTL_CONFIG_DIR` overrides the directory.
//!
//! # Atomicity
//!
//! Every mutating operation persists the entire store synchronously before
//! returning success, via write-to-temp-then-rename in the store's own
//! directory. A failure during persistence leaves the previous on-disk
//! state intact.

use crate::codec::{CodecError, SecretCodec};
use crate::model::{AuthMethod, CredentialSet};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

/// Error type for profile store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Profile already exists and overwrite was not requested.
    #[error("profile '{name}' already exists")]
    AlreadyExists { name: String },

    /// Profile not found.
    #[error("profile '{name}' not found")]
    NotFound { name: String },

    /// No profile name was given and no default is configured.
    #[error("no default profile configured")]
    NoDefault,

    /// Profile name is empty or whitespace.
    #[error("profile name must not be empty")]
    EmptyName,

    /// I/O error reading or writing the store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("profile store is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored payload could not be decoded or decrypted.
    #[error("credential payload error: {0}")]
    Codec(#[from] CodecError),

    /// Stored payload is not valid base64.
    #[error("credential payload for '{name}' is not valid base64")]
    MalformedPayload { name: String },

    /// Configuration directory not available.
    #[error("configuration directory not available")]
    ConfigDirUnavailable,

    /// Internal lock poisoning error.
    #[error("internal lock error: {message}")]
    LockError { message: String },
}

/// One persisted profile: metadata in the clear, credentials encrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub auth_method: AuthMethod,
    pub csp_endpoint: String,
    pub auth_endpoint: Option<String>,
    pub created_at: DateTime<Utc>,

    /// Base64 of `nonce || ciphertext` over the JSON credential set.
    payload: String,
}

/// Metadata view returned by [`ProfileStore::list`]; never carries secrets.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileInfo {
    pub name: String,
    pub auth_method: AuthMethod,
    pub csp_endpoint: String,
    pub auth_endpoint: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_default: bool,
}

/// Inputs for creating a profile; the credential set travels separately.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub name: String,
}

/// Internal storage format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfileStoreData {
    /// Version of the store format (for future migrations).
    version: u32,

    /// Name of the default profile, if one is set. Storing the default as
    /// a single pointer makes "at most one default" structural.
    default_profile: Option<String>,

    /// All stored profiles.
    profiles: Vec<Profile>,
}

impl Default for ProfileStoreData {
    fn default() -> Self {
        Self {
            version: 1,
            default_profile: None,
            profiles: Vec::new(),
        }
    }
}

/// Disk-backed encrypted profile store.
///
/// # Thread Safety
///
/// Uses interior mutability via `RwLock` and is safe to share across
/// threads. There is no cross-process locking; concurrent invocations
/// against the same store file have undefined interleaving.
pub struct ProfileStore {
    path: PathBuf,
    codec: SecretCodec,
    data: RwLock<ProfileStoreData>,
}

impl ProfileStore {
    /// Get the configuration directory for the store and salt files.
    ///
    /// `AQUACTL_CONFIG_DIR` overrides the platform default.
    pub fn config_dir() -> Result<PathBuf, StoreError> {
        if let Ok(dir) = std::env::var("AQUACTL_CONFIG_DIR") {
            return Ok(PathBuf::from(dir));
        }
        let dirs = directories::ProjectDirs::from("com", "aquactl", "aquactl")
            .ok_or(StoreError::ConfigDirUnavailable)?;
        Ok(dirs.config_dir().to_path_buf())
    }

    /// Open the store at the default location, creating key material and
    /// parent directories if they don't exist.
    pub fn open() -> Result<Self, StoreError> {
        let dir = Self::config_dir()?;
        Self::open_in(&dir)
    }

    /// Open the store inside a specific directory (`profiles.json` plus
    /// `key.salt`).
    pub fn open_in(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)?;
        let codec = SecretCodec::from_salt_file(&dir.join("key.salt"))?;
        Self::open_at(dir.join("profiles.json"), codec)
    }

    /// Open the store from an explicit path with an explicit codec.
    pub fn open_at(path: PathBuf, codec: SecretCodec) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            ProfileStoreData::default()
        };

        Ok(Self {
            path,
            codec,
            data: RwLock::new(data),
        })
    }

    /// Persist the current state via write-to-temp-then-rename.
    fn save(&self) -> Result<(), StoreError> {
        let data = self.data.read().map_err(|e| StoreError::LockError {
            message: format!("read lock poisoned: {}", e),
        })?;

        let contents = serde_json::to_string_pretty(&*data)?;
        drop(data);

        // The temp file lives in the same directory so the rename cannot
        // cross filesystems.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }

    /// Add a new profile, encrypting the credential set.
    ///
    /// Fails with [`StoreError::AlreadyExists`] when the name is taken and
    /// `overwrite` is false. The first profile added to an empty store
    /// becomes the default.
    pub fn add(
        &self,
        profile: NewProfile,
        credentials: &CredentialSet,
        overwrite: bool,
    ) -> Result<(), StoreError> {
        let name = profile.name.trim().to_string();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }

        let plaintext = serde_json::to_vec(credentials)?;
        let payload = BASE64.encode(self.codec.encrypt(&plaintext)?);

        let record = Profile {
            name: name.clone(),
            auth_method: credentials.method(),
            csp_endpoint: credentials.csp_endpoint.clone(),
            auth_endpoint: credentials.auth_endpoint.clone(),
            created_at: Utc::now(),
            payload,
        };

        let mut data = self.data.write().map_err(|e| StoreError::LockError {
            message: format!("write lock poisoned: {}", e),
        })?;

        let was_empty = data.profiles.is_empty();

        if let Some(existing) = data.profiles.iter_mut().find(|p| p.name == name) {
            if !overwrite {
                return Err(StoreError::AlreadyExists { name });
            }
            *existing = record;
        } else {
            data.profiles.push(record);
        }

        if was_empty {
            data.default_profile = Some(name);
        }
        drop(data);

        self.save()
    }

    /// Resolve a profile by name, or the default when `name` is `None`,
    /// and decrypt its credential set.
    pub fn get(&self, name: Option<&str>) -> Result<(ProfileInfo, CredentialSet), StoreError> {
        let data = self.data.read().map_err(|e| StoreError::LockError {
            message: format!("read lock poisoned: {}", e),
        })?;

        let name = match name {
            Some(n) => n.to_string(),
            None => data
                .default_profile
                .clone()
                .ok_or(StoreError::NoDefault)?,
        };

        let profile = data
            .profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| StoreError::NotFound { name: name.clone() })?;

        let ciphertext =
            BASE64
                .decode(&profile.payload)
                .map_err(|_| StoreError::MalformedPayload {
                    name: profile.name.clone(),
                })?;
        let plaintext = self.codec.decrypt(&ciphertext)?;
        let credentials: CredentialSet = serde_json::from_slice(&plaintext)?;

        Ok((info_of(&data, profile), credentials))
    }

    /// Resolve a profile's metadata by name, or the default when `name`
    /// is `None`. The payload is never decoded, so inspection works even
    /// when the key material cannot decrypt it.
    pub fn info(&self, name: Option<&str>) -> Result<ProfileInfo, StoreError> {
        let data = self.data.read().map_err(|e| StoreError::LockError {
            message: format!("read lock poisoned: {}", e),
        })?;

        let name = match name {
            Some(n) => n.to_string(),
            None => data
                .default_profile
                .clone()
                .ok_or(StoreError::NoDefault)?,
        };

        let profile = data
            .profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| StoreError::NotFound { name: name.clone() })?;

        Ok(info_of(&data, profile))
    }

    /// List profile metadata. Secrets are never decrypted here.
    pub fn list(&self) -> Result<Vec<ProfileInfo>, StoreError> {
        let data = self.data.read().map_err(|e| StoreError::LockError {
            message: format!("read lock poisoned: {}", e),
        })?;

        Ok(data.profiles.iter().map(|p| info_of(&data, p)).collect())
    }

    /// Name of the current default profile, if any.
    pub fn default_name(&self) -> Result<Option<String>, StoreError> {
        let data = self.data.read().map_err(|e| StoreError::LockError {
            message: format!("read lock poisoned: {}", e),
        })?;
        Ok(data.default_profile.clone())
    }

    /// Remove a profile.
    ///
    /// If the removed profile was the default the default becomes unset;
    /// there is no silent promotion of another profile, the caller must
    /// explicitly re-set it.
    pub fn remove(&self, name: &str) -> Result<(), StoreError> {
        let mut data = self.data.write().map_err(|e| StoreError::LockError {
            message: format!("write lock poisoned: {}", e),
        })?;

        let initial_len = data.profiles.len();
        data.profiles.retain(|p| p.name != name);

        if data.profiles.len() == initial_len {
            return Err(StoreError::NotFound {
                name: name.to_string(),
            });
        }

        if data.default_profile.as_deref() == Some(name) {
            data.default_profile = None;
        }
        drop(data);

        self.save()
    }

    /// Set the default profile.
    pub fn set_default(&self, name: &str) -> Result<(), StoreError> {
        let mut data = self.data.write().map_err(|e| StoreError::LockError {
            message: format!("write lock poisoned: {}", e),
        })?;

        if !data.profiles.iter().any(|p| p.name == name) {
            return Err(StoreError::NotFound {
                name: name.to_string(),
            });
        }

        data.default_profile = Some(name.to_string());
        drop(data);

        self.save()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Metadata view of one stored profile; the encrypted payload stays
/// untouched.
fn info_of(data: &ProfileStoreData, profile: &Profile) -> ProfileInfo {
    ProfileInfo {
        name: profile.name.clone(),
        auth_method: profile.auth_method,
        csp_endpoint: profile.csp_endpoint.clone(),
        auth_endpoint: profile.auth_endpoint.clone(),
        created_at: profile.created_at,
        is_default: data.default_profile.as_deref() == Some(profile.name.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApiCredentials, Secret};
    use tempfile::TempDir;

    fn test_credentials(key: &str) -> CredentialSet {
        CredentialSet {
            credentials: ApiCredentials::ApiKey {
                key: key.to_string(),
                secret: Secret::new("s3cr3t"),
                role: None,
                methods: None,
            },
            csp_endpoint: "https://tenant.cloud.aquasec.com".to_string(),
            auth_endpoint: Some("https://eu-1.api.cloudsploit.com".to_string()),
        }
    }

    fn test_store() -> (ProfileStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = ProfileStore::open_in(temp.path()).unwrap();
        (store, temp)
    }

    fn named(name: &str) -> NewProfile {
        NewProfile {
            name: name.to_string(),
        }
    }

    #[test]
    fn add_and_get_roundtrip() {
        let (store, _temp) = test_store();
        let creds = test_credentials("key-1");

        store.add(named("default"), &creds, false).unwrap();

        let (info, decrypted) = store.get(Some("default")).unwrap();
        assert_eq!(decrypted, creds);
        assert_eq!(info.auth_method, AuthMethod::ApiKey);
        assert!(info.is_default);
    }

    #[test]
    fn first_profile_becomes_default() {
        let (store, _temp) = test_store();
        store
            .add(named("first"), &test_credentials("k"), false)
            .unwrap();
        store
            .add(named("second"), &test_credentials("k2"), false)
            .unwrap();

        assert_eq!(store.default_name().unwrap().as_deref(), Some("first"));
    }

    #[test]
    fn duplicate_add_requires_overwrite() {
        let (store, _temp) = test_store();
        store
            .add(named("prod"), &test_credentials("k1"), false)
            .unwrap();

        let result = store.add(named("prod"), &test_credentials("k2"), false);
        assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));

        store
            .add(named("prod"), &test_credentials("k2"), true)
            .unwrap();
        let (_, creds) = store.get(Some("prod")).unwrap();
        assert!(matches!(
            creds.credentials,
            ApiCredentials::ApiKey { ref key, .. } if key == "k2"
        ));
    }

    #[test]
    fn get_without_name_uses_default() {
        let (store, _temp) = test_store();
        store
            .add(named("only"), &test_credentials("k"), false)
            .unwrap();

        let (info, _) = store.get(None).unwrap();
        assert_eq!(info.name, "only");
    }

    #[test]
    fn get_with_no_default_fails() {
        let (store, _temp) = test_store();
        assert!(matches!(store.get(None), Err(StoreError::NoDefault)));
    }

    #[test]
    fn get_unknown_profile_fails() {
        let (store, _temp) = test_store();
        assert!(matches!(
            store.get(Some("ghost")),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn remove_default_unsets_pointer() {
        let (store, _temp) = test_store();
        store
            .add(named("a"), &test_credentials("k"), false)
            .unwrap();
        store
            .add(named("b"), &test_credentials("k"), false)
            .unwrap();

        store.remove("a").unwrap();

        // No silent promotion of "b".
        assert_eq!(store.default_name().unwrap(), None);
        assert!(matches!(store.get(None), Err(StoreError::NoDefault)));
    }

    #[test]
    fn remove_nonexistent_fails() {
        let (store, _temp) = test_store();
        assert!(matches!(
            store.remove("ghost"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn set_default_requires_existing_profile() {
        let (store, _temp) = test_store();
        store
            .add(named("a"), &test_credentials("k"), false)
            .unwrap();
        store
            .add(named("b"), &test_credentials("k"), false)
            .unwrap();

        store.set_default("b").unwrap();
        assert_eq!(store.default_name().unwrap().as_deref(), Some("b"));

        assert!(matches!(
            store.set_default("ghost"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn at_most_one_default_over_mutation_sequences() {
        let (store, _temp) = test_store();

        for name in ["a", "b", "c"] {
            store.add(named(name), &test_credentials("k"), false).unwrap();
            let defaults = store
                .list()
                .unwrap()
                .iter()
                .filter(|p| p.is_default)
                .count();
            assert!(defaults <= 1);
        }

        store.set_default("c").unwrap();
        store.remove("c").unwrap();
        store.set_default("b").unwrap();

        let defaults = store
            .list()
            .unwrap()
            .iter()
            .filter(|p| p.is_default)
            .count();
        assert_eq!(defaults, 1);
    }

    #[test]
    fn persistence_across_reopen() {
        let temp = TempDir::new().unwrap();

        {
            let store = ProfileStore::open_in(temp.path()).unwrap();
            store
                .add(named("prod"), &test_credentials("key-id"), false)
                .unwrap();
        }

        {
            let store = ProfileStore::open_in(temp.path()).unwrap();
            let profiles = store.list().unwrap();
            assert_eq!(profiles.len(), 1);
            assert_eq!(profiles[0].name, "prod");

            let (_, creds) = store.get(Some("prod")).unwrap();
            assert_eq!(creds, test_credentials("key-id"));
        }
    }

    #[test]
    fn secrets_never_hit_disk_in_clear() {
        let temp = TempDir::new().unwrap();
        let store = ProfileStore::open_in(temp.path()).unwrap();
        store
            .add(named("prod"), &test_credentials("key-id"), false)
            .unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(!raw.contains("s3cr3t"));
        assert!(!raw.contains("key-id"));
    }

    #[test]
    fn list_does_not_require_decryptable_payloads() {
        let temp = TempDir::new().unwrap();
        {
            let store = ProfileStore::open_in(temp.path()).unwrap();
            store
                .add(named("prod"), &test_credentials("k"), false)
                .unwrap();
        }

        // Reopen with a different key: list still works, get fails.
        let codec = SecretCodec::from_salt(&[0x99; 32]).unwrap();
        let store = ProfileStore::open_at(temp.path().join("profiles.json"), codec).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
        assert!(matches!(
            store.get(Some("prod")),
            Err(StoreError::Codec(CodecError::Decryption))
        ));
    }

    #[test]
    fn info_does_not_require_decryptable_payloads() {
        let temp = TempDir::new().unwrap();
        {
            let store = ProfileStore::open_in(temp.path()).unwrap();
            store
                .add(named("prod"), &test_credentials("k"), false)
                .unwrap();
        }

        // Lost salt file scenario: metadata inspection must keep working
        // while credential decryption fails.
        let codec = SecretCodec::from_salt(&[0x99; 32]).unwrap();
        let store = ProfileStore::open_at(temp.path().join("profiles.json"), codec).unwrap();

        let info = store.info(Some("prod")).unwrap();
        assert_eq!(info.name, "prod");
        assert!(info.is_default);

        // The default resolves the same way as in get().
        assert_eq!(store.info(None).unwrap().name, "prod");
        assert!(matches!(
            store.get(Some("prod")),
            Err(StoreError::Codec(CodecError::Decryption))
        ));
    }

    #[test]
    fn info_resolution_matches_get() {
        let (store, _temp) = test_store();
        assert!(matches!(store.info(None), Err(StoreError::NoDefault)));
        assert!(matches!(
            store.info(Some("ghost")),
            Err(StoreError::NotFound { .. })
        ));
    }
}
