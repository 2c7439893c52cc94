//! # aquactl core
//!
//! Core library for the aquactl utilities that wrap the Aqua Security
//! platform API.
//!
//! This crate provides:
//! - Encrypted multi-profile credential storage ([`ProfileStore`])
//! - Credential resolution with environment-variable fallback
//!   ([`CredentialResolver`])
//! - The generic paginate / filter / batch-delete workflow contracts used
//!   by every destructive utility ([`PageSource`], [`FilterPipeline`],
//!   [`BatchActionRunner`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aquactl_core::{CredentialResolver, ProfileStore};
//!
//! let store = ProfileStore::open()?;
//! let resolver = CredentialResolver::new(&store);
//! let credentials = resolver.resolve(Some("production"))?;
//! ```

pub mod batch;
pub mod codec;
pub mod csvio;
pub mod error;
pub mod filter;
pub mod model;
pub mod paginate;
pub mod profile;
pub mod resolve;

// Re-export commonly used types at crate root
pub use model::{
    ApiCredentials,
    AuthMethod,
    CredentialSet,
    ItemId,
    ListItem,
    Secret,
};

pub use codec::{CodecError, SecretCodec};

pub use profile::{
    NewProfile,
    ProfileInfo,
    ProfileStore,
    StoreError,
};

pub use resolve::{CredentialError, CredentialResolver};

pub use paginate::{drain_pages, FetchError, Page, PageSource};

pub use filter::{Filter, FilterPipeline};

pub use batch::{
    ActionError,
    ActionOutcome,
    BatchAction,
    BatchActionRunner,
    OutcomeStatus,
    RunMode,
    RunReport,
};

pub use csvio::{CsvError, CsvImport};

pub use error::AquactlError;
