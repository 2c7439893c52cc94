//! Top-level error taxonomy for the aquactl utilities.
//!
//! The taxonomy partitions failures into fatal errors (propagated to the
//! user, process exits non-zero) and recovered outcomes (recorded per item
//! in a [`RunReport`](crate::batch::RunReport)). An [`ActionError`]
//! reaches this enum only when a command-level operation cannot proceed at
//! all; batch-granularity failures stay in outcomes and never abort a run.

use thiserror::Error;

use crate::batch::ActionError;
use crate::csvio::CsvError;
use crate::paginate::FetchError;
use crate::profile::StoreError;
use crate::resolve::CredentialError;

/// Top-level error type encompassing all aquactl failures.
#[derive(Debug, Error)]
pub enum AquactlError {
    /// Missing, incomplete or undecryptable credentials. Fatal before any
    /// network call is made.
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    /// The platform rejected the credentials.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// A paginated read failed; fatal for that listing operation.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A destructive action failed in a way that prevents the run itself.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// Profile store corrupt or unwritable.
    #[error("configuration error: {0}")]
    Config(#[from] StoreError),

    /// Bulk CSV input unusable.
    #[error("CSV input error: {0}")]
    Csv(#[from] CsvError),
}

impl AquactlError {
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }
}
