//! # aquactl client
//!
//! HTTP transport, authentication and per-endpoint shims for the Aqua
//! Security platform API.
//!
//! The shims are intentionally thin: each one supplies a page-fetch
//! function ([`PageSource`](aquactl_core::PageSource) impl) and, where the
//! endpoint is destructive, a [`BatchAction`](aquactl_core::BatchAction)
//! impl. The workflow logic (draining, filtering, dry-run/apply batching)
//! lives in `aquactl-core`.

pub mod auth;
pub mod code_repositories;
pub mod enforcers;
pub mod images;
pub mod licenses;
pub mod records;
pub mod repositories;
pub mod scopes;
pub mod transport;
pub mod vms;

pub use auth::{AuthError, Authenticator};
pub use transport::{ApiClient, ApiResponse, TransportError};

pub use images::{ImageDeleter, ImageInventory};
pub use repositories::{RepoDeleter, RepositoryList};
pub use code_repositories::CodeRepositoryList;
pub use enforcers::{EnforcerBreakdown, EnforcerGroupList};
pub use licenses::ScopeBreakdownRow;
pub use scopes::ScopeList;
pub use vms::{VmInventory, VmStats};
