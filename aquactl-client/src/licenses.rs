//! License totals and the per-scope utilization breakdown.

use crate::code_repositories::code_repo_count;
use crate::enforcers::{EnforcerBreakdown, enforcer_breakdown};
use crate::scopes::scope_names;
use crate::transport::ApiClient;
use aquactl_core::paginate::FetchError;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

const LICENSES_PATH: &str = "/api/v2/licenses";
const REPOSITORIES_PATH: &str = "/api/v2/repositories";

/// Raw license document for the tenant.
pub async fn get_licenses(client: &ApiClient) -> Result<Value, FetchError> {
    let res = client
        .get(LICENSES_PATH, &[])
        .await
        .map_err(|err| FetchError::new(1, err.to_string()))?;
    if !res.is_success() {
        return Err(FetchError::new(1, res.describe()));
    }
    res.json().map_err(|err| FetchError::new(1, err.to_string()))
}

/// Repository count, optionally narrowed to one scope.
///
/// Fetches a single one-record page and reads the reported total instead
/// of draining the listing.
pub async fn repo_count(client: &ApiClient, scope: Option<&str>) -> Result<u64, FetchError> {
    let mut query = vec![
        ("page", "1".to_string()),
        ("pagesize", "1".to_string()),
    ];
    if let Some(scope) = scope {
        query.push(("scope", scope.to_string()));
    }

    let res = client
        .get(REPOSITORIES_PATH, &query)
        .await
        .map_err(|err| FetchError::new(1, err.to_string()))?;
    if !res.is_success() {
        return Err(FetchError::new(1, res.describe()));
    }

    let body = res.json().map_err(|err| FetchError::new(1, err.to_string()))?;
    Ok(body.get("count").and_then(Value::as_u64).unwrap_or(0))
}

/// One row of the per-scope utilization breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeBreakdownRow {
    pub scope: String,
    pub repos: u64,

    /// Code repositories are tenant-wide; only the Global row carries a
    /// count.
    pub code_repos: Option<u64>,

    #[serde(flatten)]
    pub enforcers: EnforcerBreakdown,
}

/// Utilization breakdown across every application scope.
///
/// The Global row comes first with the tenant-wide repository and code
/// repository totals; each scope row follows with scoped counts. A scope
/// whose counts cannot be fetched is skipped rather than failing the
/// whole breakdown.
pub async fn license_breakdown(client: &ApiClient) -> Result<Vec<ScopeBreakdownRow>, FetchError> {
    let mut rows = Vec::new();

    let code_repos = match code_repo_count(client).await {
        Ok(count) => Some(count),
        Err(err) => {
            warn!(error = %err, "code repository count unavailable");
            None
        }
    };
    rows.push(ScopeBreakdownRow {
        scope: "Global".to_string(),
        repos: repo_count(client, None).await?,
        code_repos,
        enforcers: enforcer_breakdown(client, None).await?,
    });

    for scope in scope_names(client).await? {
        debug!(%scope, "fetching scope utilization");
        let repos = match repo_count(client, Some(&scope)).await {
            Ok(count) => count,
            Err(err) => {
                warn!(%scope, error = %err, "skipping scope");
                continue;
            }
        };
        let enforcers = match enforcer_breakdown(client, Some(scope.clone())).await {
            Ok(breakdown) => breakdown,
            Err(err) => {
                warn!(%scope, error = %err, "skipping scope");
                continue;
            }
        };
        rows.push(ScopeBreakdownRow {
            scope,
            repos,
            code_repos: None,
            enforcers,
        });
    }

    Ok(rows)
}
