//! Supply Chain code repository listing.
//!
//! The Supply Chain API lives on its own regional host, derived from the
//! tenant's CSP endpoint (or, when the CSP endpoint carries no region,
//! from the auth endpoint). A tenant in `eu-1` talks to
//! `api.eu-1.supply-chain.cloud.aquasec.com`; US tenants use the
//! unprefixed host.

use crate::records::{marker_present, record_to_item};
use crate::transport::ApiClient;
use aquactl_core::paginate::{FetchError, Page, PageSource};
use aquactl_core::ListItem;
use async_trait::async_trait;
use serde_json::Value;
use url::Url;

/// Derive the Supply Chain API base URL for a tenant.
pub fn supply_chain_base(csp_endpoint: &str, auth_endpoint: Option<&str>) -> String {
    if let Some(region) = Url::parse(csp_endpoint)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .as_deref()
        .and_then(region_from_csp_host)
    {
        return format!("https://api.{}.supply-chain.cloud.aquasec.com", region);
    }

    if let Some(region) = auth_endpoint
        .and_then(|a| Url::parse(a).ok())
        .and_then(|u| u.host_str().map(str::to_string))
        .as_deref()
        .and_then(region_from_auth_host)
    {
        return format!("https://api.{}.supply-chain.cloud.aquasec.com", region);
    }

    // No region anywhere: US tenant.
    "https://api.supply-chain.cloud.aquasec.com".to_string()
}

/// Region label from `tenant.REGION.cloud.aquasec.com`.
fn region_from_csp_host(host: &str) -> Option<String> {
    let rest = host.strip_suffix(".cloud.aquasec.com")?;
    let label = rest.rsplit('.').next()?;
    is_region_label(label).then(|| label.to_string())
}

/// Region label from `REGION.api.cloudsploit.com`.
fn region_from_auth_host(host: &str) -> Option<String> {
    let label = host.strip_suffix(".api.cloudsploit.com")?;
    is_region_label(label).then(|| label.to_string())
}

/// Region labels look like `eu-1`, `asia-2`: an alphanumeric prefix, a
/// hyphen, and a numeric suffix.
fn is_region_label(label: &str) -> bool {
    match label.rsplit_once('-') {
        Some((prefix, digits)) => {
            !prefix.is_empty()
                && !digits.is_empty()
                && prefix.chars().all(|c| c.is_ascii_alphanumeric())
                && digits.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Paginated Supply Chain repository listing.
///
/// The Supply Chain API has no scope filter; listings are always
/// tenant-wide.
pub struct CodeRepositoryList<'a> {
    client: &'a ApiClient,
    base: String,
}

impl<'a> CodeRepositoryList<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        let base = supply_chain_base(client.csp_endpoint().as_str(), client.auth_endpoint());
        Self { client, base }
    }
}

#[async_trait]
impl PageSource for CodeRepositoryList<'_> {
    type Item = ListItem;

    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Page<ListItem>, FetchError> {
        let url = format!("{}/v2/build/repositories", self.base);
        let query = vec![
            ("page", page.to_string()),
            ("page_size", page_size.to_string()),
            ("order_by", "-scan_date".to_string()),
            ("no_scan_repositories", "true".to_string()),
        ];

        let res = self
            .client
            .get(&url, &query)
            .await
            .map_err(|err| FetchError::new(page, err.to_string()))?;
        if !res.is_success() {
            return Err(FetchError::new(page, res.describe()));
        }

        let body = res
            .json()
            .map_err(|err| FetchError::new(page, err.to_string()))?;
        let records = body
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let items = records
            .iter()
            .filter_map(|r| record_to_item(r, &["id", "name"], &["created_at", "scan_date"]))
            .collect();

        Ok(Page {
            items,
            total: body.get("total_count").and_then(Value::as_u64),
            has_more: Some(marker_present(body.get("next_page"))),
        })
    }
}

/// Total code repository count, read from a single minimal page.
pub async fn code_repo_count(client: &ApiClient) -> Result<u64, FetchError> {
    let list = CodeRepositoryList::new(client);
    let page = list.fetch_page(1, 1).await?;
    Ok(page.total.unwrap_or(page.items.len() as u64))
}
