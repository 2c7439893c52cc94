//! Application scope listing.

use crate::records::record_to_item;
use crate::transport::ApiClient;
use aquactl_core::paginate::{FetchError, Page, PageSource, drain_pages};
use aquactl_core::ListItem;
use async_trait::async_trait;
use serde_json::Value;

const LIST_PATH: &str = "/api/v2/access_management/scopes";

/// Paginated application scope listing, ordered by name.
pub struct ScopeList<'a> {
    client: &'a ApiClient,
}

impl<'a> ScopeList<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for ScopeList<'_> {
    type Item = ListItem;

    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Page<ListItem>, FetchError> {
        let query = vec![
            ("page", page.to_string()),
            ("pagesize", page_size.to_string()),
            ("order_by", "name".to_string()),
        ];

        let res = self
            .client
            .get(LIST_PATH, &query)
            .await
            .map_err(|err| FetchError::new(page, err.to_string()))?;
        if !res.is_success() {
            return Err(FetchError::new(page, res.describe()));
        }

        let body = res
            .json()
            .map_err(|err| FetchError::new(page, err.to_string()))?;
        let records = body
            .get("result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let items = records
            .iter()
            .filter_map(|r| record_to_item(r, &["name"], &[]))
            .collect();

        Ok(Page {
            items,
            total: body.get("count").and_then(Value::as_u64),
            has_more: None,
        })
    }
}

/// Names of all application scopes on the tenant.
pub async fn scope_names(client: &ApiClient) -> Result<Vec<String>, FetchError> {
    let list = ScopeList::new(client);
    let items = drain_pages(&list, 200, |_| {}).await?;
    Ok(items.into_iter().map(|item| item.identity.to_string()).collect())
}
