//! Image repository listing and deletion.

use crate::records::record_to_item;
use crate::transport::ApiClient;
use aquactl_core::batch::{ActionError, BatchAction};
use aquactl_core::paginate::{FetchError, Page, PageSource};
use aquactl_core::ListItem;
use async_trait::async_trait;
use serde_json::Value;

const LIST_PATH: &str = "/api/v2/repositories";

/// Paginated repository listing, optionally narrowed to one registry.
pub struct RepositoryList<'a> {
    client: &'a ApiClient,
    registry: Option<String>,
}

impl<'a> RepositoryList<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self {
            client,
            registry: None,
        }
    }

    pub fn registry(mut self, registry: Option<String>) -> Self {
        self.registry = registry;
        self
    }
}

#[async_trait]
impl PageSource for RepositoryList<'_> {
    type Item = ListItem;

    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Page<ListItem>, FetchError> {
        let mut query = vec![
            ("page", page.to_string()),
            ("pagesize", page_size.to_string()),
        ];
        if let Some(registry) = &self.registry {
            query.push(("registry", registry.clone()));
        }

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
            .filter_map(|r| record_to_item(r, &["name"], &["created"]))
            .collect();

        Ok(Page {
            items,
            total: body.get("count").and_then(Value::as_u64),
            has_more: None,
        })
    }
}

/// Per-repository deletion.
///
/// The repositories endpoint deletes one repository per call, so callers
/// run this with batch size 1 to keep failure granularity per item.
pub struct RepoDeleter<'a> {
    client: &'a ApiClient,
}

impl<'a> RepoDeleter<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BatchAction for RepoDeleter<'_> {
    async fn apply_batch(&self, items: &[ListItem]) -> Result<(), ActionError> {
        for item in items {
            let registry = item.attr_str("registry").unwrap_or_default();
            let name = item.identity.to_string();
            let path = format!("{}/{}/{}", LIST_PATH, registry, name);

            let res = self
                .client
                .delete(&path)
                .await
                .map_err(|err| ActionError::new(err.to_string()))?;

            match res.status() {
                200 | 202 | 204 => {}
                // Already gone: success, repeated runs are safe.
                404 => {}
                _ => {
                    return Err(ActionError::new(format!(
                        "{}/{}: {}",
                        registry,
                        name,
                        res.describe()
                    )));
                }
            }
        }
        Ok(())
    }
}
