//! Hub inventory image listing and bulk delete.

use crate::records::record_to_item;
use crate::transport::ApiClient;
use aquactl_core::batch::{ActionError, BatchAction};
use aquactl_core::paginate::{FetchError, Page, PageSource};
use aquactl_core::{ItemId, ListItem};
use async_trait::async_trait;
use serde_json::{Value, json};

const LIST_PATH: &str = "/api/v2/images";
const DELETE_PATH: &str = "/api/v2/images/actions/delete";

/// Paginated view of the Hub image inventory with server-side filters.
pub struct ImageInventory<'a> {
    client: &'a ApiClient,
    min_age_days: Option<u32>,
    registry: Option<String>,
    scope: Option<String>,
    without_workloads: bool,
}

impl<'a> ImageInventory<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self {
            client,
            min_age_days: None,
            registry: None,
            scope: None,
            without_workloads: false,
        }
    }

    /// Only images first seen more than `days` days ago.
    pub fn older_than_days(mut self, days: u32) -> Self {
        self.min_age_days = Some(days);
        self
    }

    pub fn registry(mut self, registry: Option<String>) -> Self {
        self.registry = registry;
        self
    }

    pub fn scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope;
        self
    }

    /// Only images with no running workloads.
    pub fn without_workloads(mut self) -> Self {
        self.without_workloads = true;
        self
    }
}

#[async_trait]
impl PageSource for ImageInventory<'_> {
    type Item = ListItem;

    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Page<ListItem>, FetchError> {
        let mut query = vec![
            ("page", page.to_string()),
            ("page_size", page_size.to_string()),
        ];
        if let Some(days) = self.min_age_days {
            query.push(("first_found_date", format!("over|{}|days", days)));
        }
        if let Some(registry) = &self.registry {
            query.push(("registry_name", registry.clone()));
        }
        if let Some(scope) = &self.scope {
            query.push(("scope", scope.clone()));
        }
        if self.without_workloads {
            query.push(("has_workloads", "false".to_string()));
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
            .filter_map(|r| {
                record_to_item(r, &["image_uid", "id"], &["created", "first_found_date"])
            })
            .collect();

        Ok(Page {
            items,
            total: body.get("count").and_then(Value::as_u64),
            has_more: None,
        })
    }
}

/// Bulk image deletion via the inventory actions endpoint.
///
/// An already-absent target (HTTP 404) is success: repeated runs over the
/// same input are safe.
pub struct ImageDeleter<'a> {
    client: &'a ApiClient,
}

impl<'a> ImageDeleter<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BatchAction for ImageDeleter<'_> {
    async fn apply_batch(&self, items: &[ListItem]) -> Result<(), ActionError> {
        let ids: Vec<Value> = items
            .iter()
            .map(|item| match &item.identity {
                ItemId::Int(n) => json!(n),
                ItemId::Str(s) => json!(s),
            })
            .collect();

        let res = self
            .client
            .post(DELETE_PATH, &json!({ "ids": ids }))
            .await
            .map_err(|err| ActionError::new(err.to_string()))?;

        match res.status() {
            200 | 202 | 204 => Ok(()),
            404 => Ok(()),
            _ => Err(ActionError::new(res.describe())),
        }
    }
}
