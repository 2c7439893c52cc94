//! Enforcer group listing and connected-count breakdown.

use crate::records::record_to_item;
use crate::transport::ApiClient;
use aquactl_core::paginate::{FetchError, Page, PageSource, drain_pages};
use aquactl_core::ListItem;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

const LIST_PATH: &str = "/api/v1/hostsbatch";

/// Paginated enforcer group listing, optionally narrowed to one scope.
pub struct EnforcerGroupList<'a> {
    client: &'a ApiClient,
    scope: Option<String>,
}

impl<'a> EnforcerGroupList<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self {
            client,
            scope: None,
        }
    }

    pub fn scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope;
        self
    }
}

#[async_trait]
impl PageSource for EnforcerGroupList<'_> {
    type Item = ListItem;

    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Page<ListItem>, FetchError> {
        let mut query = vec![
            ("page", page.to_string()),
            ("pagesize", page_size.to_string()),
        ];
        if let Some(scope) = &self.scope {
            query.push(("scope", scope.clone()));
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
            .filter_map(|r| record_to_item(r, &["id", "name"], &[]))
            .collect();

        Ok(Page {
            items,
            total: body.get("count").and_then(Value::as_u64),
            has_more: None,
        })
    }
}

/// Connected enforcer counts, split by enforcer type.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct EnforcerBreakdown {
    pub agent: u64,
    pub kube_enforcer: u64,
    pub host_enforcer: u64,
    pub micro_enforcer: u64,
    pub nano_enforcer: u64,
    pub pod_enforcer: u64,
}

impl EnforcerBreakdown {
    /// Sum connected counts across enforcer groups.
    ///
    /// Groups with an unrecognized `enforcer_type` contribute nothing.
    pub fn from_groups<'a>(groups: impl IntoIterator<Item = &'a ListItem>) -> Self {
        let mut breakdown = Self::default();
        for group in groups {
            let connected = group.attr_u64("connected_count").unwrap_or(0);
            match group.attr_str("enforcer_type").unwrap_or_default() {
                "agent" => breakdown.agent += connected,
                "kube_enforcer" => breakdown.kube_enforcer += connected,
                "host_enforcer" => breakdown.host_enforcer += connected,
                "micro_enforcer" => breakdown.micro_enforcer += connected,
                "nano_enforcer" => breakdown.nano_enforcer += connected,
                "pod_enforcer" => breakdown.pod_enforcer += connected,
                _ => {}
            }
        }
        breakdown
    }

    pub fn total(&self) -> u64 {
        self.agent
            + self.kube_enforcer
            + self.host_enforcer
            + self.micro_enforcer
            + self.nano_enforcer
            + self.pod_enforcer
    }
}

/// Breakdown of connected enforcers, optionally narrowed to one scope.
pub async fn enforcer_breakdown(
    client: &ApiClient,
    scope: Option<String>,
) -> Result<EnforcerBreakdown, FetchError> {
    let list = EnforcerGroupList::new(client).scope(scope);
    let groups = drain_pages(&list, 200, |_| {}).await?;
    Ok(EnforcerBreakdown::from_groups(&groups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aquactl_core::ItemId;
    use serde_json::json;

    fn group(enforcer_type: &str, connected: u64) -> ListItem {
        ListItem::new(ItemId::Str(format!("{enforcer_type}-group")))
            .with_attr("enforcer_type", json!(enforcer_type))
            .with_attr("connected_count", json!(connected))
    }

    #[test]
    fn sums_connected_counts_by_type() {
        let groups = vec![
            group("agent", 3),
            group("agent", 2),
            group("kube_enforcer", 7),
            group("nano_enforcer", 1),
        ];
        let breakdown = EnforcerBreakdown::from_groups(&groups);
        assert_eq!(breakdown.agent, 5);
        assert_eq!(breakdown.kube_enforcer, 7);
        assert_eq!(breakdown.nano_enforcer, 1);
        assert_eq!(breakdown.host_enforcer, 0);
        assert_eq!(breakdown.total(), 13);
    }

    #[test]
    fn unknown_types_and_missing_counts_are_ignored() {
        let groups = vec![
            group("vm_enforcer", 9),
            ListItem::new(ItemId::Str("no-count".into()))
                .with_attr("enforcer_type", json!("agent")),
        ];
        let breakdown = EnforcerBreakdown::from_groups(&groups);
        assert_eq!(breakdown, EnforcerBreakdown::default());
    }
}
