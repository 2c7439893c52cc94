//! Hub inventory VM listing and fleet statistics.
//!
//! VM records carry a `covered_by` list mixing enforcer deployments with
//! scanners and other non-enforcing integrations, and a categorical
//! `highest_risk` label. Neither shape fits the generic filters directly,
//! so [`VmInventory`] derives two extra attributes on every fetched item:
//! `coverage` (the enforcer subset of `covered_by`) and `risk` (the
//! ordinal of `highest_risk`).

use crate::records::record_to_item;
use crate::transport::ApiClient;
use aquactl_core::ListItem;
use aquactl_core::paginate::{FetchError, Page, PageSource, drain_pages};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;

const LIST_PATH: &str = "/api/v2/hub/inventory/assets/vms";

/// `covered_by` entries that count as enforcement.
pub const ENFORCER_COVERAGE: &[&str] =
    &["vm_enforcer", "host_enforcer", "aqua_enforcer", "agent"];

/// Risk labels in ascending severity; the index is the ordinal used by
/// the numeric risk filter.
pub const RISK_LEVELS: &[&str] = &["unknown", "low", "medium", "high", "critical"];

/// Ordinal of a risk label, case-insensitive. `None` for labels the
/// platform does not use.
pub fn risk_ordinal(level: &str) -> Option<u64> {
    RISK_LEVELS
        .iter()
        .position(|l| level.eq_ignore_ascii_case(l))
        .map(|i| i as u64)
}

pub fn is_enforcer_coverage(entry: &str) -> bool {
    ENFORCER_COVERAGE
        .iter()
        .any(|e| entry.eq_ignore_ascii_case(e))
}

/// Paginated view of the Hub VM inventory.
pub struct VmInventory<'a> {
    client: &'a ApiClient,
    scope: Option<String>,
}

impl<'a> VmInventory<'a> {
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
impl PageSource for VmInventory<'_> {
    type Item = ListItem;

    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Page<ListItem>, FetchError> {
        let mut query = vec![
            ("page", page.to_string()),
            ("page_size", page_size.to_string()),
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
            .filter_map(|r| record_to_item(r, &["id", "name"], &["created"]))
            .map(annotate)
            .collect();

        Ok(Page {
            items,
            total: body.get("count").and_then(Value::as_u64),
            has_more: None,
        })
    }
}

/// Derive the filterable `coverage` and `risk` attributes from the raw
/// record. A missing `covered_by` list means the VM reports no coverage
/// at all, so `coverage` is always present (possibly empty).
fn annotate(item: ListItem) -> ListItem {
    let enforcers: Vec<Value> = item
        .attr("covered_by")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter(|e| e.as_str().map(is_enforcer_coverage).unwrap_or(false))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    let ordinal = item.attr_str("highest_risk").and_then(risk_ordinal);

    let mut item = item.with_attr("coverage", Value::Array(enforcers));
    if let Some(ordinal) = ordinal {
        item = item.with_attr("risk", json!(ordinal));
    }
    item
}

/// Aggregate counts over the VM fleet.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct VmStats {
    pub total_vms: u64,
    pub vms_with_enforcer: u64,
    pub vms_without_enforcer: u64,
    pub coverage_breakdown: BTreeMap<String, u64>,
    pub cloud_provider_breakdown: BTreeMap<String, u64>,
    pub risk_level_breakdown: BTreeMap<String, u64>,
}

impl VmStats {
    pub fn from_vms<'a>(vms: impl IntoIterator<Item = &'a ListItem>) -> Self {
        let mut stats = Self::default();

        for vm in vms {
            stats.total_vms += 1;

            let mut enforced = false;
            if let Some(entries) = vm.attr("covered_by").and_then(Value::as_array) {
                for entry in entries.iter().filter_map(Value::as_str) {
                    *stats
                        .coverage_breakdown
                        .entry(entry.to_string())
                        .or_default() += 1;
                    if is_enforcer_coverage(entry) {
                        enforced = true;
                    }
                }
            }
            if enforced {
                stats.vms_with_enforcer += 1;
            } else {
                stats.vms_without_enforcer += 1;
            }

            let cloud = vm.attr_str("cloud_provider").unwrap_or("unknown");
            *stats
                .cloud_provider_breakdown
                .entry(cloud.to_string())
                .or_default() += 1;

            let risk = vm.attr_str("highest_risk").unwrap_or("unknown");
            *stats
                .risk_level_breakdown
                .entry(risk.to_lowercase())
                .or_default() += 1;
        }

        stats
    }
}

/// Drain the inventory and fold it into [`VmStats`].
pub async fn vm_stats(
    client: &ApiClient,
    scope: Option<String>,
) -> Result<VmStats, FetchError> {
    let inventory = VmInventory::new(client).scope(scope);
    let vms = drain_pages(&inventory, 100, |_| {}).await?;
    Ok(VmStats::from_vms(&vms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aquactl_core::Filter;

    fn vm(id: i64, covered_by: Value, risk: &str, cloud: &str) -> ListItem {
        ListItem::new(id)
            .with_attr("covered_by", covered_by)
            .with_attr("highest_risk", json!(risk))
            .with_attr("cloud_provider", json!(cloud))
    }

    #[test]
    fn risk_ordinals_are_ascending() {
        assert_eq!(risk_ordinal("unknown"), Some(0));
        assert_eq!(risk_ordinal("Critical"), Some(4));
        assert!(risk_ordinal("low") < risk_ordinal("high"));
        assert_eq!(risk_ordinal("severe"), None);
    }

    #[test]
    fn annotate_derives_enforcer_coverage_subset() {
        // A scanner entry alone does not count as enforcement.
        let scanned = annotate(vm(1, json!(["vuln_scanner"]), "high", "aws"));
        assert!(Filter::lacks_coverage().matches(&scanned));

        let enforced = annotate(vm(2, json!(["vm_enforcer", "vuln_scanner"]), "high", "aws"));
        assert!(!Filter::lacks_coverage().matches(&enforced));
    }

    #[test]
    fn annotate_treats_missing_covered_by_as_uncovered() {
        let bare = annotate(ListItem::new(3));
        assert!(Filter::lacks_coverage().matches(&bare));
    }

    #[test]
    fn annotate_maps_risk_label_to_ordinal() {
        let low = annotate(vm(1, json!([]), "low", "aws"));
        let critical = annotate(vm(2, json!([]), "critical", "aws"));

        let ceiling = Filter::max_risk(2);
        assert!(ceiling.matches(&low));
        assert!(!ceiling.matches(&critical));

        // Unrecognized labels get no ordinal and fall out of the filter.
        let odd = annotate(vm(3, json!([]), "severe", "aws"));
        assert!(!ceiling.matches(&odd));
    }

    #[test]
    fn stats_count_enforcement_cloud_and_risk() {
        let fleet = vec![
            vm(1, json!(["vm_enforcer", "vuln_scanner"]), "critical", "aws"),
            vm(2, json!(["vuln_scanner"]), "high", "aws"),
            vm(3, json!([]), "High", "azure"),
        ];

        let stats = VmStats::from_vms(&fleet);
        assert_eq!(stats.total_vms, 3);
        assert_eq!(stats.vms_with_enforcer, 1);
        assert_eq!(stats.vms_without_enforcer, 2);
        assert_eq!(stats.coverage_breakdown.get("vuln_scanner"), Some(&2));
        assert_eq!(stats.coverage_breakdown.get("vm_enforcer"), Some(&1));
        assert_eq!(stats.cloud_provider_breakdown.get("aws"), Some(&2));
        assert_eq!(stats.cloud_provider_breakdown.get("azure"), Some(&1));
        // Risk labels are folded case-insensitively.
        assert_eq!(stats.risk_level_breakdown.get("high"), Some(&2));
        assert_eq!(stats.risk_level_breakdown.get("critical"), Some(&1));
    }
}
