//! Composable predicate chains over fetched records.
//!
//! A filter is a pure predicate over a [`ListItem`]; a pipeline is an
//! ordered sequence of filters combined by logical AND. Evaluation order
//! never changes the result set but is preserved so verbose output can
//! explain which filter excluded an item.
//!
//! Unknown or missing attributes referenced by a filter are treated as
//! non-matching (the item is excluded), never as an error, so partially
//! populated records degrade gracefully instead of crashing a bulk
//! operation.

use crate::model::ListItem;
use chrono::{Duration, Utc};
use serde_json::Value;

type Predicate = Box<dyn Fn(&ListItem) -> bool + Send + Sync>;

/// A named pure predicate over a list item.
pub struct Filter {
    name: String,
    predicate: Predicate,
}

impl Filter {
    pub fn new(
        name: impl Into<String>,
        predicate: impl Fn(&ListItem) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, item: &ListItem) -> bool {
        (self.predicate)(item)
    }

    /// Items first seen more than `days` days ago. Items without a
    /// creation timestamp are excluded.
    pub fn older_than_days(days: u32) -> Self {
        Self::new(format!("age > {} days", days), move |item| {
            match item.created_at {
                Some(created) => Utc::now() - created > Duration::days(i64::from(days)),
                None => false,
            }
        })
    }

    /// Items whose `registry` attribute equals `name`.
    pub fn registry(name: &str) -> Self {
        let wanted = name.to_string();
        Self::new(format!("registry == {}", name), move |item| {
            item.attr_str("registry") == Some(wanted.as_str())
        })
    }

    /// Items belonging to an application scope: either a `scope` string
    /// attribute equal to `name` or a `scopes` array containing it.
    pub fn scope(name: &str) -> Self {
        let wanted = name.to_string();
        Self::new(format!("scope == {}", name), move |item| {
            if item.attr_str("scope") == Some(wanted.as_str()) {
                return true;
            }
            match item.attr("scopes").and_then(Value::as_array) {
                Some(scopes) => scopes
                    .iter()
                    .any(|s| s.as_str() == Some(wanted.as_str())),
                None => false,
            }
        })
    }

    /// Items explicitly reporting no running workloads. An absent
    /// `has_workloads` attribute excludes the item; deleting an image we
    /// cannot prove idle is worse than skipping it.
    pub fn without_workloads() -> Self {
        Self::new("has_workloads == false", |item| {
            item.attr_bool("has_workloads") == Some(false)
        })
    }

    /// Items whose reported `coverage` list is empty: assets with no
    /// protective agents or scanners applied. Absent attribute excludes.
    pub fn lacks_coverage() -> Self {
        Self::new("coverage is empty", |item| {
            match item.attr("coverage") {
                Some(Value::Array(entries)) => entries.is_empty(),
                Some(Value::String(s)) => s.is_empty(),
                _ => false,
            }
        })
    }

    /// Items whose numeric `risk` attribute is at most `max`.
    pub fn max_risk(max: u64) -> Self {
        Self::new(format!("risk <= {}", max), move |item| {
            item.attr_u64("risk").map(|r| r <= max).unwrap_or(false)
        })
    }

    /// Items with an attribute exactly equal to a JSON value.
    pub fn attr_equals(key: &str, value: Value) -> Self {
        let key = key.to_string();
        let name = format!("{} == {}", key, value);
        Self::new(name, move |item| item.attr(&key) == Some(&value))
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter").field("name", &self.name).finish()
    }
}

/// Ordered AND-chain of filters.
#[derive(Debug, Default)]
pub struct FilterPipeline {
    filters: Vec<Filter>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn push(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// True when every filter matches. An empty pipeline matches
    /// everything.
    pub fn matches(&self, item: &ListItem) -> bool {
        self.filters.iter().all(|f| f.matches(item))
    }

    /// Name of the first filter (in insertion order) that rejects the
    /// item, for verbose exclusion output. `None` when the item matches.
    pub fn explain(&self, item: &ListItem) -> Option<&str> {
        self.filters
            .iter()
            .find(|f| !f.matches(item))
            .map(Filter::name)
    }

    /// Apply the pipeline to a fetched sequence, preserving order.
    pub fn apply(&self, items: Vec<ListItem>) -> Vec<ListItem> {
        items.into_iter().filter(|i| self.matches(i)).collect()
    }
}
