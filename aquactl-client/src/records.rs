//! Conversion of raw API response objects into generic list items.

use aquactl_core::{ItemId, ListItem};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

/// Convert one response object into a [`ListItem`].
///
/// `id_keys` are probed in order for the identity (string or int64);
/// `created_keys` likewise for the creation timestamp. Returns `None`
/// when no identity can be found, matching the original utilities which
/// skip records without an id rather than failing the run.
pub fn record_to_item(value: &Value, id_keys: &[&str], created_keys: &[&str]) -> Option<ListItem> {
    let object = value.as_object()?;

    let identity = id_keys.iter().find_map(|key| match object.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(ItemId::Str(s.clone())),
        Some(Value::Number(n)) => n.as_i64().map(ItemId::Int),
        _ => None,
    });

    let Some(identity) = identity else {
        debug!(record = %value, "skipping record without an identity");
        return None;
    };

    let created_at = created_keys.iter().find_map(|key| {
        object
            .get(*key)
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
    });

    let mut item = ListItem::from_object(identity, object.clone());
    item.created_at = created_at;
    Some(item)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Truthiness of a "next page" style marker: absent, null, zero and empty
/// string all mean "no next page".
pub fn marker_present(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Number(n)) => n.as_u64().map(|v| v > 0).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Bool(b)) => *b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn probes_identity_keys_in_order() {
        let record = json!({"image_uid": "uid-1", "id": 42});
        let item = record_to_item(&record, &["image_uid", "id"], &[]).unwrap();
        assert_eq!(item.identity, ItemId::Str("uid-1".to_string()));

        let record = json!({"id": 42});
        let item = record_to_item(&record, &["image_uid", "id"], &[]).unwrap();
        assert_eq!(item.identity, ItemId::Int(42));
    }

    #[test]
    fn record_without_identity_is_skipped() {
        let record = json!({"name": "orphan"});
        assert!(record_to_item(&record, &["id"], &[]).is_none());
    }

    #[test]
    fn parses_creation_timestamp() {
        let record = json!({"id": 1, "created": "2024-01-15T10:00:00Z"});
        let item = record_to_item(&record, &["id"], &["created"]).unwrap();
        assert!(item.created_at.is_some());

        let record = json!({"id": 1, "created": "yesterday"});
        let item = record_to_item(&record, &["id"], &["created"]).unwrap();
        assert!(item.created_at.is_none());
    }

    #[test]
    fn attributes_keep_the_full_object() {
        let record = json!({"id": 1, "registry": "Hub", "has_workloads": false});
        let item = record_to_item(&record, &["id"], &[]).unwrap();
        assert_eq!(item.attr_str("registry"), Some("Hub"));
        assert_eq!(item.attr_bool("has_workloads"), Some(false));
    }

    #[test]
    fn marker_truthiness() {
        assert!(marker_present(Some(&json!(2))));
        assert!(marker_present(Some(&json!("cursor-abc"))));
        assert!(!marker_present(Some(&json!(0))));
        assert!(!marker_present(Some(&json!(""))));
        assert!(!marker_present(Some(&json!(null))));
        assert!(!marker_present(None));
    }
}
