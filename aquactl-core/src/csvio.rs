//! CSV ingestion for file-based bulk operations.
//!
//! The image cleanup utility accepts a CSV export instead of draining the
//! inventory API. Expected columns: `image_id,image_name,registry_id,created`
//! where `image_name` is `repository:tag`. Malformed rows are skipped and
//! counted, never fatal to the whole file.

use crate::model::{ItemId, ListItem};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Error type for CSV ingestion. Row-level problems are not errors; they
/// are counted in [`CsvImport::skipped`].
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("file not found: {path}")]
    NotFound { path: String },

    #[error("failed to read CSV: {0}")]
    Read(#[from] csv::Error),
}

/// Result of ingesting a CSV file.
#[derive(Debug)]
pub struct CsvImport {
    pub items: Vec<ListItem>,
    /// Rows skipped because they were malformed (missing or non-integer
    /// id, unparsable record).
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct ImageRow {
    image_id: String,
    #[serde(default)]
    image_name: String,
    #[serde(default)]
    registry_id: String,
    #[serde(default)]
    created: String,
}

/// Read image rows from a CSV file into list items.
pub fn read_image_rows(path: &Path) -> Result<CsvImport, CsvError> {
    if !path.exists() {
        return Err(CsvError::NotFound {
            path: path.display().to_string(),
        });
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut items = Vec::new();
    let mut skipped = 0usize;

    for (row_number, record) in reader.deserialize::<ImageRow>().enumerate() {
        let row = match record {
            Ok(row) => row,
            Err(err) => {
                debug!(row = row_number + 2, error = %err, "skipping unparsable CSV row");
                skipped += 1;
                continue;
            }
        };

        // The delete endpoint expects int64 ids.
        let image_id: i64 = match row.image_id.trim().parse() {
            Ok(id) => id,
            Err(_) => {
                debug!(
                    row = row_number + 2,
                    image_id = %row.image_id,
                    "skipping row with missing or non-integer image_id"
                );
                skipped += 1;
                continue;
            }
        };

        let (repository, tag) = match row.image_name.rsplit_once(':') {
            Some((repo, tag)) => (repo.to_string(), tag.to_string()),
            None => (row.image_name.clone(), String::new()),
        };

        let mut item = ListItem::new(ItemId::Int(image_id))
            .with_attr("name", Value::String(row.image_name.clone()))
            .with_attr("registry", Value::String(row.registry_id.clone()))
            .with_attr("repository", Value::String(repository))
            .with_attr("tag", Value::String(tag));

        if let Ok(created) = DateTime::parse_from_rfc3339(row.created.trim()) {
            item = item.with_created_at(created.with_timezone(&Utc));
        }

        items.push(item);
    }

    Ok(CsvImport { items, skipped })
}
