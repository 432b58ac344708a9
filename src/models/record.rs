//! Publish record data structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable evidence that an `(id, subtype_label)` pair was published.
///
/// Field names on disk keep the `hobby_id`/`info_type` wording of the
/// hpoi.net markup so the table stays readable next to the site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PublishRecord {
    #[serde(rename = "hobby_id")]
    pub id: u64,

    #[serde(rename = "info_type")]
    pub subtype_label: String,

    /// Calendar date (UTC) of the publish, `YYYY-MM-DD`
    pub publish_date: String,

    /// Epoch seconds of the publish
    pub publish_timestamp: i64,
}

impl PublishRecord {
    /// Create a record stamped with the given instant.
    pub fn new(id: u64, subtype_label: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id,
            subtype_label: subtype_label.into(),
            publish_date: at.format("%Y-%m-%d").to_string(),
            publish_timestamp: at.timestamp(),
        }
    }

    /// Whether this record is for the given dedup key.
    pub fn matches(&self, id: u64, subtype_label: &str) -> bool {
        self.id == id && self.subtype_label == subtype_label
    }
}
