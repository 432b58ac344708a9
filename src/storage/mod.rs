//! Dedup store for publish records.
//!
//! Keeps an append-only table of `(hobby_id, info_type)` pairs that have been
//! posted, and answers whether a pair was posted inside the trailing window.
//!
//! ## File Layout
//!
//! ```text
//! data/
//! └── published_records.jsonl   # one PublishRecord per line, append-only
//! ```

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::Result;

// Re-export for convenience
pub use local::LocalStorage;

/// Trailing span during which a published pair suppresses republishing.
pub const DEDUP_WINDOW_DAYS: i64 = 7;

/// Earliest publish timestamp (epoch seconds) still inside the window at `now`.
///
/// The bound is inclusive: a record stamped exactly at this second counts.
pub fn window_start(now: DateTime<Utc>) -> i64 {
    (now - Duration::days(DEDUP_WINDOW_DAYS)).timestamp()
}

/// Trait for dedup store backends.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Whether `(id, subtype_label)` was published within the window ending at `now`.
    async fn was_published_since(
        &self,
        id: u64,
        subtype_label: &str,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Append a record for `(id, subtype_label)` stamped with `at`.
    ///
    /// Existing rows are never touched, even identical ones.
    async fn record_publish_at(
        &mut self,
        id: u64,
        subtype_label: &str,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Whether `(id, subtype_label)` was published within the last seven days.
    async fn was_recently_published(&self, id: u64, subtype_label: &str) -> Result<bool> {
        self.was_published_since(id, subtype_label, Utc::now()).await
    }

    /// Append a record for `(id, subtype_label)` stamped now.
    async fn record_publish(&mut self, id: u64, subtype_label: &str) -> Result<()> {
        self.record_publish_at(id, subtype_label, Utc::now()).await
    }
}
