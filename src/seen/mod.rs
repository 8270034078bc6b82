// src/seen/mod.rs
//! Seen-set persistence carried between runs.
//!
//! Three flavours:
//! - [`metadata::MetadataStore`]: JSON file, `id -> {first_seen, engagement_snapshot}`,
//!   pruned by age on every save. Used where update detection needs the snapshot.
//! - [`hash::HashStore`]: SQLite table keyed by content hash, insert-if-absent,
//!   unbounded retention. Used where only existence matters.
//! - [`processed::ProcessedStore`]: JSON ledger of ids whose digest was
//!   produced. Written after synthesis, never pruned.

pub mod hash;
pub mod metadata;
pub mod processed;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use hash::{HashRecord, HashStore};
pub use metadata::{MetadataStore, SaveReport};
pub use processed::ProcessedStore;

/// Metadata record: "item X was first processed at `first_seen` with this much engagement".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRecord {
    /// ISO-8601 as written. Kept as text so one bad value never poisons the file.
    #[serde(default)]
    pub first_seen: String,
    /// Older files wrote this as `num_comments`.
    #[serde(default, alias = "num_comments")]
    pub engagement_snapshot: u64,
}

impl SeenRecord {
    pub fn new(first_seen: DateTime<Utc>, engagement_snapshot: u64) -> Self {
        Self {
            first_seen: first_seen.to_rfc3339(),
            engagement_snapshot,
        }
    }

    /// `None` when the stored value does not parse.
    pub fn first_seen_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(self.first_seen.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}
