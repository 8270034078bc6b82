// src/seen/metadata.rs
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::SeenRecord;
use crate::persist::write_atomic;

pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Outcome of a save: how many records were written and how many aged out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    pub kept: usize,
    pub pruned: usize,
}

/// TTL-pruned seen-set backed by one pretty-printed JSON object.
#[derive(Debug)]
pub struct MetadataStore {
    path: PathBuf,
    retention: Duration,
    records: BTreeMap<String, SeenRecord>,
}

impl MetadataStore {
    /// Load the store. Missing file is an empty store; a corrupt file is logged
    /// and also treated as empty.
    pub fn load(path: impl Into<PathBuf>, retention: Duration) -> Self {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str::<BTreeMap<String, SeenRecord>>(&s) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "seen store corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "seen store unreadable, starting empty");
                BTreeMap::new()
            }
        };
        Self {
            path,
            retention,
            records,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_seen(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&SeenRecord> {
        self.records.get(id)
    }

    pub fn records(&self) -> &BTreeMap<String, SeenRecord> {
        &self.records
    }

    /// Insert or refresh the engagement snapshot, keeping the original `first_seen`.
    pub fn record(&mut self, id: &str, engagement: u64, now: DateTime<Utc>) {
        let first_seen = self
            .records
            .get(id)
            .map(|r| r.first_seen.clone())
            .unwrap_or_else(|| now.to_rfc3339());
        self.records.insert(
            id.to_string(),
            SeenRecord {
                first_seen,
                engagement_snapshot: engagement,
            },
        );
    }

    /// Prune records older than the retention window, then rewrite the file
    /// through a temp file + rename.
    pub fn save(&mut self, now: DateTime<Utc>) -> Result<SaveReport> {
        let cutoff = now - self.retention;
        let before = self.records.len();
        prune(&mut self.records, cutoff);
        let report = SaveReport {
            kept: self.records.len(),
            pruned: before - self.records.len(),
        };

        let json = serde_json::to_string_pretty(&self.records).context("serializing seen store")?;
        write_atomic(&self.path, json.as_bytes())
            .with_context(|| format!("writing seen store {}", self.path.display()))?;

        info!(
            path = %self.path.display(),
            kept = report.kept,
            pruned = report.pruned,
            "seen store saved"
        );
        Ok(report)
    }
}

/// Drop records whose `first_seen` is at or before `cutoff`. Records whose
/// timestamp does not parse are kept.
pub fn prune(records: &mut BTreeMap<String, SeenRecord>, cutoff: DateTime<Utc>) {
    records.retain(|_, rec| match rec.first_seen_at() {
        Some(ts) => ts > cutoff,
        None => true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_preserves_first_seen() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MetadataStore::load(dir.path().join("seen.json"), Duration::days(7));
        let t0 = Utc::now() - Duration::hours(5);
        store.record("42", 10, t0);
        store.record("42", 25, Utc::now());
        let rec = store.get("42").unwrap();
        assert_eq!(rec.first_seen, t0.to_rfc3339());
        assert_eq!(rec.engagement_snapshot, 25);
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("seen.json");
        let mut store = MetadataStore::load(&path, Duration::days(7));
        store.record("a", 1, Utc::now());
        store.save(Utc::now()).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
