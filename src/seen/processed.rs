// src/seen/processed.rs
//! Processed-id ledger for digests that are marked only after they succeed.
//!
//! File layout:
//! `{"processed": {id: {"processed_at", "metadata"}}, "metadata": {"created", "last_updated"}}`.
//! Entries never expire.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ingest::types::Item;
use crate::persist::write_atomic;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedEntry {
    pub processed_at: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Ledger {
    #[serde(default)]
    processed: BTreeMap<String, ProcessedEntry>,
    #[serde(default)]
    metadata: LedgerMeta,
}

#[derive(Debug)]
pub struct ProcessedStore {
    path: PathBuf,
    ledger: Ledger,
}

impl ProcessedStore {
    /// Missing or corrupt file is an empty ledger.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ledger = match fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str::<Ledger>(&s).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "processed store corrupt, starting empty");
                Ledger::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ledger::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "processed store unreadable, starting empty");
                Ledger::default()
            }
        };
        Self { path, ledger }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.ledger.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.processed.is_empty()
    }

    pub fn is_processed(&self, id: &str) -> bool {
        self.ledger.processed.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&ProcessedEntry> {
        self.ledger.processed.get(id)
    }

    pub fn meta(&self) -> &LedgerMeta {
        &self.ledger.metadata
    }

    /// Keep items not yet processed, in their original order.
    pub fn filter_unprocessed(&self, items: Vec<Item>) -> Vec<Item> {
        let before = items.len();
        let out: Vec<Item> = items
            .into_iter()
            .filter(|it| !self.is_processed(&it.id))
            .collect();
        info!(before, unprocessed = out.len(), "processed filter");
        out
    }

    /// Mark every id with one shared timestamp and metadata, then persist.
    pub fn mark_batch(
        &mut self,
        ids: &[String],
        metadata: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let ts = now.to_rfc3339();
        for id in ids {
            self.ledger.processed.insert(
                id.clone(),
                ProcessedEntry {
                    processed_at: ts.clone(),
                    metadata: metadata.clone(),
                },
            );
        }
        self.save(now)?;
        info!(marked = ids.len(), total = self.len(), "items marked processed");
        Ok(())
    }

    pub fn save(&mut self, now: DateTime<Utc>) -> Result<()> {
        let ts = now.to_rfc3339();
        if self.ledger.metadata.created.is_none() {
            self.ledger.metadata.created = Some(ts.clone());
        }
        self.ledger.metadata.last_updated = Some(ts);
        let json =
            serde_json::to_string_pretty(&self.ledger).context("serializing processed store")?;
        write_atomic(&self.path, json.as_bytes())
            .with_context(|| format!("writing processed store {}", self.path.display()))
    }
}
