// src/pipeline/hn.rs
//! Front-page digest against the metadata seen-set.
//!
//! load store -> fetch -> classify -> select -> enrich -> synthesize ->
//! record selected -> save. The store is only written after synthesis
//! succeeded, so a failed run leaves it exactly as it was.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use tracing::{debug, info};

use super::RunOutcome;
use crate::chunk::{synthesize_chunked, ChunkPolicy};
use crate::config::DigestConfig;
use crate::freshness::{classify, Classification, FreshnessPolicy, UpdatePolicy};
use crate::ingest::dedup_by_id;
use crate::ingest::types::SourceProvider;
use crate::seen::MetadataStore;
use crate::select::{select, SelectionPolicy};
use crate::synth::{SynthesisConfig, Synthesizer};

#[derive(Debug, Clone)]
pub struct HnPipeline {
    pub store_path: PathBuf,
    pub retention: chrono::Duration,
    pub freshness: FreshnessPolicy,
    pub update: UpdatePolicy,
    pub selection: SelectionPolicy,
    pub chunking: ChunkPolicy,
    pub synthesis: SynthesisConfig,
}

impl HnPipeline {
    pub fn from_config(cfg: &DigestConfig) -> Self {
        Self {
            store_path: cfg.paths.hn_seen.clone(),
            retention: cfg.seen.retention(),
            freshness: cfg.freshness,
            update: cfg.update,
            selection: cfg.selection,
            chunking: cfg.chunking,
            synthesis: cfg.synthesis.params.clone(),
        }
    }

    pub async fn run(
        &self,
        provider: &dyn SourceProvider,
        synth: &dyn Synthesizer,
        now: DateTime<Utc>,
    ) -> Result<RunOutcome> {
        crate::ingest::ensure_metrics_described();
        let mut store = MetadataStore::load(&self.store_path, self.retention);
        info!(path = %self.store_path.display(), known = store.len(), "seen store loaded");

        let fetched = provider
            .fetch_latest()
            .await
            .with_context(|| format!("fetching {}", provider.name()))?;
        let (items, dup) = dedup_by_id(fetched);
        counter!("digest_items_fetched_total").increment(items.len() as u64);
        counter!("digest_items_duplicate_total").increment(dup as u64);
        let fetched = items.len();

        let mut new_items = Vec::new();
        let mut updates = Vec::new();
        for item in items {
            match classify(&item, now, store.get(&item.id), &self.freshness, &self.update) {
                Classification::New => new_items.push(item),
                Classification::Update => {
                    debug!(id = %item.id, comments = item.engagement.comments(), "resurfacing as update");
                    updates.push(item);
                }
                Classification::Drop => {}
            }
        }

        let batch = select(new_items, updates, &self.selection);
        if batch.is_empty() {
            info!(fetched, "nothing new or updated");
            return Ok(RunOutcome::empty(fetched));
        }
        let updates = batch.update_count();
        counter!("digest_items_selected_total").increment(batch.len() as u64);
        counter!("digest_items_update_total").increment(updates as u64);

        let mut selected = Vec::with_capacity(batch.len());
        for mut ranked in batch.into_items() {
            ranked.item = provider.enrich(ranked.item).await;
            selected.push(ranked);
        }

        let digest = synthesize_chunked(synth, &selected, &self.synthesis, &self.chunking)
            .await
            .context("synthesizing hn digest")?;

        for ranked in &selected {
            store.record(&ranked.item.id, ranked.item.engagement.comments(), now);
        }
        let report = store.save(now)?;
        info!(
            fetched,
            selected = selected.len(),
            updates,
            kept = report.kept,
            pruned = report.pruned,
            "hn pipeline complete"
        );
        gauge!("digest_pipeline_last_run_ts").set(now.timestamp() as f64);

        Ok(RunOutcome {
            digest,
            fetched,
            selected: selected.len(),
            updates,
        })
    }
}
