// src/pipeline/feeds.rs
//! Multi-feed briefing against the hash seen-set.
//!
//! Items are keyed by the title+link hash. The seen-set is written before
//! synthesis: an item fetched once is never briefed twice, even when the
//! synthesis call for it failed.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use tracing::{info, warn};

use super::RunOutcome;
use crate::chunk::{synthesize_chunked, ChunkPolicy};
use crate::config::DigestConfig;
use crate::ingest::run_once;
use crate::ingest::types::{Item, SourceProvider};
use crate::seen::{HashRecord, HashStore};
use crate::select::RankedItem;
use crate::synth::{Digest, SynthesisConfig, Synthesizer};

#[derive(Debug, Clone)]
pub struct FeedsPipeline {
    pub lookback: chrono::Duration,
    pub chunking: ChunkPolicy,
    pub synthesis: SynthesisConfig,
}

impl FeedsPipeline {
    pub fn from_config(cfg: &DigestConfig) -> Self {
        Self {
            lookback: chrono::Duration::hours(cfg.feeds.lookback_hours.max(0)),
            chunking: cfg.chunking,
            synthesis: cfg.synthesis.params.clone(),
        }
    }

    /// Undated items are kept; dated ones older than the lookback are dropped.
    pub fn within_lookback(&self, item: &Item, now: DateTime<Utc>) -> bool {
        let cutoff = now - self.lookback;
        item.published_at.map_or(true, |ts| ts >= cutoff)
    }

    /// Fetch, keep recent items, claim unseen hashes. Returns the unseen
    /// items in fetch order.
    pub async fn collect_unseen(
        &self,
        providers: &[Box<dyn SourceProvider>],
        store: &HashStore,
        now: DateTime<Utc>,
    ) -> Result<(usize, Vec<Item>)> {
        let items = run_once(providers).await;
        let fetched = items.len();

        let mut unseen = Vec::new();
        let mut stale = 0usize;
        for item in items {
            if !self.within_lookback(&item, now) {
                stale += 1;
                continue;
            }
            let rec = HashRecord {
                title: item.title.clone(),
                source: item.source.clone(),
                recorded_at: now,
            };
            if store
                .insert(&item.id, &rec)
                .await
                .with_context(|| format!("recording {}", item.id))?
            {
                unseen.push(item);
            }
        }
        info!(fetched, stale, unseen = unseen.len(), "feeds collected");
        Ok((fetched, unseen))
    }

    pub async fn run(
        &self,
        providers: &[Box<dyn SourceProvider>],
        store: &HashStore,
        synth: &dyn Synthesizer,
        now: DateTime<Utc>,
    ) -> Result<RunOutcome> {
        let (fetched, unseen) = self.collect_unseen(providers, store, now).await?;
        if unseen.is_empty() {
            info!(fetched, "no unseen feed items");
            return Ok(RunOutcome::empty(fetched));
        }

        let selected: Vec<RankedItem> = unseen.into_iter().map(RankedItem::new).collect();
        counter!("digest_items_selected_total").increment(selected.len() as u64);

        let digest = match synthesize_chunked(synth, &selected, &self.synthesis, &self.chunking)
            .await
        {
            Ok(d) => d,
            Err(e) => {
                warn!(error = ?e, items = selected.len(), "briefing synthesis failed");
                Digest::empty()
            }
        };
        info!(
            fetched,
            selected = selected.len(),
            references = digest.references.len(),
            "feeds pipeline complete"
        );
        gauge!("digest_pipeline_last_run_ts").set(now.timestamp() as f64);

        Ok(RunOutcome {
            digest,
            fetched,
            selected: selected.len(),
            updates: 0,
        })
    }
}
