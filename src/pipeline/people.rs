// src/pipeline/people.rs
//! Per-person feed digest against the processed ledger.
//!
//! Each followed person has one or more feeds and an optional lookback of
//! their own. Undated entries are dropped. Ids are the feeds' own entry ids.
//! Items are marked processed only once a non-empty digest came back, so a
//! failed or empty synthesis leaves them eligible for the next run.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge};
use tracing::info;

use super::RunOutcome;
use crate::chunk::{synthesize_chunked, ChunkPolicy};
use crate::config::{DigestConfig, PersonSource};
use crate::ingest::types::{Item, SourceProvider};
use crate::ingest::{dedup_by_id, run_once};
use crate::seen::ProcessedStore;
use crate::select::RankedItem;
use crate::synth::{SynthesisConfig, Synthesizer};

pub const SYSTEM_PROMPT: &str = "You write a daily digest of what a set of AI researchers and \
practitioners published. Group people by the themes they share and show where they agree or \
differ; cover someone on their own only when nobody else touches their topic. Lead with the \
arguments and findings, define jargon inline in a few words, and skip funding, hiring and \
product-launch news. Write in Markdown with short paragraphs. Only use the content provided.";

/// One person's feeds, already built into providers.
pub struct PersonFeeds {
    pub person: PersonSource,
    pub providers: Vec<Box<dyn SourceProvider>>,
}

#[derive(Debug, Clone)]
pub struct PeoplePipeline {
    pub store_path: PathBuf,
    pub lookback: Duration,
    pub chunking: ChunkPolicy,
    pub synthesis: SynthesisConfig,
}

impl PeoplePipeline {
    pub fn from_config(cfg: &DigestConfig) -> Self {
        Self {
            store_path: cfg.paths.people_processed.clone(),
            lookback: Duration::hours(cfg.people.lookback_hours.max(0)),
            chunking: cfg.chunking,
            synthesis: cfg.synthesis.params.clone(),
        }
    }

    pub fn lookback_for(&self, person: &PersonSource) -> Duration {
        person
            .lookback_hours
            .map(|h| Duration::hours(h.max(0)))
            .unwrap_or(self.lookback)
    }

    /// Fetch every person's feeds, keep dated entries inside that person's
    /// window, tag them with the person, and order newest first.
    pub async fn collect(&self, groups: &[PersonFeeds], now: DateTime<Utc>) -> (usize, Vec<Item>) {
        let mut fetched = 0usize;
        let mut all = Vec::new();
        for g in groups {
            let cutoff = now - self.lookback_for(&g.person);
            let items = run_once(&g.providers).await;
            fetched += items.len();
            let mut kept = 0usize;
            for item in items {
                if !item.published_at.is_some_and(|ts| ts >= cutoff) {
                    continue;
                }
                all.push(tag_person(item, &g.person));
                kept += 1;
            }
            info!(person = %g.person.id, kept, "person feeds collected");
        }

        let (mut items, dup) = dedup_by_id(all);
        if dup > 0 {
            info!(dup, "entries shared between people dropped");
        }
        items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        (fetched, items)
    }

    pub async fn run(
        &self,
        groups: &[PersonFeeds],
        synth: &dyn Synthesizer,
        now: DateTime<Utc>,
    ) -> Result<RunOutcome> {
        let mut store = ProcessedStore::load(&self.store_path);

        let (fetched, items) = self.collect(groups, now).await;
        if items.is_empty() {
            info!(fetched, "no recent entries from followed people");
            return Ok(RunOutcome::empty(fetched));
        }
        let fresh = store.filter_unprocessed(items);
        if fresh.is_empty() {
            info!(fetched, "every recent entry already processed");
            return Ok(RunOutcome::empty(fetched));
        }

        let selected: Vec<RankedItem> = fresh.into_iter().map(RankedItem::new).collect();
        counter!("digest_items_selected_total").increment(selected.len() as u64);

        let digest =
            synthesize_chunked(synth, &selected, &self.synthesis, &self.chunking).await?;

        if digest.is_empty() {
            info!(items = selected.len(), "empty digest; entries stay unprocessed");
        } else {
            let ids: Vec<String> = selected.iter().map(|r| r.item.id.clone()).collect();
            store.mark_batch(
                &ids,
                serde_json::json!({ "digest_date": now.to_rfc3339() }),
                now,
            )?;
        }
        info!(
            fetched,
            selected = selected.len(),
            "people pipeline complete"
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

fn tag_person(mut item: Item, person: &PersonSource) -> Item {
    let name = serde_json::Value::from(person.display_name());
    let id = serde_json::Value::from(person.id.as_str());
    match &mut item.payload {
        serde_json::Value::Object(map) => {
            map.insert("person".into(), name);
            map.insert("person_id".into(), id);
        }
        other => {
            *other = serde_json::json!({ "person": name, "person_id": id });
        }
    }
    item
}
