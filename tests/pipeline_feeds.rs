// tests/pipeline_feeds.rs
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};

use signal_digest::config::DigestConfig;
use signal_digest::ingest::providers::rss::RssFeedProvider;
use signal_digest::seen::HashStore;
use signal_digest::select::RankedItem;
use signal_digest::synth::{Digest, SourceLink, SynthesisConfig, Synthesizer};
use signal_digest::{FeedsPipeline, SourceProvider};

struct BriefingSynth {
    fail: bool,
    calls: AtomicUsize,
}

impl BriefingSynth {
    fn new(fail: bool) -> Self {
        Self {
            fail,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Synthesizer for BriefingSynth {
    async fn generate(&self, items: &[RankedItem], _config: &SynthesisConfig) -> Result<Digest> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("502 from synthesis endpoint");
        }
        Ok(Digest {
            text: items
                .iter()
                .map(|r| r.item.title.as_str())
                .collect::<Vec<_>>()
                .join(" / "),
            references: items
                .iter()
                .map(|r| SourceLink {
                    title: r.item.title.clone(),
                    url: r.item.url_or_empty().to_string(),
                })
                .collect(),
        })
    }

    fn name(&self) -> &str {
        "briefing"
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 14, 12, 0, 0).unwrap()
}

fn providers() -> Vec<Box<dyn SourceProvider>> {
    let xml = std::fs::read_to_string("tests/fixtures/feed_rss.xml").expect("fixture");
    vec![Box::new(RssFeedProvider::from_fixture(
        "Paddock News",
        "en",
        &xml,
    ))]
}

#[tokio::test]
async fn briefs_recent_unseen_items_once() {
    let store = HashStore::open_in_memory().await.unwrap();
    let synth = BriefingSynth::new(false);
    let p = FeedsPipeline::from_config(&DigestConfig::default());

    let out = p.run(&providers(), &store, &synth, now()).await.unwrap();
    assert_eq!(out.fetched, 3);
    // last week's review is outside the lookback; the undated rumour is kept
    assert_eq!(out.selected, 2);
    assert_eq!(
        out.digest.text,
        "Leclerc tops second practice / Undated paddock rumour"
    );
    assert_eq!(out.digest.references.len(), 2);
    assert_eq!(store.count().await.unwrap(), 2);

    let again = p.run(&providers(), &store, &synth, now()).await.unwrap();
    assert_eq!(again.selected, 0);
    assert!(again.digest.is_empty());
    assert_eq!(synth.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn synthesis_failure_is_an_empty_briefing_but_items_stay_seen() {
    let store = HashStore::open_in_memory().await.unwrap();
    let synth = BriefingSynth::new(true);
    let p = FeedsPipeline::from_config(&DigestConfig::default());

    let out = p.run(&providers(), &store, &synth, now()).await.unwrap();
    assert!(out.digest.is_empty());
    assert_eq!(out.selected, 2);
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn collect_unseen_respects_lookback_window() {
    let store = HashStore::open_in_memory().await.unwrap();
    let mut cfg = DigestConfig::default();
    cfg.feeds.lookback_hours = 24 * 10;
    let p = FeedsPipeline::from_config(&cfg);

    let (fetched, unseen) = p.collect_unseen(&providers(), &store, now()).await.unwrap();
    assert_eq!(fetched, 3);
    assert_eq!(unseen.len(), 3);
}
