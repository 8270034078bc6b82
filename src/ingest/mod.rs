// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::{Item, SourceProvider};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

/// One-time metrics registration (so series show up in the exported snapshot).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "digest_items_fetched_total",
            "Items parsed from providers."
        );
        describe_counter!(
            "digest_items_duplicate_total",
            "Items dropped because the same id appeared earlier in the batch."
        );
        describe_counter!(
            "digest_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_counter!(
            "digest_items_selected_total",
            "Items handed to synthesis."
        );
        describe_counter!(
            "digest_items_update_total",
            "Previously seen items resurfaced as updates."
        );
        describe_counter!(
            "digest_chunks_failed_total",
            "Synthesis chunks that errored or returned nothing."
        );
        describe_counter!(
            "digest_exec_attempts_total",
            "External command attempts made by the retrying executor."
        );
        describe_histogram!("digest_parse_ms", "Provider parse time in milliseconds.");
        describe_gauge!(
            "digest_pipeline_last_run_ts",
            "Unix ts when a pipeline last completed."
        );
    });
}

/// Normalize text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Drop items whose id already appeared earlier in the batch (first wins).
/// Returns (kept, dropped_count).
pub fn dedup_by_id(items: Vec<Item>) -> (Vec<Item>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut keep = Vec::with_capacity(items.len());
    let mut dropped = 0usize;
    for it in items {
        if !seen.insert(it.id.clone()) {
            dropped += 1;
            continue;
        }
        keep.push(it);
    }
    (keep, dropped)
}

/// Fetch every provider once. A failing provider is logged and skipped; it
/// never aborts the run.
pub async fn run_once(providers: &[Box<dyn SourceProvider>]) -> Vec<Item> {
    ensure_metrics_described();

    let mut raw = Vec::new();
    for p in providers {
        match p.fetch_latest().await {
            Ok(mut v) => {
                tracing::info!(provider = p.name(), fetched = v.len(), "provider fetched");
                raw.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(error = ?e, provider = p.name(), "provider error");
                counter!("digest_provider_errors_total").increment(1);
            }
        }
    }

    let (kept, dup) = dedup_by_id(raw);
    counter!("digest_items_fetched_total").increment(kept.len() as u64);
    counter!("digest_items_duplicate_total").increment(dup as u64);
    kept
}
