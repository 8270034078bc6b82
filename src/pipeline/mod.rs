// src/pipeline/mod.rs
//! End-to-end runs: fetch, filter against a seen-set, select, synthesize.

pub mod feeds;
pub mod hn;
pub mod people;

use std::fmt::Write as _;

use crate::synth::Digest;

pub use feeds::FeedsPipeline;
pub use hn::HnPipeline;
pub use people::{PeoplePipeline, PersonFeeds};

/// What a pipeline run produced, plus counts for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub digest: Digest,
    pub fetched: usize,
    pub selected: usize,
    pub updates: usize,
}

impl RunOutcome {
    pub fn empty(fetched: usize) -> Self {
        Self {
            fetched,
            ..Self::default()
        }
    }
}

/// One Markdown section: heading, digest text, then a sources list when the
/// digest carries references. Empty digests render to an empty string.
pub fn render_section(heading: &str, digest: &Digest) -> String {
    if digest.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    let _ = writeln!(out, "## {heading}\n");
    let _ = writeln!(out, "{}", digest.text.trim());
    let refs: Vec<_> = digest
        .references
        .iter()
        .filter(|r| !r.url.trim().is_empty())
        .collect();
    if !refs.is_empty() {
        let _ = writeln!(out, "\n### Sources\n");
        for r in refs {
            let title = if r.title.trim().is_empty() {
                r.url.as_str()
            } else {
                r.title.trim()
            };
            let _ = writeln!(out, "- [{}]({})", title, r.url.trim());
        }
    }
    out
}
