// src/chunk.rs
//! Split an oversized selection into capacity-bounded chunks for the
//! synthesis call and stitch the partial outputs back together in order.

use anyhow::Result;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::select::RankedItem;
use crate::synth::{Digest, SynthesisConfig, Synthesizer};

pub const DEFAULT_CHUNK_CAPACITY: usize = 30;
pub const CHUNK_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkPolicy {
    pub capacity: usize,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CHUNK_CAPACITY,
        }
    }
}

/// Consecutive slices of at most `capacity` items, in input order. A
/// capacity of zero is treated as one.
pub fn chunk<T>(items: &[T], capacity: usize) -> Vec<&[T]> {
    items.chunks(capacity.max(1)).collect()
}

/// Concatenate partial digests in order. Empty parts contribute nothing,
/// neither text nor references.
pub fn merge_digests(parts: impl IntoIterator<Item = Digest>) -> Digest {
    let mut texts: Vec<String> = Vec::new();
    let mut references = Vec::new();
    for part in parts {
        if part.is_empty() {
            continue;
        }
        texts.push(part.text);
        references.extend(part.references);
    }
    Digest {
        text: texts.join(CHUNK_SEPARATOR),
        references,
    }
}

/// One call when the batch fits, otherwise one call per chunk.
///
/// A chunk that errors or returns nothing is skipped. If nothing was
/// produced and at least one chunk errored, the last error is returned.
pub async fn synthesize_chunked(
    synth: &dyn Synthesizer,
    items: &[RankedItem],
    config: &SynthesisConfig,
    policy: &ChunkPolicy,
) -> Result<Digest> {
    if items.is_empty() {
        return Ok(Digest::empty());
    }
    let chunks = chunk(items, policy.capacity);
    if chunks.len() > 1 {
        info!(
            items = items.len(),
            chunks = chunks.len(),
            capacity = policy.capacity,
            "batch exceeds capacity, synthesizing in chunks"
        );
    }

    let mut parts = Vec::with_capacity(chunks.len());
    let mut last_err = None;
    for (idx, part) in chunks.iter().enumerate() {
        match synth.generate(part, config).await {
            Ok(d) if d.is_empty() => {
                warn!(chunk = idx, size = part.len(), "chunk produced no text");
                counter!("digest_chunks_failed_total").increment(1);
            }
            Ok(d) => parts.push(d),
            Err(e) => {
                warn!(chunk = idx, size = part.len(), error = ?e, "chunk synthesis failed");
                counter!("digest_chunks_failed_total").increment(1);
                last_err = Some(e);
            }
        }
    }

    match (parts.is_empty(), last_err) {
        (true, Some(e)) => Err(e),
        _ => Ok(merge_digests(parts)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::SourceLink;

    #[test]
    fn sixty_five_items_make_three_chunks() {
        let v: Vec<u32> = (0..65).collect();
        let sizes: Vec<usize> = chunk(&v, 30).iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![30, 30, 5]);
        assert_eq!(chunk(&v, 30)[2][0], 60);
    }

    #[test]
    fn zero_capacity_is_one() {
        let v = [1, 2];
        assert_eq!(chunk(&v, 0).len(), 2);
    }

    #[test]
    fn merge_skips_empty_parts() {
        let d = |t: &str, u: &str| Digest {
            text: t.into(),
            references: vec![SourceLink {
                title: t.into(),
                url: u.into(),
            }],
        };
        let merged = merge_digests(vec![d("one", "a"), d("", "b"), d("three", "c")]);
        assert_eq!(merged.text, "one\n\nthree");
        let urls: Vec<_> = merged.references.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["a", "c"]);
    }
}
