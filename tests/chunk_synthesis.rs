// tests/chunk_synthesis.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Mutex;

use signal_digest::chunk::{synthesize_chunked, ChunkPolicy};
use signal_digest::select::RankedItem;
use signal_digest::synth::{Digest, SourceLink, SynthesisConfig, Synthesizer};
use signal_digest::Item;

/// Scripted synthesizer: call `n` answers with `script[n]`.
#[derive(Clone, Copy)]
enum Reply {
    Text,
    Empty,
    Fail,
}

struct ScriptedSynth {
    script: Vec<Reply>,
    calls: Mutex<Vec<usize>>,
}

impl ScriptedSynth {
    fn new(script: Vec<Reply>) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn call_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Synthesizer for ScriptedSynth {
    async fn generate(&self, items: &[RankedItem], _config: &SynthesisConfig) -> Result<Digest> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(items.len());
            calls.len() - 1
        };
        match self.script.get(n).copied().unwrap_or(Reply::Text) {
            Reply::Text => Ok(Digest {
                text: format!("part {n}: {}", items[0].item.title),
                references: vec![SourceLink {
                    title: items[0].item.title.clone(),
                    url: format!("https://example.com/{n}"),
                }],
            }),
            Reply::Empty => Ok(Digest::empty()),
            Reply::Fail => Err(anyhow!("upstream 529 on call {n}")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn ranked(n: usize) -> Vec<RankedItem> {
    (0..n)
        .map(|i| {
            RankedItem::new(Item::new(
                None,
                "Paddock News",
                &format!("item {i}"),
                Some(&format!("https://news.example.com/{i}")),
            ))
        })
        .collect()
}

#[tokio::test]
async fn sixty_five_items_go_out_as_30_30_5() {
    let synth = ScriptedSynth::new(vec![]);
    let d = synthesize_chunked(
        &synth,
        &ranked(65),
        &SynthesisConfig::default(),
        &ChunkPolicy::default(),
    )
    .await
    .unwrap();
    assert_eq!(synth.call_sizes(), vec![30, 30, 5]);
    assert_eq!(
        d.text,
        "part 0: item 0\n\npart 1: item 30\n\npart 2: item 60"
    );
    assert_eq!(d.references.len(), 3);
}

#[tokio::test]
async fn batch_within_capacity_is_one_call() {
    let synth = ScriptedSynth::new(vec![]);
    synthesize_chunked(
        &synth,
        &ranked(30),
        &SynthesisConfig::default(),
        &ChunkPolicy::default(),
    )
    .await
    .unwrap();
    assert_eq!(synth.call_sizes(), vec![30]);
}

#[tokio::test]
async fn empty_middle_chunk_keeps_order_of_the_rest() {
    let synth = ScriptedSynth::new(vec![Reply::Text, Reply::Empty, Reply::Text]);
    let d = synthesize_chunked(
        &synth,
        &ranked(65),
        &SynthesisConfig::default(),
        &ChunkPolicy::default(),
    )
    .await
    .unwrap();
    assert_eq!(d.text, "part 0: item 0\n\npart 2: item 60");
    let urls: Vec<_> = d.references.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec!["https://example.com/0", "https://example.com/2"]);
}

#[tokio::test]
async fn failed_chunk_is_skipped_when_others_succeed() {
    let synth = ScriptedSynth::new(vec![Reply::Fail, Reply::Text, Reply::Text]);
    let d = synthesize_chunked(
        &synth,
        &ranked(65),
        &SynthesisConfig::default(),
        &ChunkPolicy::default(),
    )
    .await
    .unwrap();
    assert_eq!(d.text, "part 1: item 30\n\npart 2: item 60");
}

#[tokio::test]
async fn all_chunks_failing_is_an_error() {
    let synth = ScriptedSynth::new(vec![Reply::Fail, Reply::Empty, Reply::Fail]);
    let err = synthesize_chunked(
        &synth,
        &ranked(65),
        &SynthesisConfig::default(),
        &ChunkPolicy::default(),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("call 2"));
}

#[tokio::test]
async fn all_chunks_empty_is_an_empty_digest() {
    let synth = ScriptedSynth::new(vec![Reply::Empty, Reply::Empty]);
    let d = synthesize_chunked(
        &synth,
        &ranked(40),
        &SynthesisConfig::default(),
        &ChunkPolicy::default(),
    )
    .await
    .unwrap();
    assert!(d.is_empty());
}

#[tokio::test]
async fn no_items_means_no_call() {
    let synth = ScriptedSynth::new(vec![]);
    let d = synthesize_chunked(
        &synth,
        &[],
        &SynthesisConfig::default(),
        &ChunkPolicy::default(),
    )
    .await
    .unwrap();
    assert!(d.is_empty());
    assert!(synth.call_sizes().is_empty());
}
