// src/synth/mod.rs
//! Narrative synthesis contract.
//!
//! `generate(items, config) -> Digest`. An empty digest means "nothing to
//! say" and is not an error; transport/auth failures come back as `Err` and
//! are never retried here.

pub mod anthropic;
pub mod briefing;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::select::RankedItem;

pub use anthropic::{AnthropicSynthesizer, ResponseFormat};
pub use briefing::{parse_briefing, Briefing, BriefingParseError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-6".to_string(),
            max_output_tokens: 8000,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLink {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

/// Text produced for a run plus the articles it drew from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    pub text: String,
    #[serde(default)]
    pub references: Vec<SourceLink>,
}

impl Digest {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn generate(&self, items: &[RankedItem], config: &SynthesisConfig) -> Result<Digest>;
    fn name(&self) -> &str;
}
