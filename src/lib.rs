// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod chunk;
pub mod config;
pub mod executor;
pub mod freshness;
pub mod identity;
pub mod ingest;
pub mod metrics;
pub mod persist;
pub mod pipeline;
pub mod publish;
pub mod seen;
pub mod select;
pub mod synth;

// ---- Re-exports for stable public API ----
pub use crate::config::DigestConfig;
pub use crate::ingest::types::{Engagement, Item, SourceProvider};
pub use crate::pipeline::{FeedsPipeline, HnPipeline, PeoplePipeline, RunOutcome};
pub use crate::synth::{Digest, Synthesizer};
