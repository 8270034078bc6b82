// src/config.rs
//! Run configuration, loaded from TOML.
//!
//! Lookup order:
//! 1) `$DIGEST_CONFIG_PATH` (must exist)
//! 2) `config/digest.toml`
//! 3) built-in defaults
//!
//! Every threshold, capacity and window is a named field here; components
//! receive their section at construction and hold no hidden constants.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::chunk::ChunkPolicy;
use crate::executor::RetryPolicy;
use crate::freshness::{FreshnessPolicy, UpdatePolicy};
use crate::publish::DeployTarget;
use crate::select::SelectionPolicy;
use crate::synth::{ResponseFormat, SynthesisConfig};

pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/digest.toml";
pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    /// IANA zone whose calendar date names the day's digest.
    pub timezone: String,
    pub synthesis: SynthesisSection,
    pub freshness: FreshnessPolicy,
    pub update: UpdatePolicy,
    pub selection: SelectionPolicy,
    pub seen: SeenSection,
    pub chunking: ChunkPolicy,
    pub retry: RetryPolicy,
    pub deploy: Option<DeployTarget>,
    pub paths: PathsSection,
    pub pipelines: PipelinesSection,
    pub feeds: FeedsSection,
    pub people: PeopleSection,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            synthesis: SynthesisSection::default(),
            freshness: FreshnessPolicy::default(),
            update: UpdatePolicy::default(),
            selection: SelectionPolicy::default(),
            seen: SeenSection::default(),
            chunking: ChunkPolicy::default(),
            retry: RetryPolicy::default(),
            deploy: None,
            paths: PathsSection::default(),
            pipelines: PipelinesSection::default(),
            feeds: FeedsSection::default(),
            people: PeopleSection::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSection {
    #[serde(flatten)]
    pub params: SynthesisConfig,
    /// `"ENV"` (or empty) means: read `ANTHROPIC_API_KEY`.
    pub api_key: String,
}

impl Default for SynthesisSection {
    fn default() -> Self {
        Self {
            params: SynthesisConfig::default(),
            api_key: "ENV".to_string(),
        }
    }
}

impl SynthesisSection {
    pub fn resolve_api_key(&self) -> Result<String> {
        let raw = self.api_key.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("env") {
            return std::env::var(ENV_API_KEY)
                .ok()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| anyhow!("Missing {ENV_API_KEY} env var"));
        }
        Ok(raw.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeenSection {
    pub retention_days: i64,
}

impl Default for SeenSection {
    fn default() -> Self {
        Self {
            retention_days: crate::seen::metadata::DEFAULT_RETENTION_DAYS,
        }
    }
}

impl SeenSection {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days.max(0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub hn_seen: PathBuf,
    pub feeds_seen_db: PathBuf,
    pub people_processed: PathBuf,
    pub output_dir: PathBuf,
    pub metrics_file: Option<PathBuf>,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            hn_seen: PathBuf::from("data/hn_signal_seen.json"),
            feeds_seen_db: PathBuf::from("data/feeds_seen.db"),
            people_processed: PathBuf::from("data/pure_signal_processed.json"),
            output_dir: PathBuf::from("site"),
            metrics_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelinesSection {
    pub hn: bool,
    pub feeds: bool,
    pub people: bool,
}

impl Default for PipelinesSection {
    fn default() -> Self {
        Self {
            hn: true,
            feeds: true,
            people: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    #[serde(default = "default_lang")]
    pub lang: String,
}

fn default_lang() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsSection {
    pub lookback_hours: i64,
    pub format: ResponseFormat,
    pub sources: Vec<FeedSource>,
}

impl Default for FeedsSection {
    fn default() -> Self {
        Self {
            lookback_hours: 24,
            format: ResponseFormat::Briefing,
            sources: Vec::new(),
        }
    }
}

/// One followed person and the feeds they publish to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonSource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Overrides `people.lookback_hours` for this person.
    #[serde(default)]
    pub lookback_hours: Option<i64>,
    #[serde(default)]
    pub feeds: Vec<FeedSource>,
}

impl PersonSource {
    /// Display name, falling back to the config key.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            self.name.trim()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeopleSection {
    pub lookback_hours: i64,
    pub persons: Vec<PersonSource>,
}

impl Default for PeopleSection {
    fn default() -> Self {
        Self {
            lookback_hours: 24,
            persons: Vec::new(),
        }
    }
}

impl DigestConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(s: &str) -> Result<Self> {
        let cfg: DigestConfig = toml::from_str(s)?;
        Ok(cfg.sanitized())
    }

    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        Ok(Self::default())
    }

    /// Repair values that would make a component misbehave.
    fn sanitized(mut self) -> Self {
        if self.freshness.stale_hours < self.freshness.fresh_hours {
            std::mem::swap(&mut self.freshness.fresh_hours, &mut self.freshness.stale_hours);
        }
        if self.chunking.capacity == 0 {
            self.chunking.capacity = ChunkPolicy::default().capacity;
        }
        if self.retry.max_attempts == 0 {
            self.retry.max_attempts = 1;
        }
        if self.update.growth_factor.is_nan() || self.update.growth_factor <= 0.0 {
            self.update.growth_factor = UpdatePolicy::default().growth_factor;
        }
        self.feeds.sources.retain(|s| !s.url.trim().is_empty());
        for person in &mut self.people.persons {
            person.feeds.retain(|s| !s.url.trim().is_empty());
        }
        self.people.persons.retain(|p| !p.feeds.is_empty());
        if self.timezone.trim().parse::<Tz>().is_err() {
            warn!(timezone = %self.timezone, "unknown timezone, using {DEFAULT_TIMEZONE}");
            self.timezone = DEFAULT_TIMEZONE.to_string();
        }
        self
    }

    /// Calendar date of `now` in the configured zone.
    pub fn digest_date(&self, now: DateTime<Utc>) -> NaiveDate {
        let tz: Tz = self.timezone.trim().parse().unwrap_or(chrono_tz::America::New_York);
        now.with_timezone(&tz).date_naive()
    }
}
