// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Source-specific engagement counters. Absent means "source did not report it";
/// every consumer reads through the zero-defaulting accessors.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Engagement {
    pub points: Option<u64>,
    pub comments: Option<u64>,
}

impl Engagement {
    pub fn new(points: u64, comments: u64) -> Self {
        Self {
            points: Some(points),
            comments: Some(comments),
        }
    }

    pub fn points(&self) -> u64 {
        self.points.unwrap_or(0)
    }

    pub fn comments(&self) -> u64 {
        self.comments.unwrap_or(0)
    }
}

/// One discovered unit of content. Immutable once fetched within a run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct Item {
    pub id: String,
    pub source: String, // e.g., "Hacker News", "Ferrari Media"
    pub title: String,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub engagement: Engagement,
    /// Normalized body text, when the source carries one.
    pub summary: Option<String>,
    /// Source-specific attributes carried through unexamined.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Item {
    /// Build an item whose id is derived by [`crate::identity::identify`].
    pub fn new(natural_id: Option<&str>, source: &str, title: &str, url: Option<&str>) -> Self {
        let id = crate::identity::identify(natural_id, title, url.unwrap_or_default());
        Self {
            id,
            source: source.to_string(),
            title: title.to_string(),
            url: url.map(str::to_string),
            published_at: None,
            engagement: Engagement::default(),
            summary: None,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_published_at(mut self, ts: DateTime<Utc>) -> Self {
        self.published_at = Some(ts);
        self
    }

    pub fn with_engagement(mut self, engagement: Engagement) -> Self {
        self.engagement = engagement;
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn url_or_empty(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Item>>;
    fn name(&self) -> &str;

    /// Post-selection enrichment (e.g. discussion comments). Must not fail:
    /// a provider that cannot enrich returns the item unchanged.
    async fn enrich(&self, item: Item) -> Item {
        item
    }
}
