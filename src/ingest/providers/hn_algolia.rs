// src/ingest/providers/hn_algolia.rs
//! Hacker News front page via the Algolia search API.
//!
//! Stories keep their `objectID` as natural id. `created_at` that does not
//! parse is treated as absent, which the freshness test accepts (fail open).

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use serde::Deserialize;

use crate::ingest::types::{Engagement, Item, SourceProvider};

pub const FRONT_PAGE_URL: &str =
    "https://hn.algolia.com/api/v1/search_by_date?tags=front_page&hitsPerPage=60";
pub const ITEM_URL_PREFIX: &str = "https://hn.algolia.com/api/v1/items/";
pub const SOURCE_NAME: &str = "Hacker News";

const COMMENTS_PER_STORY: usize = 15;
const COMMENT_TEXT_MAX_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
struct FrontPage {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "objectID")]
    object_id: String,
    title: Option<String>,
    url: Option<String>,
    points: Option<u64>,
    num_comments: Option<u64>,
    author: Option<String>,
    created_at: Option<String>,
}

/// Node of the `items/{id}` comment tree.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentNode {
    pub author: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub children: Vec<CommentNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub text: String,
}

/// Breadth-first walk of the comment tree, keeping the first `limit` comments
/// that have both an author and text.
pub fn extract_comments(children: &[CommentNode], limit: usize) -> Vec<Comment> {
    let mut out = Vec::new();
    let mut queue: VecDeque<&CommentNode> = children.iter().collect();
    while let Some(node) = queue.pop_front() {
        if out.len() >= limit {
            break;
        }
        if let (Some(author), Some(text)) = (node.author.as_deref(), node.text.as_deref()) {
            if !author.is_empty() && !text.is_empty() {
                out.push(Comment {
                    author: author.to_string(),
                    text: text.chars().take(COMMENT_TEXT_MAX_CHARS).collect(),
                });
            }
        }
        queue.extend(node.children.iter());
    }
    out
}

fn parse_created_at(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an Algolia front-page response body into items.
pub fn parse_front_page(body: &str) -> Result<Vec<Item>> {
    let t0 = std::time::Instant::now();
    let page: FrontPage = serde_json::from_str(body).context("parsing hn front page json")?;

    let mut out = Vec::with_capacity(page.hits.len());
    for hit in page.hits {
        if hit.object_id.trim().is_empty() {
            continue;
        }
        let title = hit.title.as_deref().unwrap_or_default();
        let mut item = Item::new(Some(&hit.object_id), SOURCE_NAME, title, hit.url.as_deref())
            .with_engagement(Engagement {
                points: hit.points,
                comments: hit.num_comments,
            })
            .with_payload(serde_json::json!({
                "author": hit.author.unwrap_or_default(),
                "created_at": hit.created_at.clone().unwrap_or_default(),
            }));
        if let Some(ts) = parse_created_at(hit.created_at.as_deref()) {
            item = item.with_published_at(ts);
        }
        out.push(item);
    }

    histogram!("digest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(out)
}

enum Mode {
    Fixture {
        front_page: String,
        comments: Option<String>,
    },
    Http {
        client: reqwest::Client,
    },
}

pub struct HnAlgoliaProvider {
    mode: Mode,
}

impl HnAlgoliaProvider {
    /// `comments`: optional `items/{id}` body returned for every enrich call.
    pub fn from_fixture(front_page: &str, comments: Option<&str>) -> Self {
        Self {
            mode: Mode::Fixture {
                front_page: front_page.to_string(),
                comments: comments.map(str::to_string),
            },
        }
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http { client },
        }
    }

    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("signal-digest/0.1 (digest bot)")
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building hn http client")?;
        Ok(Self::from_client(client))
    }

    fn comments_from_body(body: &str) -> Result<Vec<Comment>> {
        #[derive(Deserialize)]
        struct ItemTree {
            #[serde(default)]
            children: Vec<CommentNode>,
        }
        let tree: ItemTree = serde_json::from_str(body).context("parsing hn item json")?;
        Ok(extract_comments(&tree.children, COMMENTS_PER_STORY))
    }

    async fn fetch_comments(&self, story_id: &str) -> Result<Vec<Comment>> {
        match &self.mode {
            Mode::Fixture { comments, .. } => match comments {
                Some(body) => Self::comments_from_body(body),
                None => Ok(Vec::new()),
            },
            Mode::Http { client } => {
                let url = format!("{ITEM_URL_PREFIX}{story_id}");
                let body = client
                    .get(&url)
                    .send()
                    .await
                    .context("hn item get()")?
                    .error_for_status()
                    .context("hn item status")?
                    .text()
                    .await
                    .context("hn item .text()")?;
                Self::comments_from_body(&body)
            }
        }
    }
}

#[async_trait]
impl SourceProvider for HnAlgoliaProvider {
    async fn fetch_latest(&self) -> Result<Vec<Item>> {
        match &self.mode {
            Mode::Fixture { front_page, .. } => parse_front_page(front_page),
            Mode::Http { client } => {
                let body = client
                    .get(FRONT_PAGE_URL)
                    .send()
                    .await
                    .context("hn front page get()")?
                    .error_for_status()
                    .context("hn front page status")?
                    .text()
                    .await
                    .context("hn front page .text()")?;
                parse_front_page(&body)
            }
        }
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn enrich(&self, mut item: Item) -> Item {
        let comments = match self.fetch_comments(&item.id).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = ?e, story = %item.id, "failed to fetch comments");
                Vec::new()
            }
        };
        if let serde_json::Value::Object(map) = &mut item.payload {
            map.insert(
                "comments".to_string(),
                serde_json::to_value(&comments).unwrap_or_default(),
            );
        } else {
            item.payload = serde_json::json!({ "comments": comments });
        }
        item
    }
}
