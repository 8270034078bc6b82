// src/ingest/providers/rss.rs
//! Syndication feed provider. Reads RSS 2.0 (`rss/channel/item`) and Atom
//! (`feed/entry`); the root element decides which.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::{OffsetDateTime, UtcOffset};

use crate::ingest::normalize_text;
use crate::ingest::types::{Item, SourceProvider};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    guid: Option<TextNode>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<String>,
    title: Option<TextNode>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<TextNode>,
    content: Option<TextNode>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Element whose attributes (`type="html"`, `isPermaLink`) are ignored.
#[derive(Debug, Default, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedKind {
    Rss,
    Atom,
}

/// Local name of the document element, skipping the prolog.
fn feed_kind(xml: &str) -> Option<FeedKind> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return match e.local_name().as_ref() {
                    b"rss" => Some(FeedKind::Rss),
                    b"feed" => Some(FeedKind::Atom),
                    _ => None,
                };
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Format-neutral view of one feed entry.
struct RawEntry {
    entry_id: Option<String>,
    title: Option<String>,
    link: Option<String>,
    published_raw: Option<String>,
    published_at: Option<DateTime<Utc>>,
    body: Option<String>,
}

fn to_utc(dt: OffsetDateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(dt.to_offset(UtcOffset::UTC).unix_timestamp(), 0)
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822).ok().and_then(to_utc)
}

fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc3339).ok().and_then(to_utc)
}

fn rss_entries(xml: &str) -> Result<Vec<RawEntry>, quick_xml::DeError> {
    let rss: Rss = from_str(xml)?;
    Ok(rss
        .channel
        .item
        .into_iter()
        .map(|it| RawEntry {
            entry_id: it.guid.map(|g| g.text),
            title: it.title,
            link: it.link,
            published_at: it.pub_date.as_deref().and_then(parse_rfc2822),
            published_raw: it.pub_date,
            body: it.description,
        })
        .collect())
}

fn atom_entries(xml: &str) -> Result<Vec<RawEntry>, quick_xml::DeError> {
    let feed: AtomFeed = from_str(xml)?;
    Ok(feed
        .entry
        .into_iter()
        .map(|e| {
            let link = e
                .link
                .iter()
                .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
                .or_else(|| e.link.first())
                .and_then(|l| l.href.clone());
            let published_raw = e.published.or(e.updated);
            RawEntry {
                entry_id: e.id,
                title: e.title.map(|t| t.text),
                link,
                published_at: published_raw.as_deref().and_then(parse_rfc3339),
                published_raw,
                body: e.content.or(e.summary).map(|t| t.text),
            }
        })
        .collect())
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

/// One syndication feed. By default items are keyed by the title+link hash,
/// so a syndicated copy of a story collapses onto the original. With
/// [`RssFeedProvider::with_entry_ids`] the feed's own `guid`/`id` is used
/// instead, then the link.
pub struct RssFeedProvider {
    name: String,
    lang: String,
    mode: Mode,
    entry_ids: bool,
}

impl RssFeedProvider {
    pub fn from_fixture(name: &str, lang: &str, xml: &str) -> Self {
        Self {
            name: name.to_string(),
            lang: lang.to_string(),
            mode: Mode::Fixture(xml.to_string()),
            entry_ids: false,
        }
    }

    pub fn from_url(name: &str, lang: &str, url: &str, client: reqwest::Client) -> Self {
        Self {
            name: name.to_string(),
            lang: lang.to_string(),
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
            entry_ids: false,
        }
    }

    pub fn with_entry_ids(mut self) -> Self {
        self.entry_ids = true;
        self
    }

    fn parse_items_from_str(&self, s: &str) -> Result<Vec<Item>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let entries = match feed_kind(&xml_clean) {
            Some(FeedKind::Rss) => rss_entries(&xml_clean)
                .with_context(|| format!("parsing rss xml for {}", self.name))?,
            Some(FeedKind::Atom) => atom_entries(&xml_clean)
                .with_context(|| format!("parsing atom xml for {}", self.name))?,
            None => return Err(anyhow!("{}: not an rss or atom document", self.name)),
        };

        let mut out = Vec::with_capacity(entries.len());
        for e in entries {
            let title = e.title.as_deref().map(str::trim).unwrap_or_default();
            if title.is_empty() {
                continue;
            }
            let link = e.link.as_deref().map(str::trim).filter(|l| !l.is_empty());
            let natural_id = if self.entry_ids {
                e.entry_id.as_deref().map(str::trim).filter(|i| !i.is_empty()).or(link)
            } else {
                None
            };

            let mut item = Item::new(natural_id, &self.name, title, link).with_payload(
                serde_json::json!({ "lang": self.lang, "published": e.published_raw }),
            );
            if let Some(ts) = e.published_at {
                item = item.with_published_at(ts);
            }
            let summary = e.body.as_deref().map(normalize_text).unwrap_or_default();
            if !summary.is_empty() {
                item = item.with_summary(summary);
            }
            out.push(item);
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("digest_parse_ms").record(ms);
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for RssFeedProvider {
    async fn fetch_latest(&self) -> Result<Vec<Item>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s),
            Mode::Http { url, client } => {
                // errors are counted once, by the caller
                let body = client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("{} http get()", self.name))?
                    .error_for_status()
                    .with_context(|| format!("{} http status", self.name))?
                    .text()
                    .await
                    .with_context(|| format!("{} http .text()", self.name))?;
                self.parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// quick-xml only knows the XML predefined entities; feeds routinely ship HTML ones.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc2822_dates_parse_to_utc() {
        let ts = parse_rfc2822("Tue, 14 Oct 2025 08:30:00 +0200").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-10-14T06:30:00+00:00");
        assert!(parse_rfc2822("yesterday-ish").is_none());
    }

    #[test]
    fn rfc3339_dates_parse_to_utc() {
        let ts = parse_rfc3339("2025-10-14T09:15:00-04:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-10-14T13:15:00+00:00");
        assert!(parse_rfc3339("Tue, 14 Oct 2025 08:30:00 +0200").is_none());
    }

    #[test]
    fn root_element_picks_the_format() {
        assert_eq!(
            feed_kind("<?xml version=\"1.0\"?>\n<rss version=\"2.0\"><channel/></rss>"),
            Some(FeedKind::Rss)
        );
        assert_eq!(
            feed_kind("<feed xmlns=\"http://www.w3.org/2005/Atom\"></feed>"),
            Some(FeedKind::Atom)
        );
        assert_eq!(feed_kind("<html><body/></html>"), None);
        assert_eq!(feed_kind(""), None);
    }
}
