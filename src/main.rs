//! Signal digest: one batch run.
//! Fetches followed people's feeds, the HN front page and the configured
//! news feeds, writes the day's Markdown digest, then publishes the site
//! directory.
//!
//! Exit status is 1 only when a deploy was attempted and failed. Fetch or
//! synthesis trouble degrades to an empty section instead.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use signal_digest::config::{DigestConfig, FeedSource};
use signal_digest::executor::RetryingExecutor;
use signal_digest::ingest::providers::hn_algolia::HnAlgoliaProvider;
use signal_digest::ingest::providers::rss::RssFeedProvider;
use signal_digest::ingest::types::SourceProvider;
use signal_digest::metrics::Metrics;
use signal_digest::pipeline::people::{self, PersonFeeds};
use signal_digest::pipeline::{render_section, FeedsPipeline, HnPipeline, PeoplePipeline};
use signal_digest::publish::deploy_pages;
use signal_digest::seen::HashStore;
use signal_digest::synth::{AnthropicSynthesizer, Digest, ResponseFormat};

/// `RUST_LOG` wins; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("signal_digest=info,sqlx=warn,warn"));
    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().compact().with_target(true)).init();
    }
}

fn dry_run() -> bool {
    std::env::var("DIGEST_DRY_RUN")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

async fn run_hn(cfg: &DigestConfig) -> Result<Digest> {
    let api_key = cfg.synthesis.resolve_api_key()?;
    let provider = HnAlgoliaProvider::new()?;
    let synth = AnthropicSynthesizer::new(api_key, ResponseFormat::Markdown)?;
    let outcome = HnPipeline::from_config(cfg)
        .run(&provider, &synth, Utc::now())
        .await?;
    Ok(outcome.digest)
}

fn feed_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("signal-digest/0.1 (feed reader)")
        .connect_timeout(std::time::Duration::from_secs(10))
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("building feed http client")
}

fn feed_providers(sources: &[FeedSource]) -> Result<Vec<Box<dyn SourceProvider>>> {
    let client = feed_client()?;
    Ok(sources
        .iter()
        .map(|s| {
            Box::new(RssFeedProvider::from_url(
                &s.name,
                &s.lang,
                &s.url,
                client.clone(),
            )) as Box<dyn SourceProvider>
        })
        .collect())
}

async fn run_people(cfg: &DigestConfig) -> Result<Digest> {
    if cfg.people.persons.is_empty() {
        info!("no people configured");
        return Ok(Digest::empty());
    }
    let api_key = cfg.synthesis.resolve_api_key()?;
    let client = feed_client()?;
    let groups: Vec<PersonFeeds> = cfg
        .people
        .persons
        .iter()
        .map(|p| PersonFeeds {
            person: p.clone(),
            providers: p
                .feeds
                .iter()
                .map(|f| {
                    Box::new(
                        RssFeedProvider::from_url(&f.name, &f.lang, &f.url, client.clone())
                            .with_entry_ids(),
                    ) as Box<dyn SourceProvider>
                })
                .collect(),
        })
        .collect();
    let synth = AnthropicSynthesizer::new(api_key, ResponseFormat::Markdown)?
        .with_system_prompt(people::SYSTEM_PROMPT);
    let outcome = PeoplePipeline::from_config(cfg)
        .run(&groups, &synth, Utc::now())
        .await?;
    Ok(outcome.digest)
}

async fn run_feeds(cfg: &DigestConfig) -> Result<Digest> {
    if cfg.feeds.sources.is_empty() {
        info!("no feeds configured");
        return Ok(Digest::empty());
    }
    let api_key = cfg.synthesis.resolve_api_key()?;
    let providers = feed_providers(&cfg.feeds.sources)?;
    let store = HashStore::open(&cfg.paths.feeds_seen_db).await?;
    let synth = AnthropicSynthesizer::new(api_key, cfg.feeds.format)?;
    let outcome = FeedsPipeline::from_config(cfg)
        .run(&providers, &store, &synth, Utc::now())
        .await;
    store.close().await;
    Ok(outcome?.digest)
}

fn write_digest(
    dir: &Path,
    date: NaiveDate,
    sections: &[String],
) -> Result<Option<std::path::PathBuf>> {
    let body: Vec<&str> = sections
        .iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect();
    if body.is_empty() {
        return Ok(None);
    }
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let date = date.format("%Y-%m-%d");
    let path = dir.join(format!("{date}.md"));
    let doc = format!("# Digest {date}\n\n{}", body.join("\n"));
    std::fs::write(&path, doc).with_context(|| format!("writing {}", path.display()))?;
    Ok(Some(path))
}

/// Returns `false` only when a deploy was attempted and failed.
async fn run(cfg: &DigestConfig) -> bool {
    let mut sections = Vec::new();
    if cfg.pipelines.people {
        let digest = run_people(cfg).await.unwrap_or_else(|e| {
            warn!(error = ?e, "people pipeline failed");
            Digest::empty()
        });
        sections.push(render_section("People", &digest));
    }
    if cfg.pipelines.hn {
        let digest = run_hn(cfg).await.unwrap_or_else(|e| {
            warn!(error = ?e, "hn pipeline failed");
            Digest::empty()
        });
        sections.push(render_section("Hacker News", &digest));
    }
    if cfg.pipelines.feeds {
        let digest = run_feeds(cfg).await.unwrap_or_else(|e| {
            warn!(error = ?e, "feeds pipeline failed");
            Digest::empty()
        });
        sections.push(render_section("Feeds", &digest));
    }

    let date = cfg.digest_date(Utc::now());
    match write_digest(&cfg.paths.output_dir, date, &sections) {
        Ok(Some(p)) => info!(path = %p.display(), "digest written"),
        Ok(None) => info!("nothing to publish today"),
        Err(e) => error!(error = ?e, "writing digest failed"),
    }

    let Some(target) = &cfg.deploy else {
        return true;
    };
    if dry_run() {
        info!("DIGEST_DRY_RUN set; skipping deploy");
        return true;
    }
    let executor = RetryingExecutor::from_policy(&cfg.retry);
    deploy_pages(&executor, target).await
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = match DigestConfig::load_default() {
        Ok(c) => c,
        Err(e) => {
            error!(error = ?e, "config load failed; using defaults");
            DigestConfig::default()
        }
    };

    let metrics = match &cfg.paths.metrics_file {
        Some(_) => Metrics::init()
            .map_err(|e| warn!(error = ?e, "metrics disabled"))
            .ok(),
        None => None,
    };

    let deployed_ok = run(&cfg).await;

    if let (Some(m), Some(path)) = (&metrics, &cfg.paths.metrics_file) {
        if let Err(e) = m.write_textfile(path) {
            warn!(error = ?e, "writing metrics textfile failed");
        }
    }

    if deployed_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
