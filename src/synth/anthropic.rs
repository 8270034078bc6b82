// src/synth/anthropic.rs
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{parse_briefing, Digest, SynthesisConfig, Synthesizer};
use crate::select::RankedItem;

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// How the model's reply is turned into a [`Digest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Reply is the digest text itself.
    Markdown,
    /// Reply is a JSON briefing object with source links.
    Briefing,
}

const MARKDOWN_SYSTEM: &str = "You write a daily morning digest of the stories you are given. \
Write in Markdown. Explain jargon in plain words and say why each story matters. \
Items with \"update\": true were covered before and have drawn much more discussion since; \
say so and briefly recall what the original story was. Only cover stories present in the data.";

const BRIEFING_SYSTEM: &str = "You receive a batch of raw news items, possibly in several languages. \
Discard items that are off-topic for this briefing, then combine the rest into one conversational \
narrative in English with paragraph breaks between topics. Reply with a single JSON object and \
nothing else: {\"briefing\": \"...\", \"source_links\": [{\"title\": \"...\", \"url\": \"...\"}]}. \
List every article you drew from in source_links, in narrative order. If nothing is relevant, \
reply {\"briefing\": \"\", \"source_links\": []}.";

/// Messages API client. Requires an API key; see `config` for `"ENV"` resolution.
pub struct AnthropicSynthesizer {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    format: ResponseFormat,
    system_prompt: String,
}

impl AnthropicSynthesizer {
    pub fn new(api_key: impl Into<String>, format: ResponseFormat) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("signal-digest/0.1")
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()
            .context("building synthesis http client")?;
        let system_prompt = match format {
            ResponseFormat::Markdown => MARKDOWN_SYSTEM,
            ResponseFormat::Briefing => BRIEFING_SYSTEM,
        }
        .to_string();
        Ok(Self {
            http,
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            format,
            system_prompt,
        })
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn user_prompt(items: &[RankedItem]) -> Result<String> {
        let json = serde_json::to_string_pretty(items).context("serializing items for prompt")?;
        Ok(format!(
            "Here are today's items. Write the digest from this data.\n\n```json\n{json}\n```\n"
        ))
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Msg<'a>>,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    content: Vec<Block>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Block {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[async_trait]
impl Synthesizer for AnthropicSynthesizer {
    async fn generate(&self, items: &[RankedItem], config: &SynthesisConfig) -> Result<Digest> {
        if items.is_empty() {
            return Ok(Digest::empty());
        }
        if self.api_key.trim().is_empty() {
            bail!("synthesis api key is empty");
        }

        let prompt = Self::user_prompt(items)?;
        let req = Req {
            model: &config.model,
            max_tokens: config.max_output_tokens,
            temperature: config.temperature,
            system: &self.system_prompt,
            messages: vec![Msg {
                role: "user",
                content: &prompt,
            }],
        };

        info!(model = %config.model, items = items.len(), "calling synthesis api");
        let resp = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&req)
            .send()
            .await
            .context("synthesis request")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("synthesis api returned {status}: {body}"));
        }
        let body: Resp = resp.json().await.context("decoding synthesis response")?;
        if let Some(u) = &body.usage {
            info!(
                input_tokens = u.input_tokens,
                output_tokens = u.output_tokens,
                "synthesis complete"
            );
        }

        let text: String = body
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            return Ok(Digest::empty());
        }

        match self.format {
            ResponseFormat::Markdown => Ok(Digest {
                text: text.trim().to_string(),
                references: Vec::new(),
            }),
            ResponseFormat::Briefing => {
                let briefing = parse_briefing(&text).context("parsing briefing response")?;
                Ok(briefing.into())
            }
        }
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
