// src/synth/briefing.rs
//! Parser for the JSON briefing object the synthesis model is asked to emit:
//! `{"briefing": "...", "source_links": [{"title": .., "url": ..}]}`.
//!
//! Models sometimes wrap the object in code fences or put raw newlines inside
//! the string. Both are handled here so callers only ever see a typed result.

use serde::Deserialize;
use thiserror::Error;

use super::{Digest, SourceLink};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Briefing {
    #[serde(default)]
    pub briefing: String,
    #[serde(default)]
    pub source_links: Vec<SourceLink>,
}

impl From<Briefing> for Digest {
    fn from(b: Briefing) -> Self {
        Digest {
            text: b.briefing,
            references: b.source_links,
        }
    }
}

#[derive(Debug, Error)]
pub enum BriefingParseError {
    #[error("empty response")]
    Empty,
    #[error("invalid briefing json: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn parse_briefing(raw: &str) -> Result<Briefing, BriefingParseError> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err(BriefingParseError::Empty);
    }
    match serde_json::from_str::<Briefing>(body) {
        Ok(b) => Ok(b),
        Err(first) => {
            let repaired = escape_control_chars_in_strings(body);
            if repaired == body {
                return Err(first.into());
            }
            tracing::debug!("direct briefing parse failed, retrying with escaped control chars");
            Ok(serde_json::from_str::<Briefing>(&repaired)?)
        }
    }
}

fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if s.starts_with("```") {
        s = match s.find('\n') {
            Some(nl) => &s[nl + 1..],
            None => "",
        };
    }
    if let Some(stripped) = s.trim_end().strip_suffix("```") {
        s = stripped;
    }
    s.trim()
}

/// Escape raw `\n`, `\r`, `\t` that appear inside JSON string literals.
fn escape_control_chars_in_strings(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    for ch in s.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(ch);
                continue;
            }
            match ch {
                '\\' => {
                    escaped = true;
                    out.push(ch);
                }
                '"' => {
                    in_string = false;
                    out.push(ch);
                }
                '\n' => out.push_str("\\n"),
                '\r' => {}
                '\t' => out.push_str("\\t"),
                c => out.push(c),
            }
        } else {
            if ch == '"' {
                in_string = true;
            }
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_object_parses() {
        let b = parse_briefing(
            r#"{"briefing":"Hello","source_links":[{"title":"A","url":"https://a.test"}]}"#,
        )
        .unwrap();
        assert_eq!(b.briefing, "Hello");
        assert_eq!(b.source_links.len(), 1);
    }

    #[test]
    fn fenced_object_parses() {
        let raw = "```json\n{\"briefing\":\"x\",\"source_links\":[]}\n```";
        assert_eq!(parse_briefing(raw).unwrap().briefing, "x");
    }

    #[test]
    fn raw_newlines_inside_string_are_repaired() {
        let raw = "{\"briefing\": \"First para.\n\nSecond para.\", \"source_links\": []}";
        let b = parse_briefing(raw).unwrap();
        assert_eq!(b.briefing, "First para.\n\nSecond para.");
    }

    #[test]
    fn garbage_is_a_typed_error() {
        assert!(matches!(
            parse_briefing("not json at all"),
            Err(BriefingParseError::Json(_))
        ));
        assert!(matches!(parse_briefing("  "), Err(BriefingParseError::Empty)));
    }
}
