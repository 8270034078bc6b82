// tests/synth_anthropic.rs
use signal_digest::select::RankedItem;
use signal_digest::synth::{AnthropicSynthesizer, ResponseFormat, SynthesisConfig, Synthesizer};
use signal_digest::Item;

fn one_item() -> Vec<RankedItem> {
    vec![RankedItem::new(Item::new(
        Some("1"),
        "Hacker News",
        "story",
        Some("https://example.com"),
    ))]
}

#[tokio::test]
async fn empty_batch_needs_no_network() {
    let s = AnthropicSynthesizer::new("", ResponseFormat::Markdown).unwrap();
    let d = s.generate(&[], &SynthesisConfig::default()).await.unwrap();
    assert!(d.is_empty());
}

#[tokio::test]
async fn missing_key_is_an_error() {
    let s = AnthropicSynthesizer::new("  ", ResponseFormat::Briefing).unwrap();
    assert!(s
        .generate(&one_item(), &SynthesisConfig::default())
        .await
        .is_err());
}

#[tokio::test]
async fn unreachable_endpoint_is_an_error() {
    let s = AnthropicSynthesizer::new("sk-test", ResponseFormat::Markdown)
        .unwrap()
        .with_endpoint("http://127.0.0.1:9/v1/messages");
    assert!(s
        .generate(&one_item(), &SynthesisConfig::default())
        .await
        .is_err());
}
