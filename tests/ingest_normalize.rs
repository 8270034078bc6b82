// tests/ingest_normalize.rs
use signal_digest::ingest::normalize_text;

#[test]
fn empty_is_ok() {
    assert_eq!(normalize_text(""), "");
}

#[test]
fn feed_description_markup_is_flattened() {
    let s = "<p>Sainz&nbsp;<b>P3</b> &ldquo;happy with the car&rdquo;</p><br/>";
    assert_eq!(normalize_text(s), r#"Sainz P3 "happy with the car""#);
}

#[test]
fn folds_whitespace_and_nbsp() {
    assert_eq!(normalize_text("A\u{00A0}\n\tB   C"), "A B C");
}

#[test]
fn length_cap_counts_chars_not_bytes() {
    let s = "é".repeat(2_000);
    assert_eq!(normalize_text(&s).chars().count(), 1_500);
}
