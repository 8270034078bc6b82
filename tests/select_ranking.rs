// tests/select_ranking.rs
use signal_digest::select::{select, SelectionPolicy};
use signal_digest::{Engagement, Item};

fn story(id: &str, points: u64, comments: u64) -> Item {
    Item::new(Some(id), "Hacker News", id, None).with_engagement(Engagement::new(points, comments))
}

#[test]
fn size_is_top_n_plus_updates() {
    let policy = SelectionPolicy::default();
    let new: Vec<Item> = (0..40).map(|i| story(&format!("n{i}"), i, 0)).collect();
    let updates = vec![story("u1", 1, 1), story("u2", 1, 1)];
    let batch = select(new, updates, &policy);
    assert_eq!(batch.len(), 15 + 2);
    assert_eq!(batch.update_count(), 2);

    let short = select(vec![story("a", 1, 0)], vec![story("u", 0, 0)], &policy);
    assert_eq!(short.len(), 2);
}

#[test]
fn ranked_by_weighted_score_then_updates_appended() {
    let policy = SelectionPolicy {
        top_n: 2,
        ..SelectionPolicy::default()
    };
    // scores: a=10, b=10+15=25, c=40
    let new = vec![story("a", 10, 0), story("b", 10, 10), story("c", 40, 0)];
    let batch = select(new, vec![story("u", 0, 0)], &policy);
    let ids: Vec<_> = batch.items.iter().map(|r| r.item.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "b", "u"]);
    assert!(batch.items[2].update);
    assert!(!batch.items[0].update);
}

#[test]
fn ties_keep_fetch_order() {
    let policy = SelectionPolicy::default();
    let new = vec![story("first", 5, 0), story("second", 5, 0), story("third", 5, 0)];
    let batch = select(new, Vec::new(), &policy);
    let ids: Vec<_> = batch.items.iter().map(|r| r.item.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
}

#[test]
fn updates_are_not_truncated() {
    let policy = SelectionPolicy {
        top_n: 1,
        ..SelectionPolicy::default()
    };
    let updates: Vec<Item> = (0..5).map(|i| story(&format!("u{i}"), 0, 0)).collect();
    let batch = select(Vec::new(), updates, &policy);
    assert_eq!(batch.len(), 5);
    assert_eq!(batch.update_count(), 5);
}
