// src/select.rs
//! Ranking and bounded selection.
//!
//! New items are scored `points * w_points + comments * w_comments`, sorted
//! descending with a stable sort (ties keep fetch order) and cut to `top_n`.
//! Updates are appended after the cut and are never bounded.

use serde::{Deserialize, Serialize};

use crate::ingest::types::Item;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionPolicy {
    pub top_n: usize,
    pub w_points: f64,
    pub w_comments: f64,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            top_n: 15,
            w_points: 1.0,
            w_comments: 1.5,
        }
    }
}

impl SelectionPolicy {
    pub fn score(&self, item: &Item) -> f64 {
        item.engagement.points() as f64 * self.w_points
            + item.engagement.comments() as f64 * self.w_comments
    }
}

/// An item chosen for this run, flagged when it resurfaces as an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    #[serde(flatten)]
    pub item: Item,
    pub update: bool,
}

impl RankedItem {
    pub fn new(item: Item) -> Self {
        Self {
            item,
            update: false,
        }
    }

    pub fn update(item: Item) -> Self {
        Self { item, update: true }
    }
}

/// Ordered selection for one run: top-N new items, then every update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedBatch {
    pub items: Vec<RankedItem>,
}

impl RankedBatch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn update_count(&self) -> usize {
        self.items.iter().filter(|r| r.update).count()
    }

    pub fn into_items(self) -> Vec<RankedItem> {
        self.items
    }
}

/// Size is always `min(top_n, new.len()) + updates.len()`.
pub fn select(new_items: Vec<Item>, updates: Vec<Item>, policy: &SelectionPolicy) -> RankedBatch {
    let mut scored: Vec<(f64, Item)> = new_items
        .into_iter()
        .map(|it| (policy.score(&it), it))
        .collect();
    // `sort_by` is stable; equal scores keep fetch order.
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut items: Vec<RankedItem> = scored
        .into_iter()
        .take(policy.top_n)
        .map(|(_, it)| RankedItem::new(it))
        .collect();
    items.extend(updates.into_iter().map(RankedItem::update));

    RankedBatch { items }
}
