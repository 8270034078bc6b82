// src/freshness.rs
//! Freshness & update classification.
//!
//! Pure function of `(item, now, prior record)`; no state is kept here.
//!
//! Freshness tiers by age:
//! - `< fresh_hours`          : accept
//! - `< stale_hours`          : accept (separate tier; currently same decision)
//! - otherwise                : accept only if `comments / max(points, 1) > stale_comment_ratio`
//!
//! Missing timestamps are accepted (fail open).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::types::Item;
use crate::seen::SeenRecord;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreshnessPolicy {
    pub fresh_hours: f64,
    pub stale_hours: f64,
    pub stale_comment_ratio: f64,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            fresh_hours: 18.0,
            stale_hours: 20.0,
            stale_comment_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatePolicy {
    /// Current engagement must reach `growth_factor * snapshot` (inclusive).
    pub growth_factor: f64,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self { growth_factor: 2.0 }
    }
}

/// Which age band an item falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeTier {
    Undated,
    Fresh,
    Aging,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Not previously seen and within its relevance window.
    New,
    /// Previously seen and grown enough to resurface.
    Update,
    /// Neither; dropped silently.
    Drop,
}

impl FreshnessPolicy {
    pub fn tier(&self, item: &Item, now: DateTime<Utc>) -> AgeTier {
        let Some(published) = item.published_at else {
            return AgeTier::Undated;
        };
        let age_hours = (now - published).num_milliseconds() as f64 / 3_600_000.0;
        if age_hours < self.fresh_hours {
            AgeTier::Fresh
        } else if age_hours < self.stale_hours {
            AgeTier::Aging
        } else {
            AgeTier::Stale
        }
    }

    pub fn is_fresh(&self, item: &Item, now: DateTime<Utc>) -> bool {
        match self.tier(item, now) {
            AgeTier::Undated => true,
            AgeTier::Fresh => true,
            // Same decision as `Fresh` for now; the band stays a separate tier.
            AgeTier::Aging => true,
            AgeTier::Stale => {
                let points = item.engagement.points().max(1) as f64;
                let comments = item.engagement.comments() as f64;
                comments / points > self.stale_comment_ratio
            }
        }
    }
}

impl UpdatePolicy {
    /// Compares current comment count against the snapshot taken at first sighting.
    pub fn is_update(&self, item: &Item, prior: &SeenRecord) -> bool {
        let snapshot = prior.engagement_snapshot;
        if snapshot == 0 {
            return false;
        }
        item.engagement.comments() as f64 >= snapshot as f64 * self.growth_factor
    }
}

/// Classify one freshly fetched item.
pub fn classify(
    item: &Item,
    now: DateTime<Utc>,
    prior: Option<&SeenRecord>,
    freshness: &FreshnessPolicy,
    update: &UpdatePolicy,
) -> Classification {
    if !freshness.is_fresh(item, now) {
        return Classification::Drop;
    }
    match prior {
        None => Classification::New,
        Some(rec) if update.is_update(item, rec) => Classification::Update,
        Some(_) => Classification::Drop,
    }
}
