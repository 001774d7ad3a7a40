//! Relevance scoring.
//!
//! Computes how disposable a subscription looks from its reading aggregates.
//! Higher scores mean worse: stale, unread, high-volume senders rank first.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ReadingAggregate;

/// Weight of the days-since-last-read component.
const STALENESS_WEIGHT: f64 = 0.4;
/// Weight of the unread-ratio component.
const UNREAD_RATIO_WEIGHT: f64 = 0.4;
/// Weight of the unread-volume component.
const UNREAD_VOLUME_WEIGHT: f64 = 0.2;

/// Human-readable bucket for when the sender was last read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LastReadBucket {
    /// No message from this sender was ever opened.
    Never,
    /// Last read within this many days.
    Days(u32),
    /// Last read within this many months.
    Months(u32),
}

impl fmt::Display for LastReadBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastReadBucket::Never => write!(f, "Never"),
            LastReadBucket::Days(d) => write!(f, "<{}d ago", d),
            LastReadBucket::Months(m) => write!(f, "<{}mo ago", m),
        }
    }
}

/// A computed relevance score with its components, all in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelevanceScore {
    /// Weighted total; higher = more disposable.
    pub value: f64,
    /// min(1, days since last read / window); 1.0 when never read.
    pub staleness: f64,
    /// unread / max(1, total received).
    pub unread_ratio: f64,
    /// min(1, unread / volume cap).
    pub unread_volume: f64,
    /// Display bucket for the last-read time.
    pub last_read: LastReadBucket,
}

/// Scores reading aggregates against a lookback window.
#[derive(Debug, Clone, Copy)]
pub struct RelevanceScorer {
    window_days: u32,
    volume_cap: u32,
}

impl RelevanceScorer {
    /// Creates a scorer for the given window and unread-volume cap.
    pub fn new(window_days: u32, volume_cap: u32) -> Self {
        Self {
            window_days: window_days.max(1),
            volume_cap: volume_cap.max(1),
        }
    }

    /// Computes the relevance score for one sender's aggregates.
    pub fn score(&self, aggregate: &ReadingAggregate, now: DateTime<Utc>) -> RelevanceScore {
        let days_since_read = aggregate
            .last_read_at
            .map(|read_at| (now - read_at).num_days().max(0) as f64);

        let staleness = match days_since_read {
            Some(days) => (days / f64::from(self.window_days)).min(1.0),
            None => 1.0,
        };

        let unread_ratio =
            f64::from(aggregate.total_unread) / f64::from(aggregate.total_received.max(1));

        let unread_volume =
            (f64::from(aggregate.total_unread) / f64::from(self.volume_cap)).min(1.0);

        RelevanceScore {
            value: STALENESS_WEIGHT * staleness
                + UNREAD_RATIO_WEIGHT * unread_ratio
                + UNREAD_VOLUME_WEIGHT * unread_volume,
            staleness,
            unread_ratio,
            unread_volume,
            last_read: bucket(days_since_read),
        }
    }
}

/// Orders scored senders for ranking: descending score, ties broken by
/// higher unread count, then ascending sender address. Fully deterministic.
pub fn ranking_order(
    a: (&ReadingAggregate, &RelevanceScore),
    b: (&ReadingAggregate, &RelevanceScore),
) -> Ordering {
    b.1.value
        .partial_cmp(&a.1.value)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.0.total_unread.cmp(&a.0.total_unread))
        .then_with(|| a.0.sender_address.cmp(&b.0.sender_address))
}

fn bucket(days_since_read: Option<f64>) -> LastReadBucket {
    match days_since_read {
        None => LastReadBucket::Never,
        Some(days) => {
            let days = days.ceil().max(1.0) as u32;
            if days < 31 {
                LastReadBucket::Days(days)
            } else {
                LastReadBucket::Months(days.div_ceil(30))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn aggregate(total: u32, unread: u32, last_read_days_ago: Option<i64>) -> ReadingAggregate {
        let now = Utc::now();
        ReadingAggregate {
            sender_address: "deals@shop.example".to_string(),
            sender_name: None,
            window_days: 90,
            total_received: total,
            total_read: total - unread,
            total_unread: unread,
            last_read_at: last_read_days_ago.map(|d| now - Duration::days(d)),
            last_received_at: Some(now),
        }
    }

    #[test]
    fn worked_example_scores_near_maximum() {
        // 40 messages, 38 unread, last read 75 days ago, window 90, cap 20.
        let scorer = RelevanceScorer::new(90, 20);
        let score = scorer.score(&aggregate(40, 38, Some(75)), Utc::now());

        assert!((score.staleness - 75.0 / 90.0).abs() < 1e-9);
        assert!((score.unread_ratio - 0.95).abs() < 1e-9);
        assert_eq!(score.unread_volume, 1.0);

        // Never-read variant of the same sender lands at 0.98.
        let never = scorer.score(&aggregate(40, 38, None), Utc::now());
        assert_eq!(never.staleness, 1.0);
        assert!((never.value - 0.98).abs() < 1e-9);
    }

    #[test]
    fn never_read_is_maximally_stale() {
        let scorer = RelevanceScorer::new(90, 20);
        let score = scorer.score(&aggregate(10, 10, None), Utc::now());
        assert_eq!(score.staleness, 1.0);
        assert_eq!(score.last_read, LastReadBucket::Never);
    }

    #[test]
    fn staleness_caps_at_one() {
        let scorer = RelevanceScorer::new(30, 20);
        let score = scorer.score(&aggregate(10, 5, Some(400)), Utc::now());
        assert_eq!(score.staleness, 1.0);
    }

    #[test]
    fn score_monotonic_in_unread_ratio() {
        let scorer = RelevanceScorer::new(90, 20);
        let now = Utc::now();
        let mut prev = f64::NEG_INFINITY;
        // Unread counts at or above the cap hold the volume component at
        // 1.0, so only the ratio moves.
        for unread in [20, 25, 30, 35, 40] {
            let value = scorer.score(&aggregate(40, unread, Some(10)), now).value;
            assert!(value >= prev);
            prev = value;
        }
    }

    #[test]
    fn score_monotonic_in_staleness() {
        let scorer = RelevanceScorer::new(90, 20);
        let now = Utc::now();
        let mut prev = f64::NEG_INFINITY;
        for days in [0, 10, 30, 60, 89, 90, 200] {
            let value = scorer.score(&aggregate(20, 10, Some(days)), now).value;
            assert!(value >= prev);
            prev = value;
        }
    }

    #[test]
    fn ties_break_by_unread_then_address() {
        let scorer = RelevanceScorer::new(90, 20);
        let now = Utc::now();

        // Same component scores everywhere (ratio 0.95, capped volume,
        // never read); c doubles the unread count.
        let mut a = aggregate(40, 38, None);
        a.sender_address = "b@example.com".to_string();
        let mut b = aggregate(40, 38, None);
        b.sender_address = "a@example.com".to_string();
        let mut c = aggregate(80, 76, None);
        c.sender_address = "c@example.com".to_string();

        let mut scored: Vec<(ReadingAggregate, RelevanceScore)> = [a, b, c]
            .into_iter()
            .map(|agg| {
                let s = scorer.score(&agg, now);
                (agg, s)
            })
            .collect();
        scored.sort_by(|a, b| ranking_order((&a.0, &a.1), (&b.0, &b.1)));

        let order: Vec<&str> = scored
            .iter()
            .map(|(agg, _)| agg.sender_address.as_str())
            .collect();
        // c has the most unread at equal (maximal) component scores; then the
        // two exact ties order by address.
        assert_eq!(order, vec!["c@example.com", "a@example.com", "b@example.com"]);
    }

    #[test]
    fn last_read_buckets() {
        assert_eq!(bucket(None).to_string(), "Never");
        assert_eq!(bucket(Some(5.0)).to_string(), "<5d ago");
        assert_eq!(bucket(Some(75.0)).to_string(), "<3mo ago");
    }
}
