//! Effectiveness store service.
//!
//! The only place engine decisions persist across runs. Attempts are
//! recorded with a single transaction per terminal state, reading samples
//! are idempotent overwrites, and the report derives everything from the
//! append-only facts rather than mutating them.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::config::ScoringSettings;
use crate::domain::{
    AttemptOutcome, EffectivenessSample, MessageId, ReadingAggregate, Sender, UnsubscribeAttempt,
};
use crate::scoring::{ranking_order, RelevanceScore, RelevanceScorer};
use crate::storage::{queries, Database, DatabaseError};

/// Errors from the effectiveness store.
///
/// Storage failures are fatal for the current run: losing attempt history
/// silently is worse than aborting.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Database(#[from] DatabaseError),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// One ranked unsubscribe candidate.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    /// The sender's persistent record.
    pub sender: Sender,
    /// Window aggregates the score was computed from.
    pub aggregate: ReadingAggregate,
    /// The computed relevance score.
    pub score: RelevanceScore,
}

/// Effectiveness classification, from post-attempt volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectivenessTier {
    /// No messages since the attempt.
    Effective,
    /// A trickle (at most two messages).
    MostlyEffective,
    /// Still flowing.
    NotEffective,
}

impl std::fmt::Display for EffectivenessTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EffectivenessTier::Effective => write!(f, "Effective"),
            EffectivenessTier::MostlyEffective => write!(f, "Mostly Effective"),
            EffectivenessTier::NotEffective => write!(f, "Not Effective"),
        }
    }
}

/// Per-sender effectiveness report entry.
///
/// Descriptive only: a `still_sending` flag surfaces the contradiction
/// between a recorded success and continued mail, it never triggers a
/// retry.
#[derive(Debug, Clone)]
pub struct EffectivenessEntry {
    /// Canonical sender address.
    pub sender_address: String,
    /// Display name, when known.
    pub display_name: Option<String>,
    /// When the successful attempt was recorded.
    pub unsubscribed_at: Option<DateTime<Utc>>,
    /// Observed messages up to the attempt.
    pub messages_before: u32,
    /// Observed messages after the attempt.
    pub messages_after: u32,
    /// Messages inside the post-attempt noise window.
    pub messages_in_window: u32,
    /// Any message within the post-attempt window means the unsubscribe
    /// did not take.
    pub still_sending: bool,
    /// Coarse classification for display.
    pub effectiveness: EffectivenessTier,
}

/// Overall engine statistics.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// Senders tracked.
    pub total_senders: u32,
    /// Senders with a recorded successful unsubscribe.
    pub unsubscribed: u32,
    /// Unsubscribed senders with no post-attempt mail.
    pub effective: u32,
    /// Unsubscribed senders still sending.
    pub still_sending: u32,
    /// Attempts recorded.
    pub total_attempts: u32,
    /// Attempts that reached `success`.
    pub successful_attempts: u32,
}

/// Service handle over the persistent store.
///
/// Passed explicitly to the components that need it; there is no ambient
/// global state.
#[derive(Clone)]
pub struct EffectivenessStore {
    db: Database,
    scoring: ScoringSettings,
}

impl EffectivenessStore {
    /// Creates the store over an opened database.
    pub fn new(db: Database, scoring: ScoringSettings) -> Self {
        Self { db, scoring }
    }

    /// Records one terminal attempt in a single transaction.
    ///
    /// On success the sender is marked unsubscribed in the same write, so a
    /// crash can never leave the two out of step.
    pub async fn record_attempt(&self, attempt: UnsubscribeAttempt) -> StoreResult<()> {
        self.db
            .transaction(move |tx| {
                queries::senders::upsert_identity(
                    tx,
                    &attempt.sender_address,
                    None,
                    attempt.attempted_at,
                )?;
                queries::attempts::insert(tx, &attempt)?;
                if attempt.outcome == AttemptOutcome::Success {
                    queries::senders::mark_unsubscribed(
                        tx,
                        &attempt.sender_address,
                        attempt.attempted_at,
                    )?;
                }
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Overwrites one sender's reading aggregates with the latest scan.
    ///
    /// Idempotent: replaying the same aggregates is a no-op in effect.
    pub async fn record_reading_sample(
        &self,
        mut aggregate: ReadingAggregate,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        if aggregate.total_unread > aggregate.total_received {
            tracing::warn!(
                sender = %aggregate.sender_address,
                unread = aggregate.total_unread,
                received = aggregate.total_received,
                "clamping unread count to received count"
            );
            aggregate.total_unread = aggregate.total_received;
        }

        self.db
            .transaction(move |tx| {
                queries::senders::upsert_identity(
                    tx,
                    &aggregate.sender_address,
                    aggregate.sender_name.as_deref(),
                    now,
                )?;
                queries::patterns::replace_aggregate(tx, &aggregate, now)?;
                queries::senders::set_aggregates(
                    tx,
                    &aggregate.sender_address,
                    aggregate.total_received,
                    aggregate.total_unread,
                    aggregate.last_read_at,
                    aggregate.engagement_score(),
                    now,
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Records a message observed after a sender's unsubscribe attempt.
    ///
    /// Returns true when a new sample row was written; false for messages
    /// from senders that are not unsubscribed, messages older than the
    /// attempt, and duplicates.
    pub async fn record_post_attempt_sample(
        &self,
        sender_address: String,
        message_id: MessageId,
        received_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let inserted = self
            .db
            .with_conn(move |conn| {
                let Some(sender) = queries::senders::get_by_address(conn, &sender_address)? else {
                    return Ok(false);
                };
                let Some(unsubscribed_at) = sender.unsubscribed_at else {
                    return Ok(false);
                };
                if received_at < unsubscribed_at {
                    return Ok(false);
                }
                let days_after = (received_at - unsubscribed_at).num_days();

                let attempt_id = queries::attempts::latest_success_for_sender(conn, &sender_address)?
                    .map(|a| a.id);

                let sample = EffectivenessSample {
                    sender_address,
                    attempt_id,
                    message_id,
                    received_at,
                    days_after_attempt: days_after,
                };
                Ok(queries::samples::insert_ignore(conn, &sample)?)
            })
            .await?;
        Ok(inserted)
    }

    /// Computes the relevance ranking over current aggregates.
    ///
    /// Applies the cooldown rules: user-kept senders sit out the keep
    /// cooldown, recently shown senders sit out the shown cooldown when
    /// requested, and recently attempted senders sit out the retry
    /// cooldown. Unsubscribed senders and senders below the minimum window
    /// volume never rank.
    pub async fn relevance_ranking(
        &self,
        window_days: u32,
        exclude_recently_shown: bool,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<RankedCandidate>> {
        let scoring = self.scoring.clone();

        let rows = self
            .db
            .with_conn(move |conn| {
                let mut eligible = Vec::new();
                for (aggregate, sender) in queries::patterns::ranking_rows(conn)? {
                    if sender.is_unsubscribed() {
                        continue;
                    }
                    if aggregate.total_received < scoring.min_messages {
                        continue;
                    }
                    if within_cooldown(sender.kept_at, scoring.keep_cooldown_days, now) {
                        continue;
                    }
                    if exclude_recently_shown
                        && within_cooldown(sender.last_shown_at, scoring.shown_cooldown_days, now)
                    {
                        continue;
                    }
                    let last_attempt =
                        queries::attempts::latest_for_sender(conn, &sender.address)?;
                    if within_cooldown(
                        last_attempt.map(|a| a.attempted_at),
                        scoring.retry_cooldown_days,
                        now,
                    ) {
                        continue;
                    }
                    eligible.push((aggregate, sender));
                }
                Ok(eligible)
            })
            .await?;

        let scorer = RelevanceScorer::new(window_days, self.scoring.volume_cap);
        let mut scored: Vec<(ReadingAggregate, RelevanceScore, Sender)> = rows
            .into_iter()
            .map(|(aggregate, sender)| {
                let score = scorer.score(&aggregate, now);
                (aggregate, score, sender)
            })
            .collect();

        scored.sort_by(|a, b| ranking_order((&a.0, &a.1), (&b.0, &b.1)));

        Ok(scored
            .into_iter()
            .map(|(aggregate, score, sender)| RankedCandidate {
                sender,
                aggregate,
                score,
            })
            .collect())
    }

    /// Records that senders were surfaced as candidates.
    pub async fn mark_shown(&self, addresses: Vec<String>, now: DateTime<Utc>) -> StoreResult<()> {
        self.db
            .transaction(move |tx| {
                for address in &addresses {
                    queries::senders::mark_shown(tx, address, now)?;
                }
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Records a user "keep" decision; the sender sits out the keep cooldown.
    pub async fn mark_kept(&self, address: String, now: DateTime<Utc>) -> StoreResult<()> {
        self.db
            .with_conn(move |conn| Ok(queries::senders::mark_kept(conn, &address, now)?))
            .await?;
        Ok(())
    }

    /// Looks up one sender's persistent record.
    pub async fn sender(&self, address: String) -> StoreResult<Option<Sender>> {
        Ok(self
            .db
            .with_conn(move |conn| Ok(queries::senders::get_by_address(conn, &address)?))
            .await?)
    }

    /// Builds the per-sender effectiveness report.
    ///
    /// Descriptive only: the report surfaces senders worth re-attempting
    /// or escalating manually, it never retries anything itself.
    pub async fn effectiveness_report(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<EffectivenessEntry>> {
        let cutoff = now - Duration::days(i64::from(self.scoring.post_attempt_window_days));

        let entries = self
            .db
            .with_conn(move |conn| {
                let mut entries = Vec::new();
                for sender in queries::senders::all_unsubscribed(conn)? {
                    let after = queries::samples::count_for_sender(conn, &sender.address)?;
                    let in_window =
                        queries::samples::count_received_since(conn, &sender.address, cutoff)?;

                    let effectiveness = match after {
                        0 => EffectivenessTier::Effective,
                        1..=2 => EffectivenessTier::MostlyEffective,
                        _ => EffectivenessTier::NotEffective,
                    };

                    entries.push(EffectivenessEntry {
                        messages_before: sender.lifetime_messages.saturating_sub(after),
                        messages_after: after,
                        messages_in_window: in_window,
                        still_sending: in_window > 0,
                        effectiveness,
                        sender_address: sender.address,
                        display_name: sender.display_name,
                        unsubscribed_at: sender.unsubscribed_at,
                    });
                }
                // Worst offenders first, matching how the report is read.
                entries.sort_by(|a, b| b.messages_after.cmp(&a.messages_after));
                Ok(entries)
            })
            .await?;
        Ok(entries)
    }

    /// Computes overall statistics.
    pub async fn statistics(&self) -> StoreResult<Statistics> {
        let stats = self
            .db
            .with_conn(|conn| {
                let unsubscribed = queries::senders::all_unsubscribed(conn)?;
                let mut effective = 0;
                let mut still_sending = 0;
                for sender in &unsubscribed {
                    if queries::samples::count_for_sender(conn, &sender.address)? == 0 {
                        effective += 1;
                    } else {
                        still_sending += 1;
                    }
                }

                Ok(Statistics {
                    total_senders: queries::senders::count_all(conn)?,
                    unsubscribed: unsubscribed.len() as u32,
                    effective,
                    still_sending,
                    total_attempts: queries::attempts::count_all(conn)?,
                    successful_attempts: queries::attempts::count_by_outcome(
                        conn,
                        AttemptOutcome::Success,
                    )?,
                })
            })
            .await?;
        Ok(stats)
    }
}

fn within_cooldown(
    timestamp: Option<DateTime<Utc>>,
    cooldown_days: u32,
    now: DateTime<Utc>,
) -> bool {
    match timestamp {
        Some(t) => now - t < Duration::days(i64::from(cooldown_days)),
        None => false,
    }
}
