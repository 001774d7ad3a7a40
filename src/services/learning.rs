//! Learning loop orchestration.
//!
//! One batch run: refresh reading aggregates from newly observed messages,
//! recompute the ranking, present candidates through the reviewer
//! collaborator, execute approved actions, and persist outcomes. Ingestion
//! is idempotent, ranking always happens after every reading update has
//! been committed, and per-sender problems never abort the batch; only
//! storage failures do.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailparse::MailHeaderMap;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::automation::{AttemptResult, AutomationExecutor};
use crate::config::Settings;
use crate::domain::{
    AttemptId, AttemptOutcome, MessageId, MessageSummary, ReadingAggregate, UnsubscribeAction,
    UnsubscribeAttempt,
};
use crate::extract::extract_actions;
use crate::providers::ai::Summarizer;
use crate::providers::browser::BrowserProvider;
use crate::providers::mailbox::{MailboxError, MailboxProvider, MailboxQuery};
use crate::scoring::RelevanceScore;

use super::effectiveness::{EffectivenessEntry, EffectivenessStore, StoreError};

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    /// The mailbox collaborator failed outright.
    #[error("mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    /// The store failed; attempt history must not be dropped silently.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One sender surfaced for user review.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Canonical sender address.
    pub sender_address: String,
    /// Display name, when known.
    pub display_name: Option<String>,
    /// Relevance score driving the ranking.
    pub score: RelevanceScore,
    /// Messages received in the window.
    pub total_received: u32,
    /// Messages left unread.
    pub total_unread: u32,
    /// The action automation would run; `None` means manual-only.
    pub action: Option<UnsubscribeAction>,
    /// Optional AI hot take, purely decorative.
    pub summary: Option<String>,
}

/// Decision returned by the reviewer collaborator.
#[derive(Debug, Clone, Default)]
pub struct ReviewDecision {
    /// Addresses approved for automation.
    pub approved: Vec<String>,
    /// Addresses the user wants to keep (cooldown applies).
    pub kept: Vec<String>,
}

/// Approval surface; the interactive UI lives outside the engine.
#[async_trait]
pub trait CandidateReviewer: Send + Sync {
    /// Reviews the presented candidates.
    async fn review(&self, candidates: &[Candidate]) -> ReviewDecision;
}

/// A message that mentions unsubscribing but offers nothing automatable.
#[derive(Debug, Clone)]
pub struct ManualFollowup {
    /// Canonical sender address.
    pub sender_address: String,
    /// The message to act on by hand.
    pub message_id: MessageId,
}

/// Outcome summary of one run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Messages fetched and ingested.
    pub messages_scanned: usize,
    /// Senders whose aggregates were refreshed.
    pub senders_updated: usize,
    /// New post-attempt samples recorded.
    pub samples_recorded: usize,
    /// Candidates surfaced for review.
    pub candidates_presented: usize,
    /// Attempts recorded this run, one per executed action.
    pub attempts: Vec<UnsubscribeAttempt>,
    /// Senders needing manual follow-up.
    pub manual_followups: Vec<ManualFollowup>,
    /// Whether the run was interrupted before executing everything.
    pub cancelled: bool,
}

/// Result of ingesting one window of messages.
struct Ingestion {
    messages_scanned: usize,
    senders_updated: usize,
    samples_recorded: usize,
    /// Best automatable action per sender.
    actions: HashMap<String, UnsubscribeAction>,
    /// Sample subject lines per sender, newest first.
    subjects: HashMap<String, Vec<String>>,
    /// Message ids mapped back to their sender for attempt records.
    message_senders: HashMap<MessageId, String>,
    manual: Vec<ManualFollowup>,
}

/// Orchestrates batch and daily runs over the collaborator traits.
pub struct LearningLoop<M, B> {
    mailbox: M,
    executor: AutomationExecutor<B>,
    store: EffectivenessStore,
    summarizer: Option<Arc<dyn Summarizer>>,
    settings: Settings,
    cancel: CancellationToken,
}

impl<M: MailboxProvider, B: BrowserProvider> LearningLoop<M, B> {
    /// Creates a loop over the given collaborators and store handle.
    pub fn new(
        mailbox: M,
        executor: AutomationExecutor<B>,
        store: EffectivenessStore,
        settings: Settings,
    ) -> Self {
        Self {
            mailbox,
            executor,
            store,
            summarizer: None,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Attaches an optional summarizer. Ranking and automation behave
    /// identically without one.
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Token for interrupting a run between senders.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The store handle this loop writes through.
    pub fn store(&self) -> &EffectivenessStore {
        &self.store
    }

    /// Runs one interactive batch.
    pub async fn run_batch(&self, reviewer: &dyn CandidateReviewer) -> Result<RunReport, LoopError> {
        let now = Utc::now();
        let ingestion = self.ingest(now).await?;

        // Every reading update is committed before this ranking call.
        let ranking = self
            .store
            .relevance_ranking(self.settings.scan.lookback_days, true, now)
            .await?;

        let top: Vec<_> = ranking
            .into_iter()
            .take(self.settings.scan.max_candidates as usize)
            .collect();

        let mut candidates: Vec<Candidate> = top
            .iter()
            .map(|ranked| Candidate {
                sender_address: ranked.sender.address.clone(),
                display_name: ranked.sender.display_name.clone(),
                score: ranked.score,
                total_received: ranked.aggregate.total_received,
                total_unread: ranked.aggregate.total_unread,
                action: ingestion.actions.get(&ranked.sender.address).cloned(),
                summary: None,
            })
            .collect();

        self.decorate_with_summaries(&mut candidates, &ingestion.subjects)
            .await;

        self.store
            .mark_shown(
                candidates.iter().map(|c| c.sender_address.clone()).collect(),
                now,
            )
            .await?;

        let decision = reviewer.review(&candidates).await;
        for address in decision.kept {
            self.store.mark_kept(address, now).await?;
        }

        let approved: Vec<(String, UnsubscribeAction)> = candidates
            .iter()
            .filter(|c| decision.approved.contains(&c.sender_address))
            .filter_map(|c| c.action.clone().map(|a| (c.sender_address.clone(), a)))
            .collect();

        let attempts = self.execute_and_record(approved, &ingestion).await?;

        Ok(RunReport {
            messages_scanned: ingestion.messages_scanned,
            senders_updated: ingestion.senders_updated,
            samples_recorded: ingestion.samples_recorded,
            candidates_presented: candidates.len(),
            attempts,
            manual_followups: ingestion.manual,
            cancelled: self.cancel.is_cancelled(),
        })
    }

    /// Runs the daily variant: exactly the single top-ranked,
    /// not-recently-shown candidate, auto-confirmed.
    pub async fn run_daily(&self) -> Result<RunReport, LoopError> {
        let now = Utc::now();
        let ingestion = self.ingest(now).await?;

        let ranking = self
            .store
            .relevance_ranking(self.settings.scan.lookback_days, true, now)
            .await?;

        let Some(pick) = ranking
            .into_iter()
            .find(|r| ingestion.actions.contains_key(&r.sender.address))
        else {
            tracing::info!("no suggestion today; inbox looks clean");
            return Ok(RunReport {
                messages_scanned: ingestion.messages_scanned,
                senders_updated: ingestion.senders_updated,
                samples_recorded: ingestion.samples_recorded,
                manual_followups: ingestion.manual,
                ..RunReport::default()
            });
        };

        let address = pick.sender.address.clone();
        tracing::info!(sender = %address, score = pick.score.value, "daily suggestion");

        self.store.mark_shown(vec![address.clone()], now).await?;

        let action = ingestion.actions[&address].clone();
        let attempts = self
            .execute_and_record(vec![(address, action)], &ingestion)
            .await?;

        Ok(RunReport {
            messages_scanned: ingestion.messages_scanned,
            senders_updated: ingestion.senders_updated,
            samples_recorded: ingestion.samples_recorded,
            candidates_presented: 1,
            attempts,
            manual_followups: ingestion.manual,
            cancelled: self.cancel.is_cancelled(),
        })
    }

    /// Refreshes post-attempt samples from a scan, then reports.
    pub async fn check_effectiveness(&self) -> Result<Vec<EffectivenessEntry>, LoopError> {
        let now = Utc::now();
        self.ingest(now).await?;
        Ok(self.store.effectiveness_report(now).await?)
    }

    /// Fetches the window, rebuilds aggregates, and records post-attempt
    /// samples. Re-running over an unchanged message set changes nothing.
    async fn ingest(&self, now: DateTime<Utc>) -> Result<Ingestion, LoopError> {
        let query = MailboxQuery::window(
            self.settings.scan.lookback_days,
            self.settings.scan.max_messages,
        );
        let messages = self.mailbox.fetch_messages(&query).await?;
        tracing::info!(count = messages.len(), "ingesting window");

        let mut by_sender: HashMap<String, Vec<&MessageSummary>> = HashMap::new();
        for message in &messages {
            let address = message.from.canonical();
            if address.is_empty() {
                continue;
            }
            by_sender.entry(address).or_default().push(message);
        }

        let mut actions = HashMap::new();
        let mut subjects = HashMap::new();
        let mut message_senders = HashMap::new();
        let mut manual = Vec::new();
        let senders_updated = by_sender.len();

        for (address, mut sender_messages) in by_sender {
            sender_messages.sort_by(|a, b| b.received_at.cmp(&a.received_at));

            let aggregate = build_aggregate(
                &address,
                &sender_messages,
                self.settings.scan.lookback_days,
            );
            self.store.record_reading_sample(aggregate, now).await?;

            subjects.insert(
                address.clone(),
                sender_messages
                    .iter()
                    .filter_map(|m| subject_of(m))
                    .take(3)
                    .collect(),
            );

            let mut mention: Option<MessageId> = None;
            for message in &sender_messages {
                message_senders.insert(message.id.clone(), address.clone());

                if actions.contains_key(&address) {
                    continue;
                }
                let extraction = extract_actions(message);
                if let Some(best) = extraction.actions.into_iter().next() {
                    actions.insert(address.clone(), best);
                } else if extraction.mentions_unsubscribe && mention.is_none() {
                    mention = Some(message.id.clone());
                }
            }
            if !actions.contains_key(&address) {
                if let Some(message_id) = mention {
                    manual.push(ManualFollowup {
                        sender_address: address.clone(),
                        message_id,
                    });
                }
            }
        }

        let mut samples_recorded = 0;
        for message in &messages {
            let inserted = self
                .store
                .record_post_attempt_sample(
                    message.from.canonical(),
                    message.id.clone(),
                    message.received_at,
                )
                .await?;
            if inserted {
                samples_recorded += 1;
            }
        }

        Ok(Ingestion {
            messages_scanned: messages.len(),
            senders_updated,
            samples_recorded,
            actions,
            subjects,
            message_senders,
            manual,
        })
    }

    /// Executes approved actions through the bounded pool and records one
    /// attempt per executed action. Store failures abort the run.
    async fn execute_and_record(
        &self,
        approved: Vec<(String, UnsubscribeAction)>,
        ingestion: &Ingestion,
    ) -> Result<Vec<UnsubscribeAttempt>, LoopError> {
        if approved.is_empty() {
            return Ok(Vec::new());
        }

        let deadline = Instant::now() + self.settings.automation.run_timeout();
        let actions: Vec<UnsubscribeAction> = approved.iter().map(|(_, a)| a.clone()).collect();

        let results = self
            .executor
            .execute_all(actions, &self.cancel, Some(deadline))
            .await;

        let mut attempts = Vec::new();
        for result in results {
            let Some(address) = ingestion.message_senders.get(&result.action.message_id) else {
                tracing::warn!(url = %result.action.url, "result for unknown message; skipping");
                continue;
            };
            let attempt = to_attempt(address.clone(), &result);
            self.store.record_attempt(attempt.clone()).await?;

            // Archive failures are per-message and never abort the batch.
            if attempt.outcome == AttemptOutcome::Success {
                if let Err(e) = self.mailbox.archive(&result.action.message_id).await {
                    tracing::warn!(
                        sender = %attempt.sender_address,
                        error = %e,
                        "could not archive source message"
                    );
                }
            }
            attempts.push(attempt);
        }
        Ok(attempts)
    }

    /// Fetches decorative summaries after ranking. Failures are logged and
    /// ignored; candidates are complete without them.
    async fn decorate_with_summaries(
        &self,
        candidates: &mut [Candidate],
        subjects: &HashMap<String, Vec<String>>,
    ) {
        let Some(summarizer) = &self.summarizer else {
            return;
        };
        if !self.settings.ai.enabled {
            return;
        }

        for candidate in candidates.iter_mut() {
            let name = candidate
                .display_name
                .clone()
                .unwrap_or_else(|| candidate.sender_address.clone());
            let samples = subjects
                .get(&candidate.sender_address)
                .cloned()
                .unwrap_or_default();

            match summarizer.summarize_sender(&name, &samples).await {
                Ok(summary) => candidate.summary = Some(summary),
                Err(e) => {
                    tracing::warn!(sender = %candidate.sender_address, error = %e, "summary failed")
                }
            }
        }
    }
}

fn build_aggregate(
    address: &str,
    messages_newest_first: &[&MessageSummary],
    window_days: u32,
) -> ReadingAggregate {
    let total_received = messages_newest_first.len() as u32;
    let total_unread = messages_newest_first.iter().filter(|m| !m.is_read).count() as u32;

    ReadingAggregate {
        sender_address: address.to_string(),
        sender_name: messages_newest_first
            .iter()
            .find_map(|m| m.from.name.clone()),
        window_days,
        total_received,
        total_read: total_received - total_unread,
        total_unread,
        last_read_at: messages_newest_first
            .iter()
            .filter(|m| m.is_read)
            .map(|m| m.received_at)
            .max(),
        last_received_at: messages_newest_first.iter().map(|m| m.received_at).max(),
    }
}

fn subject_of(message: &MessageSummary) -> Option<String> {
    let (headers, _) = mailparse::parse_headers(message.raw_headers.as_bytes()).ok()?;
    headers.get_first_value("Subject")
}

fn to_attempt(sender_address: String, result: &AttemptResult) -> UnsubscribeAttempt {
    UnsubscribeAttempt {
        id: AttemptId::generate(),
        sender_address,
        action_kind: result.action.kind,
        target_url: result.action.url.clone(),
        message_id: Some(result.action.message_id.clone()),
        outcome: result.outcome,
        failure_reason: result.failure_reason,
        confirm_steps: result.confirm_steps,
        attempted_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::domain::{Address, AttemptOutcome};
    use crate::providers::browser::{
        BrowserSession, Control, ControlPattern, Result as BrowserResult,
    };
    use crate::storage::Database;
    use chrono::Duration;
    use std::sync::Mutex;
    use std::time::Duration as StdDuration;

    /// Mailbox serving a fixed message set, recording archive commands.
    struct FixedMailbox {
        messages: Vec<MessageSummary>,
        archived: Mutex<Vec<MessageId>>,
    }

    impl FixedMailbox {
        fn new(messages: Vec<MessageSummary>) -> Self {
            Self {
                messages,
                archived: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MailboxProvider for FixedMailbox {
        async fn fetch_messages(
            &self,
            _query: &MailboxQuery,
        ) -> crate::providers::mailbox::Result<Vec<MessageSummary>> {
            Ok(self.messages.clone())
        }

        async fn archive(&self, id: &MessageId) -> crate::providers::mailbox::Result<()> {
            self.archived.lock().unwrap().push(id.clone());
            Ok(())
        }
    }

    /// Browser whose every page shows the same text and no controls.
    struct StaticBrowser {
        text: String,
    }

    #[async_trait]
    impl BrowserProvider for StaticBrowser {
        async fn open_context(&self, _headless: bool) -> BrowserResult<Box<dyn BrowserSession>> {
            Ok(Box::new(StaticSession {
                text: self.text.clone(),
            }))
        }
    }

    struct StaticSession {
        text: String,
    }

    #[async_trait]
    impl BrowserSession for StaticSession {
        async fn navigate(&mut self, _url: &str, _timeout: StdDuration) -> BrowserResult<()> {
            Ok(())
        }

        async fn find_control(
            &mut self,
            _patterns: &[ControlPattern],
        ) -> BrowserResult<Option<Control>> {
            Ok(None)
        }

        async fn click(&mut self, _control: &Control) -> BrowserResult<()> {
            Ok(())
        }

        async fn wait_for_text(
            &mut self,
            phrases: &[&str],
            _timeout: StdDuration,
        ) -> BrowserResult<bool> {
            Ok(phrases.iter().any(|p| self.text.contains(p)))
        }

        async fn close(&mut self) {}
    }

    /// Reviewer that approves everything and records what it saw.
    struct ApproveAll {
        seen: Mutex<Vec<Candidate>>,
    }

    impl ApproveAll {
        fn new() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CandidateReviewer for ApproveAll {
        async fn review(&self, candidates: &[Candidate]) -> ReviewDecision {
            self.seen.lock().unwrap().extend(candidates.iter().cloned());
            ReviewDecision {
                approved: candidates.iter().map(|c| c.sender_address.clone()).collect(),
                kept: Vec::new(),
            }
        }
    }

    fn promo_message(id: &str, sender: &str, days_ago: i64, read: bool) -> MessageSummary {
        MessageSummary {
            id: MessageId::from(id),
            from: Address::with_name(sender, "Shop Deals"),
            received_at: Utc::now() - Duration::days(days_ago),
            is_read: read,
            category: Some("promotions".to_string()),
            raw_headers: format!(
                "From: {}\r\nSubject: Big sale {}\r\nList-Unsubscribe: <https://shop.example/unsub?u={}>\r\n\r\n",
                sender, id, sender
            ),
            body: String::new(),
        }
    }

    fn quick_settings() -> Settings {
        let mut settings = Settings::default();
        settings.automation.navigation_timeout_secs = 1;
        settings.automation.locate_budget_secs = 1;
        settings.automation.confirmation_grace_secs = 1;
        settings.automation.verification_wait_secs = 1;
        settings
    }

    async fn make_loop(
        messages: Vec<MessageSummary>,
        page_text: &str,
    ) -> LearningLoop<FixedMailbox, StaticBrowser> {
        let db = Database::open_in_memory().await.unwrap();
        let settings = quick_settings();
        let store = EffectivenessStore::new(db, settings.scoring.clone());
        let executor = AutomationExecutor::new(
            StaticBrowser {
                text: page_text.to_string(),
            },
            settings.automation.executor_config(),
        );
        LearningLoop::new(FixedMailbox::new(messages), executor, store, settings)
    }

    fn unread_burst(sender: &str, count: usize) -> Vec<MessageSummary> {
        (0..count)
            .map(|i| promo_message(&format!("{}-{}", sender, i), sender, i as i64, false))
            .collect()
    }

    #[tokio::test]
    async fn batch_run_records_one_attempt_per_approved_sender() {
        let mut messages = unread_burst("deals@shop.example", 5);
        // A sender the user actually reads: never a candidate.
        messages.push(promo_message("r-1", "liked@shop.example", 1, true));

        let learning = make_loop(messages, "you have been unsubscribed").await;
        let reviewer = ApproveAll::new();

        let report = learning.run_batch(&reviewer).await.unwrap();

        assert_eq!(report.messages_scanned, 6);
        assert_eq!(report.senders_updated, 2);
        assert_eq!(report.candidates_presented, 1);
        assert_eq!(report.attempts.len(), 1);

        let attempt = &report.attempts[0];
        assert_eq!(attempt.sender_address, "deals@shop.example");
        assert_eq!(attempt.outcome, AttemptOutcome::Success);

        let sender = learning
            .store
            .sender("deals@shop.example".to_string())
            .await
            .unwrap()
            .unwrap();
        assert!(sender.is_unsubscribed());

        // The source message of the successful attempt was archived.
        let archived = learning.mailbox.archived.lock().unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0], attempt.message_id.clone().unwrap());
    }

    #[tokio::test]
    async fn rerun_over_unchanged_messages_is_idempotent() {
        let learning = make_loop(unread_burst("deals@shop.example", 5), "").await;

        let first = learning.ingest(Utc::now()).await.unwrap();
        let agg_before = learning
            .store
            .sender("deals@shop.example".to_string())
            .await
            .unwrap()
            .unwrap();

        let second = learning.ingest(Utc::now()).await.unwrap();
        let agg_after = learning
            .store
            .sender("deals@shop.example".to_string())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.messages_scanned, second.messages_scanned);
        assert_eq!(agg_before.lifetime_messages, agg_after.lifetime_messages);
        assert_eq!(agg_before.unread_messages, agg_after.unread_messages);
        assert_eq!(second.samples_recorded, 0);
    }

    #[tokio::test]
    async fn shown_senders_sit_out_the_next_batch() {
        let learning = make_loop(unread_burst("deals@shop.example", 5), "").await;
        let reviewer = ApproveAll::new();

        // First run surfaces the sender (attempt is uncertain: blank page).
        let report = learning.run_batch(&reviewer).await.unwrap();
        assert_eq!(report.candidates_presented, 1);

        // Second run: shown + retry cooldowns both hide it.
        let report = learning.run_batch(&reviewer).await.unwrap();
        assert_eq!(report.candidates_presented, 0);
        assert!(report.attempts.is_empty());
    }

    #[tokio::test]
    async fn uncertain_outcome_keeps_sender_active() {
        let learning = make_loop(unread_burst("deals@shop.example", 5), "").await;
        let reviewer = ApproveAll::new();

        let report = learning.run_batch(&reviewer).await.unwrap();
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(report.attempts[0].outcome, AttemptOutcome::Uncertain);

        let sender = learning
            .store
            .sender("deals@shop.example".to_string())
            .await
            .unwrap()
            .unwrap();
        assert!(!sender.is_unsubscribed());
    }

    #[tokio::test]
    async fn manual_mention_is_flagged_not_executed() {
        let mut message = promo_message("m-1", "plain@example.com", 1, false);
        message.raw_headers = "From: plain@example.com\r\n\r\n".to_string();
        message.body = "Reply UNSUBSCRIBE to stop these mails".to_string();
        let messages = vec![
            message.clone(),
            MessageSummary {
                id: MessageId::from("m-2"),
                ..message.clone()
            },
            MessageSummary {
                id: MessageId::from("m-3"),
                ..message
            },
        ];

        let learning = make_loop(messages, "").await;
        let reviewer = ApproveAll::new();
        let report = learning.run_batch(&reviewer).await.unwrap();

        assert_eq!(report.manual_followups.len(), 1);
        assert_eq!(report.manual_followups[0].sender_address, "plain@example.com");
        // The candidate is surfaced with no action and nothing executes.
        assert_eq!(report.candidates_presented, 1);
        assert!(report.attempts.is_empty());
    }

    #[tokio::test]
    async fn daily_run_takes_single_top_candidate() {
        let mut messages = unread_burst("worst@shop.example", 10);
        messages.extend(unread_burst("lesser@shop.example", 4));

        let learning = make_loop(messages, "you have been unsubscribed").await;
        let report = learning.run_daily().await.unwrap();

        assert_eq!(report.candidates_presented, 1);
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(report.attempts[0].sender_address, "worst@shop.example");
        assert_eq!(report.attempts[0].outcome, AttemptOutcome::Success);
    }

    #[tokio::test]
    async fn check_effectiveness_records_fresh_samples() {
        let learning = make_loop(unread_burst("deals@shop.example", 5), "").await;

        // Mark the sender unsubscribed in the past, then re-scan.
        learning
            .store
            .record_attempt(UnsubscribeAttempt {
                id: AttemptId::generate(),
                sender_address: "deals@shop.example".to_string(),
                action_kind: crate::domain::ActionKind::HeaderLink,
                target_url: "https://shop.example/unsub".to_string(),
                message_id: None,
                outcome: AttemptOutcome::Success,
                failure_reason: None,
                confirm_steps: 0,
                attempted_at: Utc::now() - Duration::days(20),
            })
            .await
            .unwrap();

        let report = learning.check_effectiveness().await.unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].messages_after, 5);
        assert!(report[0].still_sending);
    }
}
