//! Integration tests for the engine.
//!
//! These tests run full batch pipelines over mock collaborators and an
//! in-memory store, verifying behavior across module boundaries. Each
//! module contains its own unit tests for detailed logic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;

use mailsweep::automation::AutomationExecutor;
use mailsweep::config::Settings;
use mailsweep::domain::{Address, AttemptOutcome, MessageId, MessageSummary};
use mailsweep::providers::browser::{
    BrowserProvider, BrowserSession, Control, ControlPattern, ControlTarget,
};
use mailsweep::providers::mailbox::{MailboxProvider, MailboxQuery};
use mailsweep::services::{
    Candidate, CandidateReviewer, EffectivenessStore, LearningLoop, ReviewDecision,
};
use mailsweep::storage::Database;

// ============================================================================
// Mock collaborators
// ============================================================================

struct FixedMailbox {
    messages: Vec<MessageSummary>,
}

#[async_trait]
impl MailboxProvider for FixedMailbox {
    async fn fetch_messages(
        &self,
        _query: &MailboxQuery,
    ) -> mailsweep::providers::mailbox::Result<Vec<MessageSummary>> {
        Ok(self.messages.clone())
    }

    async fn archive(&self, _id: &MessageId) -> mailsweep::providers::mailbox::Result<()> {
        Ok(())
    }
}

/// A browser whose sessions present an unsubscribe link, then a
/// confirmation page, then a success page, the common two-step flow.
struct TwoStepBrowser {
    sessions_opened: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserProvider for TwoStepBrowser {
    async fn open_context(
        &self,
        _headless: bool,
    ) -> mailsweep::providers::browser::Result<Box<dyn BrowserSession>> {
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TwoStepSession { page: 0 }))
    }
}

struct TwoStepSession {
    page: usize,
}

#[async_trait]
impl BrowserSession for TwoStepSession {
    async fn navigate(
        &mut self,
        _url: &str,
        _timeout: StdDuration,
    ) -> mailsweep::providers::browser::Result<()> {
        self.page = 0;
        Ok(())
    }

    async fn find_control(
        &mut self,
        patterns: &[ControlPattern],
    ) -> mailsweep::providers::browser::Result<Option<Control>> {
        let confirming = patterns
            .first()
            .is_some_and(|p| *p == ControlPattern::ExactText("confirm".to_string()));

        let control = |label: &str| Control {
            label: label.to_string(),
            target: ControlTarget::Link {
                href: "/next".to_string(),
            },
        };

        Ok(match (self.page, confirming) {
            (0, false) => Some(control("Unsubscribe")),
            (1, true) => Some(control("Confirm")),
            _ => None,
        })
    }

    async fn click(&mut self, _control: &Control) -> mailsweep::providers::browser::Result<()> {
        self.page += 1;
        Ok(())
    }

    async fn wait_for_text(
        &mut self,
        phrases: &[&str],
        _timeout: StdDuration,
    ) -> mailsweep::providers::browser::Result<bool> {
        if self.page < 2 {
            return Ok(false);
        }
        Ok(phrases.contains(&"successfully unsubscribed"))
    }

    async fn close(&mut self) {}
}

struct ApproveAll;

#[async_trait]
impl CandidateReviewer for ApproveAll {
    async fn review(&self, candidates: &[Candidate]) -> ReviewDecision {
        ReviewDecision {
            approved: candidates.iter().map(|c| c.sender_address.clone()).collect(),
            kept: Vec::new(),
        }
    }
}

/// Keeps every candidate instead of approving any.
struct KeepAll {
    seen: Mutex<usize>,
}

#[async_trait]
impl CandidateReviewer for KeepAll {
    async fn review(&self, candidates: &[Candidate]) -> ReviewDecision {
        *self.seen.lock().unwrap() += candidates.len();
        ReviewDecision {
            approved: Vec::new(),
            kept: candidates.iter().map(|c| c.sender_address.clone()).collect(),
        }
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn promo_message(id: &str, sender: &str, days_ago: i64, read: bool) -> MessageSummary {
    MessageSummary {
        id: MessageId::from(id),
        from: Address::with_name(sender, "Promo Desk"),
        received_at: Utc::now() - Duration::days(days_ago),
        is_read: read,
        category: Some("promotions".to_string()),
        raw_headers: format!(
            "From: {sender}\r\nSubject: Deals inside\r\nList-Unsubscribe: <https://mail.example/unsub?s={sender}>\r\n\r\n"
        ),
        body: format!(r#"<a href="https://mail.example/unsub?s={sender}">Unsubscribe</a>"#),
    }
}

fn unread_burst(sender: &str, count: usize) -> Vec<MessageSummary> {
    (0..count)
        .map(|i| promo_message(&format!("{sender}-{i}"), sender, i as i64, false))
        .collect()
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
) -> (LearningLoop<FixedMailbox, TwoStepBrowser>, Arc<AtomicUsize>) {
    let db = Database::open_in_memory().await.unwrap();
    let settings = quick_settings();
    let store = EffectivenessStore::new(db, settings.scoring.clone());

    let sessions = Arc::new(AtomicUsize::new(0));
    let browser = TwoStepBrowser {
        sessions_opened: sessions.clone(),
    };
    let executor = AutomationExecutor::new(browser, settings.automation.executor_config());

    (
        LearningLoop::new(FixedMailbox { messages }, executor, store, settings),
        sessions,
    )
}

// ============================================================================
// End-to-end batch runs
// ============================================================================

#[tokio::test]
async fn full_batch_extracts_ranks_executes_and_records() {
    let mut messages = unread_burst("deals@shop.example", 6);
    messages.extend(unread_burst("news@letter.example", 4));
    messages.push(promo_message("liked-1", "liked@shop.example", 1, true));

    let (learning, sessions) = make_loop(messages).await;
    let report = learning.run_batch(&ApproveAll).await.unwrap();

    assert_eq!(report.messages_scanned, 11);
    assert_eq!(report.senders_updated, 3);
    assert_eq!(report.candidates_presented, 2);
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(sessions.load(Ordering::SeqCst), 2);

    for attempt in &report.attempts {
        assert_eq!(attempt.outcome, AttemptOutcome::Success);
        assert_eq!(attempt.confirm_steps, 1);
    }

    // Worst offender first: more unread, same ratio profile.
    assert_eq!(report.attempts.iter().filter(|a| a.sender_address == "deals@shop.example").count(), 1);
}

#[tokio::test]
async fn exactly_one_attempt_row_per_executed_action() {
    let (learning, _) = make_loop(unread_burst("deals@shop.example", 5)).await;
    let report = learning.run_batch(&ApproveAll).await.unwrap();

    assert_eq!(report.attempts.len(), 1);

    let attempts = learning
        .store()
        .statistics()
        .await
        .unwrap();
    assert_eq!(attempts.total_attempts, 1);
    assert_eq!(attempts.successful_attempts, 1);
}

#[tokio::test]
async fn second_run_does_not_reattempt_unsubscribed_sender() {
    let (learning, sessions) = make_loop(unread_burst("deals@shop.example", 5)).await;

    let first = learning.run_batch(&ApproveAll).await.unwrap();
    assert_eq!(first.attempts.len(), 1);

    let second = learning.run_batch(&ApproveAll).await.unwrap();
    assert_eq!(second.candidates_presented, 0);
    assert!(second.attempts.is_empty());
    assert_eq!(sessions.load(Ordering::SeqCst), 1);

    let stats = learning.store().statistics().await.unwrap();
    assert_eq!(stats.total_attempts, 1);
    assert_eq!(stats.unsubscribed, 1);
}

#[tokio::test]
async fn kept_sender_is_excluded_within_cooldown() {
    let (learning, sessions) = make_loop(unread_burst("deals@shop.example", 5)).await;

    let keeper = KeepAll {
        seen: Mutex::new(0),
    };
    let first = learning.run_batch(&keeper).await.unwrap();
    assert_eq!(first.candidates_presented, 1);
    assert!(first.attempts.is_empty());
    assert_eq!(sessions.load(Ordering::SeqCst), 0);

    // Within the cooldown the kept sender is not shown again.
    let second = learning.run_batch(&keeper).await.unwrap();
    assert_eq!(second.candidates_presented, 0);
    assert_eq!(*keeper.seen.lock().unwrap(), 1);
}

#[tokio::test]
async fn reingestion_is_idempotent_end_to_end() {
    let (learning, _) = make_loop(unread_burst("deals@shop.example", 5)).await;

    learning.run_batch(&ApproveAll).await.unwrap();
    let sender_after_first = learning
        .store()
        .sender("deals@shop.example".to_string())
        .await
        .unwrap()
        .unwrap();

    // Same window again: aggregates unchanged, samples not duplicated.
    learning.run_batch(&ApproveAll).await.unwrap();
    let report = learning.check_effectiveness().await.unwrap();
    let sender_after_second = learning
        .store()
        .sender("deals@shop.example".to_string())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        sender_after_first.lifetime_messages,
        sender_after_second.lifetime_messages
    );
    assert_eq!(report.len(), 1);
    // All five messages predate the attempt, so none count against it.
    assert_eq!(report[0].messages_after, 0);
    assert!(!report[0].still_sending);
}

// ============================================================================
// Effectiveness reporting across runs
// ============================================================================

#[tokio::test]
async fn still_sending_sender_is_surfaced_not_retried() {
    let (learning, sessions) = make_loop(unread_burst("deals@shop.example", 5)).await;

    // Run one: unsubscribes the sender.
    learning.run_batch(&ApproveAll).await.unwrap();
    assert_eq!(sessions.load(Ordering::SeqCst), 1);

    // The same messages arrive "again" and now postdate the attempt
    // because their ids are fresh.
    let late_messages = (0..3)
        .map(|i| {
            let mut m = promo_message(&format!("late-{i}"), "deals@shop.example", 0, false);
            m.received_at = Utc::now() + Duration::seconds(i + 1);
            m
        })
        .collect::<Vec<_>>();

    let db_report = {
        let (relisted, relist_sessions) = remake_with_store(&learning, late_messages).await;
        let report = relisted.check_effectiveness().await.unwrap();
        assert_eq!(relist_sessions.load(Ordering::SeqCst), 0);
        report
    };

    assert_eq!(db_report.len(), 1);
    let entry = &db_report[0];
    assert_eq!(entry.sender_address, "deals@shop.example");
    assert_eq!(entry.messages_after, 3);
    assert!(entry.still_sending);

    // Reporting never triggered another automation session.
    assert_eq!(sessions.load(Ordering::SeqCst), 1);
}

/// Builds a second loop over the same store with a different message set,
/// as a later run against a newer window would.
async fn remake_with_store(
    original: &LearningLoop<FixedMailbox, TwoStepBrowser>,
    messages: Vec<MessageSummary>,
) -> (LearningLoop<FixedMailbox, TwoStepBrowser>, Arc<AtomicUsize>) {
    let settings = quick_settings();
    let sessions = Arc::new(AtomicUsize::new(0));
    let browser = TwoStepBrowser {
        sessions_opened: sessions.clone(),
    };
    let executor = AutomationExecutor::new(browser, settings.automation.executor_config());
    (
        LearningLoop::new(
            FixedMailbox { messages },
            executor,
            original.store().clone(),
            settings,
        ),
        sessions,
    )
}

// ============================================================================
// Daily mode
// ============================================================================

#[tokio::test]
async fn daily_mode_processes_single_top_sender() {
    let mut messages = unread_burst("worst@shop.example", 12);
    messages.extend(unread_burst("lesser@shop.example", 4));

    let (learning, sessions) = make_loop(messages).await;
    let report = learning.run_daily().await.unwrap();

    assert_eq!(report.candidates_presented, 1);
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(report.attempts[0].sender_address, "worst@shop.example");
    assert_eq!(sessions.load(Ordering::SeqCst), 1);

    // The runner-up is untouched and still ranked for tomorrow.
    let sender = learning
        .store()
        .sender("lesser@shop.example".to_string())
        .await
        .unwrap()
        .unwrap();
    assert!(!sender.is_unsubscribed());
}
