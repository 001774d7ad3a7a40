//! Automation executor state machine.
//!
//! Drives one unsubscribe action through an isolated browser session:
//!
//! ```text
//! Navigating -> LocatingControl -> Confirming -> Verifying -> Terminal
//! ```
//!
//! Every wait is bounded, every action produces exactly one terminal result,
//! and the executor never retries within a run; re-attempting a sender is
//! the learning loop's decision on a later run.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::domain::{AttemptOutcome, FailureReason, UnsubscribeAction};
use crate::providers::browser::{BrowserProvider, BrowserSession};

use super::patterns::{
    confirmation_patterns, unsubscribe_patterns, BLOCKED_PHRASES, SUCCESS_PHRASES,
};

/// Tuning for the executor's bounded waits.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Budget for the initial page load.
    pub navigation_timeout: Duration,
    /// Budget for locating the primary control.
    pub locate_budget: Duration,
    /// Grace period for a secondary confirmation control to appear.
    pub confirmation_grace: Duration,
    /// Budget for the positive confirmation signal.
    pub verification_wait: Duration,
    /// Maximum secondary confirmation clicks before giving up.
    pub max_confirmation_hops: u32,
    /// Whether sessions run headless.
    pub headless: bool,
    /// Bounded worker pool size for independent sessions.
    pub parallel_sessions: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(15),
            locate_budget: Duration::from_secs(5),
            confirmation_grace: Duration::from_secs(3),
            verification_wait: Duration::from_secs(5),
            max_confirmation_hops: 2,
            headless: true,
            parallel_sessions: 3,
        }
    }
}

/// Terminal result of executing one action.
#[derive(Debug, Clone)]
pub struct AttemptResult {
    /// The action that was executed.
    pub action: UnsubscribeAction,
    /// Terminal classification.
    pub outcome: AttemptOutcome,
    /// Reason for a non-success terminal state.
    pub failure_reason: Option<FailureReason>,
    /// Secondary confirmation clicks performed.
    pub confirm_steps: u32,
}

/// State machine steps, in order. Terminal states are the return values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Navigating,
    LocatingControl,
    Confirming,
    Verifying,
}

/// Executes unsubscribe actions through a browser provider.
pub struct AutomationExecutor<P> {
    provider: Arc<P>,
    config: ExecutorConfig,
}

impl<P: BrowserProvider> AutomationExecutor<P> {
    /// Creates an executor over the given browser provider.
    pub fn new(provider: P, config: ExecutorConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            config,
        }
    }

    /// Returns the executor configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Runs one action to a terminal state. Infallible by contract: every
    /// browser problem is classified into an outcome, never propagated.
    pub async fn execute(&self, action: &UnsubscribeAction) -> AttemptResult {
        let mut session = match self.provider.open_context(self.config.headless).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(url = %action.url, error = %e, "could not open browser context");
                return AttemptResult {
                    action: action.clone(),
                    outcome: AttemptOutcome::Failure,
                    failure_reason: Some(FailureReason::NavigationTimeout),
                    confirm_steps: 0,
                };
            }
        };

        let (outcome, failure_reason, confirm_steps) =
            self.run_flow(session.as_mut(), action).await;
        session.close().await;

        tracing::info!(
            url = %action.url,
            outcome = outcome.as_str(),
            reason = failure_reason.map(|r| r.as_str()).unwrap_or("-"),
            confirm_steps,
            "unsubscribe attempt finished"
        );

        AttemptResult {
            action: action.clone(),
            outcome,
            failure_reason,
            confirm_steps,
        }
    }

    /// Runs many actions through a bounded session pool.
    ///
    /// Dispatch stops when the token is cancelled or the deadline passes;
    /// actions already in flight still finish, actions never dispatched
    /// produce no result at all.
    pub async fn execute_all(
        &self,
        actions: Vec<UnsubscribeAction>,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Vec<AttemptResult> {
        let concurrency = self.config.parallel_sessions.max(1);

        stream::iter(actions)
            .take_while(|_| {
                let stop = cancel.is_cancelled()
                    || deadline.is_some_and(|d| Instant::now() >= d);
                if stop {
                    tracing::warn!("stopping dispatch of remaining unsubscribe actions");
                }
                futures::future::ready(!stop)
            })
            .map(|action| async move { self.execute(&action).await })
            .buffer_unordered(concurrency)
            .collect()
            .await
    }

    async fn run_flow(
        &self,
        session: &mut dyn BrowserSession,
        action: &UnsubscribeAction,
    ) -> (AttemptOutcome, Option<FailureReason>, u32) {
        let mut step = Step::Navigating;
        let mut confirm_steps = 0u32;

        loop {
            step = match step {
                Step::Navigating => {
                    match session
                        .navigate(&action.url, self.config.navigation_timeout)
                        .await
                    {
                        Ok(()) => Step::LocatingControl,
                        Err(e) => {
                            tracing::debug!(url = %action.url, error = %e, "navigation failed");
                            return (
                                AttemptOutcome::Failure,
                                Some(FailureReason::NavigationTimeout),
                                confirm_steps,
                            );
                        }
                    }
                }

                Step::LocatingControl => {
                    let found = tokio::time::timeout(
                        self.config.locate_budget,
                        session.find_control(&unsubscribe_patterns()),
                    )
                    .await;

                    match found {
                        Ok(Ok(Some(control))) => {
                            tracing::debug!(label = %control.label, "clicking unsubscribe control");
                            if let Err(e) = session.click(&control).await {
                                tracing::debug!(error = %e, "click failed");
                                return (
                                    AttemptOutcome::Failure,
                                    Some(FailureReason::NavigationTimeout),
                                    confirm_steps,
                                );
                            }
                            Step::Confirming
                        }
                        // One-click targets often land directly on a
                        // confirmation page with nothing left to press.
                        Ok(Ok(None)) | Ok(Err(_)) | Err(_) => {
                            if self.signal(session, SUCCESS_PHRASES, Duration::ZERO).await {
                                return (AttemptOutcome::Success, None, confirm_steps);
                            }
                            return (
                                AttemptOutcome::Uncertain,
                                Some(FailureReason::NoControlFound),
                                confirm_steps,
                            );
                        }
                    }
                }

                Step::Confirming => {
                    let found = tokio::time::timeout(
                        self.config.confirmation_grace,
                        session.find_control(&confirmation_patterns()),
                    )
                    .await;

                    match found {
                        Ok(Ok(Some(control))) => {
                            if confirm_steps >= self.config.max_confirmation_hops {
                                return (
                                    AttemptOutcome::Uncertain,
                                    Some(FailureReason::TooManySteps),
                                    confirm_steps,
                                );
                            }
                            tracing::debug!(label = %control.label, "clicking confirmation control");
                            if let Err(e) = session.click(&control).await {
                                tracing::debug!(error = %e, "confirmation click failed");
                                return (
                                    AttemptOutcome::Failure,
                                    Some(FailureReason::NavigationTimeout),
                                    confirm_steps,
                                );
                            }
                            confirm_steps += 1;
                            Step::Confirming
                        }
                        Ok(Ok(None)) | Ok(Err(_)) | Err(_) => Step::Verifying,
                    }
                }

                Step::Verifying => {
                    if self
                        .signal(session, SUCCESS_PHRASES, self.config.verification_wait)
                        .await
                    {
                        return (AttemptOutcome::Success, None, confirm_steps);
                    }
                    if self
                        .signal(session, BLOCKED_PHRASES, Duration::from_secs(1))
                        .await
                    {
                        return (
                            AttemptOutcome::Failure,
                            Some(FailureReason::Blocked),
                            confirm_steps,
                        );
                    }
                    return (
                        AttemptOutcome::Uncertain,
                        Some(FailureReason::NoConfirmationText),
                        confirm_steps,
                    );
                }
            };
        }
    }

    /// Bounded check for a text signal; driver errors count as no signal.
    async fn signal(
        &self,
        session: &mut dyn BrowserSession,
        phrases: &[&str],
        wait: Duration,
    ) -> bool {
        // The outer timeout guards drivers that ignore their wait budget.
        let budget = wait + Duration::from_secs(1);
        matches!(
            tokio::time::timeout(budget, session.wait_for_text(phrases, wait)).await,
            Ok(Ok(true))
        )
    }
}
