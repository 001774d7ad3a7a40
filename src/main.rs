//! mailsweep - entry point for the unsubscribe automation engine.
//!
//! The CLI only selects which engine operations run and with what
//! parameters; all behavior lives in the library crate.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;

use mailsweep::automation::AutomationExecutor;
use mailsweep::providers::ai::AnthropicSummarizer;
use mailsweep::providers::browser::HttpBrowser;
use mailsweep::providers::mailbox::JsonFileMailbox;
use mailsweep::services::{Candidate, CandidateReviewer, EffectivenessStore, ReviewDecision};
use mailsweep::storage::Database;
use mailsweep::{LearningLoop, Settings};

#[derive(Debug, Parser)]
#[clap(name = "mailsweep")]
#[clap(author, version, about)]
struct Args {
    /// Path to a JSON message export to scan.
    #[clap(long, value_name = "FILE")]
    mailbox: PathBuf,

    /// Database path (defaults to the platform data directory).
    #[clap(long, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Days to look back when scanning.
    #[clap(long, default_value_t = 90)]
    days: u32,

    /// Maximum candidates to surface per batch.
    #[clap(long, default_value_t = 10)]
    max_candidates: u32,

    /// Show the browser window during automation.
    #[clap(long)]
    headed: bool,

    /// Suggest and process a single sender, without interactive review.
    #[clap(long)]
    daily: bool,

    /// Report effectiveness of previous unsubscribes and exit.
    #[clap(long)]
    check_effectiveness: bool,

    /// Disable AI summaries even if configured.
    #[clap(long)]
    no_ai: bool,
}

/// Minimal interactive reviewer: list the candidates, one yes/no for the
/// batch. Anything fancier belongs in a real UI, not the engine.
struct StdinReviewer;

#[async_trait]
impl CandidateReviewer for StdinReviewer {
    async fn review(&self, candidates: &[Candidate]) -> ReviewDecision {
        if candidates.is_empty() {
            println!("No unsubscribe candidates this run.");
            return ReviewDecision::default();
        }

        println!("\nUnsubscribe candidates (worst first):\n");
        for (i, candidate) in candidates.iter().enumerate() {
            println!(
                "{:2}. {}  score {:.2}  {}/{} unread  last read: {}{}",
                i + 1,
                candidate.sender_address,
                candidate.score.value,
                candidate.total_unread,
                candidate.total_received,
                candidate.score.last_read,
                if candidate.action.is_none() {
                    "  [manual only]"
                } else {
                    ""
                },
            );
            if let Some(summary) = &candidate.summary {
                println!("      {}", summary);
            }
        }

        print!("\nUnsubscribe from all of the above? (y/N): ");
        std::io::stdout().flush().ok();

        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return ReviewDecision::default();
        }

        if answer.trim().eq_ignore_ascii_case("y") {
            ReviewDecision {
                approved: candidates.iter().map(|c| c.sender_address.clone()).collect(),
                kept: Vec::new(),
            }
        } else {
            ReviewDecision::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut settings = match Settings::default_path() {
        Some(path) => Settings::load_or_default(&path),
        None => Settings::default(),
    };
    settings.scan.lookback_days = args.days;
    settings.scan.max_candidates = args.max_candidates;
    if args.headed {
        settings.automation.headless = false;
    }
    if args.no_ai {
        settings.ai.enabled = false;
    }

    let db_path = args
        .db
        .or_else(mailsweep::storage::default_db_path)
        .context("no database path available; pass --db")?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let db = Database::open(&db_path)
        .await
        .with_context(|| format!("opening database at {}", db_path.display()))?;
    let store = EffectivenessStore::new(db, settings.scoring.clone());

    let browser = HttpBrowser::new().context("building http browser")?;
    let executor = AutomationExecutor::new(browser, settings.automation.executor_config());
    let mailbox = JsonFileMailbox::new(&args.mailbox);

    let mut learning = LearningLoop::new(mailbox, executor, store.clone(), settings.clone());
    if settings.ai.enabled {
        if let Ok(api_key) = std::env::var("ANTHROPIC_API_KEY") {
            learning = learning.with_summarizer(Arc::new(AnthropicSummarizer::new(
                api_key,
                settings.ai.model.clone(),
                settings.ai.max_tokens,
            )));
        } else {
            tracing::warn!("AI summaries enabled but ANTHROPIC_API_KEY is not set");
        }
    }

    if args.check_effectiveness {
        let report = learning.check_effectiveness().await?;
        if report.is_empty() {
            println!("No unsubscribes to check yet.");
            return Ok(());
        }
        println!("\nUnsubscribe effectiveness:\n");
        for entry in report {
            println!(
                "{}  after: {} message(s)  {}  {}",
                entry.sender_address,
                entry.messages_after,
                entry.effectiveness,
                if entry.still_sending {
                    "STILL SENDING"
                } else {
                    ""
                },
            );
        }
        return Ok(());
    }

    let report = if args.daily {
        learning.run_daily().await?
    } else {
        learning.run_batch(&StdinReviewer).await?
    };

    println!(
        "\nScanned {} message(s) from {} sender(s); {} candidate(s); {} attempt(s).",
        report.messages_scanned,
        report.senders_updated,
        report.candidates_presented,
        report.attempts.len(),
    );
    for attempt in &report.attempts {
        println!(
            "  {}  {}{}",
            attempt.sender_address,
            attempt.outcome.as_str(),
            attempt
                .failure_reason
                .map(|r| format!(" ({})", r.as_str()))
                .unwrap_or_default(),
        );
    }
    if !report.manual_followups.is_empty() {
        println!("\nManual follow-up needed:");
        for item in &report.manual_followups {
            println!("  {}  (message {})", item.sender_address, item.message_id);
        }
    }

    let stats = store.statistics().await?;
    println!(
        "\nTracked {} sender(s), {} unsubscribed ({} effective, {} still sending), {}/{} attempts successful.",
        stats.total_senders,
        stats.unsubscribed,
        stats.effective,
        stats.still_sending,
        stats.successful_attempts,
        stats.total_attempts,
    );

    Ok(())
}
