//! Engine settings.
//!
//! Settings are persisted as JSON under the platform config directory
//! (`~/.config/mailsweep/settings.json` or equivalent) and loaded at
//! startup. CLI flags override individual fields; they never add behavior
//! of their own.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::automation::ExecutorConfig;

/// Top-level engine settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Message scanning parameters.
    pub scan: ScanSettings,
    /// Ranking and cooldown parameters.
    pub scoring: ScoringSettings,
    /// Browser automation parameters.
    pub automation: AutomationSettings,
    /// Optional AI summary configuration.
    pub ai: AiSettings,
}

/// Message scanning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// How many days back each batch run looks.
    pub lookback_days: u32,
    /// Maximum messages fetched per run.
    pub max_messages: u32,
    /// Maximum candidates surfaced per batch.
    pub max_candidates: u32,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            lookback_days: 90,
            max_messages: 500,
            max_candidates: 10,
        }
    }
}

/// Ranking and cooldown parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    /// Unread count at which the volume component saturates.
    pub volume_cap: u32,
    /// Minimum window messages before a sender is ranked.
    pub min_messages: u32,
    /// Days a user-kept sender stays out of the ranking.
    pub keep_cooldown_days: u32,
    /// Days a shown-but-undecided sender stays out of the ranking.
    pub shown_cooldown_days: u32,
    /// Days before a failed or uncertain attempt may be retried.
    pub retry_cooldown_days: u32,
    /// Post-attempt window in which any message means "still sending".
    pub post_attempt_window_days: u32,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            volume_cap: 20,
            min_messages: 3,
            keep_cooldown_days: 30,
            shown_cooldown_days: 30,
            retry_cooldown_days: 7,
            post_attempt_window_days: 14,
        }
    }
}

/// Browser automation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationSettings {
    /// Run browser sessions without a visible window.
    pub headless: bool,
    /// Page-load budget in seconds.
    pub navigation_timeout_secs: u64,
    /// Control-location budget in seconds.
    pub locate_budget_secs: u64,
    /// Grace period for secondary confirmations, in seconds.
    pub confirmation_grace_secs: u64,
    /// Budget for the positive confirmation signal, in seconds.
    pub verification_wait_secs: u64,
    /// Maximum secondary confirmation clicks.
    pub max_confirmation_hops: u32,
    /// Bounded worker pool size for parallel sessions.
    pub parallel_sessions: usize,
    /// Ceiling for one run's automation phase, in seconds.
    pub run_timeout_secs: u64,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            headless: true,
            navigation_timeout_secs: 15,
            locate_budget_secs: 5,
            confirmation_grace_secs: 3,
            verification_wait_secs: 5,
            max_confirmation_hops: 2,
            parallel_sessions: 3,
            run_timeout_secs: 600,
        }
    }
}

impl AutomationSettings {
    /// Builds the executor's timing configuration.
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
            locate_budget: Duration::from_secs(self.locate_budget_secs),
            confirmation_grace: Duration::from_secs(self.confirmation_grace_secs),
            verification_wait: Duration::from_secs(self.verification_wait_secs),
            max_confirmation_hops: self.max_confirmation_hops,
            headless: self.headless,
            parallel_sessions: self.parallel_sessions,
        }
    }

    /// Ceiling for one run's automation phase.
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

/// Optional AI summary configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// Master switch; the engine works identically without summaries.
    pub enabled: bool,
    /// Model identifier.
    pub model: String,
    /// Maximum tokens per summary.
    pub max_tokens: usize,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "claude-3-haiku-20240307".to_string(),
            max_tokens: 80,
        }
    }
}

impl Settings {
    /// Default on-disk settings location.
    pub fn default_path() -> Option<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "mailsweep", "mailsweep")?;
        Some(dirs.config_dir().join("settings.json"))
    }

    /// Loads settings from a file, falling back to defaults when the file
    /// is missing or unreadable.
    pub fn load_or_default(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "invalid settings, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Persists settings as pretty JSON.
    pub fn save(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}
