//! SQL schema definitions as const strings.
//!
//! Four tables: sender aggregates (overwritten by the latest scan),
//! append-only unsubscribe attempts, per-window reading patterns, and
//! post-attempt effectiveness samples.

/// SQL to create the senders table.
pub const CREATE_SENDERS: &str = r#"
CREATE TABLE IF NOT EXISTS senders (
    address TEXT PRIMARY KEY,
    display_name TEXT,
    first_seen_at TEXT NOT NULL,
    lifetime_messages INTEGER NOT NULL DEFAULT 0,
    unread_messages INTEGER NOT NULL DEFAULT 0,
    last_read_at TEXT,
    engagement_score REAL NOT NULL DEFAULT 0.0,
    status TEXT NOT NULL DEFAULT 'active',
    unsubscribed_at TEXT,
    last_shown_at TEXT,
    kept_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK (unread_messages <= lifetime_messages)
)
"#;

/// SQL to create the unsubscribe attempts table.
pub const CREATE_ATTEMPTS: &str = r#"
CREATE TABLE IF NOT EXISTS unsubscribe_attempts (
    id TEXT PRIMARY KEY,
    sender_address TEXT NOT NULL REFERENCES senders(address),
    message_id TEXT,
    action_kind TEXT NOT NULL,
    target_url TEXT NOT NULL,
    outcome TEXT NOT NULL,
    failure_reason TEXT,
    confirm_steps INTEGER NOT NULL DEFAULT 0,
    attempted_at TEXT NOT NULL,
    UNIQUE (sender_address, attempted_at)
)
"#;

/// SQL to create attempt indexes.
pub const CREATE_ATTEMPT_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_attempts_sender ON unsubscribe_attempts(sender_address);
CREATE INDEX IF NOT EXISTS idx_attempts_date ON unsubscribe_attempts(attempted_at DESC)
"#;

/// SQL to create the reading patterns table.
pub const CREATE_READING_PATTERNS: &str = r#"
CREATE TABLE IF NOT EXISTS reading_patterns (
    sender_address TEXT PRIMARY KEY REFERENCES senders(address),
    window_days INTEGER NOT NULL,
    total_received INTEGER NOT NULL DEFAULT 0,
    total_read INTEGER NOT NULL DEFAULT 0,
    total_unread INTEGER NOT NULL DEFAULT 0,
    engagement_score REAL NOT NULL DEFAULT 0.0,
    last_read_at TEXT,
    last_received_at TEXT,
    updated_at TEXT NOT NULL,
    CHECK (total_unread <= total_received)
)
"#;

/// SQL to create the post-attempt samples table.
///
/// The (sender, message) uniqueness is what makes re-scans idempotent.
pub const CREATE_POST_ATTEMPT_SAMPLES: &str = r#"
CREATE TABLE IF NOT EXISTS post_attempt_samples (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sender_address TEXT NOT NULL REFERENCES senders(address),
    attempt_id TEXT REFERENCES unsubscribe_attempts(id),
    message_id TEXT NOT NULL,
    received_at TEXT NOT NULL,
    days_after_attempt INTEGER NOT NULL,
    UNIQUE (sender_address, message_id)
)
"#;

/// SQL to create sample indexes.
pub const CREATE_SAMPLE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_samples_sender ON post_attempt_samples(sender_address)
"#;

/// Returns all migrations in execution order.
pub fn all_migrations() -> Vec<&'static str> {
    vec![
        CREATE_SENDERS,
        CREATE_ATTEMPTS,
        CREATE_ATTEMPT_INDEXES,
        CREATE_READING_PATTERNS,
        CREATE_POST_ATTEMPT_SAMPLES,
        CREATE_SAMPLE_INDEXES,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_migrations_returns_statements() {
        let migrations = all_migrations();
        assert_eq!(migrations.len(), 6);
        assert!(migrations.iter().all(|m| m.contains("IF NOT EXISTS")));
    }

    #[test]
    fn senders_enforce_unread_invariant() {
        assert!(CREATE_SENDERS.contains("CHECK (unread_messages <= lifetime_messages)"));
    }

    #[test]
    fn attempts_reference_senders() {
        assert!(CREATE_ATTEMPTS.contains("REFERENCES senders(address)"));
        assert!(CREATE_ATTEMPTS.contains("UNIQUE (sender_address, attempted_at)"));
    }

    #[test]
    fn samples_dedupe_by_sender_and_message() {
        assert!(CREATE_POST_ATTEMPT_SAMPLES.contains("UNIQUE (sender_address, message_id)"));
    }
}
