//! Unsubscribe attempt queries.
//!
//! The attempts table is append-only: rows are inserted once per terminal
//! state and never updated.

use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::domain::{
    ActionKind, AttemptId, AttemptOutcome, FailureReason, MessageId, UnsubscribeAttempt,
};

/// Inserts one attempt row.
pub fn insert(conn: &Connection, attempt: &UnsubscribeAttempt) -> Result<()> {
    conn.execute(
        "INSERT INTO unsubscribe_attempts
         (id, sender_address, message_id, action_kind, target_url, outcome,
          failure_reason, confirm_steps, attempted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            attempt.id.0,
            attempt.sender_address,
            attempt.message_id.as_ref().map(|id| id.0.as_str()),
            attempt.action_kind.as_str(),
            attempt.target_url,
            attempt.outcome.as_str(),
            attempt.failure_reason.map(|r| r.as_str()),
            attempt.confirm_steps,
            attempt.attempted_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Gets the newest attempt for a sender, if any.
pub fn latest_for_sender(conn: &Connection, address: &str) -> Result<Option<UnsubscribeAttempt>> {
    conn.query_row(
        &format!(
            "{} WHERE sender_address = ?1 ORDER BY attempted_at DESC LIMIT 1",
            SELECT_ATTEMPT
        ),
        params![address],
        row_to_attempt,
    )
    .optional()
}

/// Gets the newest successful attempt for a sender, if any.
pub fn latest_success_for_sender(
    conn: &Connection,
    address: &str,
) -> Result<Option<UnsubscribeAttempt>> {
    conn.query_row(
        &format!(
            "{} WHERE sender_address = ?1 AND outcome = 'success'
             ORDER BY attempted_at DESC LIMIT 1",
            SELECT_ATTEMPT
        ),
        params![address],
        row_to_attempt,
    )
    .optional()
}

/// Lists all attempts for a sender, newest first.
pub fn list_for_sender(conn: &Connection, address: &str) -> Result<Vec<UnsubscribeAttempt>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE sender_address = ?1 ORDER BY attempted_at DESC",
        SELECT_ATTEMPT
    ))?;
    let attempts = stmt.query_map(params![address], row_to_attempt)?;
    attempts.collect()
}

/// Counts all attempts.
pub fn count_all(conn: &Connection) -> Result<u32> {
    conn.query_row("SELECT COUNT(*) FROM unsubscribe_attempts", [], |row| {
        row.get(0)
    })
}

/// Counts attempts with a given outcome.
pub fn count_by_outcome(conn: &Connection, outcome: AttemptOutcome) -> Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM unsubscribe_attempts WHERE outcome = ?1",
        params![outcome.as_str()],
        |row| row.get(0),
    )
}

const SELECT_ATTEMPT: &str = "SELECT id, sender_address, message_id, action_kind, target_url,
        outcome, failure_reason, confirm_steps, attempted_at
     FROM unsubscribe_attempts";

fn row_to_attempt(row: &rusqlite::Row) -> Result<UnsubscribeAttempt> {
    let message_id: Option<String> = row.get(2)?;
    let failure_reason: Option<String> = row.get(6)?;
    let attempted_at: String = row.get(8)?;

    Ok(UnsubscribeAttempt {
        id: AttemptId::from(row.get::<_, String>(0)?),
        sender_address: row.get(1)?,
        message_id: message_id.map(MessageId::from),
        action_kind: ActionKind::from_str_lossy(row.get::<_, String>(3)?.as_str()),
        target_url: row.get(4)?,
        outcome: AttemptOutcome::from_str_lossy(row.get::<_, String>(5)?.as_str()),
        failure_reason: failure_reason.as_deref().and_then(FailureReason::parse),
        confirm_steps: row.get(7)?,
        attempted_at: super::senders::parse_datetime(&attempted_at),
    })
}
