//! Post-attempt effectiveness sample queries.
//!
//! Samples record messages that kept arriving after an unsubscribe attempt.
//! Insertion ignores duplicates by (sender, message) so repeated scans over
//! the same window never double-count.

use rusqlite::{params, Connection, Result};

use crate::domain::{AttemptId, EffectivenessSample, MessageId};

/// Inserts a sample unless one for this (sender, message) already exists.
///
/// Returns true when a new row was written.
pub fn insert_ignore(conn: &Connection, sample: &EffectivenessSample) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO post_attempt_samples
         (sender_address, attempt_id, message_id, received_at, days_after_attempt)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            sample.sender_address,
            sample.attempt_id.as_ref().map(|id| id.0.as_str()),
            sample.message_id.0,
            sample.received_at.to_rfc3339(),
            sample.days_after_attempt,
        ],
    )?;
    Ok(changed > 0)
}

/// Counts all samples for a sender.
pub fn count_for_sender(conn: &Connection, address: &str) -> Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM post_attempt_samples WHERE sender_address = ?1",
        params![address],
        |row| row.get(0),
    )
}

/// Counts samples received at or after the cutoff. Recent post-attempt
/// mail is the "still sending" signal.
pub fn count_received_since(
    conn: &Connection,
    address: &str,
    cutoff: chrono::DateTime<chrono::Utc>,
) -> Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM post_attempt_samples
         WHERE sender_address = ?1 AND received_at >= ?2",
        params![address, cutoff.to_rfc3339()],
        |row| row.get(0),
    )
}

/// Lists a sender's samples, newest first.
pub fn list_for_sender(conn: &Connection, address: &str) -> Result<Vec<EffectivenessSample>> {
    let mut stmt = conn.prepare(
        "SELECT sender_address, attempt_id, message_id, received_at, days_after_attempt
         FROM post_attempt_samples
         WHERE sender_address = ?1
         ORDER BY received_at DESC",
    )?;

    let samples = stmt.query_map(params![address], |row| {
        let attempt_id: Option<String> = row.get(1)?;
        let received_at: String = row.get(3)?;
        Ok(EffectivenessSample {
            sender_address: row.get(0)?,
            attempt_id: attempt_id.map(AttemptId::from),
            message_id: MessageId::from(row.get::<_, String>(2)?),
            received_at: super::senders::parse_datetime(&received_at),
            days_after_attempt: row.get(4)?,
        })
    })?;

    samples.collect()
}
