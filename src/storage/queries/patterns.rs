//! Reading pattern queries.
//!
//! One row per sender, replaced wholesale by each scan so re-ingesting the
//! same window is idempotent.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::domain::{ReadingAggregate, Sender};

/// Replaces a sender's window aggregates with the latest scan's values.
pub fn replace_aggregate(
    conn: &Connection,
    aggregate: &ReadingAggregate,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO reading_patterns
         (sender_address, window_days, total_received, total_read, total_unread,
          engagement_score, last_read_at, last_received_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            aggregate.sender_address,
            aggregate.window_days,
            aggregate.total_received,
            aggregate.total_read,
            aggregate.total_unread,
            aggregate.engagement_score(),
            aggregate.last_read_at.map(|dt| dt.to_rfc3339()),
            aggregate.last_received_at.map(|dt| dt.to_rfc3339()),
            now.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Gets a sender's current window aggregates.
pub fn get(conn: &Connection, address: &str) -> Result<Option<ReadingAggregate>> {
    conn.query_row(
        "SELECT rp.sender_address, s.display_name, rp.window_days, rp.total_received,
                rp.total_read, rp.total_unread, rp.last_read_at, rp.last_received_at
         FROM reading_patterns rp
         JOIN senders s ON s.address = rp.sender_address
         WHERE rp.sender_address = ?1",
        params![address],
        row_to_aggregate,
    )
    .optional()
}

/// Loads every sender with window aggregates, paired with its sender row.
///
/// This is the ranking input; filtering and ordering happen in the scorer.
pub fn ranking_rows(conn: &Connection) -> Result<Vec<(ReadingAggregate, Sender)>> {
    let mut stmt = conn.prepare(
        "SELECT rp.sender_address, s.display_name, rp.window_days, rp.total_received,
                rp.total_read, rp.total_unread, rp.last_read_at, rp.last_received_at,
                s.address, s.first_seen_at, s.lifetime_messages, s.unread_messages,
                s.last_read_at, s.engagement_score, s.status, s.unsubscribed_at,
                s.last_shown_at, s.kept_at
         FROM reading_patterns rp
         JOIN senders s ON s.address = rp.sender_address",
    )?;

    let rows = stmt.query_map([], |row| {
        let aggregate = row_to_aggregate(row)?;
        let first_seen: String = row.get(9)?;
        let sender = Sender {
            address: row.get(8)?,
            display_name: row.get(1)?,
            first_seen_at: super::senders::parse_datetime(&first_seen),
            lifetime_messages: row.get(10)?,
            unread_messages: row.get(11)?,
            last_read_at: super::senders::parse_datetime_opt(row.get(12)?),
            engagement_score: row.get(13)?,
            status: match row.get::<_, String>(14)?.as_str() {
                "unsubscribed" => crate::domain::SenderStatus::Unsubscribed,
                _ => crate::domain::SenderStatus::Active,
            },
            unsubscribed_at: super::senders::parse_datetime_opt(row.get(15)?),
            last_shown_at: super::senders::parse_datetime_opt(row.get(16)?),
            kept_at: super::senders::parse_datetime_opt(row.get(17)?),
        };
        Ok((aggregate, sender))
    })?;

    rows.collect()
}

fn row_to_aggregate(row: &rusqlite::Row) -> Result<ReadingAggregate> {
    Ok(ReadingAggregate {
        sender_address: row.get(0)?,
        sender_name: row.get(1)?,
        window_days: row.get(2)?,
        total_received: row.get(3)?,
        total_read: row.get(4)?,
        total_unread: row.get(5)?,
        last_read_at: super::senders::parse_datetime_opt(row.get(6)?),
        last_received_at: super::senders::parse_datetime_opt(row.get(7)?),
    })
}
