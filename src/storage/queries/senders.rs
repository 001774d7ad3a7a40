//! Sender table queries.
//!
//! Sender aggregate fields are overwritten by the latest scan; identity and
//! status fields survive across scans.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::domain::{Sender, SenderStatus};

/// Ensures a sender row exists, refreshing the display name when one is
/// provided. First-seen is kept from the earliest observation.
pub fn upsert_identity(
    conn: &Connection,
    address: &str,
    display_name: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO senders (address, display_name, first_seen_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?3, ?3)
         ON CONFLICT(address) DO UPDATE SET
             display_name = COALESCE(excluded.display_name, senders.display_name),
             updated_at = excluded.updated_at",
        params![address, display_name, now.to_rfc3339()],
    )?;
    Ok(())
}

/// Overwrites the aggregate fields from the latest scan.
pub fn set_aggregates(
    conn: &Connection,
    address: &str,
    lifetime_messages: u32,
    unread_messages: u32,
    last_read_at: Option<DateTime<Utc>>,
    engagement_score: f64,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE senders SET
             lifetime_messages = ?2,
             unread_messages = ?3,
             last_read_at = ?4,
             engagement_score = ?5,
             updated_at = ?6
         WHERE address = ?1",
        params![
            address,
            lifetime_messages,
            unread_messages,
            last_read_at.map(|dt| dt.to_rfc3339()),
            engagement_score,
            now.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Gets a sender by canonical address.
pub fn get_by_address(conn: &Connection, address: &str) -> Result<Option<Sender>> {
    conn.query_row(
        &format!("{} WHERE address = ?1", SELECT_SENDER),
        params![address],
        row_to_sender,
    )
    .optional()
}

/// Marks a sender unsubscribed. The original status timestamps stay intact
/// if this is somehow recorded twice.
pub fn mark_unsubscribed(conn: &Connection, address: &str, at: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE senders SET
             status = 'unsubscribed',
             unsubscribed_at = COALESCE(unsubscribed_at, ?2),
             updated_at = ?2
         WHERE address = ?1",
        params![address, at.to_rfc3339()],
    )?;
    Ok(())
}

/// Records that a sender was surfaced as a candidate.
pub fn mark_shown(conn: &Connection, address: &str, at: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE senders SET last_shown_at = ?2, updated_at = ?2 WHERE address = ?1",
        params![address, at.to_rfc3339()],
    )?;
    Ok(())
}

/// Records a user "keep" decision for cooldown enforcement.
pub fn mark_kept(conn: &Connection, address: &str, at: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE senders SET kept_at = ?2, updated_at = ?2 WHERE address = ?1",
        params![address, at.to_rfc3339()],
    )?;
    Ok(())
}

/// Lists all unsubscribed senders, most recent first.
pub fn all_unsubscribed(conn: &Connection) -> Result<Vec<Sender>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE status = 'unsubscribed' ORDER BY unsubscribed_at DESC",
        SELECT_SENDER
    ))?;
    let senders = stmt.query_map([], row_to_sender)?;
    senders.collect()
}

/// Counts all tracked senders.
pub fn count_all(conn: &Connection) -> Result<u32> {
    conn.query_row("SELECT COUNT(*) FROM senders", [], |row| row.get(0))
}

/// Counts senders by status.
pub fn count_by_status(conn: &Connection, status: SenderStatus) -> Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM senders WHERE status = ?1",
        params![status_to_str(status)],
        |row| row.get(0),
    )
}

const SELECT_SENDER: &str = "SELECT address, display_name, first_seen_at, lifetime_messages,
        unread_messages, last_read_at, engagement_score, status, unsubscribed_at,
        last_shown_at, kept_at
     FROM senders";

// --- Helper functions ---

fn status_to_str(status: SenderStatus) -> &'static str {
    match status {
        SenderStatus::Active => "active",
        SenderStatus::Unsubscribed => "unsubscribed",
    }
}

fn str_to_status(s: &str) -> SenderStatus {
    match s {
        "unsubscribed" => SenderStatus::Unsubscribed,
        _ => SenderStatus::Active,
    }
}

pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

fn row_to_sender(row: &rusqlite::Row) -> Result<Sender> {
    let first_seen: String = row.get(2)?;
    Ok(Sender {
        address: row.get(0)?,
        display_name: row.get(1)?,
        first_seen_at: parse_datetime(&first_seen),
        lifetime_messages: row.get(3)?,
        unread_messages: row.get(4)?,
        last_read_at: parse_datetime_opt(row.get(5)?),
        engagement_score: row.get(6)?,
        status: str_to_status(row.get::<_, String>(7)?.as_str()),
        unsubscribed_at: parse_datetime_opt(row.get(8)?),
        last_shown_at: parse_datetime_opt(row.get(9)?),
        kept_at: parse_datetime_opt(row.get(10)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        for migration in crate::storage::schema::all_migrations() {
            conn.execute_batch(migration).unwrap();
        }
        conn
    }

    #[test]
    fn upsert_creates_then_preserves_first_seen() {
        let conn = setup();
        let t1 = Utc::now();

        upsert_identity(&conn, "a@example.com", Some("A"), t1).unwrap();
        upsert_identity(&conn, "a@example.com", Some("A renamed"), Utc::now()).unwrap();

        let sender = get_by_address(&conn, "a@example.com").unwrap().unwrap();
        assert_eq!(sender.display_name.as_deref(), Some("A renamed"));
        assert_eq!(sender.first_seen_at.timestamp(), t1.timestamp());
    }

    #[test]
    fn upsert_keeps_existing_name_when_none_given() {
        let conn = setup();
        upsert_identity(&conn, "a@example.com", Some("A"), Utc::now()).unwrap();
        upsert_identity(&conn, "a@example.com", None, Utc::now()).unwrap();

        let sender = get_by_address(&conn, "a@example.com").unwrap().unwrap();
        assert_eq!(sender.display_name.as_deref(), Some("A"));
    }

    #[test]
    fn aggregates_are_overwritten() {
        let conn = setup();
        let now = Utc::now();
        upsert_identity(&conn, "a@example.com", None, now).unwrap();

        set_aggregates(&conn, "a@example.com", 10, 8, None, 20.0, now).unwrap();
        set_aggregates(&conn, "a@example.com", 12, 9, Some(now), 25.0, now).unwrap();

        let sender = get_by_address(&conn, "a@example.com").unwrap().unwrap();
        assert_eq!(sender.lifetime_messages, 12);
        assert_eq!(sender.unread_messages, 9);
        assert!(sender.last_read_at.is_some());
    }

    #[test]
    fn mark_unsubscribed_is_sticky() {
        let conn = setup();
        let t1 = Utc::now();
        upsert_identity(&conn, "a@example.com", None, t1).unwrap();

        mark_unsubscribed(&conn, "a@example.com", t1).unwrap();
        mark_unsubscribed(&conn, "a@example.com", Utc::now()).unwrap();

        let sender = get_by_address(&conn, "a@example.com").unwrap().unwrap();
        assert_eq!(sender.status, SenderStatus::Unsubscribed);
        assert_eq!(sender.unsubscribed_at.unwrap().timestamp(), t1.timestamp());
    }

    #[test]
    fn shown_and_kept_timestamps() {
        let conn = setup();
        let now = Utc::now();
        upsert_identity(&conn, "a@example.com", None, now).unwrap();

        mark_shown(&conn, "a@example.com", now).unwrap();
        mark_kept(&conn, "a@example.com", now).unwrap();

        let sender = get_by_address(&conn, "a@example.com").unwrap().unwrap();
        assert!(sender.last_shown_at.is_some());
        assert!(sender.kept_at.is_some());
    }

    #[test]
    fn counts_by_status() {
        let conn = setup();
        let now = Utc::now();
        upsert_identity(&conn, "a@example.com", None, now).unwrap();
        upsert_identity(&conn, "b@example.com", None, now).unwrap();
        mark_unsubscribed(&conn, "b@example.com", now).unwrap();

        assert_eq!(count_all(&conn).unwrap(), 2);
        assert_eq!(count_by_status(&conn, SenderStatus::Active).unwrap(), 1);
        assert_eq!(count_by_status(&conn, SenderStatus::Unsubscribed).unwrap(), 1);
        assert_eq!(all_unsubscribed(&conn).unwrap().len(), 1);
    }
}
