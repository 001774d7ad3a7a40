//! Database query modules.
//!
//! Plain functions over a [`rusqlite::Connection`], grouped by table.
//! Services compose these inside `Database::with_conn`/`transaction`.

pub mod attempts;
pub mod patterns;
pub mod samples;
pub mod senders;
