//! JSON file mailbox provider.
//!
//! Serves message summaries from a JSON export on disk. Useful for
//! development and for driving the engine from an offline dump; archive
//! commands are recorded in memory and logged, since the file is not a live
//! account.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use crate::domain::{MessageId, MessageSummary};

use super::traits::{MailboxError, MailboxProvider, MailboxQuery, Result};

/// Mailbox provider backed by a JSON array of message summaries.
pub struct JsonFileMailbox {
    path: PathBuf,
    archived: Mutex<HashSet<MessageId>>,
}

impl JsonFileMailbox {
    /// Creates a provider reading from the given file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            archived: Mutex::new(HashSet::new()),
        }
    }

    /// Message ids archived during this session.
    pub async fn archived_ids(&self) -> HashSet<MessageId> {
        self.archived.lock().await.clone()
    }

    async fn load(&self) -> Result<Vec<MessageSummary>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| MailboxError::Provider(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| MailboxError::Provider(format!("invalid message export: {}", e)))
    }
}

#[async_trait]
impl MailboxProvider for JsonFileMailbox {
    async fn fetch_messages(&self, query: &MailboxQuery) -> Result<Vec<MessageSummary>> {
        let cutoff = Utc::now() - Duration::days(i64::from(query.lookback_days));

        let mut messages: Vec<MessageSummary> = self
            .load()
            .await?
            .into_iter()
            .filter(|m| m.received_at >= cutoff)
            .filter(|m| match &query.sender {
                Some(sender) => m.from.canonical() == sender.to_lowercase(),
                None => true,
            })
            .collect();

        messages.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        messages.truncate(query.max_results as usize);
        Ok(messages)
    }

    async fn archive(&self, id: &MessageId) -> Result<()> {
        tracing::info!(message_id = %id, "archive requested (recorded only; file export)");
        self.archived.lock().await.insert(id.clone());
        Ok(())
    }
}
