use std::sync::Arc;

use parley_storage::{RecordStore, StorageError};
use snafu::{ResultExt, Snafu};

use crate::chat::message::{Message, repair_history};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum HistoryError {
    #[snafu(display("failed to read chat history '{key}' on `{stage}`: {source}"))]
    Read {
        stage: &'static str,
        key: String,
        source: StorageError,
    },
    #[snafu(display("failed to write chat history '{key}' on `{stage}`: {source}"))]
    Write {
        stage: &'static str,
        key: String,
        source: StorageError,
    },
    #[snafu(display("failed to remove chat history '{key}' on `{stage}`: {source}"))]
    Remove {
        stage: &'static str,
        key: String,
        source: StorageError,
    },
    #[snafu(display("failed to encode chat history on `{stage}`: {source}"))]
    Encode {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("stored chat history '{key}' is unreadable on `{stage}`: {source}"))]
    Decode {
        stage: &'static str,
        key: String,
        source: serde_json::Error,
    },
}

pub type HistoryResult<T> = Result<T, HistoryError>;

/// Full-snapshot mirror of the message list under a single storage key.
#[derive(Clone)]
pub struct HistoryStore {
    store: Arc<dyn RecordStore>,
    key: String,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn RecordStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the stored sequence; an absent record reads as empty.
    ///
    /// Decoded entries are repaired with [`repair_history`] before they are returned.
    pub fn load(&self) -> HistoryResult<Vec<Message>> {
        let Some(raw) = self.store.get(&self.key).context(ReadSnafu {
            stage: "history-load-read",
            key: self.key.clone(),
        })?
        else {
            return Ok(Vec::new());
        };

        let messages = serde_json::from_str(&raw).context(DecodeSnafu {
            stage: "history-load-decode",
            key: self.key.clone(),
        })?;
        Ok(repair_history(messages))
    }

    /// Overwrites the record with `messages`. An empty list leaves storage untouched.
    pub fn save(&self, messages: &[Message]) -> HistoryResult<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let raw = serde_json::to_string(messages).context(EncodeSnafu {
            stage: "history-save-encode",
        })?;
        self.store.set(&self.key, &raw).context(WriteSnafu {
            stage: "history-save-write",
            key: self.key.clone(),
        })?;
        tracing::trace!(key = %self.key, count = messages.len(), "saved chat history");
        Ok(())
    }

    pub fn clear(&self) -> HistoryResult<()> {
        self.store.remove(&self.key).context(RemoveSnafu {
            stage: "history-clear-remove",
            key: self.key.clone(),
        })
    }
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HistoryStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
