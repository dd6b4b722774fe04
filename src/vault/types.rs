//! Core secret record shared by the vault client, cache, and frontends.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single secret as stored in the vault or the local snapshot.
///
/// The value is sensitive: the manual [`fmt::Debug`] implementation redacts
/// it so a stray `{:?}` in a log line never leaks secret material.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Secret {
    /// Vault-assigned identifier; `local-<key>` for entries that only exist
    /// in the snapshot file.
    pub id: String,

    /// Unique key within the organization/project scope
    pub key: String,

    /// Secret value. Never logged.
    pub value: String,

    /// Optional free-form note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Secret {
    /// Create a secret with a synthetic local identifier.
    ///
    /// Used by the format converter, which has no vault ids to carry.
    pub fn local(key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        Self { id: format!("local-{}", key), key, value: value.into(), note: None }
    }

    /// Attach a note, dropping empty strings to keep the snapshot clean.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let note = note.into();
        self.note = if note.is_empty() { None } else { Some(note) };
        self
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("value", &"<redacted>")
            .field("note", &self.note)
            .finish()
    }
}
