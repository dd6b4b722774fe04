//! # Local Snapshot Cache
//!
//! The snapshot file is the last successfully synced copy of the vault. It
//! is a cache, never authoritative: readers must tolerate staleness, and the
//! only write paths are full overwrite (`sync`) and single-entry upsert
//! (write-through on `create`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::Deserializer;
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{Error, Result};
use crate::vault::Secret;

/// Ordered key → secret mapping, persisted as a JSON array sorted by key.
///
/// The on-disk format matches what `sync` has always written: a flat list of
/// secret records, so the file stays greppable and diff-friendly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: BTreeMap<String, Secret>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from a list of secrets. Later duplicates win.
    pub fn from_secrets(secrets: impl IntoIterator<Item = Secret>) -> Self {
        let entries = secrets.into_iter().map(|s| (s.key.clone(), s)).collect();
        Self { entries }
    }

    /// Insert or replace one entry.
    pub fn insert(&mut self, secret: Secret) {
        self.entries.insert(secret.key.clone(), secret);
    }

    /// Look up a secret by key.
    pub fn get(&self, key: &str) -> Option<&Secret> {
        self.entries.get(key)
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Secret> {
        self.entries.values()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
        for secret in self.entries.values() {
            seq.serialize_element(secret)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let secrets = Vec::<Secret>::deserialize(deserializer)?;
        Ok(Self::from_secrets(secrets))
    }
}

/// File-backed store for the local snapshot.
///
/// Writes go to a temp file in the same directory followed by a rename, so
/// concurrent readers never observe a partially written file. Concurrent
/// writers are last-writer-wins by design.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Create a store for the given snapshot path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, returning an empty one when the file is absent.
    pub async fn load(&self) -> Result<Snapshot> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Snapshot file absent, starting empty");
                return Ok(Snapshot::new());
            }
            Err(e) => {
                return Err(Error::cache(
                    e,
                    format!("Failed to read snapshot file '{}'", self.path.display()),
                ))
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            Error::serialization(
                e,
                format!("Snapshot file '{}' is not valid JSON", self.path.display()),
            )
        })
    }

    /// Persist the snapshot atomically (temp file + rename).
    pub async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

        let json = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| Error::serialization(e, "Failed to encode snapshot"))?;

        // Each writer gets its own temp file in the same directory.
        // Concurrent writers must never share a temp path, or one writer's
        // rename could publish another writer's half-written bytes.
        let tmp_path = self.path.with_extension(format!(
            "json.tmp.{}.{}",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&tmp_path, &json).await.map_err(|e| {
            Error::cache(e, format!("Failed to write snapshot file '{}'", tmp_path.display()))
        })?;
        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            Error::cache(e, format!("Failed to replace snapshot file '{}'", self.path.display()))
        })?;

        debug!(path = %self.path.display(), count = snapshot.len(), "Saved snapshot");
        Ok(())
    }

    /// Merge a single secret into the snapshot without disturbing others.
    pub async fn upsert(&self, secret: Secret) -> Result<()> {
        let mut snapshot = self.load().await?;
        snapshot.insert(secret);
        self.save(&snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> Snapshot {
        Snapshot::from_secrets([
            Secret::local("DB_PASS", "s3cr3t").with_note("prod db"),
            Secret::local("API_KEY", "sk-123"),
        ])
    }

    #[test]
    fn test_snapshot_ordering_and_lookup() {
        let snapshot = sample_snapshot();
        let keys: Vec<&str> = snapshot.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["API_KEY", "DB_PASS"]);
        assert_eq!(snapshot.get("DB_PASS").unwrap().value, "s3cr3t");
        assert!(snapshot.get("MISSING").is_none());
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let snapshot = sample_snapshot();
        let json = serde_json::to_string_pretty(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[tokio::test]
    async fn test_load_absent_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("secrets.json"));
        let snapshot = store.load().await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("secrets.json"));

        let snapshot = sample_snapshot();
        store.save(&snapshot).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, snapshot);

        // No temp file may linger after the rename.
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("secrets.json")]);
    }

    #[tokio::test]
    async fn test_concurrent_saves_never_publish_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("secrets.json"));

        // Many simultaneous writers with large payloads. Last writer wins,
        // but whichever snapshot lands must be whole and parseable.
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let snapshot = Snapshot::from_secrets([Secret::local(
                    format!("KEY_{}", i),
                    "x".repeat(64 * 1024),
                )]);
                store.save(&snapshot).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);

        // Every writer renamed its own temp file; none may remain.
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("secrets.json")]);
    }

    #[tokio::test]
    async fn test_upsert_preserves_other_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("secrets.json"));
        store.save(&sample_snapshot()).await.unwrap();

        store.upsert(Secret::local("NEW_KEY", "new-value")).await.unwrap();
        store.upsert(Secret::local("DB_PASS", "rotated")).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.get("DB_PASS").unwrap().value, "rotated");
        assert_eq!(loaded.get("API_KEY").unwrap().value, "sk-123");
        assert_eq!(loaded.get("NEW_KEY").unwrap().value, "new-value");
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let store = SnapshotStore::new(&path);
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }
}
