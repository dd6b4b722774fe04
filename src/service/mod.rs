//! # Secret Service
//!
//! Orchestrates the vault client and the local snapshot store. This is the
//! single layer both frontends call into; neither the CLI nor the HTTP API
//! touches the vault or the snapshot file directly.
//!
//! Policy decisions live here:
//! - `list` is authoritative-only, no cache fallback
//! - `get` falls back to the snapshot when the vault is unreachable
//! - `create` writes through to the cache, but a cache failure never fails
//!   the operation once the vault create succeeded
//! - `sync` overwrites the snapshot wholesale, never merges

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{Snapshot, SnapshotStore};
use crate::errors::{Error, Result};
use crate::vault::{Secret, VaultApi};

/// Service facade over the vault and the local snapshot.
#[derive(Clone)]
pub struct SecretService {
    vault: Arc<dyn VaultApi>,
    store: SnapshotStore,
}

impl SecretService {
    /// Create a service over the given vault client and snapshot store.
    pub fn new(vault: Arc<dyn VaultApi>, store: SnapshotStore) -> Self {
        Self { vault, store }
    }

    /// List all secrets from the vault.
    ///
    /// Listing is authoritative-only: a stale snapshot listing would be
    /// indistinguishable from a fresh one, so vault failures propagate.
    pub async fn list(&self) -> Result<Vec<Secret>> {
        self.vault.list_secrets().await
    }

    /// Fetch one secret, falling back to the snapshot when the vault is
    /// unreachable.
    ///
    /// Only upstream failures (transport, auth) trigger the fallback; an
    /// authoritative NotFound from the vault is returned as-is. When the key
    /// is absent from the snapshot too, the original vault error surfaces so
    /// callers never see a false NotFound.
    pub async fn get(&self, key: &str) -> Result<Secret> {
        let vault_error = match self.vault.get_secret(key).await {
            Ok(secret) => return Ok(secret),
            Err(e) if e.is_upstream_failure() => e,
            Err(e) => return Err(e),
        };

        match self.store.load().await {
            Ok(snapshot) => match snapshot.get(key) {
                Some(secret) => {
                    warn!(key = %key, error = %vault_error, "Vault unavailable, serving secret from local snapshot");
                    Ok(secret.clone())
                }
                None => Err(vault_error),
            },
            Err(cache_error) => {
                warn!(key = %key, error = %cache_error, "Vault unavailable and snapshot unreadable");
                Err(vault_error)
            }
        }
    }

    /// Create a secret in the vault, then write it through to the snapshot.
    ///
    /// The cache write is best-effort: the vault is authoritative, so once
    /// the create succeeded there the operation reports success even if the
    /// snapshot update fails.
    pub async fn create(&self, key: &str, value: &str, note: Option<&str>) -> Result<Secret> {
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::validation("Secret key cannot be empty"));
        }
        if value.is_empty() {
            return Err(Error::validation("Secret value cannot be empty"));
        }

        let secret = self.vault.create_secret(key, value, note).await?;

        if let Err(e) = self.store.upsert(secret.clone()).await {
            warn!(key = %key, error = %e, "Secret created in vault but snapshot write-through failed");
        }

        Ok(secret)
    }

    /// Pull all secrets from the vault and overwrite the snapshot.
    ///
    /// Returns the number of secrets written.
    pub async fn sync(&self) -> Result<usize> {
        let secrets = self.vault.list_secrets().await?;
        let snapshot = Snapshot::from_secrets(secrets);
        let count = snapshot.len();
        self.store.save(&snapshot).await?;
        info!(count = count, path = %self.store.path().display(), "Synced secrets to local snapshot");
        Ok(count)
    }

    /// Read the local snapshot without touching the vault.
    pub async fn local(&self) -> Result<Snapshot> {
        self.store.load().await
    }
}
