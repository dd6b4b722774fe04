//! Vault client trait.

use async_trait::async_trait;

use crate::errors::Result;

use super::types::Secret;

/// Operations the secrets bridge needs from the remote vault.
///
/// Each call is a single network round-trip attempt; retry policy is the
/// caller's decision. Implementations must never log secret values.
///
/// Errors follow the crate taxonomy: [`crate::Error::Auth`] on a rejected
/// access token, [`crate::Error::NotFound`] when a key is absent,
/// [`crate::Error::Conflict`] on duplicate create,
/// [`crate::Error::Validation`] on empty values, and
/// [`crate::Error::Transport`] when the vault is unreachable.
#[async_trait]
pub trait VaultApi: Send + Sync {
    /// List all secrets visible in the configured scope, values included.
    async fn list_secrets(&self) -> Result<Vec<Secret>>;

    /// Fetch a single secret by key.
    async fn get_secret(&self, key: &str) -> Result<Secret>;

    /// Create a new secret in the configured scope.
    async fn create_secret(&self, key: &str, value: &str, note: Option<&str>) -> Result<Secret>;
}
