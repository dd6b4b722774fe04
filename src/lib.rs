//! # bwsm
//!
//! A thin bridge in front of Bitwarden Secrets Manager: fetch, create, and
//! cache secrets through a CLI and a minimal HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! CLI Frontend ─┐
//!               ├─> Secret Service ─> Vault Client ─> Bitwarden API
//! HTTP Frontend ┘         │
//!                         └─> Snapshot Store ─> local secrets file
//! ```
//!
//! The vault is the source of truth. The snapshot file is a best-effort
//! local cache refreshed by `sync` and consulted by `get` only when the
//! vault is unreachable.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod convert;
pub mod errors;
pub mod observability;
pub mod service;
pub mod vault;

pub use config::AppConfig;
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "bwsm");
    }
}
