//! # Vault Integration
//!
//! Client-side integration with the Bitwarden Secrets Manager service:
//! the [`VaultApi`] trait is the seam the service layer programs against,
//! and [`BitwardenClient`] is the HTTP implementation behind it.

pub mod bitwarden;
pub mod client;
pub mod types;

pub use bitwarden::BitwardenClient;
pub use client::VaultApi;
pub use types::Secret;
