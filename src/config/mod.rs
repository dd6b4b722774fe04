//! # Configuration
//!
//! Environment-driven configuration for the secrets bridge. Everything is
//! loaded once at process start and passed explicitly into the components;
//! nothing reads ambient environment after startup.

use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

use crate::errors::{Error, Result};

/// Default API key used when `API_SECRET_KEY` is unset. Must be overridden
/// in any real deployment.
pub const DEFAULT_API_KEY: &str = "dev-api-key-change-me";

/// Credentials and endpoints for the Bitwarden Secrets Manager service.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Machine account access token (`0.<client_id>.<client_secret>` format)
    pub access_token: String,

    /// Base URL of the Secrets Manager API
    pub api_url: String,

    /// Base URL of the identity service used for token exchange
    pub identity_url: String,

    /// Hard per-call timeout for vault round-trips
    pub timeout: Duration,
}

impl VaultConfig {
    /// Load vault credentials from environment variables.
    ///
    /// `BW_ACCESS_TOKEN` is required; `BW_API_URL` and `BW_IDENTITY_URL`
    /// default to the Bitwarden cloud endpoints.
    pub fn from_env() -> Result<Self> {
        let access_token = std::env::var("BW_ACCESS_TOKEN")
            .map_err(|_| Error::config("BW_ACCESS_TOKEN environment variable is required"))?;

        let api_url = std::env::var("BW_API_URL")
            .unwrap_or_else(|_| "https://api.bitwarden.com".to_string());
        let identity_url = std::env::var("BW_IDENTITY_URL")
            .unwrap_or_else(|_| "https://identity.bitwarden.com".to_string());

        let timeout_secs = match std::env::var("BWSM_VAULT_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                Error::config(format!("BWSM_VAULT_TIMEOUT_SECS must be an integer, got '{}'", raw))
            })?,
            Err(_) => 10,
        };

        let config = Self {
            access_token,
            api_url: api_url.trim_end_matches('/').to_string(),
            identity_url: identity_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.access_token.trim().is_empty() {
            return Err(Error::config("BW_ACCESS_TOKEN cannot be empty"));
        }
        for (name, url) in [("BW_API_URL", &self.api_url), ("BW_IDENTITY_URL", &self.identity_url)]
        {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::config(format!(
                    "{} must start with 'http://' or 'https://'",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Organization/project pair that narrows which vault partition operations
/// target. Immutable for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub organization_id: Uuid,
    pub project_id: Uuid,
}

impl Scope {
    /// Load and validate the scope from `ORGANIZATION_ID` / `BW_PROJECT_ID`.
    ///
    /// Both must be present and well-formed UUIDs; the vault rejects
    /// anything else, so we fail fast at startup instead.
    pub fn from_env() -> Result<Self> {
        let organization_id = require_uuid("ORGANIZATION_ID")?;
        let project_id = require_uuid("BW_PROJECT_ID")?;
        Ok(Self { organization_id, project_id })
    }
}

fn require_uuid(name: &str) -> Result<Uuid> {
    let raw = std::env::var(name)
        .map_err(|_| Error::config(format!("{} environment variable is required", name)))?;
    Uuid::parse_str(raw.trim())
        .map_err(|e| Error::config(format!("{} must be a valid UUID: {}", name, e)))
}

/// HTTP API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Address to bind to
    pub bind_address: String,

    /// Port to bind to
    pub port: u16,

    /// Static API key required in the `X-API-Key` header on protected routes
    pub api_key: String,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8000,
            api_key: DEFAULT_API_KEY.to_string(),
        }
    }
}

impl ApiServerConfig {
    /// Load the API server configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let bind_address =
            std::env::var("BWSM_API_BIND_ADDRESS").unwrap_or(defaults.bind_address);
        let port = match std::env::var("BWSM_API_PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| {
                Error::config(format!("BWSM_API_PORT must be a port number, got '{}'", raw))
            })?,
            Err(_) => defaults.port,
        };
        let api_key = std::env::var("API_SECRET_KEY").unwrap_or(defaults.api_key);

        Ok(Self { bind_address, port, api_key })
    }

    /// Socket address string for binding.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Whether the placeholder key is still in use.
    pub fn uses_default_api_key(&self) -> bool {
        self.api_key == DEFAULT_API_KEY
    }
}

/// Location of the local snapshot file.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub path: PathBuf,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        let path = std::env::var("BWSM_SECRETS_FILE")
            .unwrap_or_else(|_| "secrets.json".to_string());
        Self { path: PathBuf::from(path) }
    }
}

/// Full application configuration, assembled once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub vault: VaultConfig,
    pub scope: Scope,
    pub api: ApiServerConfig,
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Load everything from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            vault: VaultConfig::from_env()?,
            scope: Scope::from_env()?,
            api: ApiServerConfig::from_env()?,
            cache: CacheConfig::from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_server_defaults() {
        let config = ApiServerConfig::default();
        assert_eq!(config.socket_addr(), "127.0.0.1:8000");
        assert!(config.uses_default_api_key());
    }

    #[test]
    fn test_vault_config_validation() {
        let config = VaultConfig {
            access_token: "0.client.secret".to_string(),
            api_url: "ftp://api.example.com".to_string(),
            identity_url: "https://identity.example.com".to_string(),
            timeout: Duration::from_secs(10),
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("BW_API_URL"));
    }

    #[test]
    fn test_vault_config_accepts_https() {
        let config = VaultConfig {
            access_token: "0.client.secret".to_string(),
            api_url: "https://api.bitwarden.com".to_string(),
            identity_url: "https://identity.bitwarden.com".to_string(),
            timeout: Duration::from_secs(10),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_require_uuid_rejects_garbage() {
        std::env::set_var("BWSM_TEST_SCOPE_ID", "not-a-uuid");
        let err = require_uuid("BWSM_TEST_SCOPE_ID").unwrap_err();
        assert!(err.to_string().contains("valid UUID"));
        std::env::remove_var("BWSM_TEST_SCOPE_ID");
    }

    #[test]
    fn test_require_uuid_parses() {
        std::env::set_var("BWSM_TEST_SCOPE_OK", "5fa85f64-5717-4562-b3fc-2c963f66afa6");
        let id = require_uuid("BWSM_TEST_SCOPE_OK").unwrap();
        assert_eq!(id.to_string(), "5fa85f64-5717-4562-b3fc-2c963f66afa6");
        std::env::remove_var("BWSM_TEST_SCOPE_OK");
    }
}
