//! # Command Line Interface
//!
//! Maps subcommands 1:1 onto [`SecretService`] operations, plus the offline
//! format-conversion commands and `serve`, which runs the HTTP API in the
//! foreground. Results go to stdout, errors to stderr with a non-zero exit.
//!
//! [`SecretService`]: crate::service::SecretService

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::api::start_api_server;
use crate::cache::SnapshotStore;
use crate::config::AppConfig;
use crate::convert;
use crate::observability::init_tracing;
use crate::service::SecretService;
use crate::vault::BitwardenClient;

#[derive(Parser)]
#[command(name = "bwsm")]
#[command(about = "Bitwarden Secrets Manager bridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List all secrets in the vault
    ListSecrets,

    /// Fetch a secret by name (falls back to the local snapshot when the
    /// vault is unreachable)
    GetSecret {
        /// Secret key to fetch
        name: String,
    },

    /// Create a new secret in the vault
    CreateSecret {
        /// Secret key (must be unique within the project)
        name: String,

        /// Secret value
        value: String,

        /// Optional note for the secret
        #[arg(long)]
        note: Option<String>,
    },

    /// Pull all secrets from the vault into the local snapshot file
    SyncSecrets,

    /// Run the HTTP API server in the foreground
    Serve {
        /// Bind address override
        #[arg(long)]
        addr: Option<String>,

        /// Port override
        #[arg(long)]
        port: Option<u16>,
    },

    /// Convert a snapshot JSON file to KEY=value env text
    ConvertToEnv {
        /// Snapshot JSON file to read
        #[arg(long)]
        json_file: PathBuf,

        /// Env file to write
        #[arg(long)]
        env_file: PathBuf,
    },

    /// Convert a KEY=value env file to snapshot JSON
    ConvertToJson {
        /// Env file to read
        #[arg(long)]
        env_file: PathBuf,

        /// Snapshot JSON file to write
        #[arg(long)]
        json_file: PathBuf,
    },

    /// Convert a KEY=value env file to JSON annotated with project and
    /// environment metadata
    ConvertToJsonFormatted {
        /// Env file to read
        #[arg(long)]
        env_file: PathBuf,

        /// JSON file to write
        #[arg(long)]
        json_file: PathBuf,

        /// Project name to annotate each record with
        #[arg(long)]
        project: String,

        /// Environment name to annotate each record with
        #[arg(long)]
        env: String,
    },
}

/// Build the secret service from environment configuration.
///
/// Only vault-backed commands call this; the conversion commands run fully
/// offline and need neither credentials nor scope.
fn build_service() -> anyhow::Result<(AppConfig, SecretService)> {
    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let vault = BitwardenClient::new(config.vault.clone(), config.scope)
        .context("Failed to build vault client")?;
    let store = SnapshotStore::new(config.cache.path.clone());
    let service = SecretService::new(Arc::new(vault), store);
    Ok((config, service))
}

/// Parse arguments and run the selected command.
pub async fn run_cli() -> anyhow::Result<()> {
    // Load .env if present; missing file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::ListSecrets => {
            let (_, service) = build_service()?;
            let secrets = service.list().await?;
            if secrets.is_empty() {
                println!("No secrets found");
            } else {
                println!("Available secrets:");
                for secret in secrets {
                    println!("- {}", secret.key);
                    if let Some(note) = &secret.note {
                        println!("  Note: {}", note);
                    }
                }
            }
        }

        Commands::GetSecret { name } => {
            let (_, service) = build_service()?;
            let secret = service.get(&name).await?;
            println!("Secret: {}", secret.key);
            println!("Value: {}", secret.value);
            if let Some(note) = &secret.note {
                println!("Note: {}", note);
            }
        }

        Commands::CreateSecret { name, value, note } => {
            let (_, service) = build_service()?;
            let secret = service.create(&name, &value, note.as_deref()).await?;
            println!("Successfully created secret: {}", secret.key);
        }

        Commands::SyncSecrets => {
            let (config, service) = build_service()?;
            let count = service.sync().await?;
            println!(
                "Successfully synced {} secrets to {}",
                count,
                config.cache.path.display()
            );
        }

        Commands::Serve { addr, port } => {
            let (config, service) = build_service()?;
            let mut api_config = config.api;
            if let Some(addr) = addr {
                api_config.bind_address = addr;
            }
            if let Some(port) = port {
                api_config.port = port;
            }
            start_api_server(api_config, service).await?;
        }

        Commands::ConvertToEnv { json_file, env_file } => {
            convert::json_file_to_env_file(&json_file, &env_file).await?;
            println!("Wrote {}", env_file.display());
        }

        Commands::ConvertToJson { env_file, json_file } => {
            convert::env_file_to_json_file(&env_file, &json_file).await?;
            println!("Wrote {}", json_file.display());
        }

        Commands::ConvertToJsonFormatted { env_file, json_file, project, env } => {
            convert::env_file_to_formatted_json_file(&env_file, &json_file, &project, &env)
                .await?;
            println!("Wrote {}", json_file.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_spec_surface() {
        Cli::try_parse_from(["bwsm", "list-secrets"]).unwrap();
        Cli::try_parse_from(["bwsm", "get-secret", "DB_PASS"]).unwrap();
        Cli::try_parse_from(["bwsm", "create-secret", "DB_PASS", "s3cr3t", "--note", "prod"])
            .unwrap();
        Cli::try_parse_from(["bwsm", "sync-secrets"]).unwrap();
        Cli::try_parse_from([
            "bwsm",
            "convert-to-env",
            "--json-file",
            "s.json",
            "--env-file",
            "s.env",
        ])
        .unwrap();
        Cli::try_parse_from([
            "bwsm",
            "convert-to-json-formatted",
            "--env-file",
            "s.env",
            "--json-file",
            "s.json",
            "--project",
            "billing",
            "--env",
            "production",
        ])
        .unwrap();
    }

    #[test]
    fn test_cli_rejects_missing_arguments() {
        assert!(Cli::try_parse_from(["bwsm", "get-secret"]).is_err());
        assert!(Cli::try_parse_from(["bwsm", "create-secret", "only-key"]).is_err());
        assert!(Cli::try_parse_from(["bwsm", "convert-to-env", "--json-file", "s.json"]).is_err());
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from(["bwsm", "serve", "--addr", "0.0.0.0", "--port", "9000"])
            .unwrap();
        match cli.command {
            Commands::Serve { addr, port } => {
                assert_eq!(addr.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(9000));
            }
            _ => panic!("expected serve command"),
        }
    }
}
