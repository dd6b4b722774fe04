//! # Format Conversion
//!
//! Bidirectional transforms between flat `KEY=value` env text and the
//! structured JSON snapshot, plus a formatted JSON variant that annotates
//! each record with project/environment metadata.
//!
//! Env text is a lossy format: it carries keys and values only, so notes and
//! vault ids do not survive a trip through it. `from_env_text(to_env_text(s))`
//! reproduces `s` exactly for snapshots built from [`Secret::local`] entries
//! with newline-free values.

use std::path::Path;

use serde::Serialize;

use crate::cache::Snapshot;
use crate::errors::{Error, Result};
use crate::vault::Secret;

/// One secret annotated with deployment metadata, as emitted by
/// [`to_formatted_json`].
#[derive(Debug, Serialize)]
struct FormattedSecret<'a> {
    key: &'a str,
    value: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'a str>,
    project: &'a str,
    environment: &'a str,
}

/// Render a snapshot as `KEY=value` lines, one per secret.
///
/// Values are written as-is, without quoting or escaping; a value containing
/// a newline cannot be represented and is rejected.
pub fn to_env_text(snapshot: &Snapshot) -> Result<String> {
    let mut out = String::new();
    for secret in snapshot.iter() {
        // Parsing trims whitespace around keys, so a padded key would not
        // survive a round trip; reject it up front like `=` and newlines.
        if secret.key.contains('=') || secret.key.contains('\n') || secret.key.trim() != secret.key
        {
            return Err(Error::validation(format!(
                "Key '{}' cannot be written as env text",
                secret.key
            )));
        }
        if secret.value.contains('\n') {
            return Err(Error::validation(format!(
                "Value of '{}' contains a newline and cannot be written as env text",
                secret.key
            )));
        }
        out.push_str(&secret.key);
        out.push('=');
        out.push_str(&secret.value);
        out.push('\n');
    }
    Ok(out)
}

/// Parse `KEY=value` text into a snapshot.
///
/// Blank lines and lines starting with `#` are skipped. Everything after the
/// first `=` is the value, untouched.
pub fn from_env_text(text: &str) -> Result<Snapshot> {
    let mut snapshot = Snapshot::new();
    for (number, raw_line) in text.lines().enumerate() {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| {
            Error::validation(format!("Line {} is not 'KEY=value': '{}'", number + 1, line))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::validation(format!("Line {} has an empty key", number + 1)));
        }

        snapshot.insert(Secret::local(key, value));
    }
    Ok(snapshot)
}

/// Render a snapshot as pretty JSON with each secret annotated by project
/// and environment.
pub fn to_formatted_json(snapshot: &Snapshot, project: &str, environment: &str) -> Result<String> {
    let records: Vec<FormattedSecret<'_>> = snapshot
        .iter()
        .map(|s| FormattedSecret {
            key: &s.key,
            value: &s.value,
            note: s.note.as_deref(),
            project,
            environment,
        })
        .collect();

    serde_json::to_string_pretty(&records)
        .map_err(|e| Error::serialization(e, "Failed to encode formatted secrets"))
}

/// Read a snapshot JSON file and write it out as env text.
pub async fn json_file_to_env_file(json_path: &Path, env_path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(json_path).await?;
    let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(|e| {
        Error::serialization(e, format!("'{}' is not a valid snapshot", json_path.display()))
    })?;
    let text = to_env_text(&snapshot)?;
    tokio::fs::write(env_path, text).await?;
    Ok(())
}

/// Read an env file and write it out as snapshot JSON.
pub async fn env_file_to_json_file(env_path: &Path, json_path: &Path) -> Result<()> {
    let text = tokio::fs::read_to_string(env_path).await?;
    let snapshot = from_env_text(&text)?;
    let json = serde_json::to_vec_pretty(&snapshot)
        .map_err(|e| Error::serialization(e, "Failed to encode snapshot"))?;
    tokio::fs::write(json_path, json).await?;
    Ok(())
}

/// Read an env file and write it out as formatted JSON with project and
/// environment metadata.
pub async fn env_file_to_formatted_json_file(
    env_path: &Path,
    json_path: &Path,
    project: &str,
    environment: &str,
) -> Result<()> {
    let text = tokio::fs::read_to_string(env_path).await?;
    let snapshot = from_env_text(&text)?;
    let json = to_formatted_json(&snapshot, project, environment)?;
    tokio::fs::write(json_path, json).await?;
    Ok(())
}
