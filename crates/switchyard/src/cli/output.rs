//! Output formats for the `--output` flag.
//!
//! Text output goes through each report's `Display` impl. Structured modes
//! serialize the report directly.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during serialization.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Controls how command output is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    /// Human-readable text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
}

/// Serializes data to JSON format.
pub fn to_json<T: Serialize>(data: &T) -> Result<String, SerializeError> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Serializes data to YAML format.
pub fn to_yaml<T: Serialize>(data: &T) -> Result<String, SerializeError> {
    Ok(serde_yaml::to_string(data)?)
}

/// Renders `data` in the given mode.
///
/// Every rendering ends with a newline.
pub fn render<T>(data: &T, mode: OutputMode) -> Result<String, SerializeError>
where
    T: Serialize + fmt::Display,
{
    let mut out = match mode {
        OutputMode::Text => data.to_string(),
        OutputMode::Json => to_json(data)?,
        OutputMode::Yaml => to_yaml(data)?,
    };
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}
