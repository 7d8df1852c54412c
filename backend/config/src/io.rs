//! Config load: YAML file, `${VAR}` substitution, schema, validation.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::info;

use crate::env::resolve_env_vars;
use crate::schema::RoomLockConfig;

/// Load and parse the config from disk.
pub async fn load_config(path: &Path) -> Result<RoomLockConfig> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&raw)
        .with_context(|| format!("Failed to parse config at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Parse a raw YAML document, resolving `${VAR}` references against the
/// process environment.
fn parse_config(raw: &str) -> Result<RoomLockConfig> {
    let value: serde_json::Value =
        serde_yaml::from_str(raw).context("config is not valid YAML")?;
    let value = resolve_env_vars(&value)?;
    let config: RoomLockConfig =
        serde_json::from_value(value).context("config does not match the schema")?;
    config.validate()?;
    Ok(config)
}
