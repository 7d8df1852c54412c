//! roomlock runtime configuration schema.
//!
//! Typed for serde YAML deserialization. The Duo keys and the codec
//! password accept `${VAR}` references resolved at load time.

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::redact::Secret;

/// Root configuration for roomlock.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomLockConfig {
    /// Duo Auth API integration
    pub duo: DuoSection,

    /// The collaboration endpoint this service drives
    pub codec: CodecSection,

    /// Inbound feedback webhook
    pub webhook: WebhookSection,

    /// Network deadlines
    #[serde(default)]
    pub timeouts: TimeoutsSection,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuoSection {
    /// `api-XXXXXXXX.duosecurity.com`
    pub api_hostname: String,
    pub integration_key: String,
    pub secret_key: Secret,
    /// Organization domain completing the principal's address.
    pub domain: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecSection {
    /// Base URL of the codec's HTTP interface, e.g. `https://codec.local`
    pub base_url: String,
    pub username: String,
    pub password: Secret,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSection {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_webhook_path")]
    pub path: String,
    /// URL the codec can reach this service at, without the path.
    pub callback_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeoutsSection {
    /// Startup deadline for reading the endpoint's contact info.
    pub identity_fetch_secs: u64,
    /// Bound on the Duo device-list fetch.
    pub preauth_secs: u64,
    /// Bound on the Duo push call, which blocks on the user's phone.
    pub auth_secs: u64,
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            identity_fetch_secs: 2,
            preauth_secs: 10,
            auth_secs: 90,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8571
}

fn default_webhook_path() -> String {
    "/feedback/codec".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RoomLockConfig {
    /// Reject configs that would fail at the first network call anyway.
    pub fn validate(&self) -> Result<()> {
        if self.duo.api_hostname.is_empty() {
            bail!("duo.apiHostname must be set");
        }
        if self.duo.integration_key.is_empty() {
            bail!("duo.integrationKey must be set");
        }
        if self.duo.secret_key.expose().is_empty() {
            bail!("duo.secretKey must be set");
        }
        if self.duo.domain.is_empty() {
            bail!("duo.domain must be set");
        }
        if self.codec.base_url.is_empty() {
            bail!("codec.baseUrl must be set");
        }
        if self.webhook.callback_url.is_empty() {
            bail!("webhook.callbackUrl must be set");
        }
        if !self.webhook.path.starts_with('/') {
            bail!("webhook.path must start with '/'");
        }
        Ok(())
    }
}
