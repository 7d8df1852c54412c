//! Duo Auth API v2 response envelope.

use roomlock_core::PreAuthDevice;
use serde::Deserialize;

/// Top-level envelope: every Auth API response nests under `response`.
#[derive(Deserialize, Debug)]
pub struct DuoEnvelope {
    pub response: DuoResponse,
}

#[derive(Deserialize, Debug)]
pub struct DuoResponse {
    pub result: String,
    /// Present on `auth` pre-authentication responses.
    #[serde(default)]
    pub devices: Option<Vec<PreAuthDevice>>,
    /// Present on `enroll` responses.
    #[serde(default)]
    pub enroll_portal_url: Option<String>,
    /// Human-readable detail, informational only.
    #[serde(default)]
    pub status_msg: Option<String>,
}

/// Classified outcome of a pre-authentication or push-authentication call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Factor satisfied.
    Allow,
    /// Explicit rejection.
    Deny,
    /// Pre-authentication device list.
    Auth { devices: Vec<PreAuthDevice> },
    /// The principal has no enrolled device; the portal completes enrollment.
    Enroll { portal_url: String },
}
