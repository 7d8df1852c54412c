use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether the endpoint UI is currently restricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    Locked,
    Unlocked,
}

/// Endpoint power states reported by the standby status feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandbyState {
    Off,
    Halfwake,
    EnteringStandby,
    Standby,
}

impl StandbyState {
    /// Parse the codec's status string. Unknown values yield `None` so the
    /// caller can ignore states introduced by newer firmware.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Off" => Some(Self::Off),
            "Halfwake" => Some(Self::Halfwake),
            "EnteringStandby" => Some(Self::EnteringStandby),
            "Standby" => Some(Self::Standby),
            _ => None,
        }
    }
}

/// The authentication principal for this endpoint: the local part of the
/// device's bound contact address joined with the organization domain.
///
/// Constructed once at startup and immutable afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    /// `"jdoe@acme.calls.example.net"` + `"example.com"` → `"jdoe@example.com"`.
    pub fn from_contact(contact: &str, domain: &str) -> Self {
        let local = contact.split('@').next().unwrap_or(contact);
        Identity(format!("{local}@{domain}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One second-factor device registered to the principal.
///
/// Field names match the provider's pre-authentication response, so this
/// doubles as the wire representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreAuthDevice {
    /// Opaque device identifier used in the push request.
    pub device: String,
    /// Human-readable name shown in the on-screen picker.
    #[serde(default)]
    pub display_name: String,
    /// Factor capabilities ("push", "sms", "phone", ...).
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl PreAuthDevice {
    pub fn supports_push(&self) -> bool {
        self.capabilities.iter().any(|c| c == "push")
    }
}

/// Keep only devices that can receive a push, order preserved.
pub fn push_capable(devices: Vec<PreAuthDevice>) -> Vec<PreAuthDevice> {
    devices.into_iter().filter(PreAuthDevice::supports_push).collect()
}
