//! High-level Duo Auth API client composing signing and transport.

use std::time::Duration;

use async_trait::async_trait;
use roomlock_core::Identity;
use tracing::info;

use crate::signer;
use crate::transport::{AuthTransport, DuoError};
use crate::wire::Outcome;

const PREAUTH_PATH: &str = "/auth/v2/preauth";
const AUTH_PATH: &str = "/auth/v2/auth";

/// Connection settings for one Duo integration.
#[derive(Clone)]
pub struct DuoSettings {
    pub api_hostname: String,
    pub integration_key: String,
    pub secret_key: String,
    /// Bound on the device-list fetch.
    pub preauth_timeout: Duration,
    /// Bound on the push call, which blocks on the user's phone.
    pub auth_timeout: Duration,
}

/// The second-factor provider seam. The controller talks to this trait so
/// tests can script outcomes without a network.
#[async_trait]
pub trait SecondFactor: Send + Sync {
    /// Fetch the factor-capable devices registered to the principal.
    async fn preauth(&self, identity: &Identity) -> Result<Outcome, DuoError>;

    /// Issue a push challenge to the chosen device and wait for the verdict.
    async fn auth_push(&self, identity: &Identity, device: &str) -> Result<Outcome, DuoError>;
}

pub struct DuoClient {
    settings: DuoSettings,
    transport: AuthTransport,
}

impl DuoClient {
    pub fn new(settings: DuoSettings) -> Self {
        let transport = AuthTransport::new(&settings.integration_key);
        Self {
            settings,
            transport,
        }
    }
}

#[async_trait]
impl SecondFactor for DuoClient {
    async fn preauth(&self, identity: &Identity) -> Result<Outcome, DuoError> {
        info!(identity = %identity, "Requesting pre-authentication device list");
        let signed = signer::sign(
            "POST",
            &self.settings.api_hostname,
            PREAUTH_PATH,
            &[("username", identity.as_str())],
            &self.settings.secret_key,
        );
        self.transport
            .send(
                &self.settings.api_hostname,
                PREAUTH_PATH,
                &signed,
                self.settings.preauth_timeout,
            )
            .await
    }

    async fn auth_push(&self, identity: &Identity, device: &str) -> Result<Outcome, DuoError> {
        info!(identity = %identity, device, "Issuing push challenge");
        let signed = signer::sign(
            "POST",
            &self.settings.api_hostname,
            AUTH_PATH,
            &[
                ("device", device),
                ("factor", "push"),
                ("username", identity.as_str()),
            ],
            &self.settings.secret_key,
        );
        self.transport
            .send(
                &self.settings.api_hostname,
                AUTH_PATH,
                &signed,
                self.settings.auth_timeout,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_preauth_uses_identity_verbatim() {
        // The constructed principal is the `username` parameter, unmodified
        // except for `@` encoding in the canonical/query string.
        let identity = Identity::from_contact("jdoe@acme.calls.example.net", "example.com");
        let ts = Utc.with_ymd_and_hms(2023, 8, 17, 12, 5, 9).unwrap();
        let signed = signer::sign_at(
            ts,
            "POST",
            "api-xxxxxxxx.duosecurity.com",
            PREAUTH_PATH,
            &[("username", identity.as_str())],
            "sekrit",
        );
        assert_eq!(signed.encoded_params, "username=jdoe%40example.com");
    }
}
