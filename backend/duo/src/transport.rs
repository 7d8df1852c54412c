//! Signed HTTP transport for the Duo Auth API.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, error};

use crate::signer::SignedRequest;
use crate::wire::{DuoEnvelope, Outcome};

/// Errors surfaced by a Duo call. Terminal to the current unlock attempt;
/// there are no retries.
#[derive(Debug, Error)]
pub enum DuoError {
    #[error("duo request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("duo returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("duo response was not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("duo returned unrecognized result {0:?}")]
    UnknownResult(String),

    #[error("duo response missing field {0}")]
    MissingField(&'static str),
}

/// Issues signed POSTs against the Duo Auth API and classifies responses.
pub struct AuthTransport {
    http: Client,
    integration_key: String,
}

impl AuthTransport {
    pub fn new(integration_key: &str) -> Self {
        Self {
            http: Client::new(),
            integration_key: integration_key.to_string(),
        }
    }

    /// POST `https://{host}{path}?{params}` with an empty body, a `Date`
    /// header echoing the signed timestamp, and a Basic-auth credential of
    /// `integration_key:signature`.
    pub async fn send(
        &self,
        host: &str,
        path: &str,
        signed: &SignedRequest,
        timeout: Duration,
    ) -> Result<Outcome, DuoError> {
        let url = format!("https://{host}{path}?{}", signed.encoded_params);
        debug!(%url, "Sending signed Duo request");

        let res = self
            .http
            .post(&url)
            .header("Date", &signed.date)
            .header(
                "Authorization",
                format!(
                    "Basic {}",
                    basic_credential(&self.integration_key, &signed.signature)
                ),
            )
            .header("Content-Type", "application/x-www-form-urlencoded")
            .timeout(timeout)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            error!(status = status.as_u16(), "Duo call failed");
            return Err(DuoError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: DuoEnvelope = serde_json::from_str(&body)?;
        classify(envelope)
    }
}

/// Base64 of `integration_key:signature`, the Basic-auth credential.
fn basic_credential(integration_key: &str, signature: &str) -> String {
    BASE64.encode(format!("{integration_key}:{signature}"))
}

/// Map the envelope's `response.result` onto an [`Outcome`]. An
/// unrecognized result or a missing required field is an error, never a
/// silent stall.
fn classify(envelope: DuoEnvelope) -> Result<Outcome, DuoError> {
    let response = envelope.response;
    match response.result.as_str() {
        "allow" => Ok(Outcome::Allow),
        "deny" => Ok(Outcome::Deny),
        "auth" => Ok(Outcome::Auth {
            devices: response.devices.unwrap_or_default(),
        }),
        "enroll" => response
            .enroll_portal_url
            .map(|portal_url| Outcome::Enroll { portal_url })
            .ok_or(DuoError::MissingField("enroll_portal_url")),
        other => Err(DuoError::UnknownResult(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_body(body: &str) -> Result<Outcome, DuoError> {
        classify(serde_json::from_str(body).unwrap())
    }

    #[test]
    fn test_basic_credential_vector() {
        let credential = basic_credential(
            "DIWJ8X6AEYOR5OMC6TQ1",
            "f910cf4297b1c745bb90425197c7190d9ca79fc9",
        );
        assert_eq!(
            credential,
            "RElXSjhYNkFFWU9SNU9NQzZUUTE6ZjkxMGNmNDI5N2IxYzc0NWJiOTA0MjUxOTdjNzE5MGQ5Y2E3OWZjOQ=="
        );
    }

    #[test]
    fn test_classify_allow() {
        let outcome = classify_body(r#"{"response": {"result": "allow"}}"#).unwrap();
        assert_eq!(outcome, Outcome::Allow);
    }

    #[test]
    fn test_classify_deny() {
        let outcome = classify_body(
            r#"{"response": {"result": "deny", "status_msg": "Login denied"}}"#,
        )
        .unwrap();
        assert_eq!(outcome, Outcome::Deny);
    }

    #[test]
    fn test_classify_auth_devices() {
        let outcome = classify_body(
            r#"{
                "response": {
                    "result": "auth",
                    "devices": [
                        {
                            "device": "DPFZRS9FB0D46QFTM891",
                            "display_name": "iOS (+1 555-123-4567)",
                            "capabilities": ["push", "sms"]
                        }
                    ]
                }
            }"#,
        )
        .unwrap();
        match outcome {
            Outcome::Auth { devices } => {
                assert_eq!(devices.len(), 1);
                assert_eq!(devices[0].device, "DPFZRS9FB0D46QFTM891");
                assert!(devices[0].supports_push());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_classify_auth_without_devices_is_empty() {
        let outcome = classify_body(r#"{"response": {"result": "auth"}}"#).unwrap();
        assert_eq!(outcome, Outcome::Auth { devices: vec![] });
    }

    #[test]
    fn test_classify_enroll() {
        let outcome = classify_body(
            r#"{"response": {"result": "enroll", "enroll_portal_url": "https://enroll.example.com/p"}}"#,
        )
        .unwrap();
        assert_eq!(
            outcome,
            Outcome::Enroll {
                portal_url: "https://enroll.example.com/p".to_string()
            }
        );
    }

    #[test]
    fn test_classify_enroll_without_portal_is_error() {
        let err = classify_body(r#"{"response": {"result": "enroll"}}"#).unwrap_err();
        assert!(matches!(err, DuoError::MissingField("enroll_portal_url")));
    }

    #[test]
    fn test_classify_unknown_result_is_error() {
        let err = classify_body(r#"{"response": {"result": "waiting"}}"#).unwrap_err();
        assert!(matches!(err, DuoError::UnknownResult(r) if r == "waiting"));
    }

    #[test]
    fn test_malformed_envelope_is_error() {
        let err = serde_json::from_str::<DuoEnvelope>(r#"{"result": "allow"}"#).unwrap_err();
        let err: DuoError = err.into();
        assert!(matches!(err, DuoError::Malformed(_)));
    }
}
