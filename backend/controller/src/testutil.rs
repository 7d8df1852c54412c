//! Shared fakes for controller tests: a recording device surface and a
//! scripted second-factor provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use roomlock_core::{Identity, PreAuthDevice};
use roomlock_device::DeviceSurface;
use roomlock_duo::{DuoError, Outcome, SecondFactor};

pub(crate) fn push_device(id: &str) -> PreAuthDevice {
    PreAuthDevice {
        device: id.to_string(),
        display_name: format!("Phone {id}"),
        capabilities: vec!["push".to_string()],
    }
}

pub(crate) fn sms_device(id: &str) -> PreAuthDevice {
    PreAuthDevice {
        device: id.to_string(),
        display_name: format!("Phone {id}"),
        capabilities: vec!["sms".to_string()],
    }
}

/// Records every surface call as an op string.
pub(crate) struct RecordingSurface {
    ops: Mutex<Vec<String>>,
}

impl RecordingSurface {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            ops: Mutex::new(Vec::new()),
        })
    }

    fn record(&self, op: String) {
        self.ops.lock().unwrap().push(op);
    }

    pub(crate) fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, op: &str) -> usize {
        self.ops().iter().filter(|o| o.as_str() == op).count()
    }

    /// Poll until `op` has been recorded at least `times` times, or give up
    /// after two seconds.
    pub(crate) async fn wait_for_count(&self, op: &str, times: usize) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while tokio::time::Instant::now() < deadline {
            if self.count(op) >= times {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    pub(crate) async fn wait_for(&self, op: &str) -> bool {
        self.wait_for_count(op, 1).await
    }
}

#[async_trait]
impl DeviceSurface for RecordingSurface {
    async fn set_hide_all_actions(&self, hidden: bool) -> Result<()> {
        self.record(format!("hide_all={hidden}"));
        Ok(())
    }

    async fn set_assistant_enabled(&self, enabled: bool) -> Result<()> {
        self.record(format!("assistant={enabled}"));
        Ok(())
    }

    async fn set_settings_menu_hidden(&self, hidden: bool) -> Result<()> {
        self.record(format!("settings_hidden={hidden}"));
        Ok(())
    }

    async fn set_booking_titles_hidden(&self, hidden: bool) -> Result<()> {
        self.record(format!("bookings_hidden={hidden}"));
        Ok(())
    }

    async fn update_panel_name(&self, panel_id: &str, name: &str) -> Result<()> {
        self.record(format!("panel_name={panel_id}:{name}"));
        Ok(())
    }

    async fn open_panel(&self, panel_id: &str) -> Result<()> {
        self.record(format!("panel_open={panel_id}"));
        Ok(())
    }

    async fn close_panel(&self) -> Result<()> {
        self.record("panel_close".to_string());
        Ok(())
    }

    async fn set_widget_value(&self, widget_id: &str, value: &str) -> Result<()> {
        self.record(format!("widget={widget_id}:{value}"));
        Ok(())
    }

    async fn show_alert(&self, title: &str, _text: &str, _duration_secs: u32) -> Result<()> {
        self.record(format!("alert={title}"));
        Ok(())
    }

    async fn display_web_view(&self, url: &str) -> Result<()> {
        self.record(format!("webview={url}"));
        Ok(())
    }

    async fn contact_address(&self) -> Result<String> {
        Ok("jdoe@acme.calls.example.net".to_string())
    }
}

/// Scripted second-factor provider. `None` outcomes produce an error, so
/// tests can exercise the failure path.
pub(crate) struct FakeDuo {
    preauth_outcome: Mutex<Option<Outcome>>,
    auth_outcome: Mutex<Option<Outcome>>,
    pub(crate) preauth_calls: AtomicUsize,
    pub(crate) auth_calls: AtomicUsize,
    auth_delay: Option<Duration>,
}

impl FakeDuo {
    pub(crate) fn new(preauth: Option<Outcome>, auth: Option<Outcome>) -> Arc<Self> {
        Arc::new(Self {
            preauth_outcome: Mutex::new(preauth),
            auth_outcome: Mutex::new(auth),
            preauth_calls: AtomicUsize::new(0),
            auth_calls: AtomicUsize::new(0),
            auth_delay: None,
        })
    }

    pub(crate) fn with_auth_delay(
        preauth: Option<Outcome>,
        auth: Option<Outcome>,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            preauth_outcome: Mutex::new(preauth),
            auth_outcome: Mutex::new(auth),
            preauth_calls: AtomicUsize::new(0),
            auth_calls: AtomicUsize::new(0),
            auth_delay: Some(delay),
        })
    }
}

#[async_trait]
impl SecondFactor for FakeDuo {
    async fn preauth(&self, _identity: &Identity) -> Result<Outcome, DuoError> {
        self.preauth_calls.fetch_add(1, Ordering::SeqCst);
        match self.preauth_outcome.lock().unwrap().clone() {
            Some(outcome) => Ok(outcome),
            None => Err(DuoError::UnknownResult("scripted failure".to_string())),
        }
    }

    async fn auth_push(&self, _identity: &Identity, _device: &str) -> Result<Outcome, DuoError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.auth_delay {
            tokio::time::sleep(delay).await;
        }
        match self.auth_outcome.lock().unwrap().clone() {
            Some(outcome) => Ok(outcome),
            None => Err(DuoError::UnknownResult("scripted failure".to_string())),
        }
    }
}
