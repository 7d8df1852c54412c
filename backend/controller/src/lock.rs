//! Lock state machine and unlock attempt orchestration.
//!
//! The controller is the bus's single consumer and the only owner of lock
//! state, the pre-auth device cache, and the attempt-in-progress guard.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use roomlock_core::{
    AttemptFinished, AttemptOutcome, Component, DeviceEvent, Identity, LockState, Message,
    PreAuthDevice, StandbyState, UiSignal,
};
use roomlock_device::{DeviceSurface, LOCK_PANEL_ID};
use roomlock_duo::SecondFactor;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::attempt::{self, AttemptContext};

/// Buffer for picker signals forwarded to the active attempt.
const SIGNAL_BUFFER: usize = 8;

pub struct LockController {
    surface: Arc<dyn DeviceSurface>,
    duo: Arc<dyn SecondFactor>,
    identity: Identity,
    controller_tx: mpsc::Sender<Message>,
}

struct ActiveAttempt {
    id: Uuid,
    signal_tx: mpsc::Sender<UiSignal>,
}

impl LockController {
    pub fn new(
        surface: Arc<dyn DeviceSurface>,
        duo: Arc<dyn SecondFactor>,
        identity: Identity,
        controller_tx: mpsc::Sender<Message>,
    ) -> Self {
        Self {
            surface,
            duo,
            identity,
            controller_tx,
        }
    }

    async fn run(&self, mut rx: mpsc::Receiver<Message>) -> Result<()> {
        let mut state = LockState::Locked;
        let mut cache: Option<Vec<PreAuthDevice>> = None;
        let mut active: Option<ActiveAttempt> = None;

        // Default to locked on startup.
        self.apply_lock_ui().await;
        info!("Lock controller started");

        while let Some(message) = rx.recv().await {
            match message {
                Message::Device(DeviceEvent::PanelClicked { panel_id }) => {
                    if panel_id != LOCK_PANEL_ID {
                        debug!(%panel_id, "Ignoring unrelated panel");
                        continue;
                    }
                    match state {
                        LockState::Unlocked => {
                            info!("Lock requested");
                            state = LockState::Locked;
                            self.apply_lock_ui().await;
                        }
                        LockState::Locked => {
                            if let Some(attempt) = &active {
                                debug!(
                                    attempt_id = %attempt.id,
                                    "Unlock attempt already in flight; ignoring"
                                );
                                continue;
                            }
                            active = Some(self.spawn_attempt(cache.clone()));
                        }
                    }
                }
                Message::Device(DeviceEvent::WidgetSignal { signal }) => match &active {
                    Some(attempt) => {
                        if attempt.signal_tx.send(signal).await.is_err() {
                            warn!(
                                attempt_id = %attempt.id,
                                "Active attempt no longer listening for picker signals"
                            );
                        }
                    }
                    None => debug!(?signal, "Picker signal with no active attempt"),
                },
                Message::Device(DeviceEvent::StandbyChanged { state: standby }) => {
                    if standby == StandbyState::Standby {
                        info!("Entering standby; locking endpoint");
                        state = LockState::Locked;
                        self.apply_lock_ui().await;
                    } else {
                        debug!(?standby, "Standby state changed");
                    }
                }
                Message::AttemptFinished(finished) => {
                    active = None;
                    if let Some(devices) = &finished.devices {
                        debug!(count = devices.len(), "Caching pre-auth device list");
                        cache = Some(devices.clone());
                    }
                    state = self.finish_attempt(state, finished).await;
                }
            }
        }

        info!("Lock controller channel closed; shutting down");
        Ok(())
    }

    fn spawn_attempt(&self, cached: Option<Vec<PreAuthDevice>>) -> ActiveAttempt {
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_BUFFER);
        let id = Uuid::new_v4();
        let ctx = AttemptContext {
            id,
            surface: self.surface.clone(),
            duo: self.duo.clone(),
            identity: self.identity.clone(),
            cached,
        };
        let tx = self.controller_tx.clone();
        tokio::spawn(async move {
            let finished = attempt::run(ctx, signal_rx).await;
            if tx.send(Message::AttemptFinished(finished)).await.is_err() {
                warn!("Controller channel closed before the attempt result was delivered");
            }
        });
        info!(attempt_id = %id, "Unlock attempt started");
        ActiveAttempt { id, signal_tx }
    }

    async fn finish_attempt(&self, state: LockState, finished: AttemptFinished) -> LockState {
        match finished.outcome {
            AttemptOutcome::Approved => {
                if state == LockState::Locked {
                    info!(
                        attempt_id = %finished.attempt_id,
                        "Authentication approved; unlocking endpoint"
                    );
                    self.apply_unlock_ui().await;
                    LockState::Unlocked
                } else {
                    debug!(
                        attempt_id = %finished.attempt_id,
                        "Approval arrived while already unlocked"
                    );
                    state
                }
            }
            outcome => {
                info!(
                    attempt_id = %finished.attempt_id,
                    ?outcome,
                    "Attempt ended without approval"
                );
                if state == LockState::Locked {
                    // Restriction sets are idempotent; re-apply in case the
                    // attempt left picker UI behind.
                    self.apply_lock_ui().await;
                }
                state
            }
        }
    }

    /// Each property set is independent and best-effort: a failure is
    /// logged and the remaining properties are still applied.
    async fn apply_lock_ui(&self) {
        if let Err(err) = self.surface.set_hide_all_actions(true).await {
            warn!(error = %err, "Could not hide action buttons");
        }
        if let Err(err) = self.surface.set_assistant_enabled(false).await {
            warn!(error = %err, "Could not disable the assistant");
        }
        if let Err(err) = self.surface.set_settings_menu_hidden(true).await {
            warn!(error = %err, "Could not hide the settings menu");
        }
        if let Err(err) = self.surface.set_booking_titles_hidden(true).await {
            warn!(error = %err, "Could not hide booking titles");
        }
        if let Err(err) = self.surface.update_panel_name(LOCK_PANEL_ID, "Unlock").await {
            warn!(error = %err, "Could not relabel the lock panel");
        }
    }

    async fn apply_unlock_ui(&self) {
        if let Err(err) = self.surface.set_hide_all_actions(false).await {
            warn!(error = %err, "Could not restore action buttons");
        }
        if let Err(err) = self.surface.set_assistant_enabled(true).await {
            warn!(error = %err, "Could not enable the assistant");
        }
        if let Err(err) = self.surface.set_settings_menu_hidden(false).await {
            warn!(error = %err, "Could not restore the settings menu");
        }
        if let Err(err) = self.surface.set_booking_titles_hidden(false).await {
            warn!(error = %err, "Could not restore booking titles");
        }
        if let Err(err) = self.surface.update_panel_name(LOCK_PANEL_ID, "Lock").await {
            warn!(error = %err, "Could not relabel the lock panel");
        }
    }
}

#[async_trait]
impl Component for LockController {
    fn name(&self) -> &str {
        "lock-controller"
    }

    async fn start(&self, rx: mpsc::Receiver<Message>) -> Result<()> {
        self.run(rx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{push_device, sms_device, FakeDuo, RecordingSurface};
    use roomlock_core::LockBus;
    use roomlock_duo::Outcome;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    async fn start_controller(
        surface: Arc<RecordingSurface>,
        duo: Arc<FakeDuo>,
    ) -> mpsc::Sender<Message> {
        let mut bus = LockBus::new();
        let rx = bus.take_controller_rx().unwrap();
        let controller = LockController::new(
            surface,
            duo,
            Identity::from_contact("jdoe@acme.calls.example.net", "example.com"),
            bus.controller_tx.clone(),
        );
        tokio::spawn(async move {
            controller.start(rx).await.unwrap();
        });
        bus.controller_tx
    }

    fn lock_click() -> Message {
        Message::Device(DeviceEvent::PanelClicked {
            panel_id: "Lock".to_string(),
        })
    }

    fn confirm() -> Message {
        Message::Device(DeviceEvent::WidgetSignal {
            signal: UiSignal::ConfirmSelection,
        })
    }

    fn standby() -> Message {
        Message::Device(DeviceEvent::StandbyChanged {
            state: StandbyState::Standby,
        })
    }

    #[tokio::test]
    async fn test_allow_unlocks_endpoint() {
        let surface = RecordingSurface::new();
        let duo = FakeDuo::new(
            Some(Outcome::Auth {
                devices: vec![push_device("a")],
            }),
            Some(Outcome::Allow),
        );
        let tx = start_controller(surface.clone(), duo).await;
        assert!(surface.wait_for("hide_all=true").await); // initial lock

        tx.send(lock_click()).await.unwrap();
        tx.send(confirm()).await.unwrap();

        assert!(surface.wait_for("hide_all=false").await);
        assert!(surface.wait_for("panel_name=Lock:Lock").await);
    }

    #[tokio::test]
    async fn test_deny_stays_locked_and_alerts() {
        let surface = RecordingSurface::new();
        let duo = FakeDuo::new(
            Some(Outcome::Auth {
                devices: vec![push_device("a")],
            }),
            Some(Outcome::Deny),
        );
        let tx = start_controller(surface.clone(), duo).await;
        assert!(surface.wait_for("hide_all=true").await);

        tx.send(lock_click()).await.unwrap();
        tx.send(confirm()).await.unwrap();

        assert!(surface.wait_for("alert=Duo authentication failed").await);
        // Restrictions re-applied, never lifted.
        assert!(surface.wait_for_count("hide_all=true", 2).await);
        assert_eq!(surface.count("hide_all=false"), 0);
    }

    #[tokio::test]
    async fn test_empty_push_list_relocks_without_alert() {
        let surface = RecordingSurface::new();
        let duo = FakeDuo::new(
            Some(Outcome::Auth {
                devices: vec![sms_device("b")],
            }),
            None,
        );
        let tx = start_controller(surface.clone(), duo.clone()).await;
        assert!(surface.wait_for("hide_all=true").await);

        tx.send(lock_click()).await.unwrap();

        assert!(surface.wait_for_count("hide_all=true", 2).await);
        assert_eq!(surface.count("alert=Duo authentication failed"), 0);
        // The picker never opened.
        assert_eq!(surface.count("panel_open=duoAuthSelect"), 0);
        assert_eq!(duo.auth_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_standby_always_forces_lock() {
        let surface = RecordingSurface::new();
        let duo = FakeDuo::new(
            Some(Outcome::Auth {
                devices: vec![push_device("a")],
            }),
            Some(Outcome::Allow),
        );
        let tx = start_controller(surface.clone(), duo).await;
        assert!(surface.wait_for("hide_all=true").await);

        // Unlock first.
        tx.send(lock_click()).await.unwrap();
        tx.send(confirm()).await.unwrap();
        assert!(surface.wait_for("hide_all=false").await);

        // Standby re-locks.
        tx.send(standby()).await.unwrap();
        assert!(surface.wait_for_count("hide_all=true", 2).await);

        // Standby while already locked is idempotent.
        tx.send(standby()).await.unwrap();
        assert!(surface.wait_for_count("hide_all=true", 3).await);
    }

    #[tokio::test]
    async fn test_duplicate_clicks_run_one_attempt() {
        let surface = RecordingSurface::new();
        let duo = FakeDuo::with_auth_delay(
            Some(Outcome::Auth {
                devices: vec![push_device("a")],
            }),
            Some(Outcome::Allow),
            Duration::from_millis(100),
        );
        let tx = start_controller(surface.clone(), duo.clone()).await;
        assert!(surface.wait_for("hide_all=true").await);

        tx.send(lock_click()).await.unwrap();
        tx.send(lock_click()).await.unwrap();
        tx.send(lock_click()).await.unwrap();
        tx.send(confirm()).await.unwrap();

        assert!(surface.wait_for("hide_all=false").await);
        assert_eq!(duo.preauth_calls.load(Ordering::SeqCst), 1);
        assert_eq!(duo.auth_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lock_panel_relocks_when_unlocked() {
        let surface = RecordingSurface::new();
        let duo = FakeDuo::new(
            Some(Outcome::Auth {
                devices: vec![push_device("a")],
            }),
            Some(Outcome::Allow),
        );
        let tx = start_controller(surface.clone(), duo.clone()).await;
        assert!(surface.wait_for("hide_all=true").await);

        tx.send(lock_click()).await.unwrap();
        tx.send(confirm()).await.unwrap();
        assert!(surface.wait_for("hide_all=false").await);

        // The panel now reads "Lock"; pressing it restores restrictions
        // without any authentication round-trip.
        tx.send(lock_click()).await.unwrap();
        assert!(surface.wait_for_count("hide_all=true", 2).await);
        assert_eq!(duo.preauth_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_device_list_is_cached_across_attempts() {
        let surface = RecordingSurface::new();
        let duo = FakeDuo::new(
            Some(Outcome::Auth {
                devices: vec![push_device("a")],
            }),
            Some(Outcome::Deny),
        );
        let tx = start_controller(surface.clone(), duo.clone()).await;
        assert!(surface.wait_for("hide_all=true").await);

        // First attempt fetches and is denied.
        tx.send(lock_click()).await.unwrap();
        tx.send(confirm()).await.unwrap();
        assert!(surface.wait_for("alert=Duo authentication failed").await);

        // Second attempt reuses the cached list.
        tx.send(lock_click()).await.unwrap();
        tx.send(confirm()).await.unwrap();
        assert!(surface.wait_for_count("alert=Duo authentication failed", 2).await);
        assert_eq!(duo.preauth_calls.load(Ordering::SeqCst), 1);
        assert_eq!(duo.auth_calls.load(Ordering::SeqCst), 2);
    }
}
