//! One unlock attempt: pre-authentication, device selection, push
//! challenge. Runs as its own task so the controller loop keeps consuming
//! events while the user and the provider take their time.

use std::sync::Arc;

use roomlock_core::{
    push_capable, AttemptFinished, AttemptOutcome, Identity, PreAuthDevice, UiSignal,
};
use roomlock_device::DeviceSurface;
use roomlock_duo::{Outcome, SecondFactor};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::selector;

pub(crate) struct AttemptContext {
    pub id: Uuid,
    pub surface: Arc<dyn DeviceSurface>,
    pub duo: Arc<dyn SecondFactor>,
    pub identity: Identity,
    /// Push-capable devices already cached by the controller, if any.
    pub cached: Option<Vec<PreAuthDevice>>,
}

pub(crate) async fn run(
    ctx: AttemptContext,
    mut signals: mpsc::Receiver<UiSignal>,
) -> AttemptFinished {
    let mut fetched = None;
    let outcome = challenge(&ctx, &mut signals, &mut fetched).await;
    AttemptFinished {
        attempt_id: ctx.id,
        outcome,
        devices: fetched,
    }
}

async fn challenge(
    ctx: &AttemptContext,
    signals: &mut mpsc::Receiver<UiSignal>,
    fetched: &mut Option<Vec<PreAuthDevice>>,
) -> AttemptOutcome {
    let devices = match &ctx.cached {
        Some(cached) => cached.clone(),
        None => match ctx.duo.preauth(&ctx.identity).await {
            Ok(Outcome::Auth { devices }) => {
                let push = push_capable(devices);
                *fetched = Some(push.clone());
                push
            }
            Ok(Outcome::Allow) => {
                info!(attempt_id = %ctx.id, "Factor already satisfied at pre-authentication");
                return AttemptOutcome::Approved;
            }
            Ok(Outcome::Enroll { portal_url }) => return enroll(ctx, &portal_url).await,
            Ok(Outcome::Deny) => return deny(ctx).await,
            Err(err) => {
                error!(attempt_id = %ctx.id, error = %err, "Pre-authentication failed");
                return AttemptOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        },
    };

    if devices.is_empty() {
        // Implicit denial: nothing to push to. No user-facing alert.
        info!(attempt_id = %ctx.id, "No push-capable device registered");
        return AttemptOutcome::NoPushDevice;
    }

    let device = match selector::select(ctx.surface.as_ref(), &devices, signals).await {
        Ok(device) => device,
        Err(err) => {
            warn!(attempt_id = %ctx.id, error = %err, "Device selection aborted");
            return AttemptOutcome::Failed {
                reason: err.to_string(),
            };
        }
    };

    info!(attempt_id = %ctx.id, device = %device.device, "Device selected; issuing push");
    match ctx.duo.auth_push(&ctx.identity, &device.device).await {
        Ok(Outcome::Allow) => AttemptOutcome::Approved,
        Ok(Outcome::Deny) => deny(ctx).await,
        Ok(Outcome::Enroll { portal_url }) => enroll(ctx, &portal_url).await,
        Ok(Outcome::Auth { .. }) => {
            warn!(attempt_id = %ctx.id, "Unexpected pre-authentication result on push call");
            AttemptOutcome::Failed {
                reason: "unexpected auth result on push call".to_string(),
            }
        }
        Err(err) => {
            error!(attempt_id = %ctx.id, error = %err, "Push authentication failed");
            AttemptOutcome::Failed {
                reason: err.to_string(),
            }
        }
    }
}

async fn deny(ctx: &AttemptContext) -> AttemptOutcome {
    if let Err(err) = ctx
        .surface
        .show_alert("Duo authentication failed", "please try again", 5)
        .await
    {
        warn!(attempt_id = %ctx.id, error = %err, "Could not display the denial alert");
    }
    AttemptOutcome::Denied
}

async fn enroll(ctx: &AttemptContext, portal_url: &str) -> AttemptOutcome {
    info!(attempt_id = %ctx.id, "Principal not enrolled; opening the portal");
    if let Err(err) = ctx.surface.display_web_view(portal_url).await {
        warn!(attempt_id = %ctx.id, error = %err, "Could not display the enrollment portal");
    }
    AttemptOutcome::EnrollmentRequired
}
