//! Inbound codec feedback webhook.
//!
//! The codec POSTs registered event and status changes as JSON documents.
//! This router translates the ones roomlock cares about into bus messages
//! and acknowledges everything else so the codec keeps the slot alive.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Router,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use roomlock_core::{DeviceEvent, Message, StandbyState, UiSignal};

#[derive(Clone)]
struct AppState {
    controller_tx: mpsc::Sender<Message>,
}

/// Build the webhook router mounted at `path`.
pub fn build_router(path: &str, controller_tx: mpsc::Sender<Message>) -> Router {
    Router::new()
        .route(path, post(handle_feedback))
        .with_state(AppState { controller_tx })
}

async fn handle_feedback(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let document: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(err) => {
            warn!(error = %err, "Feedback document was not valid JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    match parse_feedback(&document) {
        Some(event) => {
            debug!(?event, "Codec feedback");
            let _ = state.controller_tx.send(Message::Device(event)).await;
        }
        None => {
            debug!("Ignoring unrecognized feedback document");
        }
    }
    StatusCode::OK
}

/// Translate one feedback document into a [`DeviceEvent`].
///
/// The codec wraps every leaf in a `{"Value": ...}` object; only the three
/// registered shapes are recognized, everything else maps to `None`.
fn parse_feedback(document: &Value) -> Option<DeviceEvent> {
    if let Some(panel_id) = leaf(
        document,
        "/Event/UserInterface/Extensions/Panel/Clicked/PanelId",
    ) {
        return Some(DeviceEvent::PanelClicked {
            panel_id: panel_id.to_string(),
        });
    }

    if let Some(raw) = leaf(
        document,
        "/Event/UserInterface/Extensions/Event/Clicked/Signal",
    ) {
        return UiSignal::parse(raw).map(|signal| DeviceEvent::WidgetSignal { signal });
    }

    if let Some(raw) = leaf(document, "/Status/Standby/State") {
        return StandbyState::parse(raw).map(|state| DeviceEvent::StandbyChanged { state });
    }

    None
}

/// Resolve a `{"Value": "..."}` leaf at a JSON pointer.
fn leaf<'a>(document: &'a Value, pointer: &str) -> Option<&'a str> {
    document.pointer(pointer)?.get("Value")?.as_str()
}
