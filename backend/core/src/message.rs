use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{PreAuthDevice, StandbyState};

/// Messages consumed by the lock controller's single event loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Feedback webhook → controller: something happened on the endpoint.
    Device(DeviceEvent),
    /// Unlock attempt task → controller: the attempt finished.
    AttemptFinished(AttemptFinished),
}

/// A UI or power event translated from codec feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// A UI extension panel button was pressed.
    PanelClicked { panel_id: String },
    /// A widget on the device picker emitted a named signal.
    WidgetSignal { signal: UiSignal },
    /// The endpoint's power state changed.
    StandbyChanged { state: StandbyState },
}

/// Signals wired into the device picker panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiSignal {
    DeviceIncrement,
    DeviceDecrement,
    ConfirmSelection,
}

impl UiSignal {
    /// Map the signal strings assigned to the picker widgets.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "duoDevice:increment" => Some(Self::DeviceIncrement),
            "duoDevice:decrement" => Some(Self::DeviceDecrement),
            "executeAuthentication" => Some(Self::ConfirmSelection),
            _ => None,
        }
    }
}

/// Completion report from an unlock attempt task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptFinished {
    pub attempt_id: Uuid,
    pub outcome: AttemptOutcome,
    /// Push-capable device list fetched during this attempt, if the
    /// controller's cache was empty. The controller adopts it.
    pub devices: Option<Vec<PreAuthDevice>>,
}

/// Terminal result of one unlock attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Push approved; the endpoint may unlock.
    Approved,
    /// Push explicitly denied.
    Denied,
    /// The principal has no enrolled device; the portal was shown.
    EnrollmentRequired,
    /// No push-capable device registered to the principal.
    NoPushDevice,
    /// Transport or provider failure; the attempt was abandoned.
    Failed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization_roundtrip() {
        let msg = Message::Device(DeviceEvent::PanelClicked {
            panel_id: "Lock".to_string(),
        });
        let json = serde_json::to_string(&msg).unwrap();
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        match deserialized {
            Message::Device(DeviceEvent::PanelClicked { panel_id }) => {
                assert_eq!(panel_id, "Lock");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_ui_signal_parse() {
        assert_eq!(
            UiSignal::parse("duoDevice:increment"),
            Some(UiSignal::DeviceIncrement)
        );
        assert_eq!(
            UiSignal::parse("duoDevice:decrement"),
            Some(UiSignal::DeviceDecrement)
        );
        assert_eq!(
            UiSignal::parse("executeAuthentication"),
            Some(UiSignal::ConfirmSelection)
        );
        assert_eq!(UiSignal::parse("volume:up"), None);
    }

    #[test]
    fn test_attempt_finished_roundtrip() {
        let msg = Message::AttemptFinished(AttemptFinished {
            attempt_id: Uuid::new_v4(),
            outcome: AttemptOutcome::Failed {
                reason: "connection reset".to_string(),
            },
            devices: None,
        });
        let json = serde_json::to_string(&msg).unwrap();
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        match deserialized {
            Message::AttemptFinished(finished) => {
                assert_eq!(
                    finished.outcome,
                    AttemptOutcome::Failed {
                        reason: "connection reset".to_string()
                    }
                );
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
