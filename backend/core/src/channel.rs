use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::message::Message;

/// Default channel buffer size for controller messaging.
const DEFAULT_BUFFER_SIZE: usize = 64;

/// The message channel feeding the lock controller.
///
/// Producers (the feedback webhook, unlock attempt tasks) clone the sender;
/// the controller owns the single receiver. Built on a bounded Tokio mpsc
/// channel for backpressure.
pub struct LockBus {
    pub controller_tx: mpsc::Sender<Message>,
    pub controller_rx: Option<mpsc::Receiver<Message>>,
}

impl LockBus {
    /// Create a new bus with the default buffer size.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new bus with a custom buffer size.
    pub fn with_buffer_size(buffer: usize) -> Self {
        let (controller_tx, controller_rx) = mpsc::channel(buffer);

        info!(buffer_size = buffer, "LockBus initialized");

        Self {
            controller_tx,
            controller_rx: Some(controller_rx),
        }
    }

    /// Take the controller receiver (can only be called once).
    pub fn take_controller_rx(&mut self) -> Option<mpsc::Receiver<Message>> {
        debug!("Controller receiver taken");
        self.controller_rx.take()
    }
}

impl Default for LockBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{DeviceEvent, Message};

    #[tokio::test]
    async fn test_bus_send_receive() {
        let mut bus = LockBus::new();
        let mut rx = bus.take_controller_rx().unwrap();

        let msg = Message::Device(DeviceEvent::PanelClicked {
            panel_id: "Lock".into(),
        });

        bus.controller_tx.send(msg).await.unwrap();
        let received = rx.recv().await.unwrap();
        match received {
            Message::Device(DeviceEvent::PanelClicked { panel_id }) => {
                assert_eq!(panel_id, "Lock");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bus_take_rx_once() {
        let mut bus = LockBus::new();
        assert!(bus.take_controller_rx().is_some());
        assert!(bus.take_controller_rx().is_none()); // second take is None
    }

    #[tokio::test]
    async fn test_bus_backpressure() {
        let mut bus = LockBus::with_buffer_size(2);
        let _rx = bus.take_controller_rx().unwrap();

        // Fill the buffer
        for _ in 0..2 {
            bus.controller_tx
                .send(Message::Device(DeviceEvent::PanelClicked {
                    panel_id: "Lock".into(),
                }))
                .await
                .unwrap();
        }

        // Third send should not complete immediately (buffer full)
        let result = bus
            .controller_tx
            .try_send(Message::Device(DeviceEvent::PanelClicked {
                panel_id: "Lock".into(),
            }));
        assert!(result.is_err());
    }
}
