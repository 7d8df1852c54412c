//! On-screen picker for the user's push-capable devices.

use roomlock_core::{PreAuthDevice, RoomLockError, UiSignal};
use roomlock_device::{DeviceSurface, PICKER_PANEL_ID, PICKER_WIDGET_ID};
use tokio::sync::mpsc;
use tracing::debug;

/// Cursor over an ordered device list. Moves clamp at both ends.
pub(crate) struct Cursor {
    index: usize,
    last: usize,
}

impl Cursor {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            index: 0,
            last: len.saturating_sub(1),
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// Returns whether the cursor moved.
    pub(crate) fn increment(&mut self) -> bool {
        if self.index < self.last {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Returns whether the cursor moved.
    pub(crate) fn decrement(&mut self) -> bool {
        if self.index > 0 {
            self.index -= 1;
            true
        } else {
            false
        }
    }
}

/// Present the picker panel and resolve the user's choice.
///
/// Picker signals are forwarded by the controller loop onto `signals`; the
/// panel closes on confirmation. Callers guarantee a non-empty list; an
/// empty one is rejected rather than left hanging.
pub async fn select(
    surface: &dyn DeviceSurface,
    devices: &[PreAuthDevice],
    signals: &mut mpsc::Receiver<UiSignal>,
) -> Result<PreAuthDevice, RoomLockError> {
    if devices.is_empty() {
        return Err(RoomLockError::EmptyDeviceList);
    }

    let mut cursor = Cursor::new(devices.len());
    surface
        .set_widget_value(PICKER_WIDGET_ID, &devices[cursor.index()].display_name)
        .await?;
    surface.open_panel(PICKER_PANEL_ID).await?;

    while let Some(signal) = signals.recv().await {
        match signal {
            UiSignal::DeviceIncrement => {
                if cursor.increment() {
                    surface
                        .set_widget_value(PICKER_WIDGET_ID, &devices[cursor.index()].display_name)
                        .await?;
                } else {
                    debug!("Picker already at the last device");
                }
            }
            UiSignal::DeviceDecrement => {
                if cursor.decrement() {
                    surface
                        .set_widget_value(PICKER_WIDGET_ID, &devices[cursor.index()].display_name)
                        .await?;
                } else {
                    debug!("Picker already at the first device");
                }
            }
            UiSignal::ConfirmSelection => {
                surface.close_panel().await?;
                return Ok(devices[cursor.index()].clone());
            }
        }
    }

    Err(RoomLockError::ChannelClosed("device picker signals".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{push_device, RecordingSurface};
    use std::sync::Arc;

    #[test]
    fn test_cursor_clamps_at_both_ends() {
        let mut cursor = Cursor::new(3);
        assert_eq!(cursor.index(), 0);
        assert!(!cursor.decrement()); // no-op at the first element
        assert!(cursor.increment());
        assert!(cursor.increment());
        assert_eq!(cursor.index(), 2);
        assert!(!cursor.increment()); // no-op at the last element
        assert_eq!(cursor.index(), 2);
        assert!(cursor.decrement());
        assert_eq!(cursor.index(), 1);
    }

    #[test]
    fn test_cursor_single_element() {
        let mut cursor = Cursor::new(1);
        assert!(!cursor.increment());
        assert!(!cursor.decrement());
        assert_eq!(cursor.index(), 0);
    }

    #[tokio::test]
    async fn test_select_resolves_device_at_cursor() {
        let surface = RecordingSurface::new();
        let devices = vec![push_device("a"), push_device("b"), push_device("c")];
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);

        tx.send(UiSignal::DeviceIncrement).await.unwrap();
        tx.send(UiSignal::DeviceIncrement).await.unwrap();
        tx.send(UiSignal::DeviceIncrement).await.unwrap(); // no-op at end
        tx.send(UiSignal::DeviceDecrement).await.unwrap();
        tx.send(UiSignal::ConfirmSelection).await.unwrap();

        let chosen = select(&*surface, &devices, &mut rx).await.unwrap();
        assert_eq!(chosen.device, "b");

        let ops = surface.ops();
        assert!(ops.contains(&"panel_open=duoAuthSelect".to_string()));
        assert!(ops.contains(&"panel_close".to_string()));
        // Initial label plus one per effective move; the clamped increment
        // repaints nothing.
        let labels: Vec<_> = ops.iter().filter(|op| op.starts_with("widget=")).collect();
        assert_eq!(labels.len(), 4);
        assert_eq!(labels.last().unwrap().as_str(), "widget=widget_2:Phone b");
    }

    #[tokio::test]
    async fn test_select_rejects_empty_list() {
        let surface = RecordingSurface::new();
        let (_tx, mut rx) = tokio::sync::mpsc::channel(8);
        let err = select(&*surface, &[], &mut rx).await.unwrap_err();
        assert!(matches!(err, RoomLockError::EmptyDeviceList));
        // The picker surface is never opened for an empty list.
        assert!(surface.ops().is_empty());
    }

    #[tokio::test]
    async fn test_select_errors_when_signals_close() {
        let surface: Arc<RecordingSurface> = RecordingSurface::new();
        let devices = vec![push_device("a")];
        let (tx, mut rx) = tokio::sync::mpsc::channel::<UiSignal>(8);
        drop(tx);
        let err = select(&*surface, &devices, &mut rx).await.unwrap_err();
        assert!(matches!(err, RoomLockError::ChannelClosed(_)));
    }
}
