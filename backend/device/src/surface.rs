//! Everything roomlock asks of the endpoint's UI.

use anyhow::Result;
use async_trait::async_trait;

/// Panel ID of the lock/unlock button on the home screen.
pub const LOCK_PANEL_ID: &str = "Lock";
/// Panel ID of the second-factor device picker.
pub const PICKER_PANEL_ID: &str = "duoAuthSelect";
/// Widget showing the currently selected device's display name.
pub const PICKER_WIDGET_ID: &str = "widget_2";

/// The endpoint collaborator. Each call maps to one device property set or
/// command; calls are independent and best-effort from the caller's side.
#[async_trait]
pub trait DeviceSurface: Send + Sync {
    /// Hide or show every home-screen action button.
    async fn set_hide_all_actions(&self, hidden: bool) -> Result<()>;

    /// Enable or disable the voice assistant (it can reach the calendar).
    async fn set_assistant_enabled(&self, enabled: bool) -> Result<()>;

    /// Hide the settings menu or restore automatic visibility.
    async fn set_settings_menu_hidden(&self, hidden: bool) -> Result<()>;

    /// Hide meeting titles on the calendar or restore them.
    async fn set_booking_titles_hidden(&self, hidden: bool) -> Result<()>;

    /// Relabel a UI extension panel button.
    async fn update_panel_name(&self, panel_id: &str, name: &str) -> Result<()>;

    /// Open a UI extension panel.
    async fn open_panel(&self, panel_id: &str) -> Result<()>;

    /// Close the currently open UI extension panel.
    async fn close_panel(&self) -> Result<()>;

    /// Set a widget's displayed value.
    async fn set_widget_value(&self, widget_id: &str, value: &str) -> Result<()>;

    /// Pop a transient alert on the device screen.
    async fn show_alert(&self, title: &str, text: &str, duration_secs: u32) -> Result<()>;

    /// Display a URL in a modal web view (enrollment portal).
    async fn display_web_view(&self, url: &str) -> Result<()>;

    /// The endpoint's bound personal contact address.
    async fn contact_address(&self) -> Result<String>;
}
