pub mod feedback;
pub mod surface;
pub mod xapi;

pub use feedback::build_router;
pub use surface::{DeviceSurface, LOCK_PANEL_ID, PICKER_PANEL_ID, PICKER_WIDGET_ID};
pub use xapi::XapiHttpSurface;
