pub mod channel;
pub mod error;
pub mod message;
pub mod traits;
pub mod types;

pub use channel::LockBus;
pub use error::RoomLockError;
pub use message::{AttemptFinished, AttemptOutcome, DeviceEvent, Message, UiSignal};
pub use traits::Component;
pub use types::{push_capable, Identity, LockState, PreAuthDevice, StandbyState};
