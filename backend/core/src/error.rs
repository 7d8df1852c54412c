use thiserror::Error;

/// Top-level error type for the roomlock runtime.
#[derive(Debug, Error)]
pub enum RoomLockError {
    #[error("identity unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("device picker invoked with an empty device list")]
    EmptyDeviceList,

    #[error("channel closed: {0}")]
    ChannelClosed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
