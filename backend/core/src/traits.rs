use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::message::Message;

/// Trait for roomlock runtime components that consume the bus.
///
/// Each component receives messages from its channel and runs in its own
/// Tokio task.
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Human-readable name of this component.
    fn name(&self) -> &str;

    /// Start the component's event loop, consuming from the given receiver.
    async fn start(&self, rx: mpsc::Receiver<Message>) -> Result<()>;
}
