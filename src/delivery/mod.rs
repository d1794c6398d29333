//! Outbound delivery of rendered messages.
//!
//! Submodules:
//! - `line` — LINE Messaging API reply adapter and Flex conversion.
//! - `console` — prints the wire payload instead of sending it (dry runs).

pub mod console;
pub mod line;

use async_trait::async_trait;

use crate::compose::RenderedMessage;
use crate::model::Result;

pub use console::ConsoleSink;
pub use line::LineSink;

#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Sends `message` as the reply correlated by `reply_token`.
    async fn deliver(&self, reply_token: &str, message: &RenderedMessage) -> Result<()>;
}
