//! Dry-run sink: writes the LINE request body to stdout instead of sending it.

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::DeliverySink;
use super::line::reply_body;
use crate::compose::RenderedMessage;
use crate::model::{RelayError, Result};

#[derive(Debug, Default)]
pub struct ConsoleSink;

#[async_trait]
impl DeliverySink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    async fn deliver(&self, reply_token: &str, message: &RenderedMessage) -> Result<()> {
        let mut line = serde_json::to_string(&reply_body(reply_token, message))?;
        line.push('\n');

        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(line.as_bytes())
            .await
            .map_err(|e| RelayError::Delivery { status: None, reason: e.to_string() })?;
        stdout
            .flush()
            .await
            .map_err(|e| RelayError::Delivery { status: None, reason: e.to_string() })
    }
}
