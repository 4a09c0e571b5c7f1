use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use common::{Candle, CandleFeed, Error, Result};

/// Reads the reconciled candle payload the host's price service writes out.
///
/// Accepts either `{ "candles": [...], "fetchedAt": .., "sources": {..} }`
/// or a bare array of candles. Only the most recent `window` candles are
/// returned, oldest first.
#[derive(Debug, Clone)]
pub struct JsonFileFeed {
    path: PathBuf,
    window: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedPayload {
    Envelope { candles: Vec<Candle> },
    Bare(Vec<Candle>),
}

impl JsonFileFeed {
    pub fn new(path: impl Into<PathBuf>, window: usize) -> Self {
        Self {
            path: path.into(),
            window,
        }
    }

    /// Parse a payload and cut it down to the configured window.
    pub fn parse(&self, content: &str) -> Result<Vec<Candle>> {
        let mut candles = match serde_json::from_str::<FeedPayload>(content)? {
            FeedPayload::Envelope { candles } | FeedPayload::Bare(candles) => candles,
        };

        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by_key(|c| c.timestamp);

        let excess = candles.len().saturating_sub(self.window);
        candles.drain(..excess);
        Ok(candles)
    }
}

#[async_trait]
impl CandleFeed for JsonFileFeed {
    async fn candles(&self) -> Result<Vec<Candle>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Feed(format!(
                "failed to read candle file '{}': {e}",
                self.path.display()
            ))
        })?;
        let candles = self.parse(&content)?;
        debug!(path = %self.path.display(), count = candles.len(), "Candle window loaded");
        Ok(candles)
    }
}
