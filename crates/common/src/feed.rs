use async_trait::async_trait;

use crate::{Candle, Result};

/// Abstraction over the source of reconciled candles.
///
/// Implementations hand back an already-merged window in strictly
/// increasing timestamp order. Fetching from upstream exchanges and
/// merging their series happens behind this trait, never inside a cycle.
#[async_trait]
pub trait CandleFeed: Send + Sync {
    /// Return the current candle window, oldest first.
    async fn candles(&self) -> Result<Vec<Candle>>;
}
