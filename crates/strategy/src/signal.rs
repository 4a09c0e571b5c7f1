use common::{Direction, StrategyConfig};

use crate::indicators::TrendPair;

/// Percentage gap of the fast EMA over the slow EMA.
///
/// Returns 0 when the slow EMA is zero or the result is not finite.
pub fn trend_spread_pct(short_ema: f64, long_ema: f64) -> f64 {
    if long_ema == 0.0 {
        return 0.0;
    }
    let spread = (short_ema - long_ema) / long_ema * 100.0;
    if spread.is_finite() {
        spread
    } else {
        0.0
    }
}

/// Map a trend spread onto a direction using a symmetric deadband.
///
/// The long test runs first, so a negative threshold that makes both
/// tests true resolves to long.
pub fn classify(spread_pct: f64, threshold: f64) -> Direction {
    if spread_pct > threshold {
        Direction::Long
    } else if spread_pct < -threshold {
        Direction::Short
    } else {
        Direction::Flat
    }
}

/// Classify every bar of the mid-price series, index-aligned with the input.
///
/// No warm-up suppression: the EMAs are defined from the first bar, so the
/// first bar always has a zero spread and is classified against the
/// threshold like any other.
pub fn generate_signals(mid_prices: &[f64], config: &StrategyConfig) -> Vec<Direction> {
    let trend = TrendPair::compute(mid_prices, config.short_window, config.long_window);
    trend
        .short
        .iter()
        .zip(&trend.long)
        .map(|(&s, &l)| classify(trend_spread_pct(s, l), config.threshold))
        .collect()
}
