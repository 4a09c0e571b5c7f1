/// Exponential Moving Average series over a price slice (oldest first).
///
/// Seeded with the first price rather than an SMA, so the series is defined
/// from index 0 and has the same length as the input:
///
///   out[0] = price[0]
///   out[i] = out[i−1] + α·(price[i] − out[i−1])   where α = 2/(window+1)
///
/// which is the usual `α·price + (1 − α)·prev`, written so that a constant
/// input reproduces itself exactly.
///
/// A window of 0 is treated as 1, which makes the series track the input.
pub fn ema_series(prices: &[f64], window: usize) -> Vec<f64> {
    let alpha = 2.0 / (window.max(1) as f64 + 1.0);
    let mut out = Vec::with_capacity(prices.len());
    let mut iter = prices.iter();

    let Some(&first) = iter.next() else {
        return out;
    };
    let mut value = first;
    out.push(value);

    for &price in iter {
        value += alpha * (price - value);
        out.push(value);
    }
    out
}

/// Fast and slow EMA series aligned to the same input index.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendPair {
    pub short: Vec<f64>,
    pub long: Vec<f64>,
}

impl TrendPair {
    pub fn compute(prices: &[f64], short_window: usize, long_window: usize) -> Self {
        Self {
            short: ema_series(prices, short_window),
            long: ema_series(prices, long_window),
        }
    }

    pub fn len(&self) -> usize {
        self.short.len()
    }

    pub fn is_empty(&self) -> bool {
        self.short.is_empty()
    }
}
