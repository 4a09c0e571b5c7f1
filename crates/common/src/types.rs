use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One upstream source's OHLCV reading for a single interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl SourceBar {
    /// A bar whose every field is `price`, with zero volume.
    pub fn flat(price: f64) -> Self {
        Self {
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0.0,
        }
    }
}

/// A reconciled candle: readings from up to two sources for one timestamp.
///
/// Produced outside the engine and treated as immutable once handed over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub primary: Option<SourceBar>,
    #[serde(default)]
    pub secondary: Option<SourceBar>,
    /// Average of the available closes, or the single close.
    pub mid_price: f64,
    /// Absolute difference between the two closes; zero with one source.
    pub spread: f64,
}

impl Candle {
    /// Build a candle and derive its mid-price and spread from the sources.
    pub fn from_sources(
        timestamp: DateTime<Utc>,
        primary: Option<SourceBar>,
        secondary: Option<SourceBar>,
    ) -> Self {
        let (mid_price, spread) = match (&primary, &secondary) {
            (Some(a), Some(b)) => ((a.close + b.close) / 2.0, (a.close - b.close).abs()),
            (Some(only), None) | (None, Some(only)) => (only.close, 0.0),
            (None, None) => (0.0, 0.0),
        };
        Self {
            timestamp,
            primary,
            secondary,
            mid_price,
            spread,
        }
    }
}

/// Directional state of the strategy on a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Short,
    #[default]
    Flat,
    Long,
}

impl Direction {
    /// -1 for short, 0 for flat, +1 for long.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Short => -1.0,
            Direction::Flat => 0.0,
            Direction::Long => 1.0,
        }
    }

    pub fn is_flat(self) -> bool {
        self == Direction::Flat
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Short => write!(f, "short"),
            Direction::Flat => write!(f, "flat"),
            Direction::Long => write!(f, "long"),
        }
    }
}

/// The six control parameters threaded from one cycle into the next.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyConfig {
    /// Fast EMA window in bars.
    pub short_window: usize,
    /// Slow EMA window in bars.
    pub long_window: usize,
    /// Signal deadband in percent of the slow EMA.
    pub threshold: f64,
    /// Fraction of equity committed per position.
    pub risk_per_trade: f64,
    /// Cap on position size as a multiple of equity.
    pub max_position: f64,
    /// Step size applied by the learner.
    pub learning_rate: f64,
}

impl StrategyConfig {
    pub const MIN_SHORT_WINDOW: usize = 2;
    pub const MAX_LONG_WINDOW: usize = 64;
    pub const MIN_THRESHOLD: f64 = -5.0;
    pub const MAX_THRESHOLD: f64 = 5.0;
    pub const MIN_RISK_PER_TRADE: f64 = 0.01;
    pub const MAX_RISK_PER_TRADE: f64 = 1.0;
    pub const MIN_MAX_POSITION: f64 = 0.25;
    pub const MAX_MAX_POSITION: f64 = 5.0;
    pub const MIN_LEARNING_RATE: f64 = 0.05;
    pub const MAX_LEARNING_RATE: f64 = 1.0;

    pub const DEFAULT_SHORT_WINDOW: usize = 8;
    pub const DEFAULT_LONG_WINDOW: usize = 21;
    pub const DEFAULT_THRESHOLD: f64 = 0.1;
    pub const DEFAULT_RISK_PER_TRADE: f64 = 0.1;
    pub const DEFAULT_MAX_POSITION: f64 = 1.0;
    pub const DEFAULT_LEARNING_RATE: f64 = 0.1;

    /// Check every range constraint. Reports the first violation found.
    pub fn validate(&self) -> Result<()> {
        if self.short_window < Self::MIN_SHORT_WINDOW {
            return Err(Error::Config(format!(
                "shortWindow must be >= {}, got {}",
                Self::MIN_SHORT_WINDOW,
                self.short_window
            )));
        }
        if self.short_window >= self.long_window {
            return Err(Error::Config(format!(
                "shortWindow ({}) must be less than longWindow ({})",
                self.short_window, self.long_window
            )));
        }
        if self.long_window > Self::MAX_LONG_WINDOW {
            return Err(Error::Config(format!(
                "longWindow must be <= {}, got {}",
                Self::MAX_LONG_WINDOW,
                self.long_window
            )));
        }
        check_range("threshold", self.threshold, Self::MIN_THRESHOLD, Self::MAX_THRESHOLD)?;
        check_range(
            "riskPerTrade",
            self.risk_per_trade,
            Self::MIN_RISK_PER_TRADE,
            Self::MAX_RISK_PER_TRADE,
        )?;
        check_range(
            "maxPosition",
            self.max_position,
            Self::MIN_MAX_POSITION,
            Self::MAX_MAX_POSITION,
        )?;
        check_range(
            "learningRate",
            self.learning_rate,
            Self::MIN_LEARNING_RATE,
            Self::MAX_LEARNING_RATE,
        )?;
        Ok(())
    }

    /// Map every field into its valid range.
    ///
    /// The long window is clamped first, then the short window into
    /// `[MIN_SHORT_WINDOW, long_window - 1]`. Non-finite scalars fall back to
    /// the field default.
    pub fn clamped(&self) -> Self {
        let long_window = self
            .long_window
            .clamp(Self::MIN_SHORT_WINDOW + 1, Self::MAX_LONG_WINDOW);
        let short_window = self
            .short_window
            .clamp(Self::MIN_SHORT_WINDOW, long_window - 1);

        Self {
            short_window,
            long_window,
            threshold: clamp_or(
                self.threshold,
                Self::MIN_THRESHOLD,
                Self::MAX_THRESHOLD,
                Self::DEFAULT_THRESHOLD,
            ),
            risk_per_trade: clamp_or(
                self.risk_per_trade,
                Self::MIN_RISK_PER_TRADE,
                Self::MAX_RISK_PER_TRADE,
                Self::DEFAULT_RISK_PER_TRADE,
            ),
            max_position: clamp_or(
                self.max_position,
                Self::MIN_MAX_POSITION,
                Self::MAX_MAX_POSITION,
                Self::DEFAULT_MAX_POSITION,
            ),
            learning_rate: clamp_or(
                self.learning_rate,
                Self::MIN_LEARNING_RATE,
                Self::MAX_LEARNING_RATE,
                Self::DEFAULT_LEARNING_RATE,
            ),
        }
    }

    /// Effective position fraction of equity for a newly opened position.
    pub fn position_fraction(&self) -> f64 {
        self.risk_per_trade.min(self.max_position)
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            short_window: Self::DEFAULT_SHORT_WINDOW,
            long_window: Self::DEFAULT_LONG_WINDOW,
            threshold: Self::DEFAULT_THRESHOLD,
            risk_per_trade: Self::DEFAULT_RISK_PER_TRADE,
            max_position: Self::DEFAULT_MAX_POSITION,
            learning_rate: Self::DEFAULT_LEARNING_RATE,
        }
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{field} must be within [{min}, {max}], got {value}"
        )))
    }
}

fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Performance summary of one cycle. Never merged across cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Fractional change of simulated equity over the window.
    pub cumulative_return: f64,
    /// Largest peak-to-trough decline, as a non-negative fraction.
    pub max_drawdown: f64,
    /// Mark-to-market equity after each candle, starting from 1.0.
    pub equity_curve: Vec<f64>,
}

impl Metrics {
    /// Result for a cycle that saw no candles.
    pub fn empty() -> Self {
        Self {
            trades: 0,
            wins: 0,
            losses: 0,
            cumulative_return: 0.0,
            max_drawdown: 0.0,
            equity_curve: vec![1.0],
        }
    }

    /// `wins / trades`, or 0 when nothing closed.
    pub fn win_rate(&self) -> f64 {
        if self.trades == 0 {
            0.0
        } else {
            self.wins as f64 / self.trades as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn candle_with_both_sources_averages_closes() {
        let c = Candle::from_sources(
            ts(0),
            Some(SourceBar::flat(100.0)),
            Some(SourceBar::flat(102.0)),
        );
        assert!((c.mid_price - 101.0).abs() < 1e-12);
        assert!((c.spread - 2.0).abs() < 1e-12);
    }

    #[test]
    fn candle_with_one_source_has_zero_spread() {
        let c = Candle::from_sources(ts(0), None, Some(SourceBar::flat(250.0)));
        assert_eq!(c.mid_price, 250.0);
        assert_eq!(c.spread, 0.0);
    }

    #[test]
    fn candle_deserializes_camel_case_payload() {
        let json = r#"{
            "timestamp": "2024-01-01T00:00:00Z",
            "primary": {"open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volume": 10.0},
            "secondary": null,
            "midPrice": 1.5,
            "spread": 0.0
        }"#;
        let c: Candle = serde_json::from_str(json).unwrap();
        assert_eq!(c.mid_price, 1.5);
        assert!(c.secondary.is_none());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(StrategyConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_windows() {
        let cfg = StrategyConfig {
            short_window: 21,
            long_window: 21,
            ..StrategyConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn validate_rejects_nan_threshold() {
        let cfg = StrategyConfig {
            threshold: f64::NAN,
            ..StrategyConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn clamped_restores_window_ordering() {
        let cfg = StrategyConfig {
            short_window: 90,
            long_window: 100,
            threshold: 9.0,
            risk_per_trade: -1.0,
            max_position: f64::INFINITY,
            learning_rate: 0.0,
        }
        .clamped();
        assert_eq!(cfg.long_window, 64);
        assert_eq!(cfg.short_window, 63);
        assert_eq!(cfg.threshold, 5.0);
        assert_eq!(cfg.risk_per_trade, 0.01);
        assert_eq!(cfg.max_position, StrategyConfig::DEFAULT_MAX_POSITION);
        assert_eq!(cfg.learning_rate, 0.05);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn clamped_handles_degenerate_windows() {
        let cfg = StrategyConfig {
            short_window: 0,
            long_window: 0,
            ..StrategyConfig::default()
        }
        .clamped();
        assert_eq!((cfg.short_window, cfg.long_window), (2, 3));
    }

    #[test]
    fn win_rate_is_zero_without_trades() {
        assert_eq!(Metrics::empty().win_rate(), 0.0);
    }
}
