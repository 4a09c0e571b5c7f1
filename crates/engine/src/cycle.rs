use serde::{Deserialize, Serialize};
use tracing::info;

use common::{Candle, Metrics, Result, StrategyConfig};
use paper::{aggregate, Simulator};
use risk::ParameterLearner;

/// Result of one signal → simulate → learn pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleOutcome {
    pub metrics: Metrics,
    pub updated_config: StrategyConfig,
}

/// Run one cycle with the default learner coefficients.
pub fn run_cycle(candles: &[Candle], config: &StrategyConfig) -> Result<CycleOutcome> {
    run_cycle_with(&ParameterLearner::default(), candles, config)
}

/// Run one cycle over `candles` (oldest first) starting from `config`.
///
/// Pure and synchronous. The input config must already be valid; a
/// violation is returned as `Error::Config` and never corrected here. An
/// empty window yields `Metrics::empty()` and leaves the config unchanged.
pub fn run_cycle_with(
    learner: &ParameterLearner,
    candles: &[Candle],
    config: &StrategyConfig,
) -> Result<CycleOutcome> {
    config.validate()?;

    if candles.is_empty() {
        return Ok(CycleOutcome {
            metrics: Metrics::empty(),
            updated_config: *config,
        });
    }

    let report = Simulator::simulate(candles, config);
    let metrics = aggregate(&report);
    let updated_config = learner.adapt(config, &metrics);

    info!(
        candles = candles.len(),
        trades = metrics.trades,
        wins = metrics.wins,
        losses = metrics.losses,
        cumulative_return = metrics.cumulative_return,
        max_drawdown = metrics.max_drawdown,
        realized_equity = report.realized_equity,
        "Cycle evaluated"
    );

    Ok(CycleOutcome {
        metrics,
        updated_config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use common::{Error, SourceBar};
    use strategy::{ema_series, trend_spread_pct};

    fn candles(prices: &[f64]) -> Vec<Candle> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let ts = DateTime::<Utc>::from_timestamp(1_700_000_000 + i as i64 * 900, 0).unwrap();
                Candle::from_sources(ts, Some(SourceBar::flat(p)), Some(SourceBar::flat(p)))
            })
            .collect()
    }

    fn config(short: usize, long: usize, threshold: f64) -> StrategyConfig {
        StrategyConfig {
            short_window: short,
            long_window: long,
            threshold,
            ..StrategyConfig::default()
        }
    }

    #[test]
    fn empty_input_returns_default_metrics_and_same_config() {
        let cfg = StrategyConfig::default();
        let outcome = run_cycle(&[], &cfg).unwrap();
        assert_eq!(outcome.metrics, Metrics::empty());
        assert_eq!(outcome.updated_config, cfg);
    }

    #[test]
    fn single_candle_has_one_sample_and_no_trades() {
        let outcome = run_cycle(&candles(&[100.0]), &StrategyConfig::default()).unwrap();
        assert_eq!(outcome.metrics.equity_curve, vec![1.0]);
        assert_eq!(outcome.metrics.trades, 0);
        assert_eq!(outcome.metrics.cumulative_return, 0.0);
    }

    #[test]
    fn invalid_config_is_rejected_not_fixed() {
        let cfg = config(10, 10, 0.1);
        let err = run_cycle(&candles(&[1.0, 2.0]), &cfg).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn crossing_above_then_below_threshold_makes_one_trade() {
        let prices = [100.0, 110.0, 110.5];
        let cfg = config(2, 3, 1.5);

        // Spread at bar 2 is ~1.59%, at bar 3 ~1.37%.
        let short = ema_series(&prices, 2);
        let long = ema_series(&prices, 3);
        assert!(trend_spread_pct(short[1], long[1]) > 1.5);
        assert!(trend_spread_pct(short[2], long[2]) < 1.5);

        let outcome = run_cycle(&candles(&prices), &cfg).unwrap();
        let m = &outcome.metrics;
        assert_eq!(m.trades, 1);
        assert_eq!(m.wins, 1);
        assert_eq!(m.losses, 0);

        // Opened at 110.0, closed at 110.5 with size min(risk, max_position).
        let size = cfg.position_fraction();
        let expected = size * (110.5 / 110.0 - 1.0);
        assert!((m.cumulative_return - expected).abs() < 1e-12);
    }

    #[test]
    fn exit_below_entry_is_a_loss() {
        // Same entry on bar 2; bar 3 closes below it (spread ~1.22%).
        let prices = [100.0, 110.0, 109.5];
        let cfg = config(2, 3, 1.5);

        let outcome = run_cycle(&candles(&prices), &cfg).unwrap();
        let m = &outcome.metrics;
        assert_eq!(m.trades, 1);
        assert_eq!(m.wins, 0);
        assert_eq!(m.losses, 1);
        let expected = cfg.position_fraction() * (109.5 / 110.0 - 1.0);
        assert!((m.cumulative_return - expected).abs() < 1e-12);
    }

    #[test]
    fn exit_at_entry_is_neither_win_nor_loss() {
        let outcome = run_cycle(&candles(&[100.0, 110.0, 110.0]), &config(2, 3, 1.5)).unwrap();
        let m = &outcome.metrics;
        assert_eq!(m.trades, 1);
        assert_eq!(m.wins + m.losses, 0);
        assert_eq!(m.cumulative_return, 0.0);
    }

    #[test]
    fn constant_prices_never_trade() {
        let outcome = run_cycle(&candles(&[250.0; 40]), &config(3, 10, 0.0)).unwrap();
        let m = &outcome.metrics;
        assert_eq!(m.trades, 0);
        assert_eq!(m.cumulative_return, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.equity_curve.len(), 40);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let prices: Vec<f64> = (0..120)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.05)
            .collect();
        let data = candles(&prices);
        let cfg = config(4, 16, 0.05);
        assert_eq!(run_cycle(&data, &cfg).unwrap(), run_cycle(&data, &cfg).unwrap());
    }

    #[test]
    fn oscillating_market_produces_bounded_trades() {
        let prices: Vec<f64> = (0..200)
            .map(|i| 100.0 + (i as f64 * 0.2).sin() * 10.0)
            .collect();
        let outcome = run_cycle(&candles(&prices), &config(3, 12, 0.2)).unwrap();
        let m = &outcome.metrics;
        assert!(m.trades > 0);
        assert!(m.wins + m.losses <= m.trades);
        assert!(m.trades < prices.len());
        assert!(outcome.updated_config.validate().is_ok());
    }
}
