use common::StrategyConfig;
use proptest::prelude::*;
use strategy::{ema_series, generate_signals};

proptest! {
    /// An EMA never leaves the range of the prices it smooths.
    #[test]
    fn ema_stays_within_price_range(
        prices in prop::collection::vec(0.01f64..1_000_000.0, 1..200),
        window in 0usize..64,
    ) {
        let lo = prices.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = prices.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let ema = ema_series(&prices, window);
        prop_assert_eq!(ema.len(), prices.len());
        for v in ema {
            prop_assert!(v >= lo * (1.0 - 1e-12) && v <= hi * (1.0 + 1e-12), "{v} outside [{lo}, {hi}]");
        }
    }

    /// One classification per bar, whatever the parameters.
    #[test]
    fn one_signal_per_bar(
        prices in prop::collection::vec(0.0f64..10_000.0, 0..200),
        long in 3usize..=64,
        threshold in -5.0f64..=5.0,
    ) {
        let config = StrategyConfig {
            short_window: long - 1,
            long_window: long,
            threshold,
            ..StrategyConfig::default()
        };
        prop_assert_eq!(generate_signals(&prices, &config).len(), prices.len());
    }
}
