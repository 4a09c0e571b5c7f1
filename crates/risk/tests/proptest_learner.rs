use common::{Metrics, StrategyConfig};
use proptest::prelude::*;
use risk::{ParameterLearner, RISK_BUDGET};

fn valid_config() -> impl Strategy<Value = StrategyConfig> {
    (3usize..=64)
        .prop_flat_map(|long| (2usize..long, Just(long)))
        .prop_flat_map(|(short, long)| {
            (
                Just(short),
                Just(long),
                -5.0f64..=5.0,
                0.01f64..=1.0,
                0.25f64..=5.0,
                0.05f64..=1.0,
            )
        })
        .prop_map(
            |(short_window, long_window, threshold, risk_per_trade, max_position, learning_rate)| {
                StrategyConfig {
                    short_window,
                    long_window,
                    threshold,
                    risk_per_trade,
                    max_position,
                    learning_rate,
                }
            },
        )
}

fn any_metrics() -> impl Strategy<Value = Metrics> {
    (0usize..200)
        .prop_flat_map(|trades| (Just(trades), 0..=trades))
        .prop_flat_map(|(trades, wins)| {
            (
                Just(trades),
                Just(wins),
                0..=(trades - wins),
                -2.0f64..5.0,
                0.0f64..3.0,
            )
        })
        .prop_map(|(trades, wins, losses, cumulative_return, max_drawdown)| Metrics {
            trades,
            wins,
            losses,
            cumulative_return,
            max_drawdown,
            equity_curve: vec![1.0, 1.0 + cumulative_return],
        })
}

proptest! {
    /// The adapted config always satisfies every range constraint.
    #[test]
    fn adapted_config_is_always_valid(cfg in valid_config(), metrics in any_metrics()) {
        let next = ParameterLearner::default().adapt(&cfg, &metrics);
        prop_assert!(next.validate().is_ok(), "invalid output: {next:?}");
        prop_assert!(next.short_window < next.long_window);
    }

    /// Same input, same output.
    #[test]
    fn adaptation_is_deterministic(cfg in valid_config(), metrics in any_metrics()) {
        let learner = ParameterLearner::default();
        prop_assert_eq!(learner.adapt(&cfg, &metrics), learner.adapt(&cfg, &metrics));
    }

    /// With win rate fixed below target and drawdown inside budget, a larger
    /// learning rate never yields a smaller threshold step.
    #[test]
    fn threshold_step_grows_with_learning_rate(
        cfg in valid_config(),
        wins in 0usize..5,
        low_rate in 0.05f64..=1.0,
        high_rate in 0.05f64..=1.0,
        drawdown in 0.0f64..RISK_BUDGET,
    ) {
        let (low_rate, high_rate) = if low_rate <= high_rate {
            (low_rate, high_rate)
        } else {
            (high_rate, low_rate)
        };
        let metrics = Metrics {
            trades: 10,
            wins,
            losses: 10 - wins,
            cumulative_return: -0.01,
            max_drawdown: drawdown,
            equity_curve: vec![1.0, 0.99],
        };
        let learner = ParameterLearner::default();
        let slow = learner.adapt(&StrategyConfig { learning_rate: low_rate, ..cfg }, &metrics);
        let fast = learner.adapt(&StrategyConfig { learning_rate: high_rate, ..cfg }, &metrics);

        let slow_step = (slow.threshold - cfg.threshold).abs();
        let fast_step = (fast.threshold - cfg.threshold).abs();
        prop_assert!(fast_step >= slow_step, "fast {fast_step} < slow {slow_step}");
    }
}
