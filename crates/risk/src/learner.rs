use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{Metrics, StrategyConfig};

/// Drawdown the learner tolerates before it starts shrinking position size.
pub const RISK_BUDGET: f64 = 0.2;

/// Win rate below which entries are made stricter.
pub const TARGET_WIN_RATE: f64 = 0.5;

/// Coefficients of the rule-based adaptation step.
///
/// Every rule is scaled by the current config's `learning_rate`, and the
/// result is always clamped back into the valid parameter ranges. The
/// windows are structural and never adapted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterLearner {
    /// Maximum drawdown (fraction) before size is cut.
    pub risk_budget: f64,
    /// Win rate below which the threshold is raised.
    pub target_win_rate: f64,
    /// Fraction of `learning_rate` added to `risk_per_trade` after a
    /// profitable cycle that stayed within budget.
    pub reward_fraction: f64,
}

impl Default for ParameterLearner {
    fn default() -> Self {
        Self {
            risk_budget: RISK_BUDGET,
            target_win_rate: TARGET_WIN_RATE,
            reward_fraction: 0.05,
        }
    }
}

impl ParameterLearner {
    /// Produce the next cycle's config from this cycle's metrics.
    ///
    /// Deterministic and total: any input pair maps to exactly one config
    /// inside the valid ranges.
    pub fn adapt(&self, current: &StrategyConfig, metrics: &Metrics) -> StrategyConfig {
        let rate = current.learning_rate;
        let win_rate = metrics.win_rate();
        let drawdown = metrics.max_drawdown;
        let mut next = *current;

        if win_rate < self.target_win_rate {
            next.threshold += rate * (self.target_win_rate - win_rate);
        }

        if drawdown > self.risk_budget {
            let cut = rate * (drawdown - self.risk_budget);
            next.risk_per_trade *= 1.0 - cut;
            next.max_position *= 1.0 - cut;
        } else if metrics.cumulative_return > 0.0 && drawdown < self.risk_budget {
            next.risk_per_trade += rate * self.reward_fraction;
        }

        let next = next.clamped();
        debug!(
            win_rate = win_rate,
            max_drawdown = drawdown,
            cumulative_return = metrics.cumulative_return,
            threshold = next.threshold,
            risk_per_trade = next.risk_per_trade,
            max_position = next.max_position,
            "Parameters adapted"
        );
        next
    }
}
