use common::Metrics;

use crate::simulator::{SimulationReport, STARTING_EQUITY};

/// Reduce a simulation report into the cycle's performance summary.
///
/// A walk over no candles yields `Metrics::empty()`.
pub fn aggregate(report: &SimulationReport) -> Metrics {
    let Some(&last) = report.equity_curve.last() else {
        return Metrics::empty();
    };

    Metrics {
        trades: report.trades,
        wins: report.wins,
        losses: report.losses,
        cumulative_return: last - STARTING_EQUITY,
        max_drawdown: report.max_drawdown,
        equity_curve: report.equity_curve.clone(),
    }
}
