use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{Candle, Direction, StrategyConfig};
use strategy::generate_signals;

use crate::drawdown::DrawdownTracker;

/// Equity every walk starts from.
pub const STARTING_EQUITY: f64 = 1.0;

/// A round trip realized when the directional state changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedTrade {
    pub direction: Direction,
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Position size as an amount of equity.
    pub size: f64,
    pub pnl: f64,
}

/// Everything the walk produced: counters, trade log and equity trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<f64>,
    pub max_drawdown: f64,
    /// Realized equity at the end of the walk, excluding any open position.
    pub realized_equity: f64,
}

/// Open position during the walk. Never leaves this module.
#[derive(Debug, Clone, Copy)]
struct OpenPosition {
    direction: Direction,
    entry_index: usize,
    entry_price: f64,
    size: f64,
}

impl OpenPosition {
    /// `size × direction × (price/entry − 1)`, or 0 for a non-positive entry.
    fn pnl_at(&self, price: f64) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        let pnl = self.size * self.direction.sign() * (price / self.entry_price - 1.0);
        if pnl.is_finite() {
            pnl
        } else {
            0.0
        }
    }
}

/// Deterministic fill simulation at candle mid-prices.
///
/// States are `Flat`, `Long` and `Short`, starting flat. A change of
/// classification closes any open position at the bar's mid-price and, if
/// the new state is not flat, opens a new one on the same bar. Positions
/// left open at the end are marked to market but not counted as trades.
#[derive(Debug, Clone, Copy)]
pub struct Simulator {
    position_fraction: f64,
}

impl Simulator {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            position_fraction: config.position_fraction(),
        }
    }

    /// Classify the candles' mid-prices with `config` and walk the result.
    pub fn simulate(candles: &[Candle], config: &StrategyConfig) -> SimulationReport {
        let mid_prices: Vec<f64> = candles.iter().map(|c| c.mid_price).collect();
        let signals = generate_signals(&mid_prices, config);
        Self::new(config).run(candles, &signals)
    }

    /// Walk `candles` and `signals` together; extra entries in the longer
    /// slice are ignored.
    pub fn run(&self, candles: &[Candle], signals: &[Direction]) -> SimulationReport {
        let mut equity = STARTING_EQUITY;
        let mut state = Direction::Flat;
        let mut position: Option<OpenPosition> = None;
        let mut drawdown = DrawdownTracker::new(STARTING_EQUITY);

        let mut closed_trades = Vec::new();
        let mut wins = 0;
        let mut losses = 0;
        let mut equity_curve = Vec::with_capacity(candles.len().min(signals.len()));

        for (index, (candle, &signal)) in candles.iter().zip(signals).enumerate() {
            let price = candle.mid_price;

            if signal != state {
                if let Some(open) = position.take() {
                    let pnl = open.pnl_at(price);
                    equity += pnl;
                    if pnl > 0.0 {
                        wins += 1;
                    } else if pnl < 0.0 {
                        losses += 1;
                    }
                    debug!(
                        direction = %open.direction,
                        entry = open.entry_price,
                        exit = price,
                        pnl = pnl,
                        equity = equity,
                        "Simulated position closed"
                    );
                    closed_trades.push(ClosedTrade {
                        direction: open.direction,
                        entry_index: open.entry_index,
                        exit_index: index,
                        entry_price: open.entry_price,
                        exit_price: price,
                        size: open.size,
                        pnl,
                    });
                }

                if !signal.is_flat() {
                    let size = self.position_fraction * equity.max(0.0);
                    debug!(direction = %signal, entry = price, size = size, "Simulated position opened");
                    position = Some(OpenPosition {
                        direction: signal,
                        entry_index: index,
                        entry_price: price,
                        size,
                    });
                }
                state = signal;
            }

            let marked = equity + position.map_or(0.0, |p| p.pnl_at(price));
            equity_curve.push(marked);
            drawdown.observe(marked);
        }

        SimulationReport {
            trades: closed_trades.len(),
            wins,
            losses,
            closed_trades,
            equity_curve,
            max_drawdown: drawdown.max_drawdown(),
            realized_equity: equity,
        }
    }
}
