pub mod drawdown;
pub mod metrics;
pub mod simulator;

pub use drawdown::{max_drawdown, DrawdownTracker};
pub use metrics::aggregate;
pub use simulator::{ClosedTrade, SimulationReport, Simulator};
