pub mod config;
pub mod indicators;
pub mod signal;

pub use config::ConfigStore;
pub use indicators::{ema_series, TrendPair};
pub use signal::{classify, generate_signals, trend_spread_pct};
