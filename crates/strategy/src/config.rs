use std::path::{Path, PathBuf};

use tracing::{info, warn};

use common::{Result, StrategyConfig};

/// Persists the strategy parameters between runs as a flat TOML record.
///
/// Example `config/strategy.toml`:
/// ```toml
/// shortWindow = 8
/// longWindow = 21
/// threshold = 0.1
/// riskPerTrade = 0.1
/// maxPosition = 1.0
/// learningRate = 0.1
/// ```
///
/// Loading is lenient per field: a missing or invalid entry falls back to
/// that field's default without affecting the others.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored parameters. A missing file yields the defaults.
    pub fn load(&self) -> Result<StrategyConfig> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No stored strategy config, using defaults");
            return Ok(StrategyConfig::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(resolve_str(&content))
    }

    /// Write the parameters, creating the parent directory if needed.
    pub fn save(&self, config: &StrategyConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string(config)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Resolve a stored TOML document. Unparseable text yields the defaults.
pub fn resolve_str(content: &str) -> StrategyConfig {
    match content.parse::<toml::Table>() {
        Ok(table) => resolve_table(&table),
        Err(e) => {
            warn!(error = %e, "Stored strategy config is not valid TOML, using defaults");
            StrategyConfig::default()
        }
    }
}

/// Resolve each field independently, substituting its default when the
/// stored value is absent, mistyped, or outside its own range.
///
/// The windows are then checked against each other. A defaulted window is
/// moved to fit the stored one; two stored windows that conflict both
/// revert to their defaults.
pub fn resolve_table(table: &toml::Table) -> StrategyConfig {
    type C = StrategyConfig;

    let short = window_field(
        table,
        "shortWindow",
        C::MIN_SHORT_WINDOW,
        C::MAX_LONG_WINDOW - 1,
        C::DEFAULT_SHORT_WINDOW,
    );
    let long = window_field(
        table,
        "longWindow",
        C::MIN_SHORT_WINDOW + 1,
        C::MAX_LONG_WINDOW,
        C::DEFAULT_LONG_WINDOW,
    );
    let (short_window, long_window) = resolve_windows(short, long);

    StrategyConfig {
        short_window,
        long_window,
        threshold: scalar_field(
            table,
            "threshold",
            C::MIN_THRESHOLD,
            C::MAX_THRESHOLD,
            C::DEFAULT_THRESHOLD,
        ),
        risk_per_trade: scalar_field(
            table,
            "riskPerTrade",
            C::MIN_RISK_PER_TRADE,
            C::MAX_RISK_PER_TRADE,
            C::DEFAULT_RISK_PER_TRADE,
        ),
        max_position: scalar_field(
            table,
            "maxPosition",
            C::MIN_MAX_POSITION,
            C::MAX_MAX_POSITION,
            C::DEFAULT_MAX_POSITION,
        ),
        learning_rate: scalar_field(
            table,
            "learningRate",
            C::MIN_LEARNING_RATE,
            C::MAX_LEARNING_RATE,
            C::DEFAULT_LEARNING_RATE,
        ),
    }
}

/// Combine the individually resolved windows into a pair with `short < long`.
/// `None` means the stored value was unusable.
fn resolve_windows(short: Option<usize>, long: Option<usize>) -> (usize, usize) {
    type C = StrategyConfig;

    match (short, long) {
        (Some(short), Some(long)) if short < long => (short, long),
        (Some(short), Some(long)) => {
            warn!(
                short_window = short,
                long_window = long,
                "Stored windows conflict, reverting both to defaults"
            );
            (C::DEFAULT_SHORT_WINDOW, C::DEFAULT_LONG_WINDOW)
        }
        // Stored short is at most MAX_LONG_WINDOW - 1.
        (Some(short), None) => (short, C::DEFAULT_LONG_WINDOW.max(short + 1)),
        // Stored long is at least MIN_SHORT_WINDOW + 1.
        (None, Some(long)) => (C::DEFAULT_SHORT_WINDOW.min(long - 1), long),
        (None, None) => (C::DEFAULT_SHORT_WINDOW, C::DEFAULT_LONG_WINDOW),
    }
}

fn window_field(
    table: &toml::Table,
    key: &str,
    min: usize,
    max: usize,
    default: usize,
) -> Option<usize> {
    let resolved = table
        .get(key)
        .and_then(|v| v.as_integer())
        .and_then(|v| usize::try_from(v).ok())
        .filter(|v| (min..=max).contains(v));
    if resolved.is_none() {
        fallback_warning(table, key, default);
    }
    resolved
}

fn scalar_field(table: &toml::Table, key: &str, min: f64, max: f64, default: f64) -> f64 {
    let resolved = table
        .get(key)
        .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
        .filter(|v| v.is_finite() && (min..=max).contains(v));
    match resolved {
        Some(v) => v,
        None => {
            fallback_warning(table, key, default);
            default
        }
    }
}

fn fallback_warning(table: &toml::Table, key: &str, default: impl std::fmt::Display) {
    match table.get(key) {
        Some(stored) => {
            warn!(field = key, stored = %stored, default = %default, "Invalid stored value, using default")
        }
        None => warn!(field = key, default = %default, "Missing stored value, using default"),
    }
}
