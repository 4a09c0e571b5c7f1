use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{CandleFeed, Config};
use engine::{Engine, EngineOptions, JsonFileFeed};
use strategy::ConfigStore;

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().unwrap_or_else(|e| panic!("{e}"));
    info!(
        feed = %cfg.candle_feed_path,
        window = cfg.candle_window,
        auto_learn = cfg.auto_learn,
        "Adaptive trader starting"
    );

    // ── Strategy parameters ───────────────────────────────────────────────────
    let store = ConfigStore::new(&cfg.strategy_config_path);
    let initial = store.load().unwrap_or_else(|e| {
        warn!(error = %e, path = %store.path().display(), "Could not read strategy config, using defaults");
        common::StrategyConfig::default()
    });
    info!(config = ?initial, "Strategy parameters loaded");

    // ── Candle feed ───────────────────────────────────────────────────────────
    let feed: Arc<dyn CandleFeed> =
        Arc::new(JsonFileFeed::new(&cfg.candle_feed_path, cfg.candle_window));

    // ── Engine ────────────────────────────────────────────────────────────────
    let options = EngineOptions {
        interval: cfg.cycle_interval,
        auto_learn: cfg.auto_learn,
        store: Some(store),
    };
    let (mut engine, handle) = Engine::new(feed, initial, options);

    if cfg.run_once {
        let snapshot = engine
            .run_once()
            .await
            .unwrap_or_else(|e| panic!("Cycle failed: {e}"));
        let json = serde_json::to_string_pretty(&snapshot)
            .unwrap_or_else(|e| panic!("Failed to encode cycle result: {e}"));
        println!("{json}");
        return;
    }

    let task = tokio::spawn(engine.run());

    // Keep main alive
    info!("Engine started. Waiting for shutdown signal.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received. Stopping engine.");
    handle.stop().await;
    let _ = task.await;
}
