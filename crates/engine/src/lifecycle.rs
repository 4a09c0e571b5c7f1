use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use common::{CandleFeed, Error, Metrics, Result, StrategyConfig};
use strategy::ConfigStore;

use crate::cycle::{run_cycle, CycleOutcome};

/// Commands sent to the engine via the command channel.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Run a cycle now, independent of the timer.
    Refresh,
    /// Toggle whether adapted configs are adopted.
    SetAutoLearn(bool),
    /// Replace the current config by hand. Invalid configs are rejected.
    SetConfig(StrategyConfig),
    Stop,
}

/// Externally visible result state, replaced only by newer cycles.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    /// Sequence number of the cycle that last published, 0 before any.
    pub sequence: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub metrics: Option<Metrics>,
    /// Configuration the next cycle will start from.
    pub config: StrategyConfig,
    pub auto_learn: bool,
    /// Results dropped because a newer cycle had already published.
    pub stale_discarded: u64,
    /// First cycle sequence allowed to replace `config`. Raised when the
    /// config is set by hand so cycles already in flight keep it.
    #[serde(skip)]
    config_floor: u64,
}

impl EngineSnapshot {
    pub fn new(config: StrategyConfig, auto_learn: bool) -> Self {
        Self {
            sequence: 0,
            started_at: None,
            metrics: None,
            config,
            auto_learn,
            stale_discarded: 0,
            config_floor: 0,
        }
    }

    /// Whether a result from cycle `sequence` would replace the config.
    pub fn adopts(&self, sequence: u64) -> bool {
        self.auto_learn && sequence >= self.config_floor
    }

    /// Publish a cycle result if it started after the one currently shown.
    ///
    /// Ordering is by start sequence, so a slow older cycle finishing late
    /// cannot overwrite a newer result. Returns whether it was accepted.
    pub fn apply(
        &mut self,
        sequence: u64,
        started_at: DateTime<Utc>,
        outcome: CycleOutcome,
    ) -> bool {
        if sequence <= self.sequence {
            self.stale_discarded += 1;
            return false;
        }
        self.sequence = sequence;
        self.started_at = Some(started_at);
        self.metrics = Some(outcome.metrics);
        if self.adopts(sequence) {
            self.config = outcome.updated_config;
        }
        true
    }

    /// Install a hand-set config. Cycles numbered below `next_sequence`
    /// were started from the old config and will not overwrite this one.
    pub fn override_config(&mut self, config: StrategyConfig, next_sequence: u64) {
        self.config = config;
        self.config_floor = next_sequence;
    }
}

/// Host-side settings for the cycle loop.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub interval: Duration,
    pub auto_learn: bool,
    /// Where adopted configs are saved; `None` keeps them in memory only.
    pub store: Option<ConfigStore>,
}

/// One cycle, stamped with its sequence and starting config at launch.
pub struct CycleJob {
    pub sequence: u64,
    pub config: StrategyConfig,
    pub feed: Arc<dyn CandleFeed>,
    pub snapshot: Arc<RwLock<EngineSnapshot>>,
    pub store: Option<ConfigStore>,
}

impl CycleJob {
    /// Fetch candles, run the cycle and try to publish the result.
    /// Returns whether the result was published.
    pub async fn execute(self) -> Result<bool> {
        let started_at = Utc::now();
        let candles = self.feed.candles().await?;
        let outcome = run_cycle(&candles, &self.config)?;

        let mut snapshot = self.snapshot.write().await;
        let adopted = snapshot.adopts(self.sequence);
        if !snapshot.apply(self.sequence, started_at, outcome) {
            warn!(
                sequence = self.sequence,
                latest = snapshot.sequence,
                "Discarding stale cycle result"
            );
            return Ok(false);
        }

        info!(sequence = self.sequence, adopted = adopted, "Cycle result published");
        if adopted {
            if let Some(store) = &self.store {
                // Saved under the lock so files land in sequence order.
                if let Err(e) = persist(store, snapshot.config).await {
                    warn!(
                        sequence = self.sequence,
                        path = %store.path().display(),
                        error = %e,
                        "Failed to save adopted config, keeping it in memory"
                    );
                }
            }
        }
        Ok(true)
    }
}

/// Write `config` through `store` on the blocking pool.
async fn persist(store: &ConfigStore, config: StrategyConfig) -> Result<()> {
    let store = store.clone();
    tokio::task::spawn_blocking(move || store.save(&config))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
}

/// Cloneable handle for triggering cycles and reading results.
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
    snapshot: Arc<RwLock<EngineSnapshot>>,
}

impl EngineHandle {
    pub async fn send(&self, cmd: EngineCommand) {
        let _ = self.command_tx.send(cmd).await;
    }

    pub async fn refresh(&self) {
        self.send(EngineCommand::Refresh).await;
    }

    pub async fn stop(&self) {
        self.send(EngineCommand::Stop).await;
    }

    pub async fn set_config(&self, config: StrategyConfig) {
        self.send(EngineCommand::SetConfig(config)).await;
    }

    /// Latest published state.
    pub async fn snapshot(&self) -> EngineSnapshot {
        self.snapshot.read().await.clone()
    }
}

/// Drives cycles on a fixed cadence and on demand.
///
/// Each cycle runs on its own task so a slow feed does not block the timer
/// or commands; publication order is settled by `EngineSnapshot::apply`.
pub struct Engine {
    feed: Arc<dyn CandleFeed>,
    snapshot: Arc<RwLock<EngineSnapshot>>,
    command_rx: mpsc::Receiver<EngineCommand>,
    interval: Duration,
    store: Option<ConfigStore>,
    next_sequence: u64,
}

impl Engine {
    pub fn new(
        feed: Arc<dyn CandleFeed>,
        initial_config: StrategyConfig,
        options: EngineOptions,
    ) -> (Self, EngineHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let snapshot = Arc::new(RwLock::new(EngineSnapshot::new(
            initial_config,
            options.auto_learn,
        )));

        let handle = EngineHandle {
            command_tx,
            snapshot: snapshot.clone(),
        };

        let engine = Engine {
            feed,
            snapshot,
            command_rx,
            interval: options.interval,
            store: options.store,
            next_sequence: 1,
        };

        (engine, handle)
    }

    /// Stamp the next cycle with a sequence number and the current config.
    pub async fn next_job(&mut self) -> CycleJob {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let config = self.snapshot.read().await.config;
        CycleJob {
            sequence,
            config,
            feed: self.feed.clone(),
            snapshot: self.snapshot.clone(),
            store: self.store.clone(),
        }
    }

    /// Replace the current config by hand and save it.
    ///
    /// The config must pass `validate`; it is never clamped. Cycles already
    /// in flight still publish their metrics but cannot replace it.
    pub async fn set_config(&self, config: StrategyConfig) -> Result<()> {
        config.validate()?;

        let mut snapshot = self.snapshot.write().await;
        snapshot.override_config(config, self.next_sequence);
        info!(config = ?config, "Strategy config set manually");

        if let Some(store) = &self.store {
            if let Err(e) = persist(store, config).await {
                warn!(
                    path = %store.path().display(),
                    error = %e,
                    "Failed to save manual config, keeping it in memory"
                );
            }
        }
        Ok(())
    }

    /// Run a single cycle inline and return the resulting snapshot.
    pub async fn run_once(&mut self) -> Result<EngineSnapshot> {
        let job = self.next_job().await;
        job.execute().await?;
        Ok(self.snapshot.read().await.clone())
    }

    /// Run the engine until `Stop` arrives or every handle is dropped.
    /// Call from `tokio::spawn`.
    pub async fn run(mut self) {
        info!(interval_secs = self.interval.as_secs_f64(), "Engine running");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.spawn_cycle(&mut cycles).await;
                }

                cmd = self.command_rx.recv() => match cmd {
                    Some(EngineCommand::Refresh) => {
                        info!("On-demand cycle requested");
                        self.spawn_cycle(&mut cycles).await;
                    }
                    Some(EngineCommand::SetAutoLearn(enabled)) => {
                        info!(enabled = enabled, "Auto-learn toggled");
                        self.snapshot.write().await.auto_learn = enabled;
                    }
                    Some(EngineCommand::SetConfig(config)) => {
                        if let Err(e) = self.set_config(config).await {
                            warn!(error = %e, "Rejected manual config");
                        }
                    }
                    Some(EngineCommand::Stop) => {
                        info!("Engine stopping, aborting in-flight cycles");
                        cycles.abort_all();
                        break;
                    }
                    None => {
                        warn!("Engine command channel closed, shutting down");
                        cycles.abort_all();
                        break;
                    }
                },

                Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!(error = %e, "Cycle task panicked");
                        }
                    }
                }
            }
        }
    }

    async fn spawn_cycle(&mut self, cycles: &mut JoinSet<()>) {
        let job = self.next_job().await;
        let sequence = job.sequence;
        cycles.spawn(async move {
            if let Err(e) = job.execute().await {
                error!(sequence = sequence, error = %e, "Cycle failed");
            }
        });
    }
}
