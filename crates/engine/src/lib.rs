pub mod cycle;
pub mod feed;
pub mod lifecycle;

pub use cycle::{run_cycle, run_cycle_with, CycleOutcome};
pub use feed::JsonFileFeed;
pub use lifecycle::{CycleJob, Engine, EngineCommand, EngineHandle, EngineOptions, EngineSnapshot};
