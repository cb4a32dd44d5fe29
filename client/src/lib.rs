//! # Retrace Client
//! The predictor side of a retrace session. Simulates ahead of the authority
//! on predicted input, and reconciles against full and delta snapshots as
//! they arrive.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use retrace_shared::{
        Blanks, CadenceConfig, ConfigError, Delta, EventSchedule, LocalInputSource, Message,
        Model, SimulationBackend, Snapshot, SyncError, SyncOutcome, Tick, TimelineConfig,
    };
}

mod predictor;

pub use predictor::{Predictor, PredictorConfig};
