//! # Retrace Shared
//! Deterministic rollback core shared between retrace-server & retrace-client
//! crates.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod anomaly;
mod backend;
mod blanks;
mod config;
mod delta;
mod error;
mod event;
mod input;
mod message;
mod sequence;
mod snapshot;
mod tick_buffer;
mod timeline;
mod types;

pub use anomaly::{Anomalies, Anomaly};
pub use backend::{LocalInputSource, NoLocalInput, SimulationBackend};
pub use blanks::Blanks;
pub use config::{CadenceConfig, ConfigError, TimelineConfig};
pub use delta::{Checksum, Delta, DeltaError};
pub use error::SyncError;
pub use event::{At, EventSchedule};
pub use input::{InputLedger, InputRecord};
pub use message::{Message, MessageError};
pub use sequence::{DeterministicSequence, SequenceError};
pub use snapshot::{Snapshot, SnapshotStore};
pub use tick_buffer::TickBuffer;
pub use timeline::{SyncOutcome, TickMode, Timeline, TimelineState};
pub use types::{EntryMap, EventSet, HostType, InputMap, Model, Tick};
