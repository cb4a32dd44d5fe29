//! # Retrace Server
//! The authority side of a retrace session. Runs the canonical timeline,
//! folds late input and newly scheduled events back into history, and
//! publishes full and delta snapshots to every connected predictor.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use retrace_shared::{
        At, Blanks, CadenceConfig, ConfigError, EventSchedule, InputMap, LocalInputSource,
        Message, Model, NoLocalInput, SimulationBackend, Snapshot, Tick, TimelineConfig,
    };
}

mod authority;
mod peer;

pub use authority::{Authority, AuthorityConfig};
pub use peer::{Outgoing, PeerKey, Recipient};
