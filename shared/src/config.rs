use std::time::Duration;

use thiserror::Error;

use crate::Tick;

/// Errors that can occur when validating cadence settings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An interval or threshold that must be positive was zero or negative
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: Tick },

    /// A value that may be zero was negative
    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: Tick },

    /// Full snapshots must land on a delta boundary
    #[error("full_interval ({full_interval}) must be a multiple of delta_interval ({delta_interval})")]
    FullIntervalNotAligned {
        full_interval: Tick,
        delta_interval: Tick,
    },
}

/// Contains Config properties used by every Timeline
#[derive(Clone, Debug)]
pub struct TimelineConfig {
    /// Fixed simulation step handed to the backend on every tick
    pub step_duration: Duration,
    /// How far past the real tick received input may be stamped. Input
    /// beyond this is dropped, since the ledgers store every tick up to it.
    pub input_horizon: Tick,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            step_duration: Duration::from_micros(16_667),
            input_horizon: 256,
        }
    }
}

impl TimelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_horizon <= 0 {
            return Err(ConfigError::NonPositive {
                name: "input_horizon",
                value: self.input_horizon,
            });
        }
        Ok(())
    }

    /// Whether input stamped `client_tick` lies within reach of `now`
    pub fn accepts_input_at(&self, client_tick: Tick, now: Tick) -> bool {
        client_tick <= now.saturating_add(self.input_horizon)
    }
}

/// How often the authority publishes state, and how long a predictor may go
/// without hearing from it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CadenceConfig {
    /// Ticks between two consecutive state updates (delta or full)
    pub delta_interval: Tick,
    /// Ticks between two full snapshots. Must be a multiple of `delta_interval`.
    pub full_interval: Tick,
    /// Ticks without authoritative contact before a predictor asks for a
    /// full resync
    pub staleness_threshold: Tick,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            delta_interval: 2,
            full_interval: 60,
            staleness_threshold: 120,
        }
    }
}

impl CadenceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("delta_interval", self.delta_interval),
            ("full_interval", self.full_interval),
            ("staleness_threshold", self.staleness_threshold),
        ] {
            if value <= 0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }

        if self.full_interval % self.delta_interval != 0 {
            return Err(ConfigError::FullIntervalNotAligned {
                full_interval: self.full_interval,
                delta_interval: self.delta_interval,
            });
        }

        Ok(())
    }

    /// Whether the authority publishes state at `tick`
    pub fn is_update_tick(&self, tick: Tick) -> bool {
        tick.rem_euclid(self.delta_interval) == 0
    }

    /// Whether the update published at `tick` is a full snapshot
    pub fn is_full_tick(&self, tick: Tick) -> bool {
        tick.rem_euclid(self.full_interval) == 0
    }
}
