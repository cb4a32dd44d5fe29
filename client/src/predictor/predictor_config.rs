use std::default::Default;

use retrace_shared::{CadenceConfig, ConfigError, Tick, TimelineConfig};

/// Contains Config properties which will be used by a Predictor
#[derive(Clone, Debug)]
pub struct PredictorConfig {
    /// Used to configure the Predictor's Timeline
    pub timeline: TimelineConfig,
    /// Must match the Authority's cadence, deltas are order-checked against
    /// its `delta_interval`
    pub cadence: CadenceConfig,
    /// Estimated ticks between the Authority sending a state update and this
    /// Predictor receiving it. Reconciliation fast-forwards this far past the
    /// authoritative tick.
    pub lag_estimate: Tick,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            timeline: TimelineConfig::default(),
            cadence: CadenceConfig::default(),
            lag_estimate: 2,
        }
    }
}

impl PredictorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lag_estimate < 0 {
            return Err(ConfigError::Negative {
                name: "lag_estimate",
                value: self.lag_estimate,
            });
        }
        self.timeline.validate()?;
        self.cadence.validate()
    }
}
