use std::default::Default;

use retrace_shared::{CadenceConfig, ConfigError, TimelineConfig};

/// Contains Config properties which will be used by the Authority
#[derive(Clone, Debug, Default)]
pub struct AuthorityConfig {
    /// Used to configure the Authority's Timeline
    pub timeline: TimelineConfig,
    /// How often state is published to Predictors. Predictors must be
    /// configured with the same cadence.
    pub cadence: CadenceConfig,
}

impl AuthorityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timeline.validate()?;
        self.cadence.validate()
    }
}
