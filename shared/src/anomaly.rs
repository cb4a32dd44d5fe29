use std::fmt;

use log::warn;

use crate::Tick;

/// Advisory diagnostics. Raised by the ledgers when an operation is legal but
/// suspicious; the operation always proceeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Anomaly {
    /// A snapshot was read at a negative tick
    NegativeTickRead { tick: Tick },
    /// A snapshot was written at a negative tick
    NegativeTickWrite { tick: Tick },
    /// An authoritative snapshot was replaced
    AuthoritativeOverwrite { tick: Tick },
    /// A read found no snapshot at or before the tick, so a blank one was made
    BlankSnapshotSynthesized { tick: Tick },
    /// An event was scheduled at or before the current logical tick, so peers
    /// that already passed that tick will not observe it
    PastEventScheduled { tick: Tick, logical_tick: Tick },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::NegativeTickRead { tick } => {
                write!(f, "read snapshot at negative tick {tick}")
            }
            Anomaly::NegativeTickWrite { tick } => {
                write!(f, "wrote snapshot at negative tick {tick}")
            }
            Anomaly::AuthoritativeOverwrite { tick } => {
                write!(f, "overwrote authoritative snapshot at tick {tick}")
            }
            Anomaly::BlankSnapshotSynthesized { tick } => {
                write!(f, "no snapshot at or before tick {tick}, synthesized a blank one")
            }
            Anomaly::PastEventScheduled { tick, logical_tick } => write!(
                f,
                "event scheduled at tick {tick}, at or before logical tick {logical_tick}"
            ),
        }
    }
}

/// Collects anomalies until the caller drains them
#[derive(Clone, Debug, Default)]
pub struct Anomalies {
    list: Vec<Anomaly>,
}

impl Anomalies {
    pub fn new() -> Self {
        Self { list: Vec::new() }
    }

    pub fn push(&mut self, anomaly: Anomaly) {
        warn!("{}", anomaly);
        self.list.push(anomaly);
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Anomaly> {
        self.list.iter()
    }

    pub fn drain(&mut self) -> Vec<Anomaly> {
        std::mem::take(&mut self.list)
    }
}
