use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{EntryMap, Model, Snapshot, Tick};

/// Errors that can occur while building or applying a Delta
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeltaError {
    /// The base snapshot held locally is not the one the delta was built
    /// against. A full snapshot must be requested instead.
    #[error("Delta base checksum mismatch: delta expects {expected}, local base for tick {base_tick} is {actual}")]
    ChecksumMismatch {
        base_tick: Tick,
        expected: Checksum,
        actual: Checksum,
    },

    /// The snapshot could not be put into its canonical encoding
    #[error("Failed to encode snapshot for tick {tick}: {message}")]
    Encoding { tick: Tick, message: String },
}

/// blake3 digest of a snapshot's canonical encoding
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum([u8; 32]);

impl Checksum {
    /// Digest of `(tick, state, entries)` in bincode form. The authoritative
    /// flag is not part of it.
    pub fn of<M: Model>(snapshot: &Snapshot<M>) -> Result<Self, DeltaError> {
        let canonical = (snapshot.tick, &snapshot.state, &snapshot.entries);
        let bytes = bincode::serialize(&canonical).map_err(|error| DeltaError::Encoding {
            tick: snapshot.tick,
            message: error.to_string(),
        })?;
        Ok(Self(*blake3::hash(&bytes).as_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // a short prefix is enough to tell checksums apart in logs
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", self)
    }
}

/// The difference between a base snapshot and a target snapshot.
///
/// Subordinate-state entries travel only when they changed; the opaque state
/// travels in full.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Delta<M: Model> {
    base_checksum: Checksum,
    target_tick: Tick,
    state: M::State,
    changed: EntryMap<M>,
    removed: Vec<M::EntryKey>,
}

impl<M: Model> Delta<M> {
    pub fn diff(base: &Snapshot<M>, target: &Snapshot<M>) -> Result<Self, DeltaError> {
        let base_checksum = Checksum::of(base)?;

        let changed: EntryMap<M> = target
            .entries
            .iter()
            .filter(|(key, entry)| base.entries.get(*key) != Some(*entry))
            .map(|(key, entry)| (*key, entry.clone()))
            .collect();

        let removed: Vec<M::EntryKey> = base
            .entries
            .keys()
            .filter(|key| !target.entries.contains_key(*key))
            .copied()
            .collect();

        Ok(Self {
            base_checksum,
            target_tick: target.tick,
            state: target.state.clone(),
            changed,
            removed,
        })
    }

    /// Rebuilds the target snapshot on top of `base`. Nothing is applied if
    /// `base` is not the snapshot the delta was built against.
    pub fn apply(&self, base: &Snapshot<M>) -> Result<Snapshot<M>, DeltaError> {
        let actual = Checksum::of(base)?;
        if actual != self.base_checksum {
            return Err(DeltaError::ChecksumMismatch {
                base_tick: base.tick,
                expected: self.base_checksum,
                actual,
            });
        }

        let mut target = base.duplicate_at(self.target_tick);
        target.state = self.state.clone();
        for key in &self.removed {
            target.entries.remove(key);
        }
        for (key, entry) in &self.changed {
            target.entries.insert(*key, entry.clone());
        }
        Ok(target)
    }

    pub fn base_checksum(&self) -> Checksum {
        self.base_checksum
    }

    pub fn target_tick(&self) -> Tick {
        self.target_tick
    }

    /// Number of subordinate entries carried, changed plus removed
    pub fn entry_count(&self) -> usize {
        self.changed.len() + self.removed.len()
    }
}
