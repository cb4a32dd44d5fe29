use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Debug,
    hash::Hash,
};

use serde::{de::DeserializeOwned, Serialize};

/// Discrete simulation step index. Signed so that anomalous negative reads
/// can be represented and reported instead of wrapping.
pub type Tick = i64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostType {
    Authority,
    Predictor,
}

/// The closed set of value types a session simulates.
///
/// Implemented once per session on a marker type. Every associated type
/// carries value equality and serializes with serde, so that snapshots,
/// inputs and events can be compared, checksummed and sent over the wire.
pub trait Model: Clone + Copy + Debug + PartialEq + Eq + Send + Sync + 'static {
    /// Identifies a participant whose input drives the simulation
    type Player: Copy + Ord + Hash + Debug + Send + Sync + Serialize + DeserializeOwned;
    /// One player's input for one tick
    type Input: Clone + PartialEq + Debug + Send + Sync + Serialize + DeserializeOwned;
    /// A discrete event scheduled at a tick
    type Event: Clone + Ord + Hash + Debug + Send + Sync + Serialize + DeserializeOwned;
    /// Opaque simulation state, carried in full
    type State: Clone + PartialEq + Debug + Send + Sync + Serialize + DeserializeOwned;
    /// Stable identifier of a subordinate-state entry
    type EntryKey: Copy + Ord + Hash + Debug + Send + Sync + Serialize + DeserializeOwned;
    /// Subordinate-state entry, diffed one entry at a time
    type Entry: Clone + PartialEq + Debug + Send + Sync + Serialize + DeserializeOwned;
}

pub type InputMap<M> = BTreeMap<<M as Model>::Player, <M as Model>::Input>;
pub type EventSet<M> = BTreeSet<<M as Model>::Event>;
pub type EntryMap<M> = BTreeMap<<M as Model>::EntryKey, <M as Model>::Entry>;
