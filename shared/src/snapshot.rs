use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Anomalies, Anomaly, Blanks, EntryMap, Model, Tick, TickBuffer};

/// The captured world at the end of one tick
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Snapshot<M: Model> {
    pub tick: Tick,
    /// Opaque simulation state, carried in full
    pub state: M::State,
    /// Subordinate state, diffed entry by entry
    pub entries: EntryMap<M>,
    /// Certified by the authority. Never part of the canonical encoding.
    pub authoritative: bool,
}

impl<M: Model> Snapshot<M> {
    pub fn new(tick: Tick, state: M::State, entries: EntryMap<M>) -> Self {
        Self {
            tick,
            state,
            entries,
            authoritative: false,
        }
    }

    pub fn blank(tick: Tick, blanks: &Blanks<M>) -> Self {
        Self::new(tick, blanks.state(), EntryMap::<M>::new())
    }

    /// Same contents, stamped with another tick and no authority
    pub fn duplicate_at(&self, tick: Tick) -> Self {
        Self {
            tick,
            state: self.state.clone(),
            entries: self.entries.clone(),
            authoritative: false,
        }
    }

    /// Whether the two snapshots hold the same world, ignoring authority
    pub fn same_world(&self, other: &Self) -> bool {
        self.tick == other.tick && self.state == other.state && self.entries == other.entries
    }
}

/// One snapshot per tick.
///
/// Reading a tick that was never written duplicates the nearest earlier
/// snapshot into it. Overwriting an authoritative snapshot is allowed but
/// reported.
pub struct SnapshotStore<M: Model> {
    frames: TickBuffer<Snapshot<M>>,
    blanks: Arc<Blanks<M>>,
    anomalies: Anomalies,
}

impl<M: Model> SnapshotStore<M> {
    pub fn new(blanks: Arc<Blanks<M>>) -> Self {
        Self {
            frames: TickBuffer::new(),
            blanks,
            anomalies: Anomalies::new(),
        }
    }

    /// Returns the snapshot at `tick`, filling a gap from the nearest earlier
    /// snapshot (or a blank one) first.
    pub fn read(&mut self, tick: Tick) -> &Snapshot<M> {
        if tick < 0 {
            self.anomalies.push(Anomaly::NegativeTickRead { tick });
        }

        let fill = if self.frames.contains(tick) {
            None
        } else {
            Some(self.placeholder(tick))
        };

        let blanks = &self.blanks;
        self.frames
            .get_or_insert_with(tick, || fill.unwrap_or_else(|| Snapshot::blank(tick, blanks)))
    }

    fn placeholder(&mut self, tick: Tick) -> Snapshot<M> {
        match self.frames.latest_at_or_before(tick) {
            Some((_, earlier)) => earlier.duplicate_at(tick),
            None => {
                self.anomalies
                    .push(Anomaly::BlankSnapshotSynthesized { tick });
                Snapshot::blank(tick, &self.blanks)
            }
        }
    }

    pub fn write(&mut self, tick: Tick, mut snapshot: Snapshot<M>) {
        if tick < 0 {
            self.anomalies.push(Anomaly::NegativeTickWrite { tick });
        }
        if self.frames.get(tick).is_some_and(|old| old.authoritative) {
            self.anomalies.push(Anomaly::AuthoritativeOverwrite { tick });
        }

        snapshot.tick = tick;
        self.frames.insert(tick, snapshot);
    }

    /// The stored snapshot at `tick`, without gap filling
    pub fn get(&self, tick: Tick) -> Option<&Snapshot<M>> {
        self.frames.get(tick)
    }

    pub fn contains(&self, tick: Tick) -> bool {
        self.frames.contains(tick)
    }

    pub fn earliest_tick(&self) -> Option<Tick> {
        self.frames.first_tick()
    }

    pub fn latest_tick(&self) -> Option<Tick> {
        self.frames.last_tick()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn prune_before(&mut self, tick: Tick) {
        self.frames.prune_before(tick);
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn anomalies(&self) -> &Anomalies {
        &self.anomalies
    }

    pub fn drain_anomalies(&mut self) -> Vec<Anomaly> {
        self.anomalies.drain()
    }
}
