use std::{collections::BTreeMap, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use retrace_shared::{
    Blanks, DeterministicSequence, EntryMap, EventSet, InputMap, Model, SimulationBackend,
};

/// A one-dimensional arena: every player steers one body along a line, and
/// events change the wind or add and remove bodies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arena;

impl Model for Arena {
    type Player = u32;
    type Input = Thrust;
    type Event = ArenaEvent;
    type State = ArenaState;
    type EntryKey = u32;
    type Entry = Body;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thrust {
    pub push: i64,
}

impl Thrust {
    pub fn new(push: i64) -> Self {
        Self { push }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArenaEvent {
    Calm,
    Gust { strength: i64 },
    Spawn { id: u32 },
    Despawn { id: u32 },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaState {
    pub steps: u64,
    pub wind: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    pub x: i64,
    pub vx: i64,
}

pub fn arena_blanks() -> Arc<Blanks<Arena>> {
    Arc::new(Blanks::new(ArenaState::default, Thrust::default, || {
        ArenaEvent::Calm
    }))
}

/// Steps the arena. Body `n` is driven by player `n`.
#[derive(Clone, Debug, Default)]
pub struct ArenaBackend {
    state: ArenaState,
    bodies: BTreeMap<u32, Body>,
    thrust: BTreeMap<u32, i64>,
    /// Every event handed to `rollback_events`, in call order
    pub rolled_back: Vec<ArenaEvent>,
    /// Number of `step` calls
    pub step_calls: usize,
}

impl ArenaBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend with one resting body per player, all at the origin
    pub fn with_players(players: &[u32]) -> Self {
        let mut backend = Self::new();
        for player in players {
            backend.bodies.insert(*player, Body::default());
        }
        backend
    }

    pub fn body(&self, id: u32) -> Option<&Body> {
        self.bodies.get(&id)
    }

    pub fn wind(&self) -> i64 {
        self.state.wind
    }
}

impl SimulationBackend<Arena> for ArenaBackend {
    fn apply_events(&mut self, events: &EventSet<Arena>, sequence: &mut DeterministicSequence) {
        for event in events {
            match event {
                ArenaEvent::Calm => self.state.wind = 0,
                ArenaEvent::Gust { strength } => self.state.wind += strength,
                ArenaEvent::Spawn { id } => {
                    let x = sequence.range(0i64, 100i64).unwrap_or(0);
                    self.bodies.insert(*id, Body { x, vx: 0 });
                }
                ArenaEvent::Despawn { id } => {
                    self.bodies.remove(id);
                }
            }
        }
    }

    fn apply_inputs(&mut self, inputs: &InputMap<Arena>) {
        self.thrust = inputs
            .iter()
            .map(|(player, thrust)| (*player, thrust.push))
            .collect();
    }

    fn apply_state(&mut self, state: &ArenaState) {
        self.state = state.clone();
    }

    fn state(&self) -> ArenaState {
        self.state.clone()
    }

    fn step(&mut self, _dt: Duration, sequence: &mut DeterministicSequence) {
        self.step_calls += 1;
        for (id, body) in self.bodies.iter_mut() {
            body.vx += self.thrust.get(id).copied().unwrap_or(0);
            let jitter = sequence.range(-1i64, 2i64).unwrap_or(0);
            body.x += body.vx + self.state.wind + jitter;
        }
        self.state.steps += 1;
    }

    fn capture_entries(&self) -> EntryMap<Arena> {
        self.bodies.clone()
    }

    fn apply_entries(&mut self, entries: &EntryMap<Arena>) {
        self.bodies = entries.clone();
    }

    fn rollback_events(
        &mut self,
        events: &EventSet<Arena>,
        _post_event_state: &ArenaState,
        _sequence: &mut DeterministicSequence,
    ) {
        self.rolled_back.extend(events.iter().cloned());
    }
}
