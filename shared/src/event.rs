use serde::{Deserialize, Serialize};

use crate::{Anomaly, EventSet, Model, Tick, TickBuffer};

/// Where to place a newly scheduled event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum At {
    /// The tick after the current logical tick
    Next,
    Tick(Tick),
}

impl At {
    pub fn resolve(self, logical_tick: Tick) -> Tick {
        match self {
            At::Next => logical_tick + 1,
            At::Tick(tick) => tick,
        }
    }
}

impl From<Tick> for At {
    fn from(tick: Tick) -> Self {
        At::Tick(tick)
    }
}

/// Per-tick sets of scheduled events.
///
/// A tick with no entry and a tick with an empty set mean the same thing;
/// `compact` drops the empty ones. The whole schedule is a plain value, so a
/// fresher one received from the authority simply replaces it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct EventSchedule<M: Model> {
    ticks: TickBuffer<EventSet<M>>,
    #[serde(skip)]
    empty: EventSet<M>,
}

impl<M: Model> Default for EventSchedule<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> EventSchedule<M> {
    pub fn new() -> Self {
        Self {
            ticks: TickBuffer::new(),
            empty: EventSet::<M>::new(),
        }
    }

    pub fn events_at(&self, tick: Tick) -> &EventSet<M> {
        self.ticks.get(tick).unwrap_or(&self.empty)
    }

    pub fn has_events_at(&self, tick: Tick) -> bool {
        !self.events_at(tick).is_empty()
    }

    /// Adds `event` at the resolved tick. Returns the tick it landed on and,
    /// when that tick is not in the future of `logical_tick`, the anomaly to
    /// report.
    pub fn schedule(
        &mut self,
        event: M::Event,
        at: At,
        logical_tick: Tick,
    ) -> (Tick, Option<Anomaly>) {
        let tick = at.resolve(logical_tick);
        let anomaly = (tick <= logical_tick).then_some(Anomaly::PastEventScheduled {
            tick,
            logical_tick,
        });

        self.ticks
            .get_or_insert_with(tick, EventSet::<M>::new)
            .insert(event);

        (tick, anomaly)
    }

    /// Removes the events at `tick` for which `predicate` returns true,
    /// returning how many were removed.
    pub fn remove_where<F: FnMut(&M::Event) -> bool>(
        &mut self,
        tick: Tick,
        mut predicate: F,
    ) -> usize {
        let Some(events) = self.ticks.get_mut(tick) else {
            return 0;
        };
        let before = events.len();
        events.retain(|event| !predicate(event));
        before - events.len()
    }

    /// Drops every tick whose set is empty. Idempotent.
    pub fn compact(&mut self) {
        self.ticks.retain(|_, events| !events.is_empty());
    }

    /// Ticks holding an entry, empty or not
    pub fn ticks(&self) -> impl Iterator<Item = Tick> + '_ {
        self.ticks.iter().map(|(tick, _)| tick)
    }

    /// Number of ticks holding an entry, empty or not
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    /// True when no tick holds an event
    pub fn is_empty(&self) -> bool {
        self.ticks.iter().all(|(_, events)| events.is_empty())
    }

    /// Installs an explicit (possibly empty) set at `tick`
    pub fn set_events_at(&mut self, tick: Tick, events: EventSet<M>) {
        self.ticks.insert(tick, events);
    }

    pub fn prune_before(&mut self, tick: Tick) {
        self.ticks.prune_before(tick);
    }
}
