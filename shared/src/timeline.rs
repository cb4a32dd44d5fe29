//! # Timeline
//!
//! The time-travel controller. A `Timeline` owns the three tick-indexed
//! ledgers (snapshots, inputs, events), the per-tick sequence source and the
//! simulation backend, and is the only thing that ever drives the backend.
//!
//! Outside of a reconciliation call the timeline is `Live`: the logical tick
//! equals the real tick and `advance` moves both forward by one. A
//! reconciliation call (`synchronize`, `replay_due_to_local_input`,
//! `replay_due_to_events`) may pass through `Rewinding` and `FastForwarding`
//! before it returns, and always returns `Live` again, positioned at the end
//! of the tick it estimated to be "now".
//!
//! Rewinding only touches the backend on ticks whose events need rolling
//! back, plus the tick it comes to rest on. Ticks skipped on the way back are
//! re-derived by the fast-forward that follows.

use std::{cmp::Ordering, sync::Arc};

use log::{debug, info, warn};

use crate::{
    Anomalies, Anomaly, At, Blanks, DeterministicSequence, EventSchedule, InputLedger, InputMap,
    LocalInputSource, Model, SimulationBackend, Snapshot, SnapshotStore, Tick, TimelineConfig,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimelineState {
    Live,
    Rewinding,
    FastForwarding,
}

/// How `run_single_tick` produces the tick's snapshot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TickMode {
    /// Step the backend and capture a fresh snapshot
    Simulate,
    /// Push the stored snapshot into the backend without stepping
    Reapply,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncOutcome {
    /// The update was installed and the timeline now rests at `real_tick`
    Applied { real_tick: Tick },
    /// The update was older than the last authoritative tick and was dropped
    Stale {
        authority_tick: Tick,
        last_authoritative_tick: Tick,
    },
}

pub struct Timeline<M: Model, B: SimulationBackend<M>> {
    config: TimelineConfig,
    backend: B,
    snapshots: SnapshotStore<M>,
    inputs: InputLedger<M>,
    events: EventSchedule<M>,
    sequence: DeterministicSequence,
    real_tick: Tick,
    logical_tick: Tick,
    last_authoritative_tick: Tick,
    state: TimelineState,
    anomalies: Anomalies,
}

impl<M: Model, B: SimulationBackend<M>> Timeline<M, B> {
    /// Create a new Timeline, capturing the backend's current world as the
    /// snapshot for tick 0
    pub fn new(config: TimelineConfig, blanks: Arc<Blanks<M>>, backend: B, seed_base: u64) -> Self {
        let mut snapshots = SnapshotStore::new(blanks.clone());
        snapshots.write(0, Snapshot::new(0, backend.state(), backend.capture_entries()));

        Self {
            config,
            backend,
            snapshots,
            inputs: InputLedger::new(blanks),
            events: EventSchedule::new(),
            sequence: DeterministicSequence::new(seed_base),
            real_tick: 0,
            logical_tick: 0,
            last_authoritative_tick: 0,
            state: TimelineState::Live,
            anomalies: Anomalies::new(),
        }
    }

    /// Discards all history and restarts from an authoritative initial state
    pub fn initialize(&mut self, mut snapshot: Snapshot<M>, seed_base: u64) {
        let tick = snapshot.tick;
        info!("Timeline: initializing at tick {} with seed base {}", tick, seed_base);

        self.snapshots.clear();
        self.inputs.clear();
        self.events = EventSchedule::new();
        self.sequence.set_seed_base(seed_base);

        snapshot.authoritative = true;
        self.backend.apply_entries(&snapshot.entries);
        self.backend.apply_state(&snapshot.state);
        self.snapshots.write(tick, snapshot);

        self.real_tick = tick;
        self.logical_tick = tick;
        self.last_authoritative_tick = tick;
        self.state = TimelineState::Live;
    }

    // Accessors

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn real_tick(&self) -> Tick {
        self.real_tick
    }

    pub fn logical_tick(&self) -> Tick {
        self.logical_tick
    }

    pub fn last_authoritative_tick(&self) -> Tick {
        self.last_authoritative_tick
    }

    pub fn state(&self) -> TimelineState {
        self.state
    }

    pub fn seed_base(&self) -> u64 {
        self.sequence.seed_base()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn snapshots(&self) -> &SnapshotStore<M> {
        &self.snapshots
    }

    pub fn inputs(&self) -> &InputLedger<M> {
        &self.inputs
    }

    pub fn events(&self) -> &EventSchedule<M> {
        &self.events
    }

    /// An owned copy of the snapshot at the real tick
    pub fn current_snapshot(&mut self) -> Snapshot<M> {
        self.snapshots.read(self.real_tick).clone()
    }

    /// The local inputs at `tick` that changed since the tick before
    pub fn minimal_diff(&self, tick: Tick) -> InputMap<M> {
        self.inputs.minimal_diff(tick)
    }

    /// This participant's own inputs at `tick`
    pub fn local_inputs(&self, tick: Tick) -> InputMap<M> {
        self.inputs.local_inputs(tick)
    }

    pub fn drain_anomalies(&mut self) -> Vec<Anomaly> {
        let mut anomalies = self.anomalies.drain();
        anomalies.extend(self.snapshots.drain_anomalies());
        anomalies
    }

    // Events

    /// Schedules `event` on the current schedule, returning the tick it
    /// landed on
    pub fn schedule_event(&mut self, event: M::Event, at: At) -> Tick {
        let (tick, anomaly) = self.events.schedule(event, at, self.logical_tick);
        if let Some(anomaly) = anomaly {
            self.anomalies.push(anomaly);
        }
        tick
    }

    /// Swaps in a whole new schedule. Schedules are never merged.
    pub fn replace_events(&mut self, schedule: EventSchedule<M>) {
        self.events = schedule;
    }

    // Inputs

    /// Records input that is known to match the authority's record, for a
    /// tick the timeline has not reached yet
    pub fn record_authoritative_inputs(&mut self, inputs: &InputMap<M>, at: Tick) {
        self.inputs.set_authoritative_and_predict_forward(inputs, at, at);
    }

    /// Drops all history strictly before `tick`. Never called implicitly.
    pub fn prune_history(&mut self, tick: Tick) {
        debug!("Timeline: pruning history before tick {}", tick);
        self.snapshots.prune_before(tick);
        self.inputs.prune_before(tick);
        self.events.prune_before(tick);
    }

    // Live

    /// Runs the next tick with this participant's own inputs
    pub fn advance<S: LocalInputSource<M>>(&mut self, source: &mut S) -> Tick {
        self.real_tick += 1;
        self.logical_tick = self.real_tick;

        let tick = self.real_tick;
        let local_inputs = source.collect_local_inputs();
        self.inputs.set_local(&local_inputs, tick);

        let snapshot = self.run_single_tick(tick, TickMode::Simulate);
        self.snapshots.write(tick, snapshot);
        tick
    }

    /// Executes one tick against the backend.
    ///
    /// The sequence is reset first, so the tick observes the same values no
    /// matter how often, or from which direction, it is reached.
    pub fn run_single_tick(&mut self, tick: Tick, mode: TickMode) -> Snapshot<M> {
        self.sequence.reset(tick);
        self.backend.apply_events(self.events.events_at(tick), &mut self.sequence);
        let inputs = self.inputs.inputs_for(tick);
        self.backend.apply_inputs(&inputs);

        match mode {
            TickMode::Simulate => {
                self.backend.pre_step();
                self.backend.step(self.config.step_duration, &mut self.sequence);
                self.backend.post_step();
                Snapshot::new(tick, self.backend.state(), self.backend.capture_entries())
            }
            TickMode::Reapply => {
                let snapshot = self.snapshots.read(tick).clone();
                self.backend.apply_entries(&snapshot.entries);
                self.backend.apply_state(&snapshot.state);
                snapshot
            }
        }
    }

    // Time travel

    /// Walks history back until the backend holds the end of `target`,
    /// rolling back events on the way.
    pub fn rewind_to(&mut self, target: Tick) {
        if target >= self.real_tick {
            return;
        }
        debug!("Timeline: rewinding from {} to {}", self.real_tick, target);

        self.state = TimelineState::Rewinding;
        self.logical_tick = self.real_tick;
        while self.logical_tick > target {
            let tick = self.logical_tick;
            if self.events.has_events_at(tick) || tick == target + 1 {
                let previous = self.snapshots.read(tick - 1).clone();
                self.backend.apply_entries(&previous.entries);
                self.backend.apply_state(&previous.state);

                self.sequence.reset(tick);
                let post_event_state = self.snapshots.read(tick).state.clone();
                self.backend.rollback_events(
                    self.events.events_at(tick),
                    &post_event_state,
                    &mut self.sequence,
                );
            }
            self.logical_tick -= 1;
        }

        self.real_tick = target;
        self.state = TimelineState::Live;
    }

    /// Simulates forward until the backend holds the end of `target`,
    /// storing every tick on the way.
    pub fn fast_forward_to(&mut self, target: Tick) {
        if target <= self.logical_tick {
            return;
        }
        debug!("Timeline: fast-forwarding from {} to {}", self.logical_tick, target);

        self.state = TimelineState::FastForwarding;
        while self.logical_tick < target {
            self.logical_tick += 1;
            let tick = self.logical_tick;
            let snapshot = self.run_single_tick(tick, TickMode::Simulate);
            self.snapshots.write(tick, snapshot);
        }

        self.real_tick = target;
        self.state = TimelineState::Live;
    }

    /// Leaves the timeline at the end of `target` running under `schedule`.
    ///
    /// The schedule is swapped after a rewind, so rollback hooks see the
    /// events that actually ran, and before a fast-forward, so resimulation
    /// sees the fresh ones.
    pub fn travel_to_end_of(&mut self, target: Tick, schedule: EventSchedule<M>) {
        self.travel(target, Some(schedule));
    }

    fn travel(&mut self, target: Tick, schedule: Option<EventSchedule<M>>) {
        match target.cmp(&self.real_tick) {
            Ordering::Equal => {
                if let Some(schedule) = schedule {
                    self.replace_events(schedule);
                }
            }
            Ordering::Less => {
                self.rewind_to(target);
                if let Some(schedule) = schedule {
                    self.replace_events(schedule);
                }
            }
            Ordering::Greater => {
                if let Some(schedule) = schedule {
                    self.replace_events(schedule);
                }
                self.fast_forward_to(target);
            }
        }
    }

    // Reconciliation

    /// Installs an authoritative snapshot and re-derives everything after it,
    /// coming to rest at `authority_tick + lag`.
    pub fn synchronize(
        &mut self,
        mut snapshot: Snapshot<M>,
        schedule: EventSchedule<M>,
        authority_tick: Tick,
        lag: Tick,
    ) -> SyncOutcome {
        if authority_tick < self.last_authoritative_tick {
            debug!(
                "Timeline: dropping stale update for tick {} (last authoritative tick is {})",
                authority_tick, self.last_authoritative_tick
            );
            return SyncOutcome::Stale {
                authority_tick,
                last_authoritative_tick: self.last_authoritative_tick,
            };
        }

        if snapshot.tick != authority_tick {
            warn!(
                "Timeline: snapshot stamped with tick {} arrived for authority tick {}, restamping",
                snapshot.tick, authority_tick
            );
            snapshot.tick = authority_tick;
        }

        self.travel(authority_tick - 1, Some(schedule.clone()));

        snapshot.authoritative = true;
        self.snapshots.write(authority_tick, snapshot);
        self.logical_tick = authority_tick;
        self.run_single_tick(authority_tick, TickMode::Reapply);
        self.real_tick = authority_tick;

        self.travel(authority_tick + lag.max(0), Some(schedule));
        self.last_authoritative_tick = authority_tick;

        SyncOutcome::Applied {
            real_tick: self.real_tick,
        }
    }

    /// Re-derives history after input for `client_tick` became known
    pub fn replay_due_to_local_input(
        &mut self,
        inputs: &InputMap<M>,
        client_tick: Tick,
        authority_tick: Tick,
        lag: Tick,
    ) {
        let target = authority_tick + lag.max(0);
        debug!(
            "Timeline: replaying from tick {} to {} for late input",
            client_tick, target
        );

        self.travel(client_tick - 1, None);
        self.inputs
            .set_authoritative_and_predict_forward(inputs, client_tick, target);
        self.travel(target, None);
    }

    /// Re-derives history from `authority_tick` under a fresh schedule
    pub fn replay_due_to_events(
        &mut self,
        authority_tick: Tick,
        schedule: EventSchedule<M>,
        lag: Tick,
    ) {
        debug!("Timeline: replaying from tick {} for new events", authority_tick);

        self.travel(authority_tick - 1, Some(schedule.clone()));
        self.travel(authority_tick + lag.max(0), Some(schedule));
    }
}
