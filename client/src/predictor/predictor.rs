use std::{collections::BTreeMap, mem, sync::Arc};

use log::{debug, info, warn};

use retrace_shared::{
    Anomaly, Blanks, ConfigError, Delta, EventSchedule, InputMap, LocalInputSource, Message,
    Model, SimulationBackend, Snapshot, SyncError, SyncOutcome, Tick, Timeline,
};

use crate::PredictorConfig;

/// A participant that simulates ahead of the Authority on predicted input
/// and reconciles whenever authoritative data arrives.
///
/// Nothing runs until an InitialState has been received.
pub struct Predictor<M: Model, B: SimulationBackend<M>, S: LocalInputSource<M>> {
    config: PredictorConfig,
    timeline: Timeline<M, B>,
    input_source: S,
    initialized: bool,
    /// The last snapshot received from the Authority, deltas are applied
    /// on top of it
    base: Option<Snapshot<M>>,
    resync_requested: bool,
    /// Highest tick whose local input has been sent
    last_sent_tick: Tick,
    /// Newest tick each remote player's input has been received for
    remote_input_ticks: BTreeMap<M::Player, Tick>,
    outgoing: Vec<Message<M>>,
}

impl<M: Model, B: SimulationBackend<M>, S: LocalInputSource<M>> Predictor<M, B, S> {
    pub fn new(
        config: PredictorConfig,
        blanks: Arc<Blanks<M>>,
        backend: B,
        input_source: S,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let timeline = Timeline::new(config.timeline.clone(), blanks, backend, 0);

        Ok(Self {
            config,
            timeline,
            input_source,
            initialized: false,
            base: None,
            resync_requested: false,
            last_sent_tick: 0,
            remote_input_ticks: BTreeMap::new(),
            outgoing: Vec::new(),
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // Incoming

    /// Handles one Message from the Authority. Failed state updates are
    /// answered with a FullStateRequest.
    pub fn receive(&mut self, message: Message<M>) {
        if !self.initialized && !matches!(message, Message::InitialState { .. }) {
            warn!(
                "Predictor: ignoring {} received before InitialState",
                message.name()
            );
            return;
        }

        match message {
            Message::InitialState {
                snapshot,
                seed_base,
            } => {
                self.initialize(snapshot, seed_base);
            }
            Message::FullStateUpdate {
                snapshot,
                schedule,
                authority_tick,
            } => {
                if let Err(error) = self.apply_full(snapshot, schedule, authority_tick) {
                    warn!("Predictor: {}", error);
                }
            }
            Message::DeltaStateUpdate {
                delta,
                schedule,
                authority_tick,
            } => {
                if authority_tick <= self.timeline.last_authoritative_tick() {
                    debug!(
                        "Predictor: dropping stale delta for tick {} (last authoritative tick is {})",
                        authority_tick,
                        self.timeline.last_authoritative_tick()
                    );
                    return;
                }
                if let Err(error) = self.apply_delta(&delta, schedule, authority_tick) {
                    warn!("Predictor: {}", error);
                    self.request_full_state();
                }
            }
            Message::EventNotice { tick, schedule } => {
                self.receive_events(tick, schedule);
            }
            Message::InputUpdate {
                player,
                input,
                client_tick,
            } => {
                self.receive_input(player, input, client_tick);
            }
            Message::FullStateRequest => {
                warn!("Predictor: unexpected FullStateRequest");
            }
        }
    }

    /// Discards all history and starts over from the Authority's state
    pub fn initialize(&mut self, snapshot: Snapshot<M>, seed_base: u64) {
        if self.initialized {
            info!("Predictor: re-initializing at tick {}", snapshot.tick);
        }
        let mut base = snapshot.clone();
        base.authoritative = true;

        self.timeline.initialize(snapshot, seed_base);
        self.base = Some(base);
        self.initialized = true;
        self.resync_requested = false;
        self.last_sent_tick = self.timeline.real_tick();
        self.remote_input_ticks.clear();
    }

    /// Installs a full authoritative snapshot
    pub fn apply_full(
        &mut self,
        snapshot: Snapshot<M>,
        schedule: EventSchedule<M>,
        authority_tick: Tick,
    ) -> Result<SyncOutcome, SyncError> {
        if !self.initialized {
            return Err(SyncError::NotInitialized { authority_tick });
        }

        let base = snapshot.clone();
        let outcome =
            self.timeline
                .synchronize(snapshot, schedule, authority_tick, self.config.lag_estimate);
        if let SyncOutcome::Applied { .. } = outcome {
            self.remember_base(base, authority_tick);
            self.resync_requested = false;
        }
        Ok(outcome)
    }

    /// Rebuilds the authoritative snapshot from `delta` and installs it.
    ///
    /// `authority_tick` must directly follow the last authoritative tick, and
    /// `delta` must have been built against the base held here. Nothing is
    /// applied when either check fails.
    pub fn apply_delta(
        &mut self,
        delta: &Delta<M>,
        schedule: EventSchedule<M>,
        authority_tick: Tick,
    ) -> Result<SyncOutcome, SyncError> {
        let base = match (&self.base, self.initialized) {
            (Some(base), true) => base,
            _ => return Err(SyncError::NotInitialized { authority_tick }),
        };

        let expected = self.timeline.last_authoritative_tick() + self.config.cadence.delta_interval;
        if authority_tick != expected {
            return Err(SyncError::OutOfOrder {
                expected,
                received: authority_tick,
            });
        }

        let target = delta.apply(base)?;
        let outcome = self.timeline.synchronize(
            target.clone(),
            schedule,
            authority_tick,
            self.config.lag_estimate,
        );
        if let SyncOutcome::Applied { .. } = outcome {
            self.remember_base(target, authority_tick);
        }
        Ok(outcome)
    }

    fn remember_base(&mut self, mut snapshot: Snapshot<M>, authority_tick: Tick) {
        snapshot.tick = authority_tick;
        snapshot.authoritative = true;
        self.base = Some(snapshot);
    }

    fn receive_events(&mut self, tick: Tick, schedule: EventSchedule<M>) {
        // history up to the last authoritative tick is corrected by the next
        // state update, not by replaying
        let from = tick.max(self.timeline.last_authoritative_tick() + 1);
        let now = self.timeline.real_tick();

        if from > now {
            self.timeline.replace_events(schedule);
        } else {
            self.timeline.replay_due_to_events(from, schedule, now - from);
        }
    }

    /// Folds a relayed input into the prediction. Ticks up to the last
    /// authoritative tick are never resimulated, so an input that old is
    /// applied from the first tick after it instead.
    fn receive_input(&mut self, player: M::Player, input: M::Input, client_tick: Tick) {
        let now = self.timeline.real_tick();
        if !self.timeline.config().accepts_input_at(client_tick, now) {
            warn!(
                "Predictor: dropping input for tick {}, too far past tick {}",
                client_tick, now
            );
            return;
        }
        let at = client_tick.max(self.timeline.last_authoritative_tick() + 1);

        let newest = self.remote_input_ticks.entry(player).or_insert(client_tick);
        if *newest > client_tick && at >= *newest {
            debug!(
                "Predictor: dropping input for tick {}, superseded by input for tick {}",
                client_tick, newest
            );
            return;
        }
        *newest = client_tick.max(*newest);

        let mut inputs = InputMap::<M>::new();
        inputs.insert(player, input);

        if at > now {
            self.timeline.record_authoritative_inputs(&inputs, at);
        } else {
            self.timeline.replay_due_to_local_input(&inputs, at, now, 0);
        }
    }

    // Outgoing

    /// Queues a FullStateRequest, unless one is already waiting for an answer
    pub fn request_full_state(&mut self) {
        if self.resync_requested {
            return;
        }
        info!(
            "Predictor: requesting full state at tick {}",
            self.timeline.real_tick()
        );
        self.resync_requested = true;
        self.outgoing.push(Message::FullStateRequest);
    }

    /// Takes every Message queued since the last call
    pub fn take_outgoing(&mut self) -> Vec<Message<M>> {
        mem::take(&mut self.outgoing)
    }

    // Ticking

    /// Runs the next tick and queues whatever local input changed. A tick
    /// that is being run again after a rewind re-sends all of its local input.
    /// Returns None until initialized.
    pub fn tick(&mut self) -> Option<Tick> {
        if !self.initialized {
            return None;
        }

        let tick = self.timeline.advance(&mut self.input_source);
        let inputs = if tick <= self.last_sent_tick {
            self.timeline.local_inputs(tick)
        } else {
            self.timeline.minimal_diff(tick)
        };
        self.last_sent_tick = self.last_sent_tick.max(tick);
        for (player, input) in inputs {
            self.outgoing.push(Message::InputUpdate {
                player,
                input,
                client_tick: tick,
            });
        }

        let silent_for = tick - self.timeline.last_authoritative_tick();
        if silent_for > self.config.cadence.staleness_threshold {
            self.request_full_state();
        }

        Some(tick)
    }

    // Accessors

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn input_source_mut(&mut self) -> &mut S {
        &mut self.input_source
    }

    pub fn timeline(&self) -> &Timeline<M, B> {
        &self.timeline
    }

    /// Direct access to the Timeline, for maintenance such as pruning
    pub fn timeline_mut(&mut self) -> &mut Timeline<M, B> {
        &mut self.timeline
    }

    pub fn real_tick(&self) -> Tick {
        self.timeline.real_tick()
    }

    pub fn last_authoritative_tick(&self) -> Tick {
        self.timeline.last_authoritative_tick()
    }

    pub fn base(&self) -> Option<&Snapshot<M>> {
        self.base.as_ref()
    }

    pub fn resync_requested(&self) -> bool {
        self.resync_requested
    }

    pub fn drain_anomalies(&mut self) -> Vec<Anomaly> {
        self.timeline.drain_anomalies()
    }
}
