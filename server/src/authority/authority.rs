use std::{collections::BTreeSet, mem, sync::Arc};

use log::{debug, info, warn};

use retrace_shared::{
    Anomalies, Anomaly, At, Blanks, ConfigError, Delta, EventSchedule, InputMap,
    LocalInputSource, Message, Model, SimulationBackend, Snapshot, Tick, Timeline,
};

use crate::{AuthorityConfig, Outgoing, PeerKey, Recipient};

/// The single participant whose timeline is canonical.
///
/// Every incoming message is folded into the timeline immediately, and every
/// outgoing message is queued until `take_outgoing` is called.
pub struct Authority<M: Model, B: SimulationBackend<M>, S: LocalInputSource<M>> {
    config: AuthorityConfig,
    timeline: Timeline<M, B>,
    input_source: S,
    peers: BTreeSet<PeerKey>,
    awaiting_full: BTreeSet<PeerKey>,
    last_published: Option<Snapshot<M>>,
    outgoing: Vec<Outgoing<M>>,
    anomalies: Anomalies,
}

impl<M: Model, B: SimulationBackend<M>, S: LocalInputSource<M>> Authority<M, B, S> {
    /// Create a new Authority around `backend`, whose current world becomes
    /// the state at tick 0
    pub fn new(
        config: AuthorityConfig,
        blanks: Arc<Blanks<M>>,
        backend: B,
        input_source: S,
        seed_base: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let timeline = Timeline::new(config.timeline.clone(), blanks, backend, seed_base);

        Ok(Self {
            config,
            timeline,
            input_source,
            peers: BTreeSet::new(),
            awaiting_full: BTreeSet::new(),
            last_published: None,
            outgoing: Vec::new(),
            anomalies: Anomalies::new(),
        })
    }

    // Peers

    /// Registers a Predictor and queues its InitialState. It receives a full
    /// update at the next cadence boundary, and deltas after that.
    pub fn connect_peer(&mut self, peer: PeerKey) {
        if !self.peers.insert(peer) {
            warn!("Authority: peer {:?} is already connected", peer);
            return;
        }
        info!(
            "Authority: peer {:?} connected at tick {}",
            peer,
            self.timeline.real_tick()
        );

        let message = self.initial_state();
        self.send(Recipient::Peer(peer), message);
        self.awaiting_full.insert(peer);
    }

    pub fn disconnect_peer(&mut self, peer: &PeerKey) {
        if self.peers.remove(peer) {
            info!("Authority: peer {:?} disconnected", peer);
        }
        self.awaiting_full.remove(peer);
    }

    pub fn peers(&self) -> impl Iterator<Item = &PeerKey> {
        self.peers.iter()
    }

    pub fn peer_exists(&self, peer: &PeerKey) -> bool {
        self.peers.contains(peer)
    }

    // Messages

    /// The state a new Predictor starts from
    pub fn initial_state(&mut self) -> Message<M> {
        let mut snapshot = self.timeline.current_snapshot();
        snapshot.authoritative = true;
        Message::InitialState {
            snapshot,
            seed_base: self.timeline.seed_base(),
        }
    }

    /// Handles one Message from `peer`
    pub fn receive(&mut self, peer: PeerKey, message: Message<M>) {
        if !self.peers.contains(&peer) {
            warn!(
                "Authority: dropping {} from unknown peer {:?}",
                message.name(),
                peer
            );
            return;
        }

        match message {
            Message::InputUpdate {
                player,
                input,
                client_tick,
            } => {
                if self.receive_input(player, input.clone(), client_tick) {
                    self.send(
                        Recipient::AllExcept(peer),
                        Message::InputUpdate {
                            player,
                            input,
                            client_tick,
                        },
                    );
                }
            }
            Message::FullStateRequest => {
                info!(
                    "Authority: peer {:?} requested a full state update",
                    peer
                );
                self.awaiting_full.insert(peer);
            }
            other => {
                warn!(
                    "Authority: unexpected {} from peer {:?}",
                    other.name(),
                    peer
                );
            }
        }
    }

    /// Folds one player's input into history. Returns false if it was too
    /// old to apply.
    fn receive_input(&mut self, player: M::Player, input: M::Input, client_tick: Tick) -> bool {
        let now = self.timeline.real_tick();
        if !self.timeline.config().accepts_input_at(client_tick, now) {
            warn!(
                "Authority: dropping input for tick {}, too far past tick {}",
                client_tick, now
            );
            return false;
        }

        let mut inputs = InputMap::<M>::new();
        inputs.insert(player, input);

        if client_tick > now {
            debug!(
                "Authority: recording input for future tick {} (now {})",
                client_tick, now
            );
            self.timeline.record_authoritative_inputs(&inputs, client_tick);
            return true;
        }

        let earliest = self.timeline.snapshots().earliest_tick().unwrap_or(now);
        if client_tick <= earliest {
            warn!(
                "Authority: dropping input for tick {}, history starts at tick {}",
                client_tick, earliest
            );
            return false;
        }

        self.timeline
            .replay_due_to_local_input(&inputs, client_tick, now, 0);
        true
    }

    /// Takes every Message queued since the last call
    pub fn take_outgoing(&mut self) -> Vec<Outgoing<M>> {
        mem::take(&mut self.outgoing)
    }

    fn send(&mut self, recipient: Recipient, message: Message<M>) {
        self.outgoing.push(Outgoing { recipient, message });
    }

    // Events

    /// Schedules `event` and tells every Predictor. An event landing at or
    /// before the current tick is folded back into history right away.
    pub fn schedule_event(&mut self, event: M::Event, at: At) -> Tick {
        let mut schedule = self.timeline.events().clone();
        let (tick, anomaly) = schedule.schedule(event, at, self.timeline.logical_tick());
        if let Some(anomaly) = anomaly {
            self.anomalies.push(anomaly);
        }

        self.install_schedule(tick, schedule);
        tick
    }

    /// Removes the events at `tick` matching `predicate` and tells every
    /// Predictor. Returns how many were removed.
    pub fn cancel_events_where<F: FnMut(&M::Event) -> bool>(
        &mut self,
        tick: Tick,
        predicate: F,
    ) -> usize {
        let mut schedule = self.timeline.events().clone();
        let removed = schedule.remove_where(tick, predicate);
        if removed == 0 {
            return 0;
        }
        schedule.compact();

        self.install_schedule(tick, schedule);
        removed
    }

    /// Swaps in `schedule`, replaying history from `tick` if it is not in
    /// the future, and broadcasts it
    fn install_schedule(&mut self, tick: Tick, schedule: EventSchedule<M>) {
        let now = self.timeline.real_tick();
        if tick <= now {
            self.timeline
                .replay_due_to_events(tick, schedule.clone(), now - tick);
        } else {
            self.timeline.replace_events(schedule.clone());
        }

        self.send(Recipient::All, Message::EventNotice { tick, schedule });
    }

    // Ticking

    /// Runs the next tick, publishing state when it lands on a cadence
    /// boundary
    pub fn tick(&mut self) -> Tick {
        let tick = self.timeline.advance(&mut self.input_source);
        if self.config.cadence.is_update_tick(tick) {
            self.publish(tick);
        }
        tick
    }

    fn publish(&mut self, tick: Tick) {
        let mut snapshot = self.timeline.current_snapshot();
        snapshot.authoritative = true;
        let schedule = self.timeline.events().clone();

        let delta = match &self.last_published {
            Some(base) if !self.config.cadence.is_full_tick(tick) => {
                match Delta::diff(base, &snapshot) {
                    Ok(delta) => Some(delta),
                    Err(error) => {
                        warn!("Authority: {}, publishing full state instead", error);
                        None
                    }
                }
            }
            _ => None,
        };

        match delta {
            Some(delta) => {
                let awaiting_full = mem::take(&mut self.awaiting_full);
                for peer in &awaiting_full {
                    self.send(
                        Recipient::Peer(*peer),
                        Message::FullStateUpdate {
                            snapshot: snapshot.clone(),
                            schedule: schedule.clone(),
                            authority_tick: tick,
                        },
                    );
                }
                let message = Message::DeltaStateUpdate {
                    delta,
                    schedule,
                    authority_tick: tick,
                };
                if awaiting_full.is_empty() {
                    self.send(Recipient::All, message);
                } else {
                    let peers: Vec<PeerKey> = self
                        .peers
                        .iter()
                        .filter(|peer| !awaiting_full.contains(*peer))
                        .copied()
                        .collect();
                    for peer in peers {
                        self.send(Recipient::Peer(peer), message.clone());
                    }
                }
            }
            None => {
                self.awaiting_full.clear();
                self.send(
                    Recipient::All,
                    Message::FullStateUpdate {
                        snapshot: snapshot.clone(),
                        schedule,
                        authority_tick: tick,
                    },
                );
            }
        }

        self.last_published = Some(snapshot);
    }

    // Accessors

    pub fn config(&self) -> &AuthorityConfig {
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

    pub fn events(&self) -> &EventSchedule<M> {
        self.timeline.events()
    }

    pub fn drain_anomalies(&mut self) -> Vec<Anomaly> {
        let mut anomalies = self.anomalies.drain();
        anomalies.extend(self.timeline.drain_anomalies());
        anomalies
    }
}
