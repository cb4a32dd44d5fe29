use std::time::Duration;

use crate::{DeterministicSequence, EntryMap, EventSet, InputMap, Model};

/// The step executor a Timeline drives.
///
/// The Timeline is the only caller. Every hook is synchronous, and the
/// sequence passed in has already been reset for the tick being executed, so
/// anything random the backend does must draw from it to stay replayable.
pub trait SimulationBackend<M: Model> {
    /// Applies the events scheduled for the tick about to run
    fn apply_events(&mut self, events: &EventSet<M>, sequence: &mut DeterministicSequence);

    /// Applies every player's input for the tick about to run
    fn apply_inputs(&mut self, inputs: &InputMap<M>);

    /// Overwrites the opaque state
    fn apply_state(&mut self, state: &M::State);

    /// Captures the opaque state
    fn state(&self) -> M::State;

    fn pre_step(&mut self) {}

    /// Advances the simulation by one fixed step
    fn step(&mut self, dt: Duration, sequence: &mut DeterministicSequence);

    fn post_step(&mut self) {}

    /// Captures the subordinate state
    fn capture_entries(&self) -> EntryMap<M>;

    /// Overwrites the subordinate state
    fn apply_entries(&mut self, entries: &EntryMap<M>);

    /// Undoes the side effects of `events` while rewinding.
    ///
    /// `post_event_state` is the opaque state as it was after the events
    /// originally ran, and `sequence` is reset to the tick they ran on, so
    /// the hook sees exactly what the events saw.
    fn rollback_events(
        &mut self,
        events: &EventSet<M>,
        post_event_state: &M::State,
        sequence: &mut DeterministicSequence,
    );
}

/// Produces this participant's own input once per tick
pub trait LocalInputSource<M: Model> {
    fn collect_local_inputs(&mut self) -> InputMap<M>;
}

/// A source for participants with no local players, such as a dedicated
/// authority
#[derive(Clone, Copy, Debug, Default)]
pub struct NoLocalInput;

impl<M: Model> LocalInputSource<M> for NoLocalInput {
    fn collect_local_inputs(&mut self) -> InputMap<M> {
        InputMap::<M>::new()
    }
}
