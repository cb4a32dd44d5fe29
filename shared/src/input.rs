use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use crate::{Blanks, InputMap, Model, Tick, TickBuffer};

/// One player's input at one tick
#[derive(Clone, Debug, PartialEq)]
pub struct InputRecord<M: Model> {
    pub value: M::Input,
    /// Produced by this participant's own input source
    pub local: bool,
    /// Known to match the authority's record, so forward prediction must not
    /// overwrite it
    pub authoritative: bool,
}

impl<M: Model> InputRecord<M> {
    pub fn local(value: M::Input) -> Self {
        Self {
            value,
            local: true,
            authoritative: true,
        }
    }

    pub fn authoritative(value: M::Input) -> Self {
        Self {
            value,
            local: false,
            authoritative: true,
        }
    }

    pub fn predicted(value: M::Input) -> Self {
        Self {
            value,
            local: false,
            authoritative: false,
        }
    }
}

type TickInputs<M> = BTreeMap<<M as Model>::Player, InputRecord<M>>;

/// Per-player, per-tick input history.
///
/// Missing input is predicted by holding the previous tick's value, and the
/// prediction is cached so later ticks chain off it.
pub struct InputLedger<M: Model> {
    ticks: TickBuffer<TickInputs<M>>,
    players: BTreeSet<M::Player>,
    blanks: Arc<Blanks<M>>,
}

impl<M: Model> InputLedger<M> {
    pub fn new(blanks: Arc<Blanks<M>>) -> Self {
        Self {
            ticks: TickBuffer::new(),
            players: BTreeSet::new(),
            blanks,
        }
    }

    /// Every player that has ever had input recorded
    pub fn players(&self) -> impl Iterator<Item = &M::Player> {
        self.players.iter()
    }

    pub fn record(&self, player: &M::Player, tick: Tick) -> Option<&InputRecord<M>> {
        self.ticks.get(tick)?.get(player)
    }

    /// Input for every known player at `tick`, predicting where nothing was
    /// recorded.
    pub fn inputs_for(&mut self, tick: Tick) -> InputMap<M> {
        let players: Vec<M::Player> = self.players.iter().copied().collect();
        let mut inputs = InputMap::<M>::new();
        for player in players {
            let recorded = self.record(&player, tick).map(|record| record.value.clone());
            let value = match recorded {
                Some(value) => value,
                None => self.predict(&player, tick),
            };
            inputs.insert(player, value);
        }
        inputs
    }

    /// Holds the last known input: the value at `tick - 1` if any, else a
    /// blank input. The prediction is cached at `tick`.
    pub fn predict(&mut self, player: &M::Player, tick: Tick) -> M::Input {
        let value = match self.record(player, tick - 1) {
            Some(previous) => previous.value.clone(),
            None => self.blanks.input(),
        };
        self.store(*player, tick, InputRecord::predicted(value.clone()));
        value
    }

    /// Records this participant's own inputs at `tick`
    pub fn set_local(&mut self, inputs: &InputMap<M>, tick: Tick) {
        for (player, value) in inputs {
            self.store(*player, tick, InputRecord::local(value.clone()));
        }
    }

    /// Installs authoritative input at `at` and re-predicts every later tick
    /// up to `until` that is not itself authoritative.
    ///
    /// Predictions cached past `until` are re-derived as well. They are left
    /// behind whenever reconciliation moves the real tick backward, and are
    /// read again once the timeline reaches them.
    ///
    /// Players whose input at `at` is already locally authoritative are left
    /// untouched.
    pub fn set_authoritative_and_predict_forward(
        &mut self,
        inputs: &InputMap<M>,
        at: Tick,
        until: Tick,
    ) {
        let last = self.ticks.last_tick().map_or(until, |last| last.max(until));

        for (player, value) in inputs {
            if self
                .record(player, at)
                .is_some_and(|record| record.local && record.authoritative)
            {
                continue;
            }

            self.store(*player, at, InputRecord::authoritative(value.clone()));

            let mut held = value.clone();
            for tick in (at + 1)..=last {
                // fetch, decide, store back
                match self.record(player, tick).cloned() {
                    Some(record) if record.authoritative => {
                        held = record.value;
                    }
                    Some(_) => {
                        self.store(*player, tick, InputRecord::predicted(held.clone()));
                    }
                    None if tick <= until => {
                        self.store(*player, tick, InputRecord::predicted(held.clone()));
                    }
                    // predicted from tick - 1 when reached
                    None => {}
                }
            }
        }
    }

    /// The inputs worth sending for `tick`: local entries whose value changed
    /// since `tick - 1`.
    pub fn minimal_diff(&self, tick: Tick) -> InputMap<M> {
        let mut candidates: BTreeSet<M::Player> = BTreeSet::new();
        for at in [tick - 1, tick] {
            if let Some(records) = self.ticks.get(at) {
                candidates.extend(records.keys().copied());
            }
        }

        let mut diff = InputMap::<M>::new();
        for player in candidates {
            let Some(current) = self.record(&player, tick) else {
                continue;
            };
            if !current.local {
                continue;
            }
            let unchanged = self
                .record(&player, tick - 1)
                .is_some_and(|previous| previous.value == current.value);
            if !unchanged {
                diff.insert(player, current.value.clone());
            }
        }
        diff
    }

    /// Every local input recorded at `tick`
    pub fn local_inputs(&self, tick: Tick) -> InputMap<M> {
        let Some(records) = self.ticks.get(tick) else {
            return InputMap::<M>::new();
        };
        records
            .iter()
            .filter(|(_, record)| record.local)
            .map(|(player, record)| (*player, record.value.clone()))
            .collect()
    }

    pub fn prune_before(&mut self, tick: Tick) {
        self.ticks.prune_before(tick);
    }

    pub fn clear(&mut self) {
        self.ticks.clear();
        self.players.clear();
    }

    fn store(&mut self, player: M::Player, tick: Tick, record: InputRecord<M>) {
        self.players.insert(player);
        self.ticks
            .get_or_insert_with(tick, BTreeMap::new)
            .insert(player, record);
    }
}
