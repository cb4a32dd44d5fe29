use std::collections::VecDeque;

use retrace_shared::{InputMap, LocalInputSource};

use crate::{Arena, Thrust};

/// Plays back a queue of inputs for one player, one per tick, then holds the
/// last one
pub struct ScriptedInput {
    player: u32,
    script: VecDeque<Thrust>,
    held: Thrust,
}

impl ScriptedInput {
    pub fn new(player: u32, script: impl IntoIterator<Item = i64>) -> Self {
        Self {
            player,
            script: script.into_iter().map(Thrust::new).collect(),
            held: Thrust::default(),
        }
    }

    pub fn idle(player: u32) -> Self {
        Self::new(player, [])
    }

    pub fn player(&self) -> u32 {
        self.player
    }

    pub fn queue(&mut self, script: impl IntoIterator<Item = i64>) {
        self.script.extend(script.into_iter().map(Thrust::new));
    }

    pub fn is_exhausted(&self) -> bool {
        self.script.is_empty()
    }
}

impl LocalInputSource<Arena> for ScriptedInput {
    fn collect_local_inputs(&mut self) -> InputMap<Arena> {
        if let Some(next) = self.script.pop_front() {
            self.held = next;
        }
        let mut inputs = InputMap::<Arena>::new();
        inputs.insert(self.player, self.held.clone());
        inputs
    }
}
