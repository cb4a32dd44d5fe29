use rand::{distributions::uniform::SampleUniform, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::Tick;

/// Errors that can occur when drawing from a DeterministicSequence
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// A value was drawn before the sequence was reset for any tick
    #[error("DeterministicSequence used before initialization - reset(tick) must be called first")]
    UsedBeforeInitialized,

    /// `range(min, max)` was called with `min >= max`
    #[error("Empty range requested from DeterministicSequence at tick {tick}")]
    EmptyRange { tick: Tick },
}

/// Pseudo-random sequence that is a pure function of `(seed_base, tick)`.
///
/// Every tick owns its own ChaCha stream, so the values a tick observes do
/// not depend on how many values earlier ticks consumed, or on whether the
/// tick is being run for the first time or replayed.
#[derive(Clone, Debug)]
pub struct DeterministicSequence {
    seed_base: u64,
    tick: Option<Tick>,
    rng: ChaCha8Rng,
}

impl DeterministicSequence {
    pub fn new(seed_base: u64) -> Self {
        Self {
            seed_base,
            tick: None,
            rng: ChaCha8Rng::seed_from_u64(seed_base),
        }
    }

    pub fn seed_base(&self) -> u64 {
        self.seed_base
    }

    /// The tick the sequence was last reset for, if any
    pub fn tick(&self) -> Option<Tick> {
        self.tick
    }

    /// Replaces the seed base. The sequence must be reset again before use.
    pub fn set_seed_base(&mut self, seed_base: u64) {
        self.seed_base = seed_base;
        self.tick = None;
        self.rng = ChaCha8Rng::seed_from_u64(seed_base);
    }

    /// Reseeds for `tick`. Called at the start of every tick execution.
    pub fn reset(&mut self, tick: Tick) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed_base);
        rng.set_stream(tick as u64);
        self.rng = rng;
        self.tick = Some(tick);
    }

    pub fn next(&mut self) -> Result<u32, SequenceError> {
        self.ensure_initialized()?;
        Ok(self.rng.next_u32())
    }

    /// Draws a value from the half-open range `[min, max)`.
    pub fn range<T>(&mut self, min: T, max: T) -> Result<T, SequenceError>
    where
        T: SampleUniform + PartialOrd,
    {
        let tick = self.ensure_initialized()?;
        let range = min..max;
        if range.is_empty() {
            return Err(SequenceError::EmptyRange { tick });
        }
        Ok(self.rng.gen_range(range))
    }

    fn ensure_initialized(&self) -> Result<Tick, SequenceError> {
        self.tick.ok_or(SequenceError::UsedBeforeInitialized)
    }
}
