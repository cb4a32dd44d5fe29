use std::fmt;

use crate::Model;

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Factories for the blank values a session synthesizes when history has a
/// gap: a blank opaque state, a blank (idle) input, and a blank event.
///
/// Built once per session and shared by reference-counted handle between the
/// ledgers that need it.
pub struct Blanks<M: Model> {
    state: Factory<M::State>,
    input: Factory<M::Input>,
    event: Factory<M::Event>,
}

impl<M: Model> Blanks<M> {
    pub fn new<S, I, E>(state: S, input: I, event: E) -> Self
    where
        S: Fn() -> M::State + Send + Sync + 'static,
        I: Fn() -> M::Input + Send + Sync + 'static,
        E: Fn() -> M::Event + Send + Sync + 'static,
    {
        Self {
            state: Box::new(state),
            input: Box::new(input),
            event: Box::new(event),
        }
    }

    pub fn state(&self) -> M::State {
        (self.state)()
    }

    pub fn input(&self) -> M::Input {
        (self.input)()
    }

    pub fn event(&self) -> M::Event {
        (self.event)()
    }
}

impl<M: Model> fmt::Debug for Blanks<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blanks")
            .field("state", &self.state())
            .field("input", &self.input())
            .field("event", &self.event())
            .finish()
    }
}
