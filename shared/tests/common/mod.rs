#![allow(dead_code)]

use std::sync::Arc;

use retrace_shared::{Blanks, EntryMap, Model, Snapshot, Tick};

/// Bare value types, enough to exercise the ledgers without a backend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tally;

impl Model for Tally {
    type Player = u8;
    type Input = i32;
    type Event = u8;
    type State = u32;
    type EntryKey = u16;
    type Entry = i64;
}

/// The blank input is deliberately not `i32::default()`
pub const BLANK_INPUT: i32 = -100;
pub const BLANK_EVENT: u8 = 0;

pub fn tally_blanks() -> Arc<Blanks<Tally>> {
    Arc::new(Blanks::new(|| 0u32, || BLANK_INPUT, || BLANK_EVENT))
}

pub fn snapshot(tick: Tick, state: u32, entries: &[(u16, i64)]) -> Snapshot<Tally> {
    let entries: EntryMap<Tally> = entries.iter().copied().collect();
    Snapshot::new(tick, state, entries)
}
