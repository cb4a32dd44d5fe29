/// Integration tests for the Timeline's time travel
/// These drive a real backend through rewinds, fast-forwards and
/// synchronization, and compare the snapshots it leaves behind.
use proptest::prelude::*;

use retrace_shared::{
    Anomaly, At, EventSchedule, InputMap, NoLocalInput, SimulationBackend, Snapshot,
    SyncOutcome, Timeline, TimelineConfig, TimelineState,
};
use retrace_test::{
    arena_blanks, assert_same_world, Arena, ArenaBackend, ArenaEvent, ScriptedInput, Thrust,
};

fn arena_timeline(players: &[u32]) -> Timeline<Arena, ArenaBackend> {
    Timeline::new(
        TimelineConfig::default(),
        arena_blanks(),
        ArenaBackend::with_players(players),
        42,
    )
}

fn stored(timeline: &Timeline<Arena, ArenaBackend>, tick: i64) -> Snapshot<Arena> {
    timeline
        .snapshots()
        .get(tick)
        .expect("tick should be stored")
        .clone()
}

#[test]
fn advance_moves_real_and_logical_together() {
    let mut timeline = arena_timeline(&[1]);
    let mut input = ScriptedInput::new(1, [2]);

    assert_eq!(timeline.advance(&mut input), 1);
    assert_eq!(timeline.advance(&mut input), 2);

    assert_eq!(timeline.real_tick(), 2);
    assert_eq!(timeline.logical_tick(), 2);
    assert_eq!(timeline.state(), TimelineState::Live);
    assert_eq!(stored(&timeline, 2).entries[&1].vx, 4);
}

#[test]
fn replaying_after_rewind_reproduces_every_snapshot() {
    let mut timeline = arena_timeline(&[1, 2]);
    let mut input = ScriptedInput::new(1, [1, 0, -1, 2, 0, 0, 1, 1]);
    timeline.schedule_event(ArenaEvent::Spawn { id: 7 }, At::Tick(2));
    timeline.schedule_event(ArenaEvent::Gust { strength: 3 }, At::Tick(5));

    for _ in 0..8 {
        timeline.advance(&mut input);
    }
    let live: Vec<Snapshot<Arena>> = (0..=8).map(|tick| stored(&timeline, tick)).collect();

    timeline.rewind_to(3);
    assert_eq!(timeline.real_tick(), 3);
    assert_eq!(timeline.logical_tick(), 3);
    assert_eq!(
        timeline.backend().body(1),
        live[3].entries.get(&1),
        "backend should hold the end of the target tick"
    );
    assert_eq!(timeline.backend().wind(), 0);

    timeline.fast_forward_to(8);
    assert_eq!(timeline.real_tick(), 8);
    for tick in 0..=8 {
        assert_same_world!(&stored(&timeline, tick), &live[tick as usize]);
    }
    assert_eq!(timeline.backend().state(), live[8].state);
}

#[test]
fn rewind_rolls_back_events_on_the_way() {
    let mut timeline = arena_timeline(&[1]);
    timeline.schedule_event(ArenaEvent::Gust { strength: 3 }, At::Tick(5));
    for _ in 0..8 {
        timeline.advance(&mut NoLocalInput);
    }

    timeline.rewind_to(3);

    // tick 5 has events, tick 4 is where the rewind comes to rest
    assert_eq!(
        timeline.backend().rolled_back,
        vec![ArenaEvent::Gust { strength: 3 }]
    );
}

#[test]
fn rewind_to_present_touches_nothing() {
    let mut timeline = arena_timeline(&[1]);
    for _ in 0..4 {
        timeline.advance(&mut NoLocalInput);
    }
    let steps = timeline.backend().step_calls;

    timeline.rewind_to(4);
    timeline.travel_to_end_of(4, EventSchedule::new());

    assert_eq!(timeline.real_tick(), 4);
    assert_eq!(timeline.backend().step_calls, steps);
}

#[test]
fn travel_swaps_schedule_before_fast_forwarding() {
    let mut timeline = arena_timeline(&[1]);
    for _ in 0..3 {
        timeline.advance(&mut NoLocalInput);
    }

    let mut schedule = EventSchedule::new();
    schedule.schedule(ArenaEvent::Gust { strength: 2 }, At::Tick(5), 3);
    timeline.travel_to_end_of(6, schedule);

    assert_eq!(timeline.real_tick(), 6);
    assert_eq!(stored(&timeline, 4).state.wind, 0);
    assert_eq!(stored(&timeline, 5).state.wind, 2);
    assert_eq!(stored(&timeline, 6).state.wind, 2);
}

#[test]
fn synchronize_resimulates_from_authoritative_snapshot() {
    // authority side, ten ticks in
    let mut authority = arena_timeline(&[1]);
    for _ in 0..10 {
        authority.advance(&mut NoLocalInput);
    }
    let mut authoritative = stored(&authority, 10);
    authoritative.state.wind = 3;

    // predictor side, five ticks in
    let mut predictor = arena_timeline(&[1]);
    for _ in 0..5 {
        predictor.advance(&mut NoLocalInput);
    }
    assert_eq!(predictor.last_authoritative_tick(), 0);

    let outcome = predictor.synchronize(authoritative.clone(), EventSchedule::new(), 10, 2);

    assert_eq!(outcome, SyncOutcome::Applied { real_tick: 12 });
    assert_eq!(predictor.real_tick(), 12);
    assert_eq!(predictor.last_authoritative_tick(), 10);
    assert!(stored(&predictor, 10).authoritative);
    assert_same_world!(&stored(&predictor, 10), &authoritative);

    // ticks 11 and 12 must come from the authoritative snapshot, not from the
    // predictor's own history
    let mut reference = arena_timeline(&[]);
    reference.initialize(authoritative, 42);
    reference.advance(&mut NoLocalInput);
    reference.advance(&mut NoLocalInput);
    assert_same_world!(&stored(&predictor, 11), &stored(&reference, 11));
    assert_same_world!(&stored(&predictor, 12), &stored(&reference, 12));
    assert_eq!(stored(&predictor, 12).state.wind, 3);
}

#[test]
fn synchronize_drops_stale_updates() {
    let mut timeline = arena_timeline(&[1]);
    for _ in 0..10 {
        timeline.advance(&mut NoLocalInput);
    }
    let snapshot = stored(&timeline, 10);
    timeline.synchronize(snapshot, EventSchedule::new(), 10, 0);

    let older = stored(&timeline, 8);
    let outcome = timeline.synchronize(older, EventSchedule::new(), 8, 0);

    assert_eq!(
        outcome,
        SyncOutcome::Stale {
            authority_tick: 8,
            last_authoritative_tick: 10
        }
    );
    assert_eq!(timeline.real_tick(), 10);
    assert_eq!(timeline.last_authoritative_tick(), 10);
}

#[test]
fn synchronize_restamps_mismatched_snapshot() {
    let mut timeline = arena_timeline(&[1]);
    for _ in 0..4 {
        timeline.advance(&mut NoLocalInput);
    }
    let snapshot = stored(&timeline, 2);

    timeline.synchronize(snapshot, EventSchedule::new(), 6, 0);

    assert_eq!(timeline.real_tick(), 6);
    assert_eq!(stored(&timeline, 6).tick, 6);
    assert!(stored(&timeline, 6).authoritative);
}

#[test]
fn late_input_is_replayed_and_predicted_forward() {
    let mut timeline = arena_timeline(&[1, 2]);
    for _ in 0..6 {
        timeline.advance(&mut NoLocalInput);
    }

    let mut inputs = InputMap::<Arena>::new();
    inputs.insert(2, Thrust::new(5));
    timeline.replay_due_to_local_input(&inputs, 3, 6, 0);

    assert_eq!(timeline.real_tick(), 6);
    let record = timeline.inputs().record(&2, 3).expect("input should be recorded");
    assert!(record.authoritative);
    let predicted = timeline.inputs().record(&2, 5).expect("input should be predicted");
    assert_eq!(predicted.value, Thrust::new(5));
    assert!(!predicted.authoritative);

    // thrust lands on ticks 3, 4, 5 and 6
    assert_eq!(stored(&timeline, 2).entries[&2].vx, 0);
    assert_eq!(stored(&timeline, 6).entries[&2].vx, 20);
}

#[test]
fn late_input_after_sync_reaches_ticks_left_ahead() {
    let mut timeline = arena_timeline(&[1, 2]);
    for _ in 0..20 {
        timeline.advance(&mut NoLocalInput);
    }

    // the authority is behind, so syncing pulls the real tick back to 12 and
    // leaves predictions for ticks 13 to 20 behind
    let snapshot = stored(&timeline, 10);
    timeline.synchronize(snapshot, EventSchedule::new(), 10, 2);
    assert_eq!(timeline.real_tick(), 12);

    let mut inputs = InputMap::<Arena>::new();
    inputs.insert(2, Thrust::new(5));
    timeline.replay_due_to_local_input(&inputs, 11, 12, 0);
    timeline.advance(&mut NoLocalInput);

    let held = |tick| timeline.inputs().record(&2, tick).map(|record| record.value.clone());
    assert_eq!(held(12), Some(Thrust::new(5)));
    assert_eq!(held(13), Some(Thrust::new(5)));
    assert_eq!(held(20), Some(Thrust::new(5)));
    // thrust lands on ticks 11, 12 and 13
    assert_eq!(stored(&timeline, 13).entries[&2].vx, 15);
}

#[test]
fn new_events_are_replayed_under_the_new_schedule() {
    let mut timeline = arena_timeline(&[1]);
    for _ in 0..6 {
        timeline.advance(&mut NoLocalInput);
    }

    let mut schedule = timeline.events().clone();
    schedule.schedule(ArenaEvent::Gust { strength: 2 }, At::Tick(4), 6);
    timeline.replay_due_to_events(4, schedule, 2);

    assert_eq!(timeline.real_tick(), 6);
    assert!(timeline.events().has_events_at(4));
    assert_eq!(stored(&timeline, 3).state.wind, 0);
    assert_eq!(stored(&timeline, 6).state.wind, 2);
    // the old schedule had nothing to roll back
    assert!(timeline.backend().rolled_back.is_empty());
}

#[test]
fn scheduling_in_the_past_is_reported() {
    let mut timeline = arena_timeline(&[1]);
    for _ in 0..6 {
        timeline.advance(&mut NoLocalInput);
    }

    assert_eq!(timeline.schedule_event(ArenaEvent::Calm, At::Tick(2)), 2);
    assert_eq!(timeline.schedule_event(ArenaEvent::Calm, At::Next), 7);

    assert_eq!(
        timeline.drain_anomalies(),
        vec![Anomaly::PastEventScheduled {
            tick: 2,
            logical_tick: 6
        }]
    );
}

#[test]
fn initialize_discards_history() {
    let mut timeline = arena_timeline(&[1]);
    let mut input = ScriptedInput::new(1, [1]);
    for _ in 0..5 {
        timeline.advance(&mut input);
    }
    let snapshot = stored(&timeline, 3);

    timeline.initialize(snapshot, 9);

    assert_eq!(timeline.real_tick(), 3);
    assert_eq!(timeline.last_authoritative_tick(), 3);
    assert_eq!(timeline.seed_base(), 9);
    assert!(timeline.snapshots().get(4).is_none());
    assert!(timeline.inputs().record(&1, 2).is_none());
}

#[test]
fn prune_history_forgets_old_ticks() {
    let mut timeline = arena_timeline(&[1]);
    for _ in 0..6 {
        timeline.advance(&mut NoLocalInput);
    }

    timeline.prune_history(4);

    assert_eq!(timeline.snapshots().earliest_tick(), Some(4));
    assert_eq!(timeline.real_tick(), 6);
}

proptest! {
    #[test]
    fn rewind_then_fast_forward_is_identity(
        script in prop::collection::vec(-3i64..=3, 1..12),
        target_seed in any::<usize>(),
        gust_tick in 1i64..12,
    ) {
        let ticks = script.len() as i64;
        let target = (target_seed % script.len()) as i64;

        let mut timeline = arena_timeline(&[1, 2]);
        timeline.schedule_event(ArenaEvent::Gust { strength: 1 }, At::Tick(gust_tick));
        let mut input = ScriptedInput::new(1, script);
        for _ in 0..ticks {
            timeline.advance(&mut input);
        }
        let live: Vec<Snapshot<Arena>> = (0..=ticks).map(|tick| stored(&timeline, tick)).collect();

        timeline.rewind_to(target);
        timeline.fast_forward_to(ticks);

        prop_assert_eq!(timeline.real_tick(), ticks);
        for tick in 0..=ticks {
            prop_assert!(stored(&timeline, tick).same_world(&live[tick as usize]));
        }
    }
}
