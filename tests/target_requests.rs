// CLASSIFICATION: COMMUNITY
// Filename: target_requests.rs v0.4
// Author: Lukas Bower
// Date Modified: 2026-08-09

use std::sync::{Arc, Mutex};

use corefreq::{
    Clock, ClockError, FreqChange, FreqConfig, FreqCoordinator, FreqError, PmEvent, Relation,
    StepEntry, SteppedClock, TransitionObserver,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ladder_config() -> FreqConfig {
    FreqConfig {
        steps: [300_000u32, 600_000, 900_000]
            .iter()
            .map(|khz| StepEntry {
                cpu_khz: *khz,
                l2_khz: None,
                bw_mbps: None,
            })
            .collect(),
        ports: Vec::new(),
    }
}

fn ladder_coordinator(
    cores: usize,
    observers: Vec<Arc<dyn TransitionObserver>>,
) -> (FreqCoordinator, Vec<Arc<SteppedClock>>) {
    init_logs();
    let clocks: Vec<Arc<SteppedClock>> = (0..cores)
        .map(|i| {
            Arc::new(SteppedClock::new(
                &format!("cpu{i}_clk"),
                &[300_000, 600_000, 900_000],
            ))
        })
        .collect();
    let cpu_clks = clocks
        .iter()
        .map(|c| Some(Arc::clone(c) as Arc<dyn Clock>))
        .collect();
    let coordinator =
        FreqCoordinator::new(&ladder_config(), cpu_clks, None, None, observers).unwrap();
    (coordinator, clocks)
}

#[test]
fn at_most_resolves_to_lower_step() {
    let (coordinator, clocks) = ladder_coordinator(2, Vec::new());

    coordinator.target(0, 700_000, Relation::AtMost).unwrap();

    assert_eq!(clocks[0].set_history_khz(), vec![600_000]);
    assert_eq!(coordinator.active_step_index(0), Some(1));
    assert_eq!(coordinator.get_current(0), 600_000);
    // core 1 idles at step 0, so the fastest core wins the aggregate
    assert_eq!(coordinator.aggregate_index(), 1);
}

#[test]
fn at_least_resolves_to_higher_step() {
    let (coordinator, clocks) = ladder_coordinator(1, Vec::new());

    coordinator.target(0, 650_000, Relation::AtLeast).unwrap();

    assert_eq!(clocks[0].set_history_khz(), vec![900_000]);
    assert_eq!(coordinator.active_step_index(0), Some(2));
}

#[test]
fn unresolvable_target_is_rejected() {
    let (coordinator, clocks) = ladder_coordinator(1, Vec::new());

    assert_eq!(
        coordinator.target(0, 100_000, Relation::AtMost),
        Err(FreqError::InvalidTarget(100_000))
    );
    assert!(clocks[0].set_history_khz().is_empty());
    assert_eq!(coordinator.active_step_index(0), Some(0));
}

#[test]
fn repeated_target_is_idempotent() {
    let (coordinator, clocks) = ladder_coordinator(1, Vec::new());

    coordinator.target(0, 700_000, Relation::AtMost).unwrap();
    coordinator.target(0, 700_000, Relation::AtMost).unwrap();
    coordinator.target(0, 600_000, Relation::AtMost).unwrap();

    // one transition, two no-ops
    assert_eq!(clocks[0].set_history_khz(), vec![600_000]);
}

#[test]
fn suspended_core_rejects_requests() {
    let (coordinator, clocks) = ladder_coordinator(2, Vec::new());

    coordinator.pm_notify(PmEvent::SuspendPrepare);
    assert_eq!(
        coordinator.target(0, 900_000, Relation::AtLeast),
        Err(FreqError::Suspended(0))
    );
    assert!(clocks[0].set_history_khz().is_empty());
    assert_eq!(coordinator.active_step_index(0), Some(0));

    coordinator.pm_notify(PmEvent::PostSuspend);
    coordinator.target(0, 900_000, Relation::AtLeast).unwrap();
    assert_eq!(coordinator.get_current(0), 900_000);
}

#[test]
fn failed_clock_set_leaves_state_unchanged() {
    let (coordinator, clocks) = ladder_coordinator(1, Vec::new());

    clocks[0].fail_next_set();
    let err = coordinator
        .target(0, 900_000, Relation::AtLeast)
        .unwrap_err();
    assert_eq!(
        err,
        FreqError::ClockSetFailed(ClockError::Hardware("injected set failure"))
    );
    assert_eq!(coordinator.active_step_index(0), Some(0));
    assert_eq!(coordinator.get_current(0), 300_000);
    assert_eq!(coordinator.aggregate_index(), 0);
}

#[test]
fn init_core_lands_on_a_table_step() {
    let (coordinator, clocks) = ladder_coordinator(1, Vec::new());

    let bounds = coordinator.init_core(0).unwrap();
    assert_eq!(bounds.cur_khz, 300_000);
    assert_eq!(bounds.min_khz, 300_000);
    assert_eq!(bounds.max_khz, 900_000);
    // the landing set is issued even when the clock already reads a step
    assert_eq!(clocks[0].set_history_khz(), vec![300_000]);
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<(&'static str, u32, u32)>>,
}

impl TransitionObserver for RecordingObserver {
    fn pre_change(&self, change: &FreqChange) {
        self.events
            .lock()
            .unwrap()
            .push(("pre", change.old_khz, change.new_khz));
    }

    fn post_change(&self, change: &FreqChange) {
        self.events
            .lock()
            .unwrap()
            .push(("post", change.old_khz, change.new_khz));
    }
}

#[test]
fn notifications_bracket_the_transition() {
    let observer = Arc::new(RecordingObserver::default());
    let (coordinator, _clocks) =
        ladder_coordinator(1, vec![Arc::clone(&observer) as Arc<dyn TransitionObserver>]);

    coordinator.target(0, 600_000, Relation::AtLeast).unwrap();
    coordinator.target(0, 900_000, Relation::AtLeast).unwrap();

    let events = observer.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            ("pre", 300_000, 600_000),
            ("post", 300_000, 600_000),
            ("pre", 600_000, 900_000),
            ("post", 600_000, 900_000),
        ]
    );
}

#[test]
fn failed_transition_emits_no_post_change() {
    let observer = Arc::new(RecordingObserver::default());
    let (coordinator, clocks) =
        ladder_coordinator(1, vec![Arc::clone(&observer) as Arc<dyn TransitionObserver>]);

    clocks[0].fail_next_set();
    assert!(coordinator.target(0, 900_000, Relation::AtLeast).is_err());

    let events = observer.events.lock().unwrap().clone();
    assert_eq!(events, vec![("pre", 300_000, 900_000)]);
}
