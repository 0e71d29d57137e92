// CLASSIFICATION: COMMUNITY
// Filename: ceiling_limit.rs v0.3
// Author: Lukas Bower
// Date Modified: 2026-08-15

use std::sync::Arc;

use corefreq::{
    Clock, FreqConfig, FreqCoordinator, FreqError, Relation, StepEntry, SteppedClock,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ladder_coordinator(cores: usize) -> (FreqCoordinator, Vec<Arc<SteppedClock>>) {
    init_logs();
    let clocks: Vec<Arc<SteppedClock>> = (0..cores)
        .map(|i| {
            Arc::new(SteppedClock::new(
                &format!("cpu{i}_clk"),
                &[300_000, 600_000, 900_000],
            ))
        })
        .collect();
    let cfg = FreqConfig {
        steps: [300_000u32, 600_000, 900_000]
            .iter()
            .map(|khz| StepEntry {
                cpu_khz: *khz,
                l2_khz: None,
                bw_mbps: None,
            })
            .collect(),
        ports: Vec::new(),
    };
    let coordinator = FreqCoordinator::new(
        &cfg,
        clocks
            .iter()
            .map(|c| Some(Arc::clone(c) as Arc<dyn Clock>))
            .collect(),
        None,
        None,
        Vec::new(),
    )
    .unwrap();
    (coordinator, clocks)
}

#[test]
fn ceiling_defaults_to_hardware_maximum() {
    let (coordinator, _clocks) = ladder_coordinator(1);
    assert_eq!(coordinator.ceiling_khz(), 900_000);
    assert_eq!(coordinator.show_ceiling(), "900000\n");
}

#[test]
fn lowered_ceiling_clamps_future_requests() {
    let (coordinator, _clocks) = ladder_coordinator(2);

    assert_eq!(coordinator.set_ceiling(600_000), Ok(600_000));

    // no step at or above 900 MHz survives the ceiling
    assert_eq!(
        coordinator.target(0, 900_000, Relation::AtLeast),
        Err(FreqError::InvalidTarget(900_000))
    );
    // AT_MOST degrades to the ceiling step
    coordinator.target(0, 900_000, Relation::AtMost).unwrap();
    assert_eq!(coordinator.get_current(0), 600_000);
}

#[test]
fn ceiling_resolves_at_most() {
    let (coordinator, _clocks) = ladder_coordinator(1);
    assert_eq!(coordinator.set_ceiling(700_000), Ok(600_000));
    assert_eq!(coordinator.ceiling_khz(), 600_000);
}

#[test]
fn ceiling_below_table_is_rejected() {
    let (coordinator, _clocks) = ladder_coordinator(1);
    assert_eq!(
        coordinator.set_ceiling(100_000),
        Err(FreqError::InvalidTarget(100_000))
    );
    // no partial state change
    assert_eq!(coordinator.ceiling_khz(), 900_000);
    assert_eq!(coordinator.policy(0).unwrap().max_khz, 900_000);
}

#[test]
fn ceiling_forces_running_cores_under_it() {
    let (coordinator, clocks) = ladder_coordinator(2);

    coordinator.target(0, 900_000, Relation::AtLeast).unwrap();
    coordinator.target(1, 600_000, Relation::AtLeast).unwrap();

    coordinator.set_ceiling(600_000).unwrap();

    assert_eq!(coordinator.get_current(0), 600_000);
    assert_eq!(coordinator.get_current(1), 600_000);
    assert_eq!(clocks[0].rate_khz(), 600_000);
    assert_eq!(coordinator.aggregate_index(), 1);
}

#[test]
fn store_parses_decimal_khz() {
    let (coordinator, _clocks) = ladder_coordinator(1);

    assert_eq!(coordinator.store_ceiling("600000\n"), Ok(600_000));
    assert_eq!(coordinator.show_ceiling(), "600000\n");

    assert!(coordinator.store_ceiling("fast").is_err());
    // failed store leaves the ceiling untouched
    assert_eq!(coordinator.ceiling_khz(), 600_000);
}

#[test]
fn cleared_ceiling_restores_hardware_maximum() {
    let (coordinator, _clocks) = ladder_coordinator(1);

    coordinator.set_ceiling(600_000).unwrap();
    assert_eq!(
        coordinator.target(0, 900_000, Relation::AtLeast),
        Err(FreqError::InvalidTarget(900_000))
    );

    coordinator.clear_ceiling();
    coordinator.target(0, 900_000, Relation::AtLeast).unwrap();
    assert_eq!(coordinator.get_current(0), 900_000);
}
