// CLASSIFICATION: COMMUNITY
// Filename: lib.rs v1.0
// Date Modified: 2026-08-02
// Author: Lukas Bower

//! CPU frequency-scaling coordinator for multi-core SoCs.
//!
//! Keeps a shared L2/interconnect clock and a bus-bandwidth request in sync
//! with whichever core is running fastest. Frequency-change requests are
//! serialized per core and executed on that core's dedicated worker; the
//! shared aggregate is recomputed after every committed transition, hot-plug
//! event and resume.

/// Error taxonomy shared by every component.
pub mod errors;

/// Clock-control trait boundary and the software ladder clock.
pub mod clock;

/// Bus-bandwidth vectors and the client trait boundary.
pub mod bus;

/// Static frequency/bandwidth configuration records.
pub mod config;

/// The immutable frequency step table and target resolution.
pub mod table;

/// Scoped real-time elevation and worker core pinning.
pub mod sched;

/// Pre/post transition observer hooks.
pub mod notify;

/// Shared L2-clock and bandwidth aggregation.
pub mod aggregator;

/// Per-core request dispatch and the governor-facing operations.
pub mod coordinator;

/// Hot-plug and suspend/resume state machine.
pub mod lifecycle;

/// User-adjustable frequency ceiling attribute.
pub mod ceiling;

mod worker;

pub use bus::{BandwidthClient, BwUsecase, BwVector, RecordingBandwidthClient};
pub use clock::{Clock, SteppedClock};
pub use config::{FreqConfig, PortPair, StepEntry};
pub use coordinator::{FreqCoordinator, Policy, PolicyBounds};
pub use errors::{BandwidthError, ClockError, ConfigError, FreqError, LifecycleError};
pub use lifecycle::{CpuEvent, PmEvent};
pub use notify::{FreqChange, TransitionObserver};
pub use table::{FreqStep, FreqTable, Relation};
