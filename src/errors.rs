// CLASSIFICATION: COMMUNITY
// Filename: errors.rs v0.3
// Author: Lukas Bower
// Date Modified: 2026-04-19

//! Error taxonomy for the frequency-scaling coordinator.
//!
//! Per-core request failures are returned synchronously to the caller.
//! Aggregator (L2/bandwidth) failures never unwind a committed per-core
//! transition; they are logged and degrade gracefully. Lifecycle bring-up
//! failures are the only errors that block a higher-level state transition.

use thiserror::Error;

/// Build-time failures of the frequency table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("frequency table is empty")]
    EmptyTable,
    #[error("no usable steps after rounding against the cpu clock")]
    NoUsableSteps,
    #[error("bandwidth values configured without bus ports")]
    MissingPorts,
    #[error("core 0 has no clock device")]
    NoCpuClock,
    #[error("malformed frequency config: {0}")]
    Parse(String),
}

/// Failures reported by the clock-control boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClockError {
    #[error("no supported rate at or near {0} Hz")]
    UnsupportedRate(u64),
    #[error("clock hardware rejected the operation: {0}")]
    Hardware(&'static str),
}

/// Failures of a per-core frequency request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FreqError {
    #[error("target {0} kHz resolves to no table entry")]
    InvalidTarget(u32),
    #[error("core {0} is suspended")]
    Suspended(usize),
    #[error("clock set failed: {0}")]
    ClockSetFailed(#[from] ClockError),
    #[error("no clock device for core {0}")]
    NoDevice(usize),
}

/// Failures of a bus-bandwidth usecase update. Logged, never propagated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BandwidthError {
    #[error("bandwidth request rejected for usecase {0}")]
    Rejected(usize),
}

/// Hot-plug bring-up failures. The core stays offline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("clock prepare failed during bring-up of core {core}: {source}")]
    PrepareFailed { core: usize, source: ClockError },
    #[error("clock enable failed during bring-up of core {core}: {source}")]
    EnableFailed { core: usize, source: ClockError },
}
