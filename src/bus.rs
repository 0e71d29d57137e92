// CLASSIFICATION: COMMUNITY
// Filename: bus.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-05-02

//! Bus-bandwidth boundary.
//!
//! Each frequency step may carry a bandwidth requirement which the table
//! builder expands into one vector per configured `(src, dst)` endpoint
//! pair. The aggregator selects a usecase index and pushes it through the
//! [`BandwidthClient`] trait; registration of the usecase list with the bus
//! framework happens outside this crate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::errors::BandwidthError;

/// One bandwidth request path in bytes per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BwVector {
    pub src: u32,
    pub dst: u32,
    pub ib_bps: u64,
}

/// The full set of path vectors for one frequency step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BwUsecase {
    pub vectors: Vec<BwVector>,
}

/// Client handle used to switch the active bandwidth usecase.
pub trait BandwidthClient: Send + Sync {
    fn update_request(&self, usecase: usize) -> Result<(), BandwidthError>;
}

/// Records usecase updates; stands in for a real bus client in tests.
#[derive(Default)]
pub struct RecordingBandwidthClient {
    requests: Mutex<Vec<usize>>,
    fail: AtomicBool,
}

impl RecordingBandwidthClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<usize> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<usize> {
        self.requests.lock().unwrap().last().copied()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl BandwidthClient for RecordingBandwidthClient {
    fn update_request(&self, usecase: usize) -> Result<(), BandwidthError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BandwidthError::Rejected(usecase));
        }
        self.requests.lock().unwrap().push(usecase);
        Ok(())
    }
}
