// CLASSIFICATION: COMMUNITY
// Filename: clock.rs v0.5
// Author: Lukas Bower
// Date Modified: 2026-05-02

//! Clock-control boundary.
//!
//! The coordinator only ever talks to clock hardware through the [`Clock`]
//! trait: round a requested rate to the nearest supported one, set it, and
//! manage the prepare/enable lifecycle used during hot-plug. Real drivers
//! live outside this crate; [`SteppedClock`] is a software clock backed by a
//! fixed ladder of supported rates, used by tests and simulations.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use log::trace;

use crate::errors::ClockError;

/// Control interface of one clock domain.
pub trait Clock: Send + Sync {
    /// Round `rate_hz` to the nearest rate the hardware supports.
    fn round_rate(&self, rate_hz: u64) -> Result<u64, ClockError>;

    /// Program the clock to `rate_hz`. The rate must have been rounded first.
    fn set_rate(&self, rate_hz: u64) -> Result<(), ClockError>;

    /// Current programmed rate in Hz.
    fn rate(&self) -> u64;

    fn prepare(&self) -> Result<(), ClockError>;
    fn unprepare(&self);
    fn enable(&self) -> Result<(), ClockError>;
    fn disable(&self);
}

struct SteppedState {
    rate_hz: u64,
    prepare_count: u32,
    enable_count: u32,
    set_history: Vec<u64>,
}

/// Software clock with a discrete ladder of supported rates.
///
/// Rounding picks the highest supported rate at or below the request and
/// falls back to the lowest rate for requests below the ladder, matching how
/// a table-based hardware clock rounds. Failure injection hooks cover the
/// paths the coordinator must survive: a rejected set, a failed prepare or
/// enable, and rates the ladder cannot express.
pub struct SteppedClock {
    name: String,
    rates_hz: Vec<u64>,
    state: Mutex<SteppedState>,
    fail_next_set: AtomicBool,
    fail_prepare: AtomicBool,
    fail_enable: AtomicBool,
    reject_above_khz: AtomicU32,
}

impl SteppedClock {
    /// Create a clock supporting `rates_khz`, initially at the lowest rate.
    pub fn new(name: &str, rates_khz: &[u32]) -> Self {
        let mut rates_hz: Vec<u64> = rates_khz.iter().map(|k| u64::from(*k) * 1000).collect();
        rates_hz.sort_unstable();
        let initial = rates_hz.first().copied().unwrap_or(0);
        Self {
            name: name.to_string(),
            rates_hz,
            state: Mutex::new(SteppedState {
                rate_hz: initial,
                prepare_count: 0,
                enable_count: 0,
                set_history: Vec::new(),
            }),
            fail_next_set: AtomicBool::new(false),
            fail_prepare: AtomicBool::new(false),
            fail_enable: AtomicBool::new(false),
            reject_above_khz: AtomicU32::new(0),
        }
    }

    pub fn rate_khz(&self) -> u32 {
        (self.rate() / 1000) as u32
    }

    /// Every rate accepted by `set_rate`, in kHz, oldest first.
    pub fn set_history_khz(&self) -> Vec<u32> {
        self.state
            .lock()
            .unwrap()
            .set_history
            .iter()
            .map(|hz| (hz / 1000) as u32)
            .collect()
    }

    pub fn prepare_count(&self) -> u32 {
        self.state.lock().unwrap().prepare_count
    }

    pub fn enable_count(&self) -> u32 {
        self.state.lock().unwrap().enable_count
    }

    /// Make the next `set_rate` call fail.
    pub fn fail_next_set(&self) {
        self.fail_next_set.store(true, Ordering::SeqCst);
    }

    pub fn set_fail_prepare(&self, fail: bool) {
        self.fail_prepare.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_enable(&self, fail: bool) {
        self.fail_enable.store(fail, Ordering::SeqCst);
    }

    /// Reject rounding for requests above `khz`. Models a clock domain that
    /// cannot express the higher table rates.
    pub fn reject_round_above_khz(&self, khz: u32) {
        self.reject_above_khz.store(khz, Ordering::SeqCst);
    }
}

impl Clock for SteppedClock {
    fn round_rate(&self, rate_hz: u64) -> Result<u64, ClockError> {
        let ceiling_khz = self.reject_above_khz.load(Ordering::SeqCst);
        if ceiling_khz != 0 && rate_hz > u64::from(ceiling_khz) * 1000 {
            return Err(ClockError::UnsupportedRate(rate_hz));
        }
        let rounded = self
            .rates_hz
            .iter()
            .rev()
            .find(|supported| **supported <= rate_hz)
            .or_else(|| self.rates_hz.first())
            .copied()
            .ok_or(ClockError::UnsupportedRate(rate_hz))?;
        trace!("{}: round {} -> {} Hz", self.name, rate_hz, rounded);
        Ok(rounded)
    }

    fn set_rate(&self, rate_hz: u64) -> Result<(), ClockError> {
        if self.fail_next_set.swap(false, Ordering::SeqCst) {
            return Err(ClockError::Hardware("injected set failure"));
        }
        if !self.rates_hz.contains(&rate_hz) {
            return Err(ClockError::UnsupportedRate(rate_hz));
        }
        let mut state = self.state.lock().unwrap();
        state.rate_hz = rate_hz;
        state.set_history.push(rate_hz);
        trace!("{}: set {} Hz", self.name, rate_hz);
        Ok(())
    }

    fn rate(&self) -> u64 {
        self.state.lock().unwrap().rate_hz
    }

    fn prepare(&self) -> Result<(), ClockError> {
        if self.fail_prepare.load(Ordering::SeqCst) {
            return Err(ClockError::Hardware("injected prepare failure"));
        }
        self.state.lock().unwrap().prepare_count += 1;
        Ok(())
    }

    fn unprepare(&self) {
        let mut state = self.state.lock().unwrap();
        state.prepare_count = state.prepare_count.saturating_sub(1);
    }

    fn enable(&self) -> Result<(), ClockError> {
        if self.fail_enable.load(Ordering::SeqCst) {
            return Err(ClockError::Hardware("injected enable failure"));
        }
        self.state.lock().unwrap().enable_count += 1;
        Ok(())
    }

    fn disable(&self) {
        let mut state = self.state.lock().unwrap();
        state.enable_count = state.enable_count.saturating_sub(1);
    }
}
