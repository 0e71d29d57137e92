// CLASSIFICATION: COMMUNITY
// Filename: notify.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-06-21

//! Transition notifications.
//!
//! Observers are fixed at coordinator construction. For a given core the
//! pre-change and post-change calls are strictly ordered around the clock
//! set, and post-change fires only after the per-core state update commits.

/// One frequency transition on one core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreqChange {
    pub core: usize,
    pub old_khz: u32,
    pub new_khz: u32,
}

/// Hook invoked around every committed frequency transition.
pub trait TransitionObserver: Send + Sync {
    fn pre_change(&self, _change: &FreqChange) {}
    fn post_change(&self, _change: &FreqChange) {}
}
