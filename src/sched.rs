// CLASSIFICATION: COMMUNITY
// Filename: sched.rs v0.3
// Author: Lukas Bower
// Date Modified: 2026-06-21

//! Scheduler plumbing for the per-core workers.
//!
//! A rate increase must not be preempted mid-transition, so the worker
//! elevates itself to the highest real-time class for the duration of the
//! clock set and restores its previous class on every exit path. Workers are
//! also pinned to the core they serve, since the clock hardware is only
//! safely programmable from the core it clocks.

#[cfg(target_os = "linux")]
use log::debug;

/// Scoped SCHED_FIFO elevation; restores the saved class on drop.
#[cfg(target_os = "linux")]
pub struct RtBoost {
    saved: Option<(libc::c_int, libc::c_int)>,
}

#[cfg(target_os = "linux")]
impl RtBoost {
    pub fn engage() -> Self {
        // Safety: plain scheduler syscalls on the calling thread.
        unsafe {
            let policy = libc::sched_getscheduler(0);
            if policy < 0 || policy == libc::SCHED_FIFO {
                return Self { saved: None };
            }
            let mut old: libc::sched_param = std::mem::zeroed();
            if libc::sched_getparam(0, &mut old) != 0 {
                return Self { saved: None };
            }
            let mut param: libc::sched_param = std::mem::zeroed();
            param.sched_priority = libc::sched_get_priority_max(libc::SCHED_FIFO);
            if libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) != 0 {
                // unprivileged processes cannot enter SCHED_FIFO; carry on
                debug!(
                    "rt boost unavailable: {}",
                    std::io::Error::last_os_error()
                );
                return Self { saved: None };
            }
            Self {
                saved: Some((policy, old.sched_priority)),
            }
        }
    }
}

#[cfg(target_os = "linux")]
impl Drop for RtBoost {
    fn drop(&mut self) {
        if let Some((policy, priority)) = self.saved.take() {
            unsafe {
                let mut param: libc::sched_param = std::mem::zeroed();
                param.sched_priority = priority;
                if libc::sched_setscheduler(0, policy, &param) != 0 {
                    debug!(
                        "rt boost restore failed: {}",
                        std::io::Error::last_os_error()
                    );
                }
            }
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub struct RtBoost;

#[cfg(not(target_os = "linux"))]
impl RtBoost {
    pub fn engage() -> Self {
        RtBoost
    }
}

/// Pin the calling thread to `core`. Best effort off Linux.
#[cfg(target_os = "linux")]
pub fn pin_to_core(core: usize) {
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core, &mut set);
        if libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) != 0 {
            debug!(
                "affinity for core {core} unavailable: {}",
                std::io::Error::last_os_error()
            );
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn pin_to_core(_core: usize) {}
