// CLASSIFICATION: COMMUNITY
// Filename: lifecycle.rs v0.6
// Author: Lukas Bower
// Date Modified: 2026-07-26

//! Hot-plug and suspend/resume handling.
//!
//! The platform's notifier chains push [`CpuEvent`] and [`PmEvent`] values
//! into the coordinator. Bring-up failures are the only lifecycle errors
//! that propagate: the core is kept offline. Tear-down and suspend paths
//! never fail; they shrink or gate the shared aggregate instead.

use std::sync::atomic::Ordering;
use std::sync::PoisonError;

use log::{info, warn};

use crate::coordinator::FreqCoordinator;
use crate::errors::{ClockError, LifecycleError};
use crate::table::Relation;

/// Hot-plug notifications, in the order the platform emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuEvent {
    /// Core is about to be brought up; clocks must be prepared and the
    /// aggregate pre-provisioned before it starts executing at speed.
    UpPrepare,
    /// Core is starting; enable its clocks.
    Starting,
    /// Core went offline; release clocks and shrink the aggregate.
    Dead,
    /// Bring-up was cancelled after prepare; release unused clocks.
    UpCanceled,
}

/// System power-management notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmEvent {
    SuspendPrepare,
    PostSuspend,
}

impl FreqCoordinator {
    /// Consume one hot-plug event for `core`.
    pub fn cpu_notify(&self, core: usize, event: CpuEvent) -> Result<(), LifecycleError> {
        let shared = &self.shared;
        let slot = match shared.cores.get(core) {
            Some(slot) => slot,
            None => {
                warn!("hotplug event {event:?} for unknown core {core}");
                return Ok(());
            }
        };
        let prepare_err = |source: ClockError| LifecycleError::PrepareFailed { core, source };
        let enable_err = |source: ClockError| LifecycleError::EnableFailed { core, source };

        match event {
            CpuEvent::UpPrepare => {
                if let Some(l2_clk) = &shared.l2_clk {
                    l2_clk.prepare().map_err(prepare_err)?;
                }
                shared.clock_for(core).prepare().map_err(prepare_err)?;
                // pre-provision bandwidth for the incoming core before the
                // scheduler counts it as online
                shared.update_l2_bw(Some(core));
            }
            CpuEvent::Starting => {
                if let Some(l2_clk) = &shared.l2_clk {
                    l2_clk.enable().map_err(enable_err)?;
                }
                shared.clock_for(core).enable().map_err(enable_err)?;
                slot.online.store(true, Ordering::SeqCst);
                info!("core{core} online");
            }
            CpuEvent::Dead => {
                let clk = shared.clock_for(core);
                clk.disable();
                clk.unprepare();
                if let Some(l2_clk) = &shared.l2_clk {
                    l2_clk.disable();
                    l2_clk.unprepare();
                }
                slot.online.store(false, Ordering::SeqCst);
                shared.update_l2_bw(None);
                info!("core{core} offline");
            }
            CpuEvent::UpCanceled => {
                shared.clock_for(core).unprepare();
                if let Some(l2_clk) = &shared.l2_clk {
                    l2_clk.unprepare();
                }
                slot.online.store(false, Ordering::SeqCst);
                shared.update_l2_bw(None);
            }
        }
        Ok(())
    }

    /// Consume one system power-management event.
    pub fn pm_notify(&self, event: PmEvent) {
        match event {
            PmEvent::SuspendPrepare => {
                for slot in &self.shared.cores {
                    let _guard = slot
                        .req_lock
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner);
                    slot.suspended.store(true, Ordering::SeqCst);
                }
                info!("all cores suspended");
            }
            PmEvent::PostSuspend => {
                for slot in &self.shared.cores {
                    let _guard = slot
                        .req_lock
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner);
                    slot.suspended.store(false, Ordering::SeqCst);
                }
                self.correct_policy_violations();
            }
        }
    }

    /// Requests rejected during suspend can leave a core's frequency outside
    /// the (possibly updated) policy bounds; fix that as soon as possible.
    fn correct_policy_violations(&self) {
        for core in 0..self.num_cores() {
            if !self.is_online(core) {
                continue;
            }
            let Some(policy) = self.policy(core) else {
                continue;
            };
            let cur_khz = self
                .shared
                .cores
                .get(core)
                .map(|slot| slot.cur_khz.load(Ordering::SeqCst))
                .unwrap_or(0);
            let correction = if cur_khz > policy.max_khz {
                Some((policy.max_khz, Relation::AtMost))
            } else if cur_khz < policy.min_khz {
                Some((policy.min_khz, Relation::AtLeast))
            } else {
                None
            };
            if let Some((target_khz, relation)) = correction {
                match self.target(core, target_khz, relation) {
                    Ok(()) => info!("core{core}: frequency violation fixed after resume"),
                    Err(e) => {
                        warn!("core{core}: frequency violates policy bounds after resume: {e}")
                    }
                }
            }
        }
    }
}
