// CLASSIFICATION: COMMUNITY
// Filename: ceiling.rs v0.4
// Author: Lukas Bower
// Date Modified: 2026-08-02

//! User-adjustable frequency ceiling.
//!
//! One value per device, lazily defaulted to the hardware maximum on first
//! read. Lowering it propagates a reduced policy max to every core and
//! forces cores already running above the new ceiling back under it. The
//! string front-end mirrors the sysfs attribute contract: decimal kHz in,
//! current ceiling out, no partial state change on a failed store.

use std::sync::atomic::Ordering;
use std::sync::PoisonError;

use log::{info, warn};

use crate::coordinator::FreqCoordinator;
use crate::errors::FreqError;
use crate::table::Relation;

impl FreqCoordinator {
    /// Current ceiling, defaulting to the hardware-reported maximum.
    pub fn ceiling_khz(&self) -> u32 {
        let hw_max = self.shared.table.max_khz();
        let mut ceiling = self
            .shared
            .ceiling_khz
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *ceiling.get_or_insert(hw_max)
    }

    /// Lower (or raise) the ceiling to the step resolved AT_MOST from
    /// `new_khz`, returning the resolved value.
    pub fn set_ceiling(&self, new_khz: u32) -> Result<u32, FreqError> {
        let shared = &self.shared;
        let index = shared
            .table
            .resolve(new_khz, Relation::AtMost, 0, u32::MAX)
            .ok_or(FreqError::InvalidTarget(new_khz))?;
        let resolved_khz = shared.table.step(index).cpu_khz;

        *shared
            .ceiling_khz
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(resolved_khz);

        for slot in &shared.cores {
            let mut policy = slot
                .policy
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            policy.max_khz = resolved_khz;
            if policy.min_khz > policy.max_khz {
                policy.min_khz = policy.max_khz;
            }
        }
        info!("frequency ceiling set to {resolved_khz} kHz");

        // force cores running above the new ceiling back under it
        for core in 0..self.num_cores() {
            if !self.is_online(core) {
                continue;
            }
            let cur_khz = shared.cores[core].cur_khz.load(Ordering::SeqCst);
            if cur_khz > resolved_khz {
                if let Err(e) = self.target(core, resolved_khz, Relation::AtMost) {
                    warn!("core{core}: could not apply new ceiling: {e}");
                }
            }
        }
        Ok(resolved_khz)
    }

    /// Read side of the ceiling attribute.
    pub fn show_ceiling(&self) -> String {
        format!("{}\n", self.ceiling_khz())
    }

    /// Write side of the ceiling attribute: a decimal frequency in kHz.
    pub fn store_ceiling(&self, buf: &str) -> Result<u32, FreqError> {
        let khz: u32 = buf
            .trim()
            .parse()
            .map_err(|_| FreqError::InvalidTarget(0))?;
        self.set_ceiling(khz)
    }

    /// Restore per-core policy maxima to the hardware maximum.
    pub fn clear_ceiling(&self) {
        let shared = &self.shared;
        let hw_max = shared.table.max_khz();
        *shared
            .ceiling_khz
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(hw_max);
        for slot in &shared.cores {
            let mut policy = slot
                .policy
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            policy.max_khz = hw_max;
        }
        info!("frequency ceiling restored to {hw_max} kHz");
    }
}
