// CLASSIFICATION: COMMUNITY
// Filename: coordinator.rs v0.9
// Author: Lukas Bower
// Date Modified: 2026-07-19

//! Per-core frequency request dispatch.
//!
//! The governor calls [`FreqCoordinator::target`] with a target frequency
//! and rounding relation. The request is resolved against the step table,
//! executed on the owning core's serial worker, and on success the shared
//! L2/bandwidth aggregate is recomputed. Admission for a core serializes on
//! that core's request mutex, which also guards the suspend flag, so a
//! suspend transition and a frequency request can never interleave.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};

use log::{debug, info};

use crate::aggregator::BwAggregator;
use crate::bus::BandwidthClient;
use crate::clock::Clock;
use crate::config::FreqConfig;
use crate::errors::{ConfigError, FreqError};
use crate::notify::{FreqChange, TransitionObserver};
use crate::sched::RtBoost;
use crate::table::{FreqTable, Relation};
use crate::worker::{CoreWorker, FreqRequest};

/// Frequency bounds the governor may request within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub min_khz: u32,
    pub max_khz: u32,
}

/// Initial bounds and landing frequency reported by [`FreqCoordinator::init_core`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyBounds {
    pub min_khz: u32,
    pub max_khz: u32,
    pub cur_khz: u32,
}

pub(crate) struct CoreSlot {
    /// Admission lock; also guards writes to `suspended`.
    pub(crate) req_lock: Mutex<()>,
    /// Written only under `req_lock`; read lock-free by the aggregator.
    pub(crate) suspended: AtomicBool,
    pub(crate) active_index: AtomicUsize,
    pub(crate) cur_khz: AtomicU32,
    pub(crate) online: AtomicBool,
    pub(crate) policy: Mutex<Policy>,
}

pub(crate) struct Shared {
    pub(crate) table: FreqTable,
    pub(crate) cpu_clks: Vec<Option<Arc<dyn Clock>>>,
    pub(crate) boot_clk: Arc<dyn Clock>,
    pub(crate) l2_clk: Option<Arc<dyn Clock>>,
    pub(crate) sync_mode: bool,
    pub(crate) cores: Vec<CoreSlot>,
    pub(crate) agg: BwAggregator,
    pub(crate) observers: Vec<Arc<dyn TransitionObserver>>,
    pub(crate) ceiling_khz: Mutex<Option<u32>>,
}

impl Shared {
    /// Clock owned by `core`; cores without their own clock share core 0's.
    pub(crate) fn clock_for(&self, core: usize) -> &Arc<dyn Clock> {
        self.cpu_clks[core].as_ref().unwrap_or(&self.boot_clk)
    }

    /// Recompute the shared aggregate from the online, non-suspended cores.
    pub(crate) fn update_l2_bw(&self, extra_core: Option<usize>) {
        let extra_index =
            extra_core.map(|core| self.cores[core].active_index.load(Ordering::SeqCst));
        let active: Vec<usize> = self
            .cores
            .iter()
            .filter(|slot| {
                slot.online.load(Ordering::SeqCst) && !slot.suspended.load(Ordering::SeqCst)
            })
            .map(|slot| slot.active_index.load(Ordering::SeqCst))
            .collect();
        self.agg.recompute(&self.table, active, extra_index);
    }

    /// Execute one transition. Runs on the worker thread of `core`.
    fn set_core_freq(&self, core: usize, new_khz: u32, index: usize) -> Result<(), FreqError> {
        let slot = &self.cores[core];
        let old_khz = slot.cur_khz.load(Ordering::SeqCst);
        let change = FreqChange {
            core,
            old_khz,
            new_khz,
        };

        // Hold SCHED_FIFO while ramping up so the clock-set path cannot
        // starve itself; the guard restores the class on every exit path.
        let _boost = (new_khz > old_khz).then(RtBoost::engage);

        for observer in &self.observers {
            observer.pre_change(&change);
        }

        let clk = self.clock_for(core);
        let rate_hz = clk.round_rate(u64::from(new_khz) * 1000)?;
        clk.set_rate(rate_hz)?;

        slot.active_index.store(index, Ordering::SeqCst);
        slot.cur_khz.store(new_khz, Ordering::SeqCst);
        for observer in &self.observers {
            observer.post_change(&change);
        }
        self.update_l2_bw(None);
        Ok(())
    }
}

/// Frequency-scaling coordinator for one multi-core device.
pub struct FreqCoordinator {
    pub(crate) shared: Arc<Shared>,
    pub(crate) workers: Vec<CoreWorker>,
}

impl FreqCoordinator {
    /// Build the step table and spawn one serial worker per core.
    ///
    /// `cpu_clks` has one entry per core; a `None` entry means the core has
    /// no dedicated clock and shares core 0's (synchronous configuration).
    pub fn new(
        cfg: &FreqConfig,
        cpu_clks: Vec<Option<Arc<dyn Clock>>>,
        l2_clk: Option<Arc<dyn Clock>>,
        bus_client: Option<Arc<dyn BandwidthClient>>,
        observers: Vec<Arc<dyn TransitionObserver>>,
    ) -> Result<Self, ConfigError> {
        let boot_clk = cpu_clks
            .first()
            .and_then(|clk| clk.clone())
            .ok_or(ConfigError::NoCpuClock)?;
        let sync_mode = cpu_clks.iter().any(|clk| clk.is_none());
        if sync_mode {
            info!("synchronous clock configuration, cores share cpu0_clk");
        }

        let table = FreqTable::build(cfg, boot_clk.as_ref(), l2_clk.as_deref())?;
        let hw_min = table.min_khz();
        let hw_max = table.max_khz();

        let cores = cpu_clks
            .iter()
            .map(|clk| {
                let cur_hz = clk.as_ref().unwrap_or(&boot_clk).rate();
                CoreSlot {
                    req_lock: Mutex::new(()),
                    suspended: AtomicBool::new(false),
                    active_index: AtomicUsize::new(0),
                    cur_khz: AtomicU32::new((cur_hz / 1000) as u32),
                    online: AtomicBool::new(true),
                    policy: Mutex::new(Policy {
                        min_khz: hw_min,
                        max_khz: hw_max,
                    }),
                }
            })
            .collect();

        let shared = Arc::new(Shared {
            table,
            cpu_clks,
            boot_clk,
            l2_clk: l2_clk.clone(),
            sync_mode,
            cores,
            agg: BwAggregator::new(l2_clk, bus_client),
            observers,
            ceiling_khz: Mutex::new(None),
        });

        let workers = (0..shared.cores.len())
            .map(|core| {
                let exec_shared = Arc::clone(&shared);
                CoreWorker::spawn(core, move |req: &FreqRequest| {
                    exec_shared.set_core_freq(core, req.target_khz, req.index)
                })
            })
            .collect();

        Ok(Self { shared, workers })
    }

    pub fn num_cores(&self) -> usize {
        self.shared.cores.len()
    }

    /// Request a frequency change on `core`, blocking until it completes.
    pub fn target(
        &self,
        core: usize,
        target_khz: u32,
        relation: Relation,
    ) -> Result<(), FreqError> {
        let shared = &self.shared;
        let slot = shared.cores.get(core).ok_or(FreqError::NoDevice(core))?;
        let _admission = slot
            .req_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if target_khz == slot.cur_khz.load(Ordering::SeqCst) {
            return Ok(());
        }
        if slot.suspended.load(Ordering::SeqCst) {
            debug!("core{core}: frequency change rejected in suspend");
            return Err(FreqError::Suspended(core));
        }

        let policy = *slot
            .policy
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let index = shared
            .table
            .resolve(target_khz, relation, policy.min_khz, policy.max_khz)
            .ok_or(FreqError::InvalidTarget(target_khz))?;
        let step_khz = shared.table.step(index).cpu_khz;
        debug!(
            "core{core}: target {target_khz} relation {relation:?} ({}-{}) selected {step_khz}",
            policy.min_khz, policy.max_khz
        );
        if step_khz == slot.cur_khz.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.dispatch(core, step_khz, index)
    }

    /// Governor init: land the core on a table step and report its bounds.
    pub fn init_core(&self, core: usize) -> Result<PolicyBounds, FreqError> {
        let shared = &self.shared;
        let slot = shared.cores.get(core).ok_or(FreqError::NoDevice(core))?;
        let _admission = slot
            .req_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let cur_khz = (shared.clock_for(core).rate() / 1000) as u32;
        let index = shared
            .table
            .resolve(cur_khz, Relation::AtMost, 0, u32::MAX)
            .or_else(|| shared.table.resolve(cur_khz, Relation::AtLeast, 0, u32::MAX))
            .ok_or(FreqError::InvalidTarget(cur_khz))?;
        let step_khz = shared.table.step(index).cpu_khz;

        // set unconditionally so a freshly onlined core always lands on a
        // table step, even when the clock already reads one
        self.dispatch(core, step_khz, index)?;
        debug!("core{core}: init at {cur_khz} switching to {step_khz}");

        let policy = *slot
            .policy
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(PolicyBounds {
            min_khz: policy.min_khz,
            max_khz: policy.max_khz,
            cur_khz: step_khz,
        })
    }

    /// Clamp a requested policy within the hardware bounds.
    pub fn verify(&self, policy: Policy) -> Policy {
        let hw_min = self.shared.table.min_khz();
        let hw_max = self.shared.table.max_khz();
        let min_khz = policy.min_khz.clamp(hw_min, hw_max);
        let max_khz = policy.max_khz.clamp(hw_min, hw_max);
        Policy {
            min_khz: min_khz.min(max_khz),
            max_khz: max_khz.max(min_khz),
        }
    }

    /// Install new policy bounds for `core`, returning the clamped result.
    pub fn update_policy(&self, core: usize, policy: Policy) -> Result<Policy, FreqError> {
        let slot = self
            .shared
            .cores
            .get(core)
            .ok_or(FreqError::NoDevice(core))?;
        let clamped = self.verify(policy);
        *slot
            .policy
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = clamped;
        Ok(clamped)
    }

    pub fn policy(&self, core: usize) -> Option<Policy> {
        self.shared.cores.get(core).map(|slot| {
            *slot
                .policy
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
        })
    }

    /// Current frequency of `core` in kHz, straight from the clock.
    pub fn get_current(&self, core: usize) -> u32 {
        let shared = &self.shared;
        if core >= shared.cpu_clks.len() {
            return 0;
        }
        let core = if shared.sync_mode { 0 } else { core };
        (shared.clock_for(core).rate() / 1000) as u32
    }

    /// Active step index of `core`, as last committed by its worker.
    pub fn active_step_index(&self, core: usize) -> Option<usize> {
        self.shared
            .cores
            .get(core)
            .map(|slot| slot.active_index.load(Ordering::SeqCst))
    }

    /// Aggregate step index currently applied to the L2 clock and bus.
    pub fn aggregate_index(&self) -> usize {
        self.shared.agg.current_index()
    }

    /// Last L2 rate actually programmed by the aggregator.
    pub fn aggregate_l2_khz(&self) -> Option<u32> {
        self.shared.agg.last_l2_khz()
    }

    pub fn is_online(&self, core: usize) -> bool {
        self.shared
            .cores
            .get(core)
            .map(|slot| slot.online.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Post to the core's worker and wait for completion.
    fn dispatch(&self, core: usize, step_khz: u32, index: usize) -> Result<(), FreqError> {
        let (reply, completion) = mpsc::channel();
        self.workers[core].post(FreqRequest {
            target_khz: step_khz,
            index,
            reply,
        });
        // the worker only exits on shutdown, so a dead channel means the
        // coordinator is being torn down
        match completion.recv() {
            Ok(result) => result,
            Err(_) => Err(FreqError::NoDevice(core)),
        }
    }
}
