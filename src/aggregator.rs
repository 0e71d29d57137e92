// CLASSIFICATION: COMMUNITY
// Filename: aggregator.rs v0.5
// Author: Lukas Bower
// Date Modified: 2026-07-03

//! Shared L2-clock and bus-bandwidth aggregation.
//!
//! The shared state follows whichever core runs fastest: after every
//! committed per-core transition, hot-plug event or resume, `recompute`
//! takes the maximum active step index over the online, non-suspended cores
//! and applies that step's L2 rate and bandwidth usecase. Failures here are
//! logged and never unwind the per-core transition that already committed.

use std::sync::{Arc, Mutex};

use log::{debug, error};

use crate::bus::BandwidthClient;
use crate::clock::Clock;
use crate::table::FreqTable;

struct AggState {
    current_index: usize,
    last_l2_khz: Option<u32>,
}

/// Exactly one instance per device; all aggregate updates serialize on the
/// inner lock.
pub struct BwAggregator {
    l2_clk: Option<Arc<dyn Clock>>,
    client: Option<Arc<dyn BandwidthClient>>,
    state: Mutex<AggState>,
}

impl BwAggregator {
    pub fn new(
        l2_clk: Option<Arc<dyn Clock>>,
        client: Option<Arc<dyn BandwidthClient>>,
    ) -> Self {
        Self {
            l2_clk,
            client,
            state: Mutex::new(AggState {
                current_index: 0,
                last_l2_khz: None,
            }),
        }
    }

    /// Aggregate step index applied by the last `recompute`.
    pub fn current_index(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .current_index
    }

    /// Last L2 rate actually programmed, if any.
    pub fn last_l2_khz(&self) -> Option<u32> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .last_l2_khz
    }

    /// Recompute and apply the aggregate settings.
    ///
    /// `active` yields the active step index of every online, non-suspended
    /// core; `extra_index` covers a core about to come online that the
    /// scheduler does not count yet.
    pub(crate) fn recompute<I>(&self, table: &FreqTable, active: I, extra_index: Option<usize>)
    where
        I: IntoIterator<Item = usize>,
    {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut index = extra_index.unwrap_or(0);
        for active_index in active {
            index = index.max(active_index);
        }
        state.current_index = index;

        if let Some(l2_clk) = &self.l2_clk {
            match table.step(index).l2_khz {
                Some(khz) => {
                    if let Err(e) = l2_clk.set_rate(u64::from(khz) * 1000) {
                        error!("error setting L2 clock rate for step {index}: {e}");
                        // an unapplied L2 rate also skips the bandwidth update
                        return;
                    }
                    state.last_l2_khz = Some(khz);
                }
                None => {
                    // invalid at build time: hold the last valid L2 rate
                    debug!(
                        "step {index} has no valid L2 rate, holding {:?} kHz",
                        state.last_l2_khz
                    );
                }
            }
        }

        if let Some(client) = &self.client {
            if let Err(e) = client.update_request(index) {
                error!("bandwidth request failed: {e}");
            }
        }
    }
}
