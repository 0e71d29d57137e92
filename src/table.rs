// CLASSIFICATION: COMMUNITY
// Filename: table.rs v0.7
// Author: Lukas Bower
// Date Modified: 2026-06-09

//! Frequency step table: built once per device, immutable afterward.
//!
//! Building rounds every configured CPU rate through the clock layer and
//! truncates at the first entry whose rounded rate is not strictly greater
//! than the previous one. A table listing rates beyond what this speed bin
//! of silicon supports is not an error; truncation just bounds the usable
//! length. L2 rates are resolved independently per step and a failure there
//! marks the step's L2 entry invalid rather than dropping the step.

use log::{error, info};

use crate::bus::{BwUsecase, BwVector};
use crate::clock::Clock;
use crate::config::FreqConfig;
use crate::errors::ConfigError;

/// One accepted table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreqStep {
    pub index: usize,
    pub cpu_khz: u32,
    /// Rounded L2 rate, `None` when absent or unresolvable for this step.
    pub l2_khz: Option<u32>,
}

/// Rounding direction when a target does not exactly match a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Lowest step at or above the target.
    AtLeast,
    /// Highest step at or below the target.
    AtMost,
}

/// Ordered, strictly increasing frequency table.
#[derive(Debug)]
pub struct FreqTable {
    steps: Vec<FreqStep>,
    usecases: Vec<BwUsecase>,
}

impl FreqTable {
    /// Build the table from the static config against the clock layer.
    pub fn build(
        cfg: &FreqConfig,
        cpu_clk: &dyn Clock,
        l2_clk: Option<&dyn Clock>,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;

        let mut steps: Vec<FreqStep> = Vec::with_capacity(cfg.steps.len());
        let mut usecases = Vec::new();
        let mut prev_khz = 0u32;

        for entry in &cfg.steps {
            let rounded_khz = match cpu_clk.round_rate(u64::from(entry.cpu_khz) * 1000) {
                Ok(hz) => (hz / 1000) as u32,
                Err(_) => break,
            };
            // Last feasible entry reached once rounding stops increasing.
            if !steps.is_empty() && rounded_khz <= prev_khz {
                break;
            }

            let index = steps.len();
            let l2_khz = match (l2_clk, entry.l2_khz) {
                (Some(clk), Some(want_khz)) => {
                    match clk.round_rate(u64::from(want_khz) * 1000) {
                        Ok(hz) => Some((hz / 1000) as u32),
                        Err(e) => {
                            error!("no L2 rate for cpu step {rounded_khz} kHz: {e}");
                            None
                        }
                    }
                }
                _ => None,
            };

            if !cfg.ports.is_empty() {
                // validate() guarantees the bandwidth column is populated
                let mbps = entry.bw_mbps.unwrap_or(0);
                usecases.push(BwUsecase {
                    vectors: cfg
                        .ports
                        .iter()
                        .map(|p| BwVector {
                            src: p.src,
                            dst: p.dst,
                            ib_bps: u64::from(mbps) * 1_000_000,
                        })
                        .collect(),
                });
            }

            steps.push(FreqStep {
                index,
                cpu_khz: rounded_khz,
                l2_khz,
            });
            prev_khz = rounded_khz;
        }

        if steps.is_empty() {
            return Err(ConfigError::NoUsableSteps);
        }
        info!(
            "frequency table built: {} steps, {}-{} kHz",
            steps.len(),
            steps[0].cpu_khz,
            prev_khz
        );
        Ok(Self { steps, usecases })
    }

    pub fn steps(&self) -> &[FreqStep] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> &FreqStep {
        &self.steps[index]
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn min_khz(&self) -> u32 {
        self.steps[0].cpu_khz
    }

    pub fn max_khz(&self) -> u32 {
        self.steps[self.steps.len() - 1].cpu_khz
    }

    /// Per-step bandwidth usecases; empty when no ports were configured.
    pub fn usecases(&self) -> &[BwUsecase] {
        &self.usecases
    }

    /// Resolve `target_khz` to a step index within `[min_khz, max_khz]`.
    pub fn resolve(
        &self,
        target_khz: u32,
        relation: Relation,
        min_khz: u32,
        max_khz: u32,
    ) -> Option<usize> {
        let mut picked = None;
        for step in &self.steps {
            if step.cpu_khz < min_khz || step.cpu_khz > max_khz {
                continue;
            }
            match relation {
                Relation::AtMost => {
                    if step.cpu_khz <= target_khz {
                        picked = Some(step.index);
                    }
                }
                Relation::AtLeast => {
                    if step.cpu_khz >= target_khz {
                        return Some(step.index);
                    }
                }
            }
        }
        picked
    }
}
