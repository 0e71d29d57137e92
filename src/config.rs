// CLASSIFICATION: COMMUNITY
// Filename: config.rs v0.4
// Author: Lukas Bower
// Date Modified: 2026-05-18

//! Static frequency/bandwidth configuration, read once at initialization.
//!
//! Mirrors the board-supplied table: per step a CPU clock target, an
//! optional L2 clock target and an optional bandwidth value in Mbps, plus a
//! fixed list of bus endpoint pairs used to expand each bandwidth value into
//! per-path vectors.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::errors::ConfigError;

/// One configured frequency step before rounding against the clock layer.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct StepEntry {
    pub cpu_khz: u32,
    #[serde(default)]
    pub l2_khz: Option<u32>,
    #[serde(default)]
    pub bw_mbps: Option<u32>,
}

/// A `(source, destination)` bus endpoint pair.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct PortPair {
    pub src: u32,
    pub dst: u32,
}

/// Complete scaling configuration for one device.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
pub struct FreqConfig {
    pub steps: Vec<StepEntry>,
    #[serde(default)]
    pub ports: Vec<PortPair>,
}

impl FreqConfig {
    pub fn from_yaml_str(data: &str) -> Result<Self, ConfigError> {
        let cfg: FreqConfig =
            serde_yaml::from_str(data).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_yaml_str(&data)
    }

    /// Structural checks that do not need the clock layer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps.is_empty() {
            return Err(ConfigError::EmptyTable);
        }
        let any_bw = self.steps.iter().any(|s| s.bw_mbps.is_some());
        if any_bw && self.ports.is_empty() {
            return Err(ConfigError::MissingPorts);
        }
        if !self.ports.is_empty() {
            // the bandwidth column must be fully populated once ports exist
            for (i, step) in self.steps.iter().enumerate() {
                if step.bw_mbps.is_none() {
                    return Err(ConfigError::Parse(format!("step {i} missing bw_mbps")));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal() {
        let cfg = FreqConfig::from_yaml_str("steps:\n  - cpu_khz: 300000\n").unwrap();
        assert_eq!(cfg.steps.len(), 1);
        assert!(cfg.ports.is_empty());
    }

    #[test]
    fn bandwidth_without_ports_rejected() {
        let text = "steps:\n  - cpu_khz: 300000\n    bw_mbps: 1600\n";
        assert_eq!(
            FreqConfig::from_yaml_str(text),
            Err(ConfigError::MissingPorts)
        );
    }

    #[test]
    fn empty_steps_rejected() {
        assert_eq!(
            FreqConfig::from_yaml_str("steps: []\n"),
            Err(ConfigError::EmptyTable)
        );
    }
}
