//! Platform facts reported in the controller info payload.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Source of the platform values the controller reports.
pub trait SystemProbe: Send {
    fn free_memory_bytes(&self) -> u32;
    fn cpu_frequency_mhz(&self) -> u32;
    /// Link signal strength in dBm (0 when not applicable).
    fn signal_strength_dbm(&self) -> i32;
}

/// Fixed values for the static probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SystemConfig {
    pub cpu_frequency_mhz: u32,
    pub free_memory_bytes: u32,
    pub signal_strength_dbm: i32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            cpu_frequency_mhz: 240,
            free_memory_bytes: 0,
            signal_strength_dbm: 0,
        }
    }
}

/// Probe that reports configured constants.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticProbe {
    config: SystemConfig,
}

impl StaticProbe {
    pub fn new(config: SystemConfig) -> Self {
        Self { config }
    }
}

impl SystemProbe for StaticProbe {
    fn free_memory_bytes(&self) -> u32 {
        self.config.free_memory_bytes
    }

    fn cpu_frequency_mhz(&self) -> u32 {
        self.config.cpu_frequency_mhz
    }

    fn signal_strength_dbm(&self) -> i32 {
        self.config.signal_strength_dbm
    }
}
