//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent common bugs like passing a memory slot where
//! an accelerator slot is expected, and make function signatures more
//! expressive.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Monitor slot index (0-based within one monitor kind)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SlotIndex(pub usize);

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

/// Device clock cycles
///
/// Raw counter values are fixed-width and wrap; values of this type have
/// already had overflow correction applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub struct DeviceCycles(pub u64);

impl DeviceCycles {
    /// Inclusive span from `start` to `self`, in cycles
    #[must_use]
    pub fn span_from(self, start: DeviceCycles) -> u64 {
        self.0.saturating_sub(start.0) + 1
    }
}

impl fmt::Display for DeviceCycles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}cyc", self.0)
    }
}

/// Kind of performance monitor a channel belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorKind {
    /// Memory port monitor (read/write bursts)
    Memory,
    /// Compute unit monitor (execution spans and stalls)
    Accelerator,
}

impl fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorKind::Memory => write!(f, "memory"),
            MonitorKind::Accelerator => write!(f, "accel"),
        }
    }
}

/// Logical correlation unit: one monitored port or compute unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChannelId {
    pub kind: MonitorKind,
    pub slot: SlotIndex,
}

impl ChannelId {
    #[must_use]
    pub fn memory(slot: usize) -> Self {
        Self { kind: MonitorKind::Memory, slot: SlotIndex(slot) }
    }

    #[must_use]
    pub fn accelerator(slot: usize) -> Self {
        Self { kind: MonitorKind::Accelerator, slot: SlotIndex(slot) }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.slot.0)
    }
}

/// Group of monitors sharing one clock domain and one calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorGroup {
    Memory,
    Host,
    Accelerator,
    Stall,
    Stream,
}

impl MonitorGroup {
    /// Number of groups (size of per-group tables)
    pub const COUNT: usize = 5;

    /// Position of this group in per-group tables
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            MonitorGroup::Memory => 0,
            MonitorGroup::Host => 1,
            MonitorGroup::Accelerator => 2,
            MonitorGroup::Stall => 3,
            MonitorGroup::Stream => 4,
        }
    }
}

impl fmt::Display for MonitorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorGroup::Memory => "memory",
            MonitorGroup::Host => "host",
            MonitorGroup::Accelerator => "accel",
            MonitorGroup::Stall => "stall",
            MonitorGroup::Stream => "stream",
        };
        write!(f, "{name}")
    }
}

impl FromStr for MonitorGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(MonitorGroup::Memory),
            "host" => Ok(MonitorGroup::Host),
            "accel" | "accelerator" => Ok(MonitorGroup::Accelerator),
            "stall" => Ok(MonitorGroup::Stall),
            "stream" => Ok(MonitorGroup::Stream),
            other => Err(format!("unknown monitor group: {other}")),
        }
    }
}

/// How the device trace was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowMode {
    /// Real hardware: host time only on the clock-training prologue
    Hardware,
    /// Hardware emulation: host time on every sample
    HardwareEmulation,
}
