//! Device capability registry
//!
//! The decoder never discovers monitors itself. It asks a
//! [`CapabilityRegistry`] how many slots a device carries, which flow
//! produced the trace, and what each slot is called. [`StaticRegistry`] is the
//! in-memory implementation, loadable from a JSON description:
//!
//! ```json
//! {
//!   "flow_mode": "hardware",
//!   "devices": {
//!     "xilinx_u200": {
//!       "memory": ["vadd_1/m_axi_gmem", "vadd_1/m_axi_gmem1"],
//!       "accelerator": ["vadd_1"]
//!     }
//!   }
//! }
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::domain::{FlowMode, MonitorKind, RegistryError, SlotIndex};
use devtrace_common::{MAX_ACCEL_SLOTS, MAX_MEMORY_SLOTS};

/// Separator between a compute unit's name and its port name in memory slot names
pub const PORT_SEPARATOR: char = '/';

/// Read-only view of the monitors present on a device
pub trait CapabilityRegistry {
    /// Number of monitor slots of `kind` on `device`
    fn slot_count(&self, kind: MonitorKind, device: &str) -> usize;

    /// Flow that produced the trace
    fn flow_mode(&self) -> FlowMode;

    /// Display name of one slot, if the slot exists
    fn slot_display_name(&self, kind: MonitorKind, device: &str, slot: SlotIndex) -> Option<&str>;

    /// Memory slots whose traffic belongs to the given compute unit.
    ///
    /// Used to approximate a compute unit's end when its completion toggle
    /// never arrived. The default pairs slots by name: a memory slot named
    /// `cu/port` belongs to the accelerator slot named `cu`.
    fn associated_memory_slots(&self, device: &str, accel_slot: SlotIndex) -> Vec<SlotIndex> {
        let Some(cu_name) = self.slot_display_name(MonitorKind::Accelerator, device, accel_slot)
        else {
            return Vec::new();
        };

        (0..self.slot_count(MonitorKind::Memory, device))
            .map(SlotIndex)
            .filter(|&slot| {
                self.slot_display_name(MonitorKind::Memory, device, slot)
                    .and_then(|port| port.split(PORT_SEPARATOR).next())
                    .is_some_and(|prefix| prefix == cu_name)
            })
            .collect()
    }
}

/// Slot names of a single device
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceSlots {
    #[serde(default)]
    pub memory: Vec<String>,
    #[serde(default)]
    pub accelerator: Vec<String>,
}

impl DeviceSlots {
    fn names(&self, kind: MonitorKind) -> &[String] {
        match kind {
            MonitorKind::Memory => &self.memory,
            MonitorKind::Accelerator => &self.accelerator,
        }
    }
}

/// Registry backed by a fixed description
#[derive(Debug, Clone, Deserialize)]
pub struct StaticRegistry {
    flow_mode: FlowMode,
    #[serde(default)]
    devices: HashMap<String, DeviceSlots>,
}

impl StaticRegistry {
    /// Create an empty registry for the given flow
    #[must_use]
    pub fn new(flow_mode: FlowMode) -> Self {
        Self { flow_mode, devices: HashMap::new() }
    }

    /// Add (or replace) a device description
    #[must_use]
    pub fn with_device(mut self, name: impl Into<String>, slots: DeviceSlots) -> Self {
        self.devices.insert(name.into(), slots);
        self
    }

    /// Parse a registry from its JSON description
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or a device declares more
    /// slots than the monitors can address
    pub fn from_json(content: &str) -> Result<Self, RegistryError> {
        let registry: StaticRegistry = serde_json::from_str(content)?;

        for (name, slots) in &registry.devices {
            if slots.memory.len() > MAX_MEMORY_SLOTS {
                return Err(RegistryError::ParseFailed(format!(
                    "device {name} declares {} memory slots (max {MAX_MEMORY_SLOTS})",
                    slots.memory.len()
                )));
            }
            if slots.accelerator.len() > MAX_ACCEL_SLOTS {
                return Err(RegistryError::ParseFailed(format!(
                    "device {name} declares {} accelerator slots (max {MAX_ACCEL_SLOTS})",
                    slots.accelerator.len()
                )));
            }
        }

        Ok(registry)
    }

    /// Load a registry from a JSON file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Look up a device description
    ///
    /// # Errors
    /// Returns an error if the device is not described
    pub fn device(&self, name: &str) -> Result<&DeviceSlots, RegistryError> {
        self.devices.get(name).ok_or_else(|| RegistryError::UnknownDevice(name.to_string()))
    }
}

impl CapabilityRegistry for StaticRegistry {
    fn slot_count(&self, kind: MonitorKind, device: &str) -> usize {
        self.devices.get(device).map_or(0, |slots| slots.names(kind).len())
    }

    fn flow_mode(&self) -> FlowMode {
        self.flow_mode
    }

    fn slot_display_name(&self, kind: MonitorKind, device: &str, slot: SlotIndex) -> Option<&str> {
        self.devices.get(device)?.names(kind).get(slot.0).map(String::as_str)
    }
}
