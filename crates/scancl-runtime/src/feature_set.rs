use std::collections::BTreeSet;

use crate::load::{LOAD_CAPABILITY, LoadCapability};
use crate::memory_management::MemoryDeviceProperties;

/// Optional capabilities of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    /// Kernels may launch child grids from inside a running cube.
    DeviceLaunch,
}

/// Limits of the execution hardware.
#[derive(Debug, Clone)]
pub struct HardwareProperties {
    /// Number of worker threads executing the cubes of one grid concurrently.
    pub num_workers: u32,
    /// Maximum number of units in one cube.
    pub max_units_per_cube: u32,
    /// Maximum cube count on each axis.
    pub max_cube_count: (u32, u32, u32),
}

impl Default for HardwareProperties {
    fn default() -> Self {
        let num_workers = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1);

        Self {
            num_workers,
            max_units_per_cube: 1024,
            max_cube_count: (u32::MAX, u16::MAX as u32, u16::MAX as u32),
        }
    }
}

/// Properties of what the device can do, like what [features](Feature) are supported by it,
/// its memory properties and its hardware limits.
#[derive(Debug, Clone)]
pub struct DeviceProperties {
    set: BTreeSet<Feature>,
    memory: MemoryDeviceProperties,
    hardware: HardwareProperties,
    load_capability: LoadCapability,
}

impl DeviceProperties {
    /// Create a new property set with the given features, memory and hardware properties.
    pub fn new(
        features: &[Feature],
        memory_props: MemoryDeviceProperties,
        hardware: HardwareProperties,
    ) -> Self {
        DeviceProperties {
            set: features.iter().copied().collect(),
            memory: memory_props,
            hardware,
            load_capability: LOAD_CAPABILITY,
        }
    }

    /// Check if the provided [feature](Feature) is supported by the device.
    pub fn feature_enabled(&self, feature: Feature) -> bool {
        self.set.contains(&feature)
    }

    /// Register a [feature](Feature) supported by the device.
    pub fn register_feature(&mut self, feature: Feature) -> bool {
        self.set.insert(feature)
    }

    /// The memory properties of this device.
    pub fn memory_properties(&self) -> &MemoryDeviceProperties {
        &self.memory
    }

    /// The hardware properties of this device.
    pub fn hardware_properties(&self) -> &HardwareProperties {
        &self.hardware
    }

    /// The cache hint level the loads were built with.
    pub fn load_capability(&self) -> LoadCapability {
        self.load_capability
    }
}

impl Default for DeviceProperties {
    fn default() -> Self {
        Self::new(
            &[Feature::DeviceLaunch],
            MemoryDeviceProperties::default(),
            HardwareProperties::default(),
        )
    }
}
