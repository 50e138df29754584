use core::fmt::Display;
use core::mem::size_of;

use scancl_runtime::DeviceProperties;
use scancl_runtime::config::GlobalConfig;
use scancl_runtime::load::CacheModifier;
use serde::{Deserialize, Serialize};

use crate::ScanError;

/// Tuning of one device-wide scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Number of units cooperating on one tile.
    pub units_per_tile: u32,
    /// Number of consecutive items each unit loads and reduces.
    pub items_per_unit: u32,
    /// Cache modifier used when loading input items.
    pub load_modifier: CacheModifier,
    /// Number of units per cube of the status initialization kernel.
    pub init_units: u32,
    /// Synchronize after each launch, so that faults are returned by the scan itself.
    pub debug: bool,
}

impl ScanConfig {
    /// Default tuning for elements of type `T`.
    ///
    /// Reads the `[scan]` section of the [global configuration](GlobalConfig). The number of items
    /// per unit is the configured nominal count for 4-byte elements, scaled down for larger
    /// elements so that tiles keep a similar footprint.
    pub fn new<T>() -> Self {
        let defaults = &GlobalConfig::get().scan;
        let nominal = defaults.nominal_items_per_unit.max(1);

        Self {
            units_per_tile: defaults.units_per_tile,
            items_per_unit: items_per_unit(nominal, size_of::<T>()),
            load_modifier: defaults.load_modifier,
            init_units: 128,
            debug: false,
        }
    }

    /// Sets the number of units cooperating on one tile.
    pub fn with_units_per_tile(mut self, units_per_tile: u32) -> Self {
        self.units_per_tile = units_per_tile;
        self
    }

    /// Sets the number of items loaded by each unit.
    pub fn with_items_per_unit(mut self, items_per_unit: u32) -> Self {
        self.items_per_unit = items_per_unit;
        self
    }

    /// Sets the cache modifier of input loads.
    pub fn with_load_modifier(mut self, load_modifier: CacheModifier) -> Self {
        self.load_modifier = load_modifier;
        self
    }

    /// Enables synchronous checking after each launch.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Number of input items covered by one tile.
    pub fn tile_items(&self) -> usize {
        self.units_per_tile as usize * self.items_per_unit as usize
    }

    /// Checks the tuning against the device limits.
    pub fn validate(&self, properties: &DeviceProperties) -> Result<(), ScanError> {
        let max_units = properties.hardware_properties().max_units_per_cube;

        if self.units_per_tile == 0 || self.items_per_unit == 0 || self.init_units == 0 {
            return Err(ScanError::invalid(format!(
                "Tiles need at least one unit and one item per unit, got {self}"
            )));
        }
        if self.units_per_tile > max_units || self.init_units > max_units {
            return Err(ScanError::invalid(format!(
                "The device supports at most {max_units} units per cube, got {self}"
            )));
        }

        Ok(())
    }
}

fn items_per_unit(nominal: u32, elem_size: usize) -> u32 {
    let scaled = (nominal as usize * 4) / elem_size.max(1);
    scaled.clamp(1, nominal as usize) as u32
}

impl Display for ScanConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} units x {} items per tile, {:?} loads",
            self.units_per_tile, self.items_per_unit, self.load_modifier
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_per_unit_scales_with_element_size() {
        assert_eq!(items_per_unit(15, 1), 15);
        assert_eq!(items_per_unit(15, 4), 15);
        assert_eq!(items_per_unit(15, 8), 7);
        assert_eq!(items_per_unit(15, 16), 3);
        assert_eq!(items_per_unit(15, 128), 1);
        assert_eq!(items_per_unit(15, 0), 15);
    }

    #[test]
    fn invalid_tuning_is_rejected() {
        let properties = DeviceProperties::default();
        let config = ScanConfig::new::<u32>();

        assert!(config.validate(&properties).is_ok());
        assert!(matches!(
            config.with_units_per_tile(0).validate(&properties),
            Err(ScanError::InvalidLaunchConfiguration { .. })
        ));
        assert!(matches!(
            config.with_items_per_unit(0).validate(&properties),
            Err(ScanError::InvalidLaunchConfiguration { .. })
        ));
        assert!(matches!(
            config.with_units_per_tile(1 << 20).validate(&properties),
            Err(ScanError::InvalidLaunchConfiguration { .. })
        ));
    }
}
