use crate::load::CacheModifier;

/// Default tuning of the device-wide scan.
///
/// These values are read once when a scan configuration is created with its defaults, explicit
/// configurations are never overridden.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ScanTuningConfig {
    /// Number of units cooperating on one tile.
    #[serde(default = "default_units_per_tile")]
    pub units_per_tile: u32,
    /// Items per unit for 4-byte elements, scaled by element size.
    #[serde(default = "default_nominal_items_per_unit")]
    pub nominal_items_per_unit: u32,
    /// Cache modifier used when loading input items.
    #[serde(default = "default_load_modifier")]
    pub load_modifier: CacheModifier,
}

impl Default for ScanTuningConfig {
    fn default() -> Self {
        Self {
            units_per_tile: default_units_per_tile(),
            nominal_items_per_unit: default_nominal_items_per_unit(),
            load_modifier: default_load_modifier(),
        }
    }
}

fn default_units_per_tile() -> u32 {
    128
}

fn default_nominal_items_per_unit() -> u32 {
    15
}

fn default_load_modifier() -> CacheModifier {
    CacheModifier::CacheStreaming
}
