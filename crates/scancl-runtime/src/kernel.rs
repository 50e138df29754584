use std::sync::Arc;

use crate::compute::{GridState, execute_grid_inline};
use crate::server::{CubeCount, CubeDim, LaunchError, ResourceLimitError, ServerError};
use crate::{DeviceProperties, Feature};
use scancl_common::backtrace::BackTrace;

/// A kernel executed by every cube of a grid.
pub trait CubeKernel: Send + Sync + 'static {
    /// Name used in logs and error messages.
    fn name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }

    /// Number of units in each cube.
    fn cube_dim(&self) -> CubeDim;

    /// Runs one cube to completion.
    ///
    /// A panic is a device trap: it fails the whole grid.
    fn execute(&self, context: &CubeContext<'_>);
}

/// What a running cube knows about itself and its grid.
pub struct CubeContext<'a> {
    /// Linear position of the cube in the grid.
    pub cube_pos: u32,
    /// Number of cubes in the grid.
    pub cube_count: CubeCount,
    /// Number of units in the cube.
    pub cube_dim: CubeDim,
    pub(crate) grid: &'a GridState,
    pub(crate) properties: &'a Arc<DeviceProperties>,
}

impl<'a> CubeContext<'a> {
    /// Whether another cube of the grid trapped.
    ///
    /// Cubes waiting on other cubes should stop once this is set, the grid is failed anyway.
    pub fn is_trapped(&self) -> bool {
        self.grid.is_trapped()
    }

    /// The properties of the device running the grid.
    pub fn properties(&self) -> &DeviceProperties {
        self.properties
    }

    /// A launcher for child grids, when the device supports [device launch](Feature::DeviceLaunch).
    pub fn launcher(&self) -> Result<DeviceLauncher<'a>, LaunchError> {
        if self.properties.feature_enabled(Feature::DeviceLaunch) {
            Ok(DeviceLauncher {
                properties: self.properties,
            })
        } else {
            Err(LaunchError::unsupported(
                "The device doesn't support launching kernels from a running cube",
            ))
        }
    }
}

/// Something that can launch kernels: the host client or a running cube.
pub trait KernelLauncher {
    /// The properties of the device kernels run on.
    fn properties(&self) -> &DeviceProperties;

    /// Launches `kernel` on a grid of `count` cubes.
    ///
    /// Kernels launched through the same launcher execute in order.
    fn launch(&self, kernel: Arc<dyn CubeKernel>, count: CubeCount) -> Result<(), LaunchError>;

    /// Waits for every launched kernel, returning the first fault they raised.
    fn sync(&self) -> Result<(), ServerError>;
}

/// Launches child grids from inside a running cube.
///
/// A child grid runs to completion on the launching worker before [launch](KernelLauncher::launch)
/// returns. A fault in the child traps the launching cube as well.
pub struct DeviceLauncher<'a> {
    properties: &'a Arc<DeviceProperties>,
}

impl KernelLauncher for DeviceLauncher<'_> {
    fn properties(&self) -> &DeviceProperties {
        self.properties
    }

    fn launch(&self, kernel: Arc<dyn CubeKernel>, count: CubeCount) -> Result<(), LaunchError> {
        validate_launch(self.properties, kernel.cube_dim(), count)?;

        if let Err(err) = execute_grid_inline(kernel.as_ref(), count, self.properties) {
            panic!("Child grid failed: {err}");
        }

        Ok(())
    }

    fn sync(&self) -> Result<(), ServerError> {
        Ok(())
    }
}

/// Checks a launch against the hardware limits.
pub(crate) fn validate_launch(
    properties: &DeviceProperties,
    cube_dim: CubeDim,
    count: CubeCount,
) -> Result<(), LaunchError> {
    let hardware = properties.hardware_properties();
    let units = cube_dim.x.checked_mul(cube_dim.y).and_then(|u| u.checked_mul(cube_dim.z));

    match units {
        Some(units) if units > 0 && units <= hardware.max_units_per_cube => {}
        _ => {
            return Err(ResourceLimitError::Units {
                requested: units.unwrap_or(u32::MAX),
                max: hardware.max_units_per_cube,
                backtrace: BackTrace::capture(),
            }
            .into());
        }
    }

    let CubeCount::Static(x, y, z) = count;
    let (max_x, max_y, max_z) = hardware.max_cube_count;
    if x > max_x || y > max_y || z > max_z || count.num_cubes().is_none() {
        return Err(ResourceLimitError::CubeCount {
            requested: (x, y, z),
            max: hardware.max_cube_count,
            backtrace: BackTrace::capture(),
        }
        .into());
    }

    Ok(())
}
