use core::fmt::Debug;
use core::time::Duration;

use scancl_common::backtrace::BackTrace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::memory_management::AllocationError;

/// Kernel Launch Errors.
#[derive(Error, Clone)]
pub enum LaunchError {
    /// The device could not provide the memory needed by the launch.
    #[error("An allocation error happened during launch\nCaused by:\n  {0}")]
    Allocation(#[from] AllocationError),

    /// Too many resources were requested
    #[error("Too many resources were requested during launch\n{0}")]
    TooManyResources(#[from] ResourceLimitError),

    /// The launch path is not available on this device.
    #[error("Unsupported launch\nCaused by:\n  {reason}\nBacktrace\n{backtrace}")]
    Unsupported {
        /// Why the launch is not supported.
        reason: String,
        /// The backtrace for this error.
        backtrace: BackTrace,
    },
}

impl LaunchError {
    /// Creates an [unsupported](LaunchError::Unsupported) launch error.
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
            backtrace: BackTrace::capture(),
        }
    }
}

/// Resource limit errors.
#[derive(Error, Clone)]
pub enum ResourceLimitError {
    /// Total units exceeds maximum
    #[error(
        "Total unit count exceeds maximum.\nRequested {requested} units, max units is {max}.\nBacktrace\n{backtrace}"
    )]
    Units {
        /// Requested value
        requested: u32,
        /// Maximum value
        max: u32,
        /// The backtrace for this error.
        backtrace: BackTrace,
    },
    /// `CubeCount` exceeds maximum
    #[error(
        "Cube count exceeds maximum bounds.\nRequested {requested:?}, max is {max:?}.\nBacktrace\n{backtrace}"
    )]
    CubeCount {
        /// Requested value
        requested: (u32, u32, u32),
        /// Maximum value
        max: (u32, u32, u32),
        /// The backtrace for this error.
        backtrace: BackTrace,
    },
}

impl core::fmt::Debug for LaunchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{self}"))
    }
}

impl core::fmt::Debug for ResourceLimitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{self}"))
    }
}

/// Error that can happen asynchronously while executing registered kernels.
///
/// These errors are only observed at a synchronization point of the stream they happened on.
#[derive(Error, Clone)]
pub enum ServerError {
    /// A cube trapped while executing a kernel; the whole grid is considered failed.
    #[error(
        "Kernel {kernel} trapped in cube {cube_pos}\nCaused by:\n  {reason}\nBacktrace:\n{backtrace}"
    )]
    Execution {
        /// Name of the kernel that trapped.
        kernel: String,
        /// First cube that reported the trap.
        cube_pos: u32,
        /// The trap message.
        reason: String,
        /// The backtrace for this error.
        backtrace: BackTrace,
    },

    /// The caller stopped waiting for the stream; the work is still running.
    #[error("Timed out after {elapsed:?} while waiting for the stream to complete")]
    Timeout {
        /// How long the caller waited.
        elapsed: Duration,
    },

    /// A launch error happened while executing a task.
    #[error("A launch error happened during execution\nCaused by:\n  {0}")]
    Launch(#[from] LaunchError),

    /// The stream is in an invalid state.
    #[error("The stream is in an invalid state\nCaused by:\n  {reason}")]
    ServerUnhealthy {
        /// The details of the error.
        reason: String,
    },
}

impl core::fmt::Debug for ServerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{self}"))
    }
}

/// Specifies the number of cubes to be dispatched for a kernel.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeCount {
    /// Dispatch a known count of x, y, z cubes.
    Static(u32, u32, u32),
}

impl CubeCount {
    /// Create a new static cube count with the given x = y = z = 1.
    pub fn new_single() -> Self {
        CubeCount::Static(1, 1, 1)
    }

    /// Create a new static cube count with the given x, and y = z = 1.
    pub fn new_1d(x: u32) -> Self {
        CubeCount::Static(x, 1, 1)
    }

    /// Create a new static cube count with the given x and y, and z = 1.
    pub fn new_2d(x: u32, y: u32) -> Self {
        CubeCount::Static(x, y, 1)
    }

    /// Create a new static cube count with the given x, y and z.
    pub fn new_3d(x: u32, y: u32, z: u32) -> Self {
        CubeCount::Static(x, y, z)
    }

    /// Total number of cubes, `None` when the product overflows.
    pub fn num_cubes(&self) -> Option<u32> {
        match self {
            CubeCount::Static(x, y, z) => x.checked_mul(*y)?.checked_mul(*z),
        }
    }
}

impl Debug for CubeCount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CubeCount::Static(x, y, z) => f.write_fmt(format_args!("({x}, {y}, {z})")),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
/// The number of units across all 3 axis totalling to the number of working units in a cube.
pub struct CubeDim {
    /// The number of units in the x axis.
    pub x: u32,
    /// The number of units in the y axis.
    pub y: u32,
    /// The number of units in the z axis.
    pub z: u32,
}

impl CubeDim {
    /// Create a new cube dim with x = y = z = 1.
    pub const fn new_single() -> Self {
        Self { x: 1, y: 1, z: 1 }
    }

    /// Create a new cube dim with the given x, and y = z = 1.
    pub const fn new_1d(x: u32) -> Self {
        Self { x, y: 1, z: 1 }
    }

    /// Create a new cube dim with the given x and y, and z = 1.
    pub const fn new_2d(x: u32, y: u32) -> Self {
        Self { x, y, z: 1 }
    }

    /// Create a new cube dim with the given x, y and z.
    pub const fn new_3d(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Total numbers of units per cube
    pub const fn num_elems(&self) -> u32 {
        self.x * self.y * self.z
    }
}

impl From<(u32, u32, u32)> for CubeDim {
    fn from(value: (u32, u32, u32)) -> Self {
        CubeDim::new_3d(value.0, value.1, value.2)
    }
}

impl From<CubeDim> for (u32, u32, u32) {
    fn from(val: CubeDim) -> Self {
        (val.x, val.y, val.z)
    }
}

/// Returns the cube count needed to cover `num_elems` with cubes of `elems_per_cube`, spread
/// over the axes so that each one respects `max`.
///
/// Fails when the cubes can't fit in `max`, rather than dropping some of them.
pub fn calculate_cube_count(
    num_elems: usize,
    elems_per_cube: usize,
    max: (u32, u32, u32),
) -> Result<CubeCount, LaunchError> {
    let num_cubes = num_elems.div_ceil(elems_per_cube.max(1)) as u64;
    let spread = cube_count_spread(&max, num_cubes);
    let [x, y, z] = spread.map(|count| u32::try_from(count).unwrap_or(u32::MAX));

    if spread[0] > max.0 as u64 || spread[1] > max.1 as u64 || spread[2] > max.2 as u64 {
        return Err(ResourceLimitError::CubeCount {
            requested: (x, y, z),
            max,
            backtrace: BackTrace::capture(),
        }
        .into());
    }

    Ok(CubeCount::Static(x, y, z))
}

fn cube_count_spread(max: &(u32, u32, u32), num_cubes: u64) -> [u64; 3] {
    let max_cube_counts = [max.0 as u64, max.1 as u64, max.2 as u64];
    let mut num_cubes = [num_cubes, 1, 1];
    let base = 2;

    let mut reduce_count = |i: usize| {
        if num_cubes[i] <= max_cube_counts[i] {
            return true;
        }

        loop {
            num_cubes[i] = num_cubes[i].div_ceil(base);
            num_cubes[i + 1] *= base;

            if num_cubes[i] <= max_cube_counts[i] {
                return false;
            }
        }
    };

    for i in 0..2 {
        if reduce_count(i) {
            break;
        }
    }

    num_cubes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn safe_num_cubes_even() {
        let max = (32, 32, 32);
        let required = 2048;

        let actual = cube_count_spread(&max, required);
        let expected = [32, 32, 2];
        assert_eq!(actual, expected);
    }

    #[test_log::test]
    fn safe_num_cubes_odd() {
        let max = (48, 32, 16);
        let required = 3177;

        let actual = cube_count_spread(&max, required);
        let expected = [25, 32, 4];
        assert_eq!(actual, expected);
    }

    #[test]
    fn cube_count_covers_every_element() {
        let count = calculate_cube_count(1000, 128, (u32::MAX, 1, 1)).unwrap();

        assert_eq!(count, CubeCount::new_1d(8));
        assert_eq!(count.num_cubes(), Some(8));
    }

    #[test]
    fn cube_count_beyond_the_limits_is_an_error() {
        let result = calculate_cube_count(2049, 1, (32, 32, 2));

        assert!(matches!(
            result,
            Err(LaunchError::TooManyResources(ResourceLimitError::CubeCount {
                requested: (17, 32, 4),
                max: (32, 32, 2),
                ..
            }))
        ));
    }

    #[test]
    fn cube_count_beyond_u32_is_an_error() {
        let num_elems = u32::MAX as usize + 1;
        let result = calculate_cube_count(num_elems, 1, (u32::MAX, 1, 1));

        assert!(matches!(
            result,
            Err(LaunchError::TooManyResources(ResourceLimitError::CubeCount { .. }))
        ));
    }

    #[test]
    fn cube_count_overflow_is_detected() {
        let count = CubeCount::new_3d(u32::MAX, 2, 1);

        assert_eq!(count.num_cubes(), None);
    }
}
