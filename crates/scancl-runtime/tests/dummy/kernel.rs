use std::sync::Arc;
use std::time::Duration;

use scancl_runtime::kernel::{CubeContext, CubeKernel, KernelLauncher};
use scancl_runtime::load::{CacheModifier, ElementSource, load_element};
use scancl_runtime::memory_management::{DeviceSlice, DeviceSliceMut};
use scancl_runtime::server::{CubeCount, CubeDim};

/// Adds two arrays, one cube per `ELEMS_PER_CUBE` elements.
pub struct ElementwiseAddition {
    pub lhs: DeviceSlice<u32>,
    pub rhs: DeviceSlice<u32>,
    pub out: DeviceSliceMut<u32>,
}

pub const ELEMS_PER_CUBE: usize = 16;

impl CubeKernel for ElementwiseAddition {
    fn cube_dim(&self) -> CubeDim {
        CubeDim::new_1d(ELEMS_PER_CUBE as u32)
    }

    fn execute(&self, context: &CubeContext<'_>) {
        let start = context.cube_pos as usize * ELEMS_PER_CUBE;
        let end = (start + ELEMS_PER_CUBE).min(self.out.len());

        for i in start..end {
            let lhs = load_element(&self.lhs, i, CacheModifier::CacheStreaming);
            let rhs = load_element(&self.rhs, i, CacheModifier::ReadOnlyCache);
            unsafe { self.out.write(i, lhs + rhs) };
        }
    }
}

/// Traps in the given cube.
pub struct TrapKernel {
    pub cube: u32,
}

impl CubeKernel for TrapKernel {
    fn cube_dim(&self) -> CubeDim {
        CubeDim::new_single()
    }

    fn execute(&self, context: &CubeContext<'_>) {
        if context.cube_pos == self.cube {
            panic!("Illegal address");
        }
    }
}

/// Sleeps in every cube.
pub struct SleepKernel {
    pub duration: Duration,
}

impl CubeKernel for SleepKernel {
    fn cube_dim(&self) -> CubeDim {
        CubeDim::new_single()
    }

    fn execute(&self, _context: &CubeContext<'_>) {
        std::thread::sleep(self.duration);
    }
}

/// Writes `cube_pos + 1` in one element per cube.
pub struct FillKernel {
    pub out: DeviceSliceMut<u32>,
}

impl CubeKernel for FillKernel {
    fn cube_dim(&self) -> CubeDim {
        CubeDim::new_single()
    }

    fn execute(&self, context: &CubeContext<'_>) {
        let index = context.cube_pos as usize;
        if index < self.out.len() {
            unsafe { self.out.write(index, context.cube_pos + 1) };
        }
    }
}

/// Launches a child grid from its single cube.
pub struct ParentKernel {
    pub out: DeviceSliceMut<u32>,
    pub child_trap: bool,
}

impl CubeKernel for ParentKernel {
    fn cube_dim(&self) -> CubeDim {
        CubeDim::new_single()
    }

    fn execute(&self, context: &CubeContext<'_>) {
        let launcher = match context.launcher() {
            Ok(launcher) => launcher,
            Err(err) => panic!("{err}"),
        };

        let child: Arc<dyn CubeKernel> = match self.child_trap {
            true => Arc::new(TrapKernel { cube: 0 }),
            false => Arc::new(FillKernel {
                out: self.out.clone(),
            }),
        };
        launcher
            .launch(child, CubeCount::new_1d(self.out.len() as u32))
            .unwrap();
        launcher.sync().unwrap();

        // The child is done when `launch` returns.
        let first = load_element(&self.out.as_source(), 0, CacheModifier::CacheAsVolatile);
        assert_eq!(first, 1);
        assert_eq!(self.out.as_source().len(), self.out.len());
    }
}
