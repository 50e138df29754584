use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use scancl_common::backtrace::BackTrace;

use crate::DeviceProperties;
use crate::kernel::{CubeContext, CubeKernel};
use crate::server::{CubeCount, ServerError};

/// Shared state of one grid execution.
#[derive(Debug, Default)]
pub(crate) struct GridState {
    next_cube: AtomicU64,
    trapped: AtomicBool,
    fault: spin::Mutex<Option<Fault>>,
}

#[derive(Debug)]
struct Fault {
    cube_pos: u32,
    reason: String,
}

impl GridState {
    pub(crate) fn is_trapped(&self) -> bool {
        self.trapped.load(Ordering::Acquire)
    }

    fn trap(&self, cube_pos: u32, reason: String) {
        let mut fault = self.fault.lock();
        if fault.is_none() {
            *fault = Some(Fault { cube_pos, reason });
        }
        self.trapped.store(true, Ordering::Release);
    }

    /// Claims the next cube to run.
    ///
    /// Cubes are claimed in ascending order, so every cube below the returned one is already
    /// running or done.
    fn claim(&self, num_cubes: u32) -> Option<u32> {
        if self.is_trapped() {
            return None;
        }
        let cube_pos = self.next_cube.fetch_add(1, Ordering::Relaxed);
        (cube_pos < num_cubes as u64).then_some(cube_pos as u32)
    }

    fn into_result(self, kernel: &dyn CubeKernel) -> Result<(), ServerError> {
        match self.fault.into_inner() {
            None => Ok(()),
            Some(Fault { cube_pos, reason }) => Err(ServerError::Execution {
                kernel: kernel.name().to_string(),
                cube_pos,
                reason,
                backtrace: BackTrace::capture(),
            }),
        }
    }
}

/// Executes every cube of the grid on up to `num_workers` threads, returning once all claimed
/// cubes are done.
pub(crate) fn execute_grid(
    kernel: &dyn CubeKernel,
    count: CubeCount,
    properties: &Arc<DeviceProperties>,
    num_workers: u32,
) -> Result<(), ServerError> {
    let num_cubes = count.num_cubes().unwrap_or(u32::MAX);
    let num_workers = num_workers.clamp(1, num_cubes.max(1));
    let grid = GridState::default();

    if num_workers == 1 {
        work(kernel, count, num_cubes, &grid, properties);
    } else {
        std::thread::scope(|scope| {
            for _ in 1..num_workers {
                scope.spawn(|| work(kernel, count, num_cubes, &grid, properties));
            }
            work(kernel, count, num_cubes, &grid, properties);
        });
    }

    grid.into_result(kernel)
}

/// Executes every cube of the grid on the calling thread, in ascending order.
pub(crate) fn execute_grid_inline(
    kernel: &dyn CubeKernel,
    count: CubeCount,
    properties: &Arc<DeviceProperties>,
) -> Result<(), ServerError> {
    execute_grid(kernel, count, properties, 1)
}

fn work(
    kernel: &dyn CubeKernel,
    cube_count: CubeCount,
    num_cubes: u32,
    grid: &GridState,
    properties: &Arc<DeviceProperties>,
) {
    let cube_dim = kernel.cube_dim();

    while let Some(cube_pos) = grid.claim(num_cubes) {
        let context = CubeContext {
            cube_pos,
            cube_count,
            cube_dim,
            grid,
            properties,
        };

        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| kernel.execute(&context))) {
            let reason = match payload.downcast::<String>() {
                Ok(msg) => *msg,
                Err(payload) => match payload.downcast::<&'static str>() {
                    Ok(msg) => msg.to_string(),
                    Err(_) => "Unknown trap".to_string(),
                },
            };
            log::warn!("Kernel {} trapped in cube {cube_pos}: {reason}", kernel.name());
            grid.trap(cube_pos, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::AtomicU32;

    use super::*;
    use crate::server::CubeDim;

    struct CountCubes {
        executed: AtomicU32,
        trap_at: Option<u32>,
    }

    impl CubeKernel for CountCubes {
        fn cube_dim(&self) -> CubeDim {
            CubeDim::new_single()
        }

        fn execute(&self, context: &CubeContext<'_>) {
            if Some(context.cube_pos) == self.trap_at {
                panic!("Trap at {}", context.cube_pos);
            }
            self.executed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn kernel(trap_at: Option<u32>) -> CountCubes {
        CountCubes {
            executed: AtomicU32::new(0),
            trap_at,
        }
    }

    #[test_log::test]
    fn every_cube_runs_once() {
        let properties = Arc::new(DeviceProperties::default());
        let kernel = kernel(None);

        execute_grid(&kernel, CubeCount::new_2d(50, 3), &properties, 4).unwrap();

        assert_eq!(kernel.executed.load(Ordering::Relaxed), 150);
    }

    #[test_log::test]
    fn empty_grid_runs_nothing() {
        let properties = Arc::new(DeviceProperties::default());
        let kernel = kernel(None);

        execute_grid(&kernel, CubeCount::new_1d(0), &properties, 4).unwrap();

        assert_eq!(kernel.executed.load(Ordering::Relaxed), 0);
    }

    #[test_log::test]
    fn trap_fails_the_grid() {
        let properties = Arc::new(DeviceProperties::default());
        let kernel = kernel(Some(3));

        let result = execute_grid_inline(&kernel, CubeCount::new_1d(10), &properties);

        match result {
            Err(ServerError::Execution {
                cube_pos, reason, ..
            }) => {
                assert_eq!(cube_pos, 3);
                assert_eq!(reason, "Trap at 3");
            }
            other => panic!("Expected an execution error, got {other:?}"),
        }
        // Inline execution stops claiming cubes after the trap.
        assert_eq!(kernel.executed.load(Ordering::Relaxed), 3);
    }
}
