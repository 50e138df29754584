#![allow(dead_code)]

use std::time::Duration;

use bytemuck::Pod;
use scancl_runtime::client::ComputeClient;
use scancl_runtime::kernel::{CubeContext, CubeKernel};
use scancl_runtime::load::{CacheModifier, ElementSource};
use scancl_runtime::memory_management::{DeviceSlice, DeviceSliceMut, Handle};
use scancl_runtime::server::CubeDim;
use scancl_runtime::memory_management::MemoryDeviceProperties;
use scancl_runtime::{CpuRuntime, DeviceProperties, Feature, HardwareProperties};
use scancl_scan::instructions::Add;
use scancl_scan::{DeviceScan, ScanConfig, ScanError, ScanInstruction};

/// Items per tile of [small_tiles].
pub const TILE: usize = 8;

pub fn client() -> ComputeClient {
    CpuRuntime::client_with(DeviceProperties::default())
}

/// Workers of [multi_worker_client], more than most test hosts have cores.
pub const WORKERS: u32 = 8;

/// A device running [WORKERS] cubes at once whatever the host parallelism, so tiles wait on
/// predecessors that are still running.
pub fn multi_worker_client() -> ComputeClient {
    CpuRuntime::client_with(DeviceProperties::new(
        &[Feature::DeviceLaunch],
        MemoryDeviceProperties::default(),
        HardwareProperties {
            num_workers: WORKERS,
            ..Default::default()
        },
    ))
}

/// Both the host-sized device and the oversubscribed one.
pub fn clients() -> [ComputeClient; 2] {
    [client(), multi_worker_client()]
}

/// Tiles of 4 units by 2 items.
pub fn small_tiles<T>() -> ScanConfig {
    ScanConfig::new::<T>()
        .with_units_per_tile(4)
        .with_items_per_unit(2)
}

/// Sequential fold, the result every scan is checked against.
pub fn reference<T: Copy>(data: &[T], identity: Option<T>, op: &impl ScanInstruction<T>) -> Vec<T> {
    let mut running = identity;
    data.iter()
        .map(|item| {
            let folded = op.fold(running, *item);
            let value = match identity {
                Some(_) => running.unwrap_or(folded),
                None => folded,
            };
            running = Some(folded);
            value
        })
        .collect()
}

/// Sizes the scratch, allocates it, scans `data` and reads the output back.
pub fn scan_slice<T, I>(
    client: &ComputeClient,
    data: &[T],
    op: I,
    identity: Option<T>,
    config: &ScanConfig,
) -> Result<Vec<T>, ScanError>
where
    T: Pod + Send + Sync,
    I: ScanInstruction<T> + Clone,
{
    let len = data.len();
    let input = client.create_from_slice(data)?;
    let output = client.empty(core::mem::size_of_val(data))?;

    let scratch_bytes = scan_handles(client, &input, &output, len, op, identity, config)?;
    log::info!("Scanned {len} items with {scratch_bytes} scratch bytes");

    let mut result = client.read_as::<T>(&output)?;
    result.truncate(len);
    Ok(result)
}

/// Runs the two-call protocol on existing buffers, returning the scratch size.
pub fn scan_handles<T, I>(
    client: &ComputeClient,
    input: &Handle,
    output: &Handle,
    len: usize,
    op: I,
    identity: Option<T>,
    config: &ScanConfig,
) -> Result<usize, ScanError>
where
    T: Pod + Send + Sync,
    I: ScanInstruction<T> + Clone,
{
    let source = DeviceSlice::<T>::new(input.clone(), len)?;
    let destination = DeviceSliceMut::<T>::new(output.clone(), len)?;

    let mut scratch_bytes = 0;
    DeviceScan::scan(
        client,
        None,
        &mut scratch_bytes,
        source.clone(),
        destination.clone(),
        op.clone(),
        identity,
        len,
        config,
    )?;

    let scratch = client.empty(scratch_bytes)?;
    DeviceScan::scan(
        client,
        Some(&scratch),
        &mut scratch_bytes,
        source,
        destination,
        op,
        identity,
        len,
        config,
    )?;

    Ok(scratch_bytes)
}

/// Counts up from zero, trapping when `poison` is loaded.
pub struct PoisonedInput {
    pub len: usize,
    pub poison: usize,
}

unsafe impl ElementSource<u32> for PoisonedInput {
    fn len(&self) -> usize {
        self.len
    }

    fn value(&self, index: usize, _modifier: CacheModifier) -> u32 {
        if index == self.poison {
            panic!("Poisoned element {index}");
        }
        index as u32
    }
}

/// Ones, sleeping before the first element is produced.
pub struct SlowInput {
    pub len: usize,
    pub delay: Duration,
}

unsafe impl ElementSource<u32> for SlowInput {
    fn len(&self) -> usize {
        self.len
    }

    fn value(&self, index: usize, _modifier: CacheModifier) -> u32 {
        if index == 0 {
            std::thread::sleep(self.delay);
        }
        1
    }
}

/// Runs an exclusive sum from inside a cube, through the device launcher.
pub struct NestedScanKernel {
    pub input: DeviceSlice<u32>,
    pub output: DeviceSliceMut<u32>,
    pub scratch: Handle,
    pub scratch_bytes: usize,
    pub config: ScanConfig,
}

impl CubeKernel for NestedScanKernel {
    fn cube_dim(&self) -> CubeDim {
        CubeDim::new_single()
    }

    fn execute(&self, context: &CubeContext<'_>) {
        let launcher = match context.launcher() {
            Ok(launcher) => launcher,
            Err(err) => panic!("{err}"),
        };
        let mut scratch_bytes = self.scratch_bytes;

        if let Err(err) = DeviceScan::scan(
            &launcher,
            Some(&self.scratch),
            &mut scratch_bytes,
            self.input.clone(),
            self.output.clone(),
            Add,
            Some(0),
            self.output.len(),
            &self.config,
        ) {
            panic!("{err}");
        }
    }
}
