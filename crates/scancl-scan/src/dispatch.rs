use core::fmt::Display;
use std::sync::Arc;

use bytemuck::Pod;
use scancl_runtime::client::ComputeClient;
use scancl_runtime::kernel::KernelLauncher;
use scancl_runtime::load::ElementSource;
use scancl_runtime::memory_management::{DeviceSlice, DeviceSliceMut, Handle};
use scancl_runtime::server::calculate_cube_count;

use crate::agent::{InitKernel, ScanKernel, TileShape};
use crate::instructions::ScanInstruction;
use crate::tile_status::{TileStatusLayout, TileStatusStore};
use crate::{ScanConfig, ScanError};

/// Launch geometry and scratch layout of one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPlan {
    /// Number of input items.
    pub num_items: usize,
    /// Number of items covered by one tile.
    pub tile_items: usize,
    /// Number of tiles, one cube each.
    pub num_tiles: usize,
    /// Layout of the tile status records in the scratch.
    pub layout: TileStatusLayout,
}

impl ScanPlan {
    /// Plans the scan of `num_items` elements of type `T`.
    pub fn new<T>(num_items: usize, config: &ScanConfig) -> Self {
        let tile_items = config.tile_items().max(1);
        let num_tiles = num_items.div_ceil(tile_items);

        Self {
            num_items,
            tile_items,
            num_tiles,
            layout: TileStatusLayout::new::<T>(num_tiles),
        }
    }

    /// Scratch bytes needed.
    pub fn scratch_size(&self) -> usize {
        self.layout.size()
    }
}

impl Display for ScanPlan {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} items in {} tiles of {}, {} scratch bytes ({:?})",
            self.num_items,
            self.num_tiles,
            self.tile_items,
            self.scratch_size(),
            self.layout
        )
    }
}

/// Device-wide prefix scan with an arbitrary associative operator.
///
/// The scan runs in a single pass: every tile publishes its aggregate in the scratch and looks
/// back at the tiles before it for the prefix it needs, instead of waiting on a grid-wide
/// barrier.
pub struct DeviceScan;

impl DeviceScan {
    /// Scratch bytes needed to scan `num_items` elements of type `T`.
    ///
    /// Pure: the same arguments always give the same size.
    pub fn scratch_size<T>(num_items: usize, config: &ScanConfig) -> usize {
        ScanPlan::new::<T>(num_items, config).scratch_size()
    }

    /// Scans `num_items` elements of `input` into `output`.
    ///
    /// Follows the two-call protocol: without `scratch`, only stores the scratch size needed in
    /// `scratch_bytes` and returns. With a scratch of at least that size, submits the scan on the
    /// launcher and returns without waiting unless `config.debug` is set; faults raised by the
    /// kernels are observed at the launcher's next synchronization.
    ///
    /// With an `identity` the scan is exclusive: `output[i]` folds `input[0..i)` and
    /// `output[0] = identity`. Without, it's inclusive: `output[i]` folds `input[0..=i]`.
    /// `output` may view the same memory as `input`.
    ///
    /// The scratch must stay untouched until the scan is done, and can't be shared with
    /// another scan in flight.
    #[allow(clippy::too_many_arguments)]
    pub fn scan<T, I, S, L>(
        launcher: &L,
        scratch: Option<&Handle>,
        scratch_bytes: &mut usize,
        input: S,
        output: DeviceSliceMut<T>,
        op: I,
        identity: Option<T>,
        num_items: usize,
        config: &ScanConfig,
    ) -> Result<(), ScanError>
    where
        T: Pod + Send + Sync,
        I: ScanInstruction<T>,
        S: ElementSource<T> + 'static,
        L: KernelLauncher + ?Sized,
    {
        config.validate(launcher.properties())?;
        let plan = ScanPlan::new::<T>(num_items, config);

        let Some(scratch) = scratch else {
            *scratch_bytes = plan.scratch_size();
            return Ok(());
        };

        if *scratch_bytes < plan.scratch_size() {
            return Err(ScanError::invalid(format!(
                "The scan needs {} scratch bytes, {} were provided",
                plan.scratch_size(),
                scratch_bytes
            )));
        }
        if input.len() < num_items || output.len() < num_items {
            return Err(ScanError::invalid(format!(
                "Scanning {num_items} items, but the input has {} and the output {}",
                input.len(),
                output.len()
            )));
        }
        let store = TileStatusStore::<T>::new(scratch.clone(), plan.layout)?;

        log::debug!("Scan plan: {plan}, {config}");
        if num_items == 0 {
            return Ok(());
        }

        let max_cube_count = launcher.properties().hardware_properties().max_cube_count;

        let init = InitKernel {
            store: store.clone(),
            sentinel: identity.unwrap_or_else(T::zeroed),
            units: config.init_units,
        };
        let init_count = calculate_cube_count(
            plan.layout.records(),
            config.init_units as usize,
            max_cube_count,
        )?;
        launcher.launch(Arc::new(init), init_count)?;
        if config.debug {
            launcher.sync()?;
        }

        let shape = TileShape::new(
            config.units_per_tile,
            config.items_per_unit,
            plan.num_tiles,
            num_items,
        );
        let kernel = ScanKernel {
            input,
            output,
            op,
            identity,
            store,
            shape,
            load_modifier: config.load_modifier,
        };
        let count = calculate_cube_count(plan.num_tiles, 1, max_cube_count)?;
        launcher.launch(Arc::new(kernel), count)?;
        if config.debug {
            launcher.sync()?;
        }

        Ok(())
    }

    /// Exclusive scan of the first `num_items` elements of `input` into `output`, allocating the
    /// scratch on the client.
    pub fn exclusive_scan<T, I>(
        client: &ComputeClient,
        input: &Handle,
        output: &Handle,
        num_items: usize,
        op: I,
        identity: T,
    ) -> Result<(), ScanError>
    where
        T: Pod + Send + Sync,
        I: ScanInstruction<T>,
    {
        Self::scan_on_client(client, input, output, num_items, op, Some(identity))
    }

    /// Inclusive scan of the first `num_items` elements of `input` into `output`, allocating the
    /// scratch on the client.
    pub fn inclusive_scan<T, I>(
        client: &ComputeClient,
        input: &Handle,
        output: &Handle,
        num_items: usize,
        op: I,
    ) -> Result<(), ScanError>
    where
        T: Pod + Send + Sync,
        I: ScanInstruction<T>,
    {
        Self::scan_on_client(client, input, output, num_items, op, None)
    }

    fn scan_on_client<T, I>(
        client: &ComputeClient,
        input: &Handle,
        output: &Handle,
        num_items: usize,
        op: I,
        identity: Option<T>,
    ) -> Result<(), ScanError>
    where
        T: Pod + Send + Sync,
        I: ScanInstruction<T>,
    {
        let config = ScanConfig::new::<T>();
        let input = DeviceSlice::<T>::new(input.clone(), num_items)?;
        let output = DeviceSliceMut::<T>::new(output.clone(), num_items)?;

        let mut scratch_bytes = Self::scratch_size::<T>(num_items, &config);
        let scratch = client.empty(scratch_bytes)?;

        Self::scan(
            client,
            Some(&scratch),
            &mut scratch_bytes,
            input,
            output,
            op,
            identity,
            num_items,
            &config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_covers_every_item() {
        let config = ScanConfig::new::<u32>()
            .with_units_per_tile(4)
            .with_items_per_unit(2);

        let plan = ScanPlan::new::<u32>(17, &config);

        assert_eq!(plan.tile_items, 8);
        assert_eq!(plan.num_tiles, 3);
        assert_eq!(plan.layout.records(), 35);
    }

    #[test]
    fn empty_plan_still_has_sentinels() {
        let config = ScanConfig::new::<u64>();

        let plan = ScanPlan::new::<u64>(0, &config);

        assert_eq!(plan.num_tiles, 0);
        assert!(plan.scratch_size() > 0);
    }
}
