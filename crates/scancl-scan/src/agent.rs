use bytemuck::Pod;
use scancl_runtime::kernel::{CubeContext, CubeKernel};
use scancl_runtime::load::{CacheModifier, ElementSource, load_element};
use scancl_runtime::memory_management::DeviceSliceMut;
use scancl_runtime::server::CubeDim;

use crate::instructions::ScanInstruction;
use crate::tile_status::{TileStatus, TileStatusStore};

/// Number of polls of an unpublished record before yielding the worker.
const SPINS_BEFORE_YIELD: u32 = 64;

/// Resets the tile status records, one record per unit.
pub(crate) struct InitKernel<T> {
    pub store: TileStatusStore<T>,
    pub sentinel: T,
    pub units: u32,
}

impl<T: Pod + Send + Sync> CubeKernel for InitKernel<T> {
    fn name(&self) -> &'static str {
        "scan::init_tile_status"
    }

    fn cube_dim(&self) -> CubeDim {
        CubeDim::new_1d(self.units)
    }

    fn execute(&self, context: &CubeContext<'_>) {
        let records = self.store.layout().records();
        let start = context.cube_pos as usize * self.units as usize;
        let end = (start + self.units as usize).min(records);

        for record in start..end {
            self.store.reset(record, self.sentinel);
        }
    }
}

/// Geometry of the scan kernel.
#[derive(new, Debug, Clone, Copy)]
pub(crate) struct TileShape {
    pub units: u32,
    pub items_per_unit: u32,
    pub num_tiles: usize,
    pub num_items: usize,
}

impl TileShape {
    fn tile_items(&self) -> usize {
        self.units as usize * self.items_per_unit as usize
    }
}

/// One cube per tile: load, local scan, publish and look-back, write.
pub(crate) struct ScanKernel<T, I, S> {
    pub input: S,
    pub output: DeviceSliceMut<T>,
    pub op: I,
    pub identity: Option<T>,
    pub store: TileStatusStore<T>,
    pub shape: TileShape,
    pub load_modifier: CacheModifier,
}

impl<T, I, S> CubeKernel for ScanKernel<T, I, S>
where
    T: Pod + Send + Sync,
    I: ScanInstruction<T>,
    S: ElementSource<T> + 'static,
{
    fn name(&self) -> &'static str {
        match self.identity {
            Some(_) => "scan::exclusive",
            None => "scan::inclusive",
        }
    }

    fn cube_dim(&self) -> CubeDim {
        CubeDim::new_1d(self.shape.units)
    }

    fn execute(&self, context: &CubeContext<'_>) {
        let tile = context.cube_pos as usize;
        // The cube count may be rounded up when spread over several axes.
        if tile >= self.shape.num_tiles {
            return;
        }

        let start = tile * self.shape.tile_items();
        let end = (start + self.shape.tile_items()).min(self.shape.num_items);

        // The whole tile is read before anything is written, so the output may alias the input.
        let items = self.load_tile(start, end);
        let unit_prefixes = self.unit_prefixes(&items);
        let Some(aggregate) = unit_prefixes.last().copied() else {
            return;
        };

        let tile_prefix = if tile == 0 {
            self.store.set_inclusive(tile, aggregate);
            None
        } else {
            self.store.set_partial(tile, aggregate);
            let Some(prefix) = look_back(&self.store, &self.op, tile, || context.is_trapped())
            else {
                return;
            };
            self.store
                .set_inclusive(tile, self.op.combine(prefix, aggregate));
            Some(prefix)
        };

        self.write_tile(start, &items, &unit_prefixes, tile_prefix);
    }
}

/// Walks the records of the tiles before `tile` until an inclusive prefix is found, returning
/// the exclusive prefix of `tile`.
///
/// Returns `None` when `is_trapped` reports a failed grid while waiting on a record.
fn look_back<T, I>(
    store: &TileStatusStore<T>,
    op: &I,
    tile: usize,
    is_trapped: impl Fn() -> bool,
) -> Option<T>
where
    T: Pod,
    I: ScanInstruction<T>,
{
    // Values found further back cover lower indices than what was accumulated so far.
    let prepend = |value: T, accumulated: Option<T>| match accumulated {
        Some(accumulated) => op.combine(value, accumulated),
        None => value,
    };
    let mut exclusive: Option<T> = None;
    let mut predecessor = tile as isize - 1;
    let mut spins = 0;

    loop {
        match store.load(predecessor) {
            TileStatus::Inclusive(prefix) => return Some(prepend(prefix, exclusive)),
            TileStatus::Partial(aggregate) => {
                exclusive = Some(prepend(aggregate, exclusive));
                predecessor -= 1;
                spins = 0;
            }
            TileStatus::Invalid => {
                if is_trapped() {
                    return None;
                }
                spins += 1;
                if spins % SPINS_BEFORE_YIELD == 0 {
                    std::thread::yield_now();
                } else {
                    core::hint::spin_loop();
                }
            }
        }
    }
}

impl<T, I, S> ScanKernel<T, I, S>
where
    T: Pod + Send + Sync,
    I: ScanInstruction<T>,
    S: ElementSource<T>,
{
    /// Blocked arrangement: unit `u` owns items `u * items_per_unit..(u + 1) * items_per_unit`.
    fn load_tile(&self, start: usize, end: usize) -> Vec<T> {
        (start..end)
            .map(|index| load_element(&self.input, index, self.load_modifier))
            .collect()
    }

    /// Inclusive prefixes of the unit aggregates.
    fn unit_prefixes(&self, items: &[T]) -> Vec<T> {
        let mut prefixes: Vec<T> = items
            .chunks(self.shape.items_per_unit as usize)
            .map(|chunk| {
                chunk
                    .iter()
                    .skip(1)
                    .fold(chunk[0], |acc, item| self.op.combine(acc, *item))
            })
            .collect();

        // Kogge-Stone: after the step with offset `k`, unit `u` holds the fold of the units
        // `u + 1 - 2k..=u`.
        let mut previous = prefixes.clone();
        let mut offset = 1;
        while offset < prefixes.len() {
            for unit in offset..prefixes.len() {
                prefixes[unit] = self.op.combine(previous[unit - offset], previous[unit]);
            }
            previous.copy_from_slice(&prefixes);
            offset *= 2;
        }

        prefixes
    }

    fn write_tile(&self, start: usize, items: &[T], unit_prefixes: &[T], tile_prefix: Option<T>) {
        let items_per_unit = self.shape.items_per_unit as usize;

        for (unit, chunk) in items.chunks(items_per_unit).enumerate() {
            let unit_exclusive = match unit {
                0 => None,
                _ => Some(unit_prefixes[unit - 1]),
            };
            let mut running = match (tile_prefix, unit_exclusive) {
                (Some(prefix), Some(local)) => Some(self.op.combine(prefix, local)),
                (prefix, None) => prefix,
                (None, local) => local,
            };

            for (offset, item) in chunk.iter().enumerate() {
                let index = start + unit * items_per_unit + offset;
                let value = match self.identity {
                    Some(identity) => {
                        let value = running.unwrap_or(identity);
                        running = Some(self.op.fold(running, *item));
                        value
                    }
                    None => {
                        let value = self.op.fold(running, *item);
                        running = Some(value);
                        value
                    }
                };
                // SAFETY: every index belongs to exactly one tile and one unit.
                unsafe { self.output.write(index, value) };
            }
        }
    }
}
