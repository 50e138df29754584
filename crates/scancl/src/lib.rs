//! Device-wide single-pass prefix scan.
//!
//! ```
//! use scancl::prelude::*;
//!
//! let client = CpuRuntime::client(&CpuDevice::default());
//! let input = client.create_from_slice(&[1u32, 2, 3, 4, 5]).unwrap();
//! let output = client.empty(5 * 4).unwrap();
//!
//! DeviceScan::exclusive_scan(&client, &input, &output, 5, Add, 0u32).unwrap();
//!
//! assert_eq!(client.read_as::<u32>(&output).unwrap(), vec![0, 1, 3, 6, 10]);
//! ```

pub use scancl_runtime::*;

pub use scancl_scan as scan;

/// The types needed to run a scan.
pub mod prelude {
    pub use crate::client::ComputeClient;
    pub use crate::load::{CacheModifier, CountingInput, ElementSource, TransformInput};
    pub use crate::memory_management::{DeviceSlice, DeviceSliceMut, Handle};
    pub use crate::{CpuDevice, CpuRuntime, Runtime};

    pub use scancl_scan::instructions::{
        Add, BitAnd, BitOr, BitXor, FnInstruction, Max, Min, Mul, ScanNumeric,
    };
    pub use scancl_scan::{DeviceScan, ScanConfig, ScanError, ScanInstruction};
}
