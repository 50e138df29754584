mod kernel;

pub use kernel::*;

use scancl_runtime::client::ComputeClient;
use scancl_runtime::{CpuDevice, CpuRuntime, DeviceProperties, Runtime};

pub fn test_client() -> ComputeClient {
    CpuRuntime::client(&CpuDevice::default())
}

pub fn client_with(properties: DeviceProperties) -> ComputeClient {
    CpuRuntime::client_with(properties)
}
