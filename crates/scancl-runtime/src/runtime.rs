use hashbrown::HashMap;

use crate::DeviceProperties;
use crate::client::ComputeClient;
use crate::config::GlobalConfig;

/// Runtime for ScanCL.
pub trait Runtime: Sized + Send + Sync + 'static + core::fmt::Debug {
    /// The device used to retrieve the compute client.
    type Device: Default + Clone + core::fmt::Debug;

    /// Retrieve the compute client from the runtime device.
    fn client(device: &Self::Device) -> ComputeClient;

    /// The runtime name.
    fn name() -> &'static str;
}

/// A host device, identified by its index.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CpuDevice {
    /// Index of the device.
    pub index: usize,
}

/// Runtime executing kernels on host threads.
#[derive(Debug)]
pub struct CpuRuntime;

static CLIENTS: spin::Mutex<Option<HashMap<CpuDevice, ComputeClient>>> = spin::Mutex::new(None);

impl CpuRuntime {
    /// Creates a client for a new device with the given properties.
    ///
    /// Unlike [Runtime::client], the client isn't cached: every call creates a new device.
    pub fn client_with(properties: DeviceProperties) -> ComputeClient {
        let max_streams = GlobalConfig::get().streaming.max_streams;
        ComputeClient::new(properties, max_streams)
    }

    /// The properties of a default host device.
    pub fn default_properties() -> DeviceProperties {
        DeviceProperties::default()
    }
}

impl Runtime for CpuRuntime {
    type Device = CpuDevice;

    fn client(device: &Self::Device) -> ComputeClient {
        let mut clients = CLIENTS.lock();

        clients
            .get_or_insert_with(HashMap::new)
            .entry(*device)
            .or_insert_with(|| {
                log::debug!("Creating client for {device:?}");
                Self::client_with(Self::default_properties())
            })
            .clone()
    }

    fn name() -> &'static str {
        "cpu"
    }
}
