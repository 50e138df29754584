use core::time::Duration;
use std::sync::Arc;
use std::sync::mpsc::{RecvTimeoutError, sync_channel};
use std::time::Instant;

use bytemuck::Pod;
use scancl_common::stream_id::StreamId;

use crate::DeviceProperties;
use crate::compute::{CpuServer, StreamTask};
use crate::kernel::{CubeKernel, KernelLauncher, validate_launch};
use crate::memory_management::{
    AllocationError, Handle, MemoryDeviceProperties, MemoryManagement, MemoryUsage,
};
use crate::server::{CubeCount, LaunchError, ServerError};

/// The ComputeClient is the entry point to submit work to a device.
///
/// Clones share the device. Work is submitted on the stream of the calling thread unless
/// [an explicit stream](ComputeClient::with_stream) is selected.
#[derive(Clone, Debug)]
pub struct ComputeClient {
    server: Arc<CpuServer>,
    memory: Arc<MemoryManagement>,
    properties: Arc<DeviceProperties>,
    stream_id: Option<StreamId>,
}

impl ComputeClient {
    /// Create a new client with its own device.
    pub fn new(properties: DeviceProperties, max_streams: u8) -> Self {
        let properties = Arc::new(properties);
        let memory = MemoryManagement::new(properties.memory_properties().clone());

        Self {
            server: Arc::new(CpuServer::new(properties.clone(), max_streams)),
            memory: Arc::new(memory),
            properties,
            stream_id: None,
        }
    }

    /// The properties of the device.
    pub fn properties(&self) -> &DeviceProperties {
        &self.properties
    }

    /// The memory properties of the device.
    pub fn memory_properties(&self) -> &MemoryDeviceProperties {
        self.memory.properties()
    }

    /// A client submitting its work on the given stream.
    pub fn with_stream(&self, stream_id: StreamId) -> Self {
        Self {
            stream_id: Some(stream_id),
            ..self.clone()
        }
    }

    /// The stream work is submitted on.
    pub fn stream_id(&self) -> StreamId {
        self.stream_id.unwrap_or_else(StreamId::current)
    }

    /// Reserves `size` zeroed bytes of device memory.
    pub fn empty(&self, size: usize) -> Result<Handle, AllocationError> {
        self.memory.reserve(size as u64)
    }

    /// Reserves device memory initialized with `data`.
    pub fn create(&self, data: &[u8]) -> Result<Handle, AllocationError> {
        let handle = self.empty(data.len())?;
        // SAFETY: the memory was just reserved, no kernel can see it yet.
        unsafe { handle.write_bytes(data) };
        Ok(handle)
    }

    /// Reserves device memory initialized with the given elements.
    pub fn create_from_slice<T: Pod>(&self, data: &[T]) -> Result<Handle, AllocationError> {
        self.create(bytemuck::cast_slice(data))
    }

    /// Overwrites the start of `handle` with `data` once the work already submitted on the
    /// stream is done.
    pub fn write(&self, handle: &Handle, data: &[u8]) -> Result<(), ServerError> {
        self.submit(StreamTask::Write {
            handle: handle.clone(),
            data: data.to_vec(),
        })
    }

    /// Reads the bytes of `handle` once the work already submitted on the stream is done.
    ///
    /// Faults raised by that work are returned instead of the data.
    pub fn read(&self, handle: &Handle) -> Result<Vec<u8>, ServerError> {
        let (callback, receiver) = sync_channel(1);
        self.submit(StreamTask::Read {
            handle: handle.clone(),
            callback,
        })?;

        receiver.recv().map_err(|_| stream_closed())?
    }

    /// Reads the elements of `handle` once the work already submitted on the stream is done.
    pub fn read_as<T: Pod>(&self, handle: &Handle) -> Result<Vec<T>, ServerError> {
        let bytes = self.read(handle)?;
        let len = bytes.len() / core::mem::size_of::<T>().max(1);
        Ok(bytemuck::pod_collect_to_vec(
            &bytes[..len * core::mem::size_of::<T>()],
        ))
    }

    /// Submits `kernel` on a grid of `count` cubes.
    ///
    /// The launch is checked against the device limits before anything is submitted. Faults
    /// raised while executing are only observed by the next [sync](ComputeClient::sync) or
    /// [read](ComputeClient::read) on the stream.
    pub fn launch(&self, kernel: Arc<dyn CubeKernel>, count: CubeCount) -> Result<(), LaunchError> {
        validate_launch(&self.properties, kernel.cube_dim(), count)?;

        self.server
            .submit(self.stream_id(), StreamTask::Execute { kernel, count })
            .map_err(|_| LaunchError::unsupported("The stream is closed"))
    }

    /// Waits for the work submitted on the stream, returning the first fault it raised.
    pub fn sync(&self) -> Result<(), ServerError> {
        let (callback, receiver) = sync_channel(1);
        self.submit(StreamTask::Flush { callback })?;

        receiver.recv().map_err(|_| stream_closed())?
    }

    /// Waits at most `timeout` for the work submitted on the stream.
    ///
    /// On [timeout](ServerError::Timeout) the work keeps running and its faults are kept for
    /// the next synchronization.
    pub fn sync_timeout(&self, timeout: Duration) -> Result<(), ServerError> {
        let start = Instant::now();
        let (callback, receiver) = sync_channel(1);
        self.submit(StreamTask::Flush { callback })?;

        match receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(ServerError::Timeout {
                elapsed: start.elapsed(),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(stream_closed()),
        }
    }

    /// The current memory usage of the device.
    pub fn memory_usage(&self) -> MemoryUsage {
        self.memory.memory_usage()
    }

    fn submit(&self, task: StreamTask) -> Result<(), ServerError> {
        self.server
            .submit(self.stream_id(), task)
            .map_err(|_| stream_closed())
    }
}

fn stream_closed() -> ServerError {
    ServerError::ServerUnhealthy {
        reason: "The stream thread is gone".to_string(),
    }
}

impl KernelLauncher for ComputeClient {
    fn properties(&self) -> &DeviceProperties {
        &self.properties
    }

    fn launch(&self, kernel: Arc<dyn CubeKernel>, count: CubeCount) -> Result<(), LaunchError> {
        ComputeClient::launch(self, kernel, count)
    }

    fn sync(&self) -> Result<(), ServerError> {
        ComputeClient::sync(self)
    }
}
