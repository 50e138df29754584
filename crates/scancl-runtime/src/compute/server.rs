use std::sync::Arc;

use scancl_common::stream_id::StreamId;

use crate::DeviceProperties;
use crate::stream::{StreamFactory, StreamPool};

use super::stream::CpuStream;

pub(crate) use super::stream::StreamTask;

/// Creates the stream threads of a device.
#[derive(new, Debug)]
pub(crate) struct CpuStreamFactory {
    properties: Arc<DeviceProperties>,
}

impl StreamFactory for CpuStreamFactory {
    type Stream = CpuStream;

    fn create(&mut self, index: usize) -> Self::Stream {
        CpuStream::spawn(index, self.properties.clone())
    }
}

/// Routes tasks to the stream threads of a device.
#[derive(Debug)]
pub(crate) struct CpuServer {
    streams: spin::Mutex<StreamPool<CpuStreamFactory>>,
}

impl CpuServer {
    pub(crate) fn new(properties: Arc<DeviceProperties>, max_streams: u8) -> Self {
        Self {
            streams: spin::Mutex::new(StreamPool::new(
                CpuStreamFactory::new(properties),
                max_streams,
            )),
        }
    }

    /// Submits a task on the given stream, handing it back if the stream is gone.
    pub(crate) fn submit(&self, stream_id: StreamId, task: StreamTask) -> Result<(), StreamTask> {
        let stream = self.streams.lock().get_mut(&stream_id).clone();
        stream.submit(task)
    }
}
