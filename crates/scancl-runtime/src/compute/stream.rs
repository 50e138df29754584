use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, SyncSender};
use std::time::Instant;

use crate::DeviceProperties;
use crate::config::streaming::StreamingLogLevel;
use crate::kernel::CubeKernel;
use crate::logging::ServerLogger;
use crate::memory_management::Handle;
use crate::server::{CubeCount, ServerError};

use super::execute_grid;

/// Work submitted to a stream, executed in submission order.
pub(crate) enum StreamTask {
    Execute {
        kernel: Arc<dyn CubeKernel>,
        count: CubeCount,
    },
    Write {
        handle: Handle,
        data: Vec<u8>,
    },
    Read {
        handle: Handle,
        callback: SyncSender<Result<Vec<u8>, ServerError>>,
    },
    Flush {
        callback: SyncSender<Result<(), ServerError>>,
    },
}

/// Host side of a stream.
#[derive(Debug, Clone)]
pub(crate) struct CpuStream {
    sender: Sender<StreamTask>,
}

impl CpuStream {
    /// Spawns the thread executing the stream's tasks.
    pub(crate) fn spawn(index: usize, properties: Arc<DeviceProperties>) -> Self {
        let (sender, receiver) = std::sync::mpsc::channel();

        std::thread::Builder::new()
            .name(format!("scancl-stream-{index}"))
            .spawn(move || {
                let mut server = StreamServer {
                    index,
                    properties,
                    logger: ServerLogger::new(),
                    errors: Vec::new(),
                };
                server.run(receiver);
            })
            .map(|_| ())
            .unwrap_or_else(|err| log::error!("Can't spawn stream {index}: {err}"));

        Self { sender }
    }

    /// Submits a task, handing it back if the stream thread is gone.
    pub(crate) fn submit(&self, task: StreamTask) -> Result<(), StreamTask> {
        self.sender.send(task).map_err(|err| err.0)
    }
}

struct StreamServer {
    index: usize,
    properties: Arc<DeviceProperties>,
    logger: ServerLogger,
    errors: Vec<ServerError>,
}

impl StreamServer {
    fn run(&mut self, receiver: Receiver<StreamTask>) {
        self.logger
            .log_streaming(StreamingLogLevel::Basic, format!("Stream {} started", self.index));
        log::trace!("Stream {} started", self.index);

        for task in receiver.iter() {
            match task {
                StreamTask::Execute { kernel, count } => self.execute(kernel, count),
                StreamTask::Write { handle, data } => {
                    // SAFETY: tasks of a stream run one at a time, the kernels reading this
                    // memory are either done or not started.
                    unsafe { handle.write_bytes(&data) };
                }
                StreamTask::Read { handle, callback } => {
                    let result = match self.take_error() {
                        Some(err) => Err(err),
                        // SAFETY: see `Write`.
                        None => Ok(unsafe { handle.read_bytes() }),
                    };
                    if let Err(err) = callback.send(result) {
                        self.restore_error(err.0.err());
                    }
                }
                StreamTask::Flush { callback } => self.flush(callback),
            }
        }

        log::trace!("Stream {} stopped", self.index);
    }

    fn execute(&mut self, kernel: Arc<dyn CubeKernel>, count: CubeCount) {
        self.logger.log_streaming(
            StreamingLogLevel::Full,
            format!("Stream {} executes {} on {count:?}", self.index, kernel.name()),
        );

        let num_workers = self.properties.hardware_properties().num_workers;
        let start = Instant::now();
        let result = execute_grid(kernel.as_ref(), count, &self.properties, num_workers);

        if self.logger.profile_level().is_some() {
            self.logger.register_profiled(kernel.name(), start.elapsed());
        }
        if let Err(err) = result {
            self.errors.push(err);
        }
    }

    fn flush(&mut self, callback: SyncSender<Result<(), ServerError>>) {
        self.logger
            .log_streaming(StreamingLogLevel::Basic, format!("Stream {} flushed", self.index));
        self.logger.profile_summary();

        let result = match self.take_error() {
            Some(err) => Err(err),
            None => Ok(()),
        };

        // The caller may have stopped waiting, keep the error for the next sync.
        if let Err(err) = callback.send(result) {
            self.restore_error(err.0.err());
        }
    }

    /// Takes the first pending error, dropping the others.
    fn take_error(&mut self) -> Option<ServerError> {
        let mut errors = core::mem::take(&mut self.errors).into_iter();
        let first = errors.next();
        for ignored in errors {
            log::warn!("Stream {} dropped a later error: {ignored}", self.index);
        }
        first
    }

    fn restore_error(&mut self, error: Option<ServerError>) {
        if let Some(error) = error {
            self.errors.insert(0, error);
        }
    }
}
