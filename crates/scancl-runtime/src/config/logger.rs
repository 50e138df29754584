use core::fmt::Display;
use std::sync::Arc;

use hashbrown::HashMap;

#[cfg(std_io)]
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::PathBuf,
};

use super::{GlobalConfig, profiling::ProfilingLogLevel, streaming::StreamingLogLevel};

/// Configuration of one log destination set, parameterized by a log level type.
///
/// Several destinations can be active at the same time.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct LoggerConfig<L: LogLevel> {
    /// Path to the log file, if file logging is enabled.
    #[serde(default)]
    #[cfg(std_io)]
    pub file: Option<PathBuf>,

    /// Whether to append to the log file (true) or overwrite it (false). Defaults to true.
    #[serde(default = "append_default")]
    pub append: bool,

    /// Whether to log to standard output.
    #[serde(default)]
    pub stdout: bool,

    /// Whether to log to standard error.
    #[serde(default)]
    pub stderr: bool,

    /// Forward messages to the `log` crate at the given level.
    #[serde(default)]
    pub log: Option<LogCrateLevel>,

    /// The log level for this logger, determining verbosity.
    #[serde(default)]
    pub level: L,
}

impl<L: LogLevel> Default for LoggerConfig<L> {
    fn default() -> Self {
        Self {
            #[cfg(std_io)]
            file: None,
            append: true,
            stdout: false,
            stderr: false,
            log: None,
            level: L::default(),
        }
    }
}

/// Log levels using the `log` crate.
#[derive(
    Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize, Hash, PartialEq, Eq,
)]
pub enum LogCrateLevel {
    /// Logs informational messages.
    #[default]
    #[serde(rename = "info")]
    Info,

    /// Logs debugging messages.
    #[serde(rename = "debug")]
    Debug,

    /// Logs trace-level messages.
    #[serde(rename = "trace")]
    Trace,
}

fn append_default() -> bool {
    true
}

/// Trait for types that can be used as log levels in [LoggerConfig].
pub trait LogLevel:
    serde::de::DeserializeOwned + serde::Serialize + Clone + Copy + core::fmt::Debug + Default
{
}

/// Routes runtime events to the destinations selected by the global configuration.
#[derive(Debug)]
pub struct Logger {
    loggers: Vec<LoggerKind>,
    streaming_index: Vec<usize>,
    profiling_index: Vec<usize>,

    /// Global configuration the logger was built from.
    pub config: Arc<GlobalConfig>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Hash, PartialEq, Eq)]
enum LoggerId {
    #[cfg(std_io)]
    File(PathBuf),
    Stdout,
    Stderr,
    LogCrate(LogCrateLevel),
}

#[derive(Default)]
struct Registry {
    loggers: Vec<LoggerKind>,
    ids: HashMap<LoggerId, usize>,
}

impl Registry {
    fn index(&mut self, id: LoggerId, create: impl FnOnce() -> Option<LoggerKind>) -> Option<usize> {
        if let Some(index) = self.ids.get(&id) {
            return Some(*index);
        }

        let logger = create()?;
        let index = self.loggers.len();
        self.ids.insert(id, index);
        self.loggers.push(logger);
        Some(index)
    }

    fn register<L: LogLevel>(&mut self, config: &LoggerConfig<L>) -> Vec<usize> {
        let mut indices = Vec::new();

        #[cfg(std_io)]
        if let Some(file) = &config.file {
            let append = config.append;
            indices.extend(self.index(LoggerId::File(file.clone()), || {
                FileLogger::new(file, append).map(LoggerKind::File)
            }));
        }

        if config.stdout {
            indices.extend(self.index(LoggerId::Stdout, || Some(LoggerKind::Stdout)));
        }

        if config.stderr {
            indices.extend(self.index(LoggerId::Stderr, || Some(LoggerKind::Stderr)));
        }

        if let Some(level) = config.log {
            indices.extend(self.index(LoggerId::LogCrate(level), || {
                Some(LoggerKind::Log(level))
            }));
        }

        indices
    }
}

impl Logger {
    /// Creates a new logger based on the global configuration.
    ///
    /// Creating a logger opens the configured files; keep one per server.
    pub fn new() -> Self {
        Self::from_config(GlobalConfig::get())
    }

    /// Creates a new logger based on the provided configuration.
    pub fn from_config(config: Arc<GlobalConfig>) -> Self {
        let mut registry = Registry::default();

        let streaming_index = match config.streaming.logger.level {
            StreamingLogLevel::Disabled => Vec::new(),
            _ => registry.register(&config.streaming.logger),
        };
        let profiling_index = match config.profiling.logger.level {
            ProfilingLogLevel::Disabled => Vec::new(),
            _ => registry.register(&config.profiling.logger),
        };

        Self {
            loggers: registry.loggers,
            streaming_index,
            profiling_index,
            config,
        }
    }

    /// Logs a message for streaming, directing it to all configured streaming loggers.
    pub fn log_streaming<S: Display>(&mut self, msg: &S) {
        Self::dispatch(&mut self.loggers, &self.streaming_index, msg);
    }

    /// Logs a message for profiling, directing it to all configured profiling loggers.
    pub fn log_profiling<S: Display>(&mut self, msg: &S) {
        Self::dispatch(&mut self.loggers, &self.profiling_index, msg);
    }

    /// Returns the current streaming log level from the global configuration.
    pub fn log_level_streaming(&self) -> StreamingLogLevel {
        self.config.streaming.logger.level
    }

    /// Returns the current profiling log level from the global configuration.
    pub fn log_level_profiling(&self) -> ProfilingLogLevel {
        self.config.profiling.logger.level
    }

    fn dispatch<S: Display>(loggers: &mut [LoggerKind], indices: &[usize], msg: &S) {
        match indices {
            [] => {}
            [index] => loggers[*index].log(msg),
            _ => {
                let msg = msg.to_string();
                for index in indices {
                    loggers[*index].log(&msg);
                }
            }
        }
    }
}

#[derive(Debug)]
enum LoggerKind {
    #[cfg(std_io)]
    File(FileLogger),
    Stdout,
    Stderr,
    Log(LogCrateLevel),
}

impl LoggerKind {
    fn log<S: Display>(&mut self, msg: &S) {
        match self {
            #[cfg(std_io)]
            LoggerKind::File(file_logger) => file_logger.log(msg),
            LoggerKind::Stdout => println!("{msg}"),
            LoggerKind::Stderr => eprintln!("{msg}"),
            LoggerKind::Log(level) => match level {
                LogCrateLevel::Info => log::info!("{msg}"),
                LogCrateLevel::Debug => log::debug!("{msg}"),
                LogCrateLevel::Trace => log::trace!("{msg}"),
            },
        }
    }
}

#[derive(Debug)]
#[cfg(std_io)]
struct FileLogger {
    writer: BufWriter<File>,
}

#[cfg(std_io)]
impl FileLogger {
    fn new(path: &PathBuf, append: bool) -> Option<Self> {
        let file = OpenOptions::new()
            .write(true)
            .append(append)
            .truncate(!append)
            .create(true)
            .open(path);

        match file {
            Ok(file) => Some(Self {
                writer: BufWriter::new(file),
            }),
            Err(err) => {
                log::warn!("Can't open log file {}: {err}", path.display());
                None
            }
        }
    }

    fn log<S: Display>(&mut self, msg: &S) {
        if let Err(err) = writeln!(self.writer, "{msg}").and_then(|_| self.writer.flush()) {
            log::warn!("Failed to write to log file: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_levels_register_nothing() {
        let mut config = GlobalConfig::default();
        config.streaming.logger.stdout = true;

        let logger = Logger::from_config(Arc::new(config));

        assert!(logger.loggers.is_empty());
    }

    #[test]
    fn shared_destinations_are_deduplicated() {
        let mut config = GlobalConfig::default();
        config.streaming.logger.level = StreamingLogLevel::Basic;
        config.streaming.logger.log = Some(LogCrateLevel::Debug);
        config.profiling.logger.level = ProfilingLogLevel::Full;
        config.profiling.logger.log = Some(LogCrateLevel::Debug);
        config.profiling.logger.stderr = true;

        let logger = Logger::from_config(Arc::new(config));

        assert_eq!(logger.loggers.len(), 2);
        assert_eq!(logger.streaming_index, vec![0]);
        // stderr is new, the log crate destination is shared with streaming.
        assert_eq!(logger.profiling_index, vec![1, 0]);
    }
}
