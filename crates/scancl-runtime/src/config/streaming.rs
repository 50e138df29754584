use super::logger::{LogLevel, LoggerConfig};

/// How work submitted to a device is spread over stream threads.
///
/// Every stream id is mapped onto one of `max_streams` threads, each executing its tasks in
/// submission order.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Where stream events are logged.
    pub logger: LoggerConfig<StreamingLogLevel>,
    /// Number of stream threads of a device, at least one.
    pub max_streams: u8,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            logger: LoggerConfig::default(),
            max_streams: 4,
        }
    }
}

/// Verbosity of stream events.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamingLogLevel {
    /// Nothing is logged.
    #[default]
    Disabled,
    /// Stream startup and flushes.
    Basic,
    /// Every kernel execution as well.
    Full,
}

impl LogLevel for StreamingLogLevel {}
