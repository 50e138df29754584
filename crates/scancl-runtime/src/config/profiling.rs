use super::logger::{LogLevel, LoggerConfig};

/// Configuration for kernel profiling.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ProfilingConfig {
    /// Logger configuration for profiling logs.
    #[serde(default)]
    pub logger: LoggerConfig<ProfilingLogLevel>,
}

/// Log levels for profiling.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ProfilingLogLevel {
    /// Profiling logging is disabled.
    #[default]
    #[serde(rename = "disabled")]
    Disabled,

    /// A summary of the kernels executed is logged on sync.
    #[serde(rename = "basic")]
    Basic,

    /// Every kernel execution is logged with its duration, plus the summary.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for ProfilingLogLevel {}
