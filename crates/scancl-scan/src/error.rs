use scancl_common::backtrace::BackTrace;
use scancl_runtime::memory_management::{AllocationError, BindingError};
use scancl_runtime::server::{LaunchError, ServerError};
use thiserror::Error;

/// Errors returned by the device-wide scan.
#[derive(Error, Clone)]
pub enum ScanError {
    /// The device couldn't provide the scratch or output memory.
    #[error("An allocation error happened during the scan\nCaused by:\n  {0}")]
    Allocation(#[from] AllocationError),

    /// The arguments or the tuning don't describe a valid launch.
    #[error("Invalid scan launch configuration\nCaused by:\n  {reason}\nBacktrace\n{backtrace}")]
    InvalidLaunchConfiguration {
        /// Why the configuration is invalid.
        reason: String,
        /// The backtrace for this error.
        backtrace: BackTrace,
    },

    /// The device refused to launch a scan kernel.
    #[error("The scan couldn't be launched\nCaused by:\n  {0}")]
    Launch(#[from] LaunchError),

    /// The device faulted, or the caller stopped waiting, while the scan was executing.
    #[error("The scan failed while executing\nCaused by:\n  {0}")]
    Execution(#[from] ServerError),
}

impl ScanError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidLaunchConfiguration {
            reason: reason.into(),
            backtrace: BackTrace::capture(),
        }
    }
}

impl From<BindingError> for ScanError {
    fn from(err: BindingError) -> Self {
        Self::invalid(err.to_string())
    }
}

impl core::fmt::Debug for ScanError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{self}"))
    }
}
