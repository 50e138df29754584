use core::fmt::{Debug, Display, Formatter, Result};

/// Backtrace attached to runtime errors.
///
/// Capturing follows `RUST_BACKTRACE` and `RUST_LIB_BACKTRACE`: unless one of them enables it,
/// no frame is resolved.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BackTrace {
    frames: Option<String>,
}

impl BackTrace {
    /// Captures the backtrace of the calling thread.
    pub fn capture() -> Self {
        Self {
            frames: capture_frames(),
        }
    }

    /// Whether any frame was captured.
    pub fn is_captured(&self) -> bool {
        self.frames.is_some()
    }
}

#[cfg(feature = "std")]
fn capture_frames() -> Option<String> {
    use std::backtrace::{Backtrace, BacktraceStatus};

    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => Some(backtrace.to_string()),
        _ => None,
    }
}

#[cfg(not(feature = "std"))]
fn capture_frames() -> Option<String> {
    None
}

impl Display for BackTrace {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match &self.frames {
            Some(frames) => f.write_str(frames),
            None => f.write_str("<not captured, set RUST_BACKTRACE=1>"),
        }
    }
}

impl Debug for BackTrace {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        Display::fmt(self, f)
    }
}
