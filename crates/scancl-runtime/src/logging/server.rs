use core::fmt::Display;
use core::time::Duration;

use crate::config::{
    Logger, profiling::ProfilingLogLevel, streaming::StreamingLogLevel,
};

use super::{ProfileLevel, Profiled};

/// Per-stream logger for lifecycle events and kernel profiling.
#[derive(Debug, Default)]
pub struct ServerLogger {
    kind: DebugLoggerKind,
    profiled: Profiled,
}

#[derive(Debug, Default)]
enum DebugLoggerKind {
    Activated {
        logger: Logger,
        streaming: Option<StreamingLogLevel>,
        profile: Option<ProfileLevel>,
    },
    #[default]
    None,
}

impl ServerLogger {
    /// Creates a logger from the global configuration.
    pub fn new() -> Self {
        Self::from_logger(Logger::new())
    }

    /// Creates a logger routing its events through the given logger.
    pub fn from_logger(logger: Logger) -> Self {
        let streaming = match logger.log_level_streaming() {
            StreamingLogLevel::Disabled => None,
            level => Some(level),
        };
        let profile = match logger.log_level_profiling() {
            ProfilingLogLevel::Disabled => None,
            ProfilingLogLevel::Basic => Some(ProfileLevel::Basic),
            ProfilingLogLevel::Full => Some(ProfileLevel::Full),
        };

        let kind = if streaming.is_none() && profile.is_none() {
            DebugLoggerKind::None
        } else {
            DebugLoggerKind::Activated {
                logger,
                streaming,
                profile,
            }
        };

        Self {
            kind,
            profiled: Profiled::default(),
        }
    }

    /// Returns the profile level, none if profiling is deactivated.
    pub fn profile_level(&self) -> Option<ProfileLevel> {
        match &self.kind {
            DebugLoggerKind::Activated { profile, .. } => *profile,
            DebugLoggerKind::None => None,
        }
    }

    /// Logs a stream event when streaming logs are at least at the given level.
    pub fn log_streaming<S: Display>(&mut self, level: StreamingLogLevel, msg: S) {
        if let DebugLoggerKind::Activated {
            logger,
            streaming: Some(current),
            ..
        } = &mut self.kind
        {
            let enabled = match level {
                StreamingLogLevel::Disabled => false,
                StreamingLogLevel::Basic => true,
                StreamingLogLevel::Full => *current == StreamingLogLevel::Full,
            };
            if enabled {
                logger.log_streaming(&msg);
            }
        }
    }

    /// Register a profiled task.
    pub fn register_profiled<Name: Display>(&mut self, name: Name, duration: Duration) {
        let Some(level) = self.profile_level() else {
            return;
        };
        let name = name.to_string();
        self.profiled.update(&name, duration);

        if let (ProfileLevel::Full, DebugLoggerKind::Activated { logger, .. }) =
            (level, &mut self.kind)
        {
            logger.log_profiling(&format!("| {duration:<10?} | {name}"));
        }
    }

    /// Show the profiling summary if activated and reset its state.
    pub fn profile_summary(&mut self) {
        if self.profiled.is_empty() {
            return;
        }
        let profiled = core::mem::take(&mut self.profiled);

        if let DebugLoggerKind::Activated { logger, .. } = &mut self.kind {
            logger.log_profiling(&profiled);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::GlobalConfig;

    #[test]
    fn disabled_config_profiles_nothing() {
        let mut logger = ServerLogger::from_logger(Logger::from_config(Arc::new(
            GlobalConfig::default(),
        )));

        logger.register_profiled("scan", Duration::from_millis(1));

        assert_eq!(logger.profile_level(), None);
        assert!(logger.profiled.is_empty());
    }

    #[test]
    fn profiling_collects_durations() {
        let mut config = GlobalConfig::default();
        config.profiling.logger.level = ProfilingLogLevel::Full;

        let mut logger = ServerLogger::from_logger(Logger::from_config(Arc::new(config)));
        logger.register_profiled("scan", Duration::from_millis(1));

        assert_eq!(logger.profile_level(), Some(ProfileLevel::Full));
        assert!(!logger.profiled.is_empty());

        logger.profile_summary();
        assert!(logger.profiled.is_empty());
    }
}
