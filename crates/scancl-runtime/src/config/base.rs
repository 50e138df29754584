use std::sync::Arc;

use super::{profiling::ProfilingConfig, scan::ScanTuningConfig, streaming::StreamingConfig};

/// Static mutex holding the global configuration, initialized as `None`.
static SCANCL_GLOBAL_CONFIG: spin::Mutex<Option<Arc<GlobalConfig>>> = spin::Mutex::new(None);

/// Represents the global configuration for ScanCL, combining streaming, profiling and scan
/// settings.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GlobalConfig {
    /// Configuration for the stream pool.
    #[serde(default)]
    pub streaming: StreamingConfig,

    /// Configuration for kernel profiling.
    #[serde(default)]
    pub profiling: ProfilingConfig,

    /// Default tuning of the device-wide scan.
    #[serde(default)]
    pub scan: ScanTuningConfig,
}

impl GlobalConfig {
    /// Retrieves the current global configuration, loading it from the current directory if not set.
    ///
    /// If no configuration is set, it attempts to load one from `scancl.toml` or `ScanCL.toml` in
    /// the current directory or its parents. If no file is found, a default configuration is used.
    ///
    /// # Notes
    ///
    /// Calling this function takes a global lock; read it once during initialization rather than
    /// on hot paths.
    pub fn get() -> Arc<Self> {
        let mut state = SCANCL_GLOBAL_CONFIG.lock();

        match state.as_ref() {
            Some(config) => config.clone(),
            None => {
                cfg_if::cfg_if! {
                    if #[cfg(std_io)] {
                        let config = Self::from_current_dir();
                        let config = config.override_from_env();
                    } else {
                        let config = Self::default();
                    }
                }

                let config = Arc::new(config);
                *state = Some(config.clone());
                config
            }
        }
    }

    /// Sets the global configuration to the provided value.
    ///
    /// # Panics
    /// Panics if the configuration has already been set or read, as it cannot be overridden.
    ///
    /// # Warning
    /// This method must be called at the start of the program, before any calls to `get`.
    pub fn set(config: Self) {
        let mut state = SCANCL_GLOBAL_CONFIG.lock();
        if state.is_some() {
            panic!("Cannot set the global configuration multiple times.");
        }
        *state = Some(Arc::new(config));
    }

    #[cfg(std_io)]
    /// Overrides configuration fields based on environment variables.
    pub fn override_from_env(mut self) -> Self {
        use super::{profiling::ProfilingLogLevel, streaming::StreamingLogLevel};

        if let Ok(val) = std::env::var("SCANCL_DEBUG_LOG") {
            self.streaming.logger.level = StreamingLogLevel::Basic;
            self.profiling.logger.level = ProfilingLogLevel::Basic;

            match val.as_str() {
                "stdout" => {
                    self.streaming.logger.stdout = true;
                    self.profiling.logger.stdout = true;
                }
                "stderr" => {
                    self.streaming.logger.stderr = true;
                    self.profiling.logger.stderr = true;
                }
                "1" | "true" => {
                    let file_path = "/tmp/scancl.log";
                    self.streaming.logger.file = Some(file_path.into());
                    self.profiling.logger.file = Some(file_path.into());
                }
                "0" | "false" => {
                    self.streaming.logger.level = StreamingLogLevel::Disabled;
                    self.profiling.logger.level = ProfilingLogLevel::Disabled;
                }
                file_path => {
                    self.streaming.logger.file = Some(file_path.into());
                    self.profiling.logger.file = Some(file_path.into());
                }
            }
        };

        if let Ok(val) = std::env::var("SCANCL_DEBUG_OPTION") {
            match val.as_str() {
                "debug" => {
                    self.streaming.logger.level = StreamingLogLevel::Full;
                    self.profiling.logger.level = ProfilingLogLevel::Full;
                }
                "profile" => {
                    self.profiling.logger.level = ProfilingLogLevel::Basic;
                }
                "profile-full" => {
                    self.profiling.logger.level = ProfilingLogLevel::Full;
                }
                _ => {}
            }
        };

        self
    }

    // Loads configuration from `scancl.toml` or `ScanCL.toml` in the current directory or its
    // parents, falling back to the default configuration.
    #[cfg(std_io)]
    fn from_current_dir() -> Self {
        let Ok(mut dir) = std::env::current_dir() else {
            return Self::default();
        };

        loop {
            for name in ["scancl.toml", "ScanCL.toml"] {
                let path = dir.join(name);
                if path.is_file() {
                    match Self::from_file_path(&path) {
                        Ok(config) => return config,
                        Err(err) => log::warn!("Ignoring {}: {err}", path.display()),
                    }
                }
            }

            if !dir.pop() {
                break;
            }
        }

        Self::default()
    }

    // Loads configuration from a specified file path.
    #[cfg(std_io)]
    fn from_file_path<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses a configuration from its TOML representation.
    #[cfg(feature = "std")]
    pub fn from_toml(content: &str) -> std::io::Result<Self> {
        toml::from_str(content)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }
}
