use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use songtap_engine::EngineConfig;
use tracing::debug;

use crate::error::{AppError, Result};

/// Only traffic to or from the web port reaches the pipeline.
pub const DEFAULT_FILTER: &str = "tcp && (src port 80 || dst port 80)";

const CONFIG_DIR_NAME: &str = "songtap";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Capture device settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Device name; the system default device when unset.
    pub device: Option<String>,
    pub filter: String,
    pub snaplen: i32,
    /// Read timeout in milliseconds, bounds how long shutdown waits for the capture thread.
    pub timeout_ms: i32,
    pub promisc: bool,
    /// Frames buffered between the capture thread and the pipeline.
    pub channel_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: None,
            filter: DEFAULT_FILTER.to_owned(),
            snaplen: 65535,
            timeout_ms: 500,
            promisc: true,
            channel_capacity: 1024,
        }
    }
}

/// Configuration file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub engine: EngineConfig,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub device: Option<String>,
    pub filter: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub delay: Option<u64>,
}

impl AppConfig {
    /// Load from `path`, or from the default location when it exists.
    ///
    /// An explicit path that cannot be read is an error; a missing default file is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(path) => path,
                None => {
                    debug!("No configuration file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let contents = fs::read_to_string(&path).map_err(|source| AppError::ConfigRead {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&contents).map_err(|source| AppError::ConfigParse {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(device) = overrides.device {
            self.capture.device = Some(device);
        }
        if let Some(filter) = overrides.filter {
            self.capture.filter = filter;
        }
        if let Some(dir) = overrides.output_dir {
            self.engine.output_dir = dir;
        }
        if let Some(delay) = overrides.delay {
            self.engine.request_delay_secs = delay;
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
