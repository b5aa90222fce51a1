use std::path::PathBuf;
use std::time::Duration;

use http_flow::TrackerConfig;
use regex::bytes::Regex;
use serde::Deserialize;

use crate::dispatcher::DEFAULT_REQUEST_DELAY;
use crate::download::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_OUTPUT_DIR, DEFAULT_USER_AGENT, DownloaderConfig};
use crate::error::ConfigError;
use crate::matcher::{DEFAULT_MEDIA_PATTERN, DEFAULT_MIN_REQUEST_PAYLOAD, MediaRequestMatcher};

/// Request path of the playlist endpoint.
pub const DEFAULT_PLAYLIST_PATTERN: &str = r"j/mine/playlist\?type=[nps]";

/// Engine settings. Every field has a default, so a partial file is enough.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Outbound request that starts playlist reassembly.
    pub playlist_pattern: String,
    /// Outbound media request; group 1 captures the file identifier.
    pub media_pattern: String,
    pub server_port: u16,
    /// Minimum body length of the first response segment.
    pub min_first_body: usize,
    /// Minimum payload length scanned for media requests.
    pub min_request_payload: usize,
    pub request_delay_secs: u64,
    pub output_dir: PathBuf,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub show_progress: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            playlist_pattern: DEFAULT_PLAYLIST_PATTERN.to_owned(),
            media_pattern: DEFAULT_MEDIA_PATTERN.to_owned(),
            server_port: http_flow::DEFAULT_SERVER_PORT,
            min_first_body: http_flow::DEFAULT_MIN_FIRST_BODY,
            min_request_payload: DEFAULT_MIN_REQUEST_PAYLOAD,
            request_delay_secs: DEFAULT_REQUEST_DELAY.as_secs(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            show_progress: true,
        }
    }
}

impl EngineConfig {
    pub fn tracker_config(&self) -> Result<TrackerConfig, ConfigError> {
        let request_pattern =
            Regex::new(&self.playlist_pattern).map_err(|source| ConfigError::Pattern {
                field: "playlist",
                source,
            })?;
        Ok(TrackerConfig {
            request_pattern,
            server_port: self.server_port,
            min_first_body: self.min_first_body,
        })
    }

    pub fn media_matcher(&self) -> Result<MediaRequestMatcher, ConfigError> {
        MediaRequestMatcher::new(&self.media_pattern, self.min_request_payload)
    }

    pub fn downloader_config(&self) -> DownloaderConfig {
        DownloaderConfig {
            output_dir: self.output_dir.clone(),
            user_agent: self.user_agent.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            show_progress: self.show_progress,
        }
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.request_delay_secs)
    }
}
