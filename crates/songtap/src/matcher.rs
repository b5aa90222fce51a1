use regex::bytes::Regex;

use crate::error::ConfigError;

/// Request line of a media fetch; group 1 is the file identifier.
pub const DEFAULT_MEDIA_PATTERN: &str = r"GET .*/view/song/small/(.*\.mp3) HTTP";

/// Shortest payload worth scanning: `GET / HTTP/1.1\r\n`.
pub const DEFAULT_MIN_REQUEST_PAYLOAD: usize = 16;

/// Finds outbound media requests in segment payloads.
#[derive(Debug, Clone)]
pub struct MediaRequestMatcher {
    pattern: Regex,
    min_payload: usize,
}

impl MediaRequestMatcher {
    /// `pattern` must have a capture group for the file identifier.
    pub fn new(pattern: &str, min_payload: usize) -> Result<Self, ConfigError> {
        let pattern = Regex::new(&format!("(?-u){pattern}")).map_err(|source| {
            ConfigError::Pattern {
                field: "media",
                source,
            }
        })?;
        Ok(Self {
            pattern,
            min_payload,
        })
    }

    /// File identifier requested by `payload`, if it is a media request.
    pub fn file_id(&self, payload: &[u8]) -> Option<String> {
        if payload.len() < self.min_payload {
            return None;
        }
        let caps = self.pattern.captures(payload)?;
        let id = caps.get(1)?;
        Some(String::from_utf8_lossy(id.as_bytes()).into_owned())
    }
}

impl Default for MediaRequestMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MEDIA_PATTERN, DEFAULT_MIN_REQUEST_PAYLOAD)
            .expect("default media pattern is valid")
    }
}
