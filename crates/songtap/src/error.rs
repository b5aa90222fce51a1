use reqwest::StatusCode;

/// Failure to turn a reassembled playlist response into entries.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("gzip decompression failed: {source}")]
    Decompress {
        #[source]
        source: std::io::Error,
    },

    #[error("invalid playlist JSON: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

/// Failure while fetching a media file.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("request failed with HTTP {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("request timed out for {url}")]
    Timeout { url: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl DownloadError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn http_status(status: StatusCode, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    /// Classify a transport error, separating timeouts from other failures.
    pub fn from_request(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_owned(),
            }
        } else {
            Self::Network { source: err }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Invalid engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {field} pattern: {source}")]
    Pattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("HTTP client setup failed: {source}")]
    Client {
        #[from]
        source: reqwest::Error,
    },
}
