//! Playlist responses: gzip-compressed JSON carrying a `song` array.

use std::io::Read;

use flate2::read::GzDecoder;
use http_flow::HttpMessage;
use serde::Deserialize;
use tracing::debug;

use crate::error::DecodeError;

/// One media item advertised by the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaylistEntry {
    pub artist: String,
    pub title: String,
    /// Streaming URL of the media file.
    pub url: String,
}

#[derive(Deserialize)]
struct PlaylistResponse {
    song: Vec<PlaylistEntry>,
}

/// Decompress and parse a playlist response body.
pub fn decode_playlist(body: &[u8]) -> Result<Vec<PlaylistEntry>, DecodeError> {
    let mut json = Vec::with_capacity(body.len() * 4);
    GzDecoder::new(body)
        .read_to_end(&mut json)
        .map_err(|source| DecodeError::Decompress { source })?;
    let response: PlaylistResponse = serde_json::from_slice(&json)?;
    Ok(response.song)
}

/// Every entry learned so far, in arrival order.
///
/// Entries are appended and never removed; the same item may appear several times.
#[derive(Debug, Default, Clone)]
pub struct Playlist {
    entries: Vec<PlaylistEntry>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a completed playlist response and append its entries.
    ///
    /// Returns the number of entries added. On error nothing is appended.
    pub fn absorb(&mut self, message: &HttpMessage) -> Result<usize, DecodeError> {
        let entries = decode_playlist(&message.body)?;
        let added = entries.len();
        self.extend(entries);
        debug!(added, total = self.entries.len(), "Playlist updated");
        Ok(added)
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = PlaylistEntry>) {
        self.entries.extend(entries);
    }

    /// First entry whose URL contains `file_id`.
    pub fn find_by_file(&self, file_id: &str) -> Option<&PlaylistEntry> {
        self.entries.iter().find(|entry| entry.url.contains(file_id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlaylistEntry> {
        self.entries.iter()
    }
}
