use std::fmt;

/// Counters for one capture session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    /// Frames that were too short or not TCP.
    pub skipped_frames: u64,
    pub messages: u64,
    pub playlist_entries: u64,
    pub decode_failures: u64,
    pub unknown_media: u64,
    pub downloads_saved: u64,
    pub downloads_skipped: u64,
    pub downloads_failed: u64,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames ({} skipped), {} playlist responses ({} entries, {} undecodable), \
             downloads: {} saved, {} already present, {} failed, {} unknown",
            self.frames,
            self.skipped_frames,
            self.messages,
            self.playlist_entries,
            self.decode_failures,
            self.downloads_saved,
            self.downloads_skipped,
            self.downloads_failed,
            self.unknown_media,
        )
    }
}
