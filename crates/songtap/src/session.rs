//! Per-frame pipeline: flow tracker first, dispatcher for everything it does not consume.

use http_flow::{FlowTracker, Observation};
use tcp_segment::{FrameLayout, TcpSegment};
use tracing::{debug, info, trace, warn};

use crate::config::EngineConfig;
use crate::dispatcher::{Dispatch, Dispatcher};
use crate::download::{FetchOutcome, MediaFetcher};
use crate::error::{ConfigError, DecodeError};
use crate::playlist::Playlist;
use crate::stats::SessionStats;

/// What happened to one captured frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// Too short or not TCP.
    Skipped,
    /// Part of the playlist response being reassembled.
    Tracked,
    /// Completed playlist response decoded; number of entries added.
    PlaylistDecoded { added: usize },
    /// Completed playlist response could not be decoded.
    DecodeFailed(DecodeError),
    Dispatched(Dispatch),
}

/// Owns all capture-time state: one flow tracker and the playlist learned so far.
pub struct Session<F> {
    layout: FrameLayout,
    tracker: FlowTracker,
    playlist: Playlist,
    dispatcher: Dispatcher<F>,
    stats: SessionStats,
}

impl<F: MediaFetcher> Session<F> {
    pub fn new(layout: FrameLayout, tracker: FlowTracker, dispatcher: Dispatcher<F>) -> Self {
        Self {
            layout,
            tracker,
            playlist: Playlist::new(),
            dispatcher,
            stats: SessionStats::default(),
        }
    }

    pub fn from_config(
        config: &EngineConfig,
        layout: FrameLayout,
        fetcher: F,
    ) -> Result<Self, ConfigError> {
        let tracker = FlowTracker::new(config.tracker_config()?);
        let dispatcher = Dispatcher::new(config.media_matcher()?, fetcher, config.request_delay());
        Ok(Self::new(layout, tracker, dispatcher))
    }

    /// Process one captured frame. Frames must be fed in capture order.
    pub async fn handle_frame(&mut self, frame: &[u8]) -> FrameOutcome {
        self.stats.frames += 1;

        let segment = match TcpSegment::parse(frame, &self.layout) {
            Ok(segment) => segment,
            Err(e) => {
                trace!(reason = %e, "Frame skipped");
                self.stats.skipped_frames += 1;
                return FrameOutcome::Skipped;
            }
        };

        match self.tracker.observe(&segment) {
            Observation::Completed(message) => {
                self.stats.messages += 1;
                return match self.playlist.absorb(&message) {
                    Ok(added) => {
                        self.stats.playlist_entries += added as u64;
                        info!(
                            added,
                            total = self.playlist.len(),
                            peer = %message.peer,
                            "Playlist received"
                        );
                        FrameOutcome::PlaylistDecoded { added }
                    }
                    Err(e) => {
                        self.stats.decode_failures += 1;
                        warn!(
                            error = %e,
                            status = message.status_line().unwrap_or_default(),
                            content_encoding = message.header("Content-Encoding").unwrap_or_default(),
                            body_len = message.body.len(),
                            "Failed to decode playlist response"
                        );
                        FrameOutcome::DecodeFailed(e)
                    }
                };
            }
            Observation::Absorbed => return FrameOutcome::Tracked,
            Observation::Discarded | Observation::Unrelated => {}
        }

        let dispatch = self.dispatcher.dispatch(&segment, &self.playlist).await;
        match &dispatch {
            Dispatch::Ignored => {}
            Dispatch::NotInPlaylist { .. } => self.stats.unknown_media += 1,
            Dispatch::Fetched(FetchOutcome::Saved { .. }) => self.stats.downloads_saved += 1,
            Dispatch::Fetched(FetchOutcome::Skipped { .. }) => self.stats.downloads_skipped += 1,
            Dispatch::Failed(_) => self.stats.downloads_failed += 1,
        }
        if !matches!(dispatch, Dispatch::Ignored) {
            debug!(outcome = ?dispatch, "Media request handled");
        }
        FrameOutcome::Dispatched(dispatch)
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn tracker(&self) -> &FlowTracker {
        &self.tracker
    }

    pub fn dispatcher(&self) -> &Dispatcher<F> {
        &self.dispatcher
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }
}
