//! # Songtap Engine
//!
//! Turns captured HTTP traffic into saved media files.
//!
//! A [`Session`] receives raw frames in capture order. Playlist responses are
//! reassembled by an [`http_flow::FlowTracker`] and decoded into a [`Playlist`];
//! every other frame is checked by the [`Dispatcher`] for an outbound media request,
//! which is looked up in the playlist and fetched out-of-band through a
//! [`MediaFetcher`].
//!
//! ## Modules
//!
//! - [`playlist`] - gzip/JSON playlist decoding and the append-only entry list
//! - [`matcher`] - media request line detection
//! - [`dispatcher`] - playlist lookup and download triggering
//! - [`download`] - HTTP downloader writing into the output directory
//! - [`ownership`] - handing created files back to the `sudo` user
//! - [`session`] - the per-frame pipeline

pub mod config;
pub mod dispatcher;
pub mod download;
pub mod error;
pub mod matcher;
pub mod naming;
pub mod ownership;
pub mod playlist;
pub mod session;
pub mod stats;

pub use config::EngineConfig;
pub use dispatcher::{Dispatch, Dispatcher};
pub use download::{DownloaderConfig, FetchOutcome, HttpFetcher, MediaFetcher};
pub use error::{ConfigError, DecodeError, DownloadError};
pub use matcher::MediaRequestMatcher;
pub use ownership::Ownership;
pub use playlist::{Playlist, PlaylistEntry, decode_playlist};
pub use session::{FrameOutcome, Session};
pub use stats::SessionStats;
