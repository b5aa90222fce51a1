use std::time::Duration;

use tcp_segment::TcpSegment;
use tracing::{debug, info, warn};

use crate::download::{FetchOutcome, MediaFetcher};
use crate::matcher::MediaRequestMatcher;
use crate::naming::media_file_name;
use crate::playlist::Playlist;

/// Pause before each download, to go easy on the remote service.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(3);

/// What the dispatcher did with a segment.
#[derive(Debug)]
pub enum Dispatch {
    /// Not a media request.
    Ignored,
    /// A media request for something the playlist does not list (yet).
    NotInPlaylist { file_id: String },
    Fetched(FetchOutcome),
    /// The download failed; already logged.
    Failed(crate::error::DownloadError),
}

/// Correlates outbound media requests with the playlist and triggers downloads.
pub struct Dispatcher<F> {
    matcher: MediaRequestMatcher,
    fetcher: F,
    delay: Duration,
}

impl<F: MediaFetcher> Dispatcher<F> {
    pub fn new(matcher: MediaRequestMatcher, fetcher: F, delay: Duration) -> Self {
        Self {
            matcher,
            fetcher,
            delay,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Inspect one segment. Blocks for the delay and the whole download when it matches.
    pub async fn dispatch(&self, segment: &TcpSegment<'_>, playlist: &Playlist) -> Dispatch {
        let Some(file_id) = self.matcher.file_id(segment.payload) else {
            return Dispatch::Ignored;
        };

        let Some(entry) = playlist.find_by_file(&file_id) else {
            debug!(file_id = %file_id, "Media request not in playlist");
            return Dispatch::NotInPlaylist { file_id };
        };

        let file_name = media_file_name(&entry.artist, &entry.title);
        info!(
            artist = %entry.artist,
            title = %entry.title,
            file_id = %file_id,
            "Media request observed"
        );

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.fetcher.fetch(&entry.url, Some(&file_name)).await {
            Ok(outcome) => Dispatch::Fetched(outcome),
            Err(e) => {
                if e.is_timeout() {
                    warn!(url = %entry.url, "Download timed out");
                } else {
                    warn!(url = %entry.url, error = %e, "Download failed");
                }
                Dispatch::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DownloadError;
    use crate::playlist::PlaylistEntry;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tcp_segment::FrameLayout;
    use tcp_segment::test_utils::FrameBuilder;

    #[derive(Default)]
    struct RecordingFetcher {
        requests: Mutex<Vec<(String, Option<String>)>>,
        fail_with_timeout: bool,
    }

    #[async_trait]
    impl MediaFetcher for RecordingFetcher {
        async fn fetch(
            &self,
            url: &str,
            file_name: Option<&str>,
        ) -> Result<FetchOutcome, DownloadError> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_owned(), file_name.map(str::to_owned)));
            if self.fail_with_timeout {
                return Err(DownloadError::Timeout {
                    url: url.to_owned(),
                });
            }
            Ok(FetchOutcome::Saved {
                path: PathBuf::from(file_name.unwrap_or_default()),
                bytes: 0,
            })
        }
    }

    fn playlist() -> Playlist {
        let mut playlist = Playlist::new();
        playlist.extend([PlaylistEntry {
            artist: "A".into(),
            title: "T".into(),
            url: "http://x/y/small/z.mp3".into(),
        }]);
        playlist
    }

    fn media_request(path: &str) -> Vec<u8> {
        FrameBuilder::new()
            .dst([203, 0, 113, 5], 80)
            .push()
            .payload(format!("GET {path} HTTP/1.1\r\nHost: mr3.example\r\n\r\n").as_bytes())
            .build()
    }

    async fn run(dispatcher: &Dispatcher<RecordingFetcher>, frame: &[u8], playlist: &Playlist) -> Dispatch {
        let segment = TcpSegment::parse(frame, &FrameLayout::ETHERNET).unwrap();
        dispatcher.dispatch(&segment, playlist).await
    }

    #[tokio::test]
    async fn known_media_triggers_one_download() {
        let dispatcher = Dispatcher::new(
            MediaRequestMatcher::default(),
            RecordingFetcher::default(),
            Duration::ZERO,
        );

        let result = run(&dispatcher, &media_request("/view/song/small/z.mp3"), &playlist()).await;
        assert!(matches!(result, Dispatch::Fetched(_)));

        let requests = dispatcher.fetcher().requests.lock().unwrap();
        assert_eq!(
            *requests,
            vec![("http://x/y/small/z.mp3".to_owned(), Some("A-T.mp3".to_owned()))]
        );
    }

    #[tokio::test]
    async fn unknown_media_is_ignored() {
        let dispatcher = Dispatcher::new(
            MediaRequestMatcher::default(),
            RecordingFetcher::default(),
            Duration::ZERO,
        );

        let result = run(&dispatcher, &media_request("/view/song/small/q.mp3"), &playlist()).await;
        assert!(matches!(result, Dispatch::NotInPlaylist { ref file_id } if file_id == "q.mp3"));

        let result = run(&dispatcher, &media_request("/view/song/small/z.mp3"), &Playlist::new()).await;
        assert!(matches!(result, Dispatch::NotInPlaylist { .. }));
        assert!(dispatcher.fetcher().requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_traffic_is_ignored() {
        let dispatcher = Dispatcher::new(
            MediaRequestMatcher::default(),
            RecordingFetcher::default(),
            Duration::ZERO,
        );
        let result = run(&dispatcher, &media_request("/index.html"), &playlist()).await;
        assert!(matches!(result, Dispatch::Ignored));
    }

    #[tokio::test]
    async fn failures_are_contained() {
        let dispatcher = Dispatcher::new(
            MediaRequestMatcher::default(),
            RecordingFetcher {
                fail_with_timeout: true,
                ..Default::default()
            },
            Duration::ZERO,
        );
        let result = run(&dispatcher, &media_request("/view/song/small/z.mp3"), &playlist()).await;
        assert!(matches!(result, Dispatch::Failed(ref e) if e.is_timeout()));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_before_downloading() {
        let dispatcher = Dispatcher::new(
            MediaRequestMatcher::default(),
            RecordingFetcher::default(),
            DEFAULT_REQUEST_DELAY,
        );
        let started = tokio::time::Instant::now();
        run(&dispatcher, &media_request("/view/song/small/z.mp3"), &playlist()).await;
        assert!(started.elapsed() >= DEFAULT_REQUEST_DELAY);
    }
}
