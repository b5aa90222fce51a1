//! # Media Download
//!
//! Fetches media files over HTTP into a fixed output directory, streaming the
//! body to disk with a progress bar. Existing files are never fetched again.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, Url};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::error::{ConfigError, DownloadError};
use crate::naming::file_name_from_url;
use crate::ownership::Ownership;

/// Sent with every request so the service treats us like a browser.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/4.0 (compatible; MSIE 6.0; Windows NT 5.1)";

pub const DEFAULT_OUTPUT_DIR: &str = "songs";

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const PART_SUFFIX: &str = ".part";

/// Downloader options.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Directory files are written to, created on first use.
    pub output_dir: PathBuf,
    pub user_agent: String,
    /// Applied to connecting and to each read of the body.
    pub connect_timeout: Duration,
    /// Draw a progress bar on stderr while downloading.
    pub show_progress: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            show_progress: true,
        }
    }
}

/// Result of a fetch that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Saved { path: PathBuf, bytes: u64 },
    /// The target already existed; nothing was requested.
    Skipped { path: PathBuf },
}

/// Something that can save the resource at `url` locally.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Save `url` as `file_name`, or under the URL's last path segment when `None`.
    async fn fetch(&self, url: &str, file_name: Option<&str>)
    -> Result<FetchOutcome, DownloadError>;
}

/// Build the HTTP client used for media downloads.
pub fn create_client(config: &DownloaderConfig) -> Result<Client, ConfigError> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.connect_timeout)
        .build()?;
    Ok(client)
}

/// [`MediaFetcher`] backed by `reqwest`.
pub struct HttpFetcher {
    client: Client,
    config: DownloaderConfig,
    ownership: Ownership,
}

impl HttpFetcher {
    pub fn new(config: DownloaderConfig, ownership: Ownership) -> Result<Self, ConfigError> {
        let client = create_client(&config)?;
        Ok(Self {
            client,
            config,
            ownership,
        })
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    async fn ensure_output_dir(&self) -> Result<(), DownloadError> {
        let dir = &self.config.output_dir;
        if fs::try_exists(dir).await? {
            return Ok(());
        }
        fs::create_dir_all(dir).await?;
        self.ownership.apply(dir);
        debug!(dir = %dir.display(), "Created output directory");
        Ok(())
    }

    fn progress_bar(&self, total: Option<u64>, name: &str) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = match total {
            Some(total) => {
                let pb = ProgressBar::new(total);
                if let Ok(style) = ProgressStyle::with_template(
                    "{spinner:.yellow} [{bar:30.yellow/white}] {bytes}/{total_bytes} ({percent}%) {msg}",
                ) {
                    pb.set_style(style.progress_chars("=> "));
                }
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::with_template("{spinner:.yellow} {bytes} {msg}") {
                    pb.set_style(style);
                }
                pb
            }
        };
        pb.set_message(name.to_owned());
        pb
    }

    async fn stream_to_file(
        &self,
        url: &Url,
        part: &Path,
        name: &str,
    ) -> Result<u64, DownloadError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DownloadError::from_request(e, url.as_str()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(status, url.as_str()));
        }

        let total = response.content_length();
        let pb = self.progress_bar(total, name);
        let mut file = fs::File::create(part).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    pb.abandon();
                    return Err(DownloadError::from_request(e, url.as_str()));
                }
            };
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            pb.set_position(written);
        }

        file.flush().await?;
        pb.finish_and_clear();
        Ok(written)
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(
        &self,
        url: &str,
        file_name: Option<&str>,
    ) -> Result<FetchOutcome, DownloadError> {
        let parsed = Url::parse(url).map_err(|e| DownloadError::invalid_url(url, e.to_string()))?;
        let name = match file_name {
            Some(name) => name.to_owned(),
            None => file_name_from_url(url)
                .ok_or_else(|| DownloadError::invalid_url(url, "no file name in path"))?,
        };

        self.ensure_output_dir().await?;

        let path = self.config.output_dir.join(&name);
        if fs::try_exists(&path).await? {
            info!(path = %path.display(), "File exists, skipping download");
            return Ok(FetchOutcome::Skipped { path });
        }

        info!(url = %url, path = %path.display(), "Downloading");
        let part = self.config.output_dir.join(format!("{name}{PART_SUFFIX}"));
        let bytes = match self.stream_to_file(&parsed, &part, &name).await {
            Ok(bytes) => bytes,
            Err(e) => {
                if let Err(rm) = fs::remove_file(&part).await
                    && rm.kind() != std::io::ErrorKind::NotFound
                {
                    warn!(path = %part.display(), error = %rm, "Failed to remove partial download");
                }
                return Err(e);
            }
        };
        fs::rename(&part, &path).await?;
        self.ownership.apply(&path);

        info!(path = %path.display(), bytes, "Download completed");
        Ok(FetchOutcome::Saved { path, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn fetcher(dir: &Path) -> HttpFetcher {
        HttpFetcher::new(
            DownloaderConfig {
                output_dir: dir.to_path_buf(),
                show_progress: false,
                ..Default::default()
            },
            Ownership::Unchanged,
        )
        .unwrap()
    }

    /// Serve one canned response and hand back the raw request.
    async fn serve_once(response: &'static [u8]) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn existing_file_is_not_fetched() {
        let temp = TempDir::new().unwrap();
        let existing = temp.path().join("A-T.mp3");
        std::fs::write(&existing, b"already here").unwrap();

        // Nothing listens on the discard port; a request would fail.
        let outcome = fetcher(temp.path())
            .fetch("http://127.0.0.1:9/view/song/small/z.mp3", Some("A-T.mp3"))
            .await
            .unwrap();

        assert_eq!(outcome, FetchOutcome::Skipped { path: existing.clone() });
        assert_eq!(std::fs::read(&existing).unwrap(), b"already here");
    }

    #[tokio::test]
    async fn saves_body_with_browser_user_agent() {
        let temp = TempDir::new().unwrap();
        let out_dir = temp.path().join("songs");
        let (base, server) =
            serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello").await;

        let outcome = fetcher(&out_dir)
            .fetch(&format!("{base}/view/song/small/z.mp3"), Some("A-T.mp3"))
            .await
            .unwrap();

        let path = out_dir.join("A-T.mp3");
        assert_eq!(outcome, FetchOutcome::Saved { path: path.clone(), bytes: 5 });
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        assert!(!out_dir.join("A-T.mp3.part").exists());

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /view/song/small/z.mp3 HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains(&format!(
            "user-agent: {}",
            DEFAULT_USER_AGENT.to_ascii_lowercase()
        )));
    }

    #[tokio::test]
    async fn defaults_to_url_file_name() {
        let temp = TempDir::new().unwrap();
        let (base, _server) =
            serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok").await;

        let outcome = fetcher(temp.path())
            .fetch(&format!("{base}/small/z.mp3"), None)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::Saved { path: temp.path().join("z.mp3"), bytes: 2 }
        );
    }

    #[tokio::test]
    async fn http_error_is_reported_and_leaves_no_file() {
        let temp = TempDir::new().unwrap();
        let (base, _server) = serve_once(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let err = fetcher(temp.path())
            .fetch(&format!("{base}/missing.mp3"), Some("A-T.mp3"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DownloadError::HttpStatus { status, .. } if status == reqwest::StatusCode::NOT_FOUND
        ));
        assert!(!temp.path().join("A-T.mp3").exists());
        assert!(!temp.path().join("A-T.mp3.part").exists());
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let temp = TempDir::new().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let fetcher = HttpFetcher::new(
            DownloaderConfig {
                output_dir: temp.path().to_path_buf(),
                connect_timeout: Duration::from_secs(1),
                show_progress: false,
                ..Default::default()
            },
            Ownership::Unchanged,
        )
        .unwrap();
        let err = fetcher
            .fetch(&format!("http://{addr}/a.mp3"), Some("A-T.mp3"))
            .await
            .unwrap_err();

        assert!(err.is_timeout(), "unexpected error: {err:?}");
        assert!(matches!(err, DownloadError::Timeout { .. }));
        assert!(!temp.path().join("A-T.mp3").exists());
        assert!(!temp.path().join("A-T.mp3.part").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn ownership_is_applied_to_directory_and_file() {
        use std::os::unix::fs::MetadataExt;

        let temp = TempDir::new().unwrap();
        let meta = std::fs::metadata(temp.path()).unwrap();
        let owner = Ownership::Invoker {
            user: "self".into(),
            uid: meta.uid(),
            gid: meta.gid(),
        };
        let out_dir = temp.path().join("songs");
        let (base, _server) =
            serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\nConnection: close\r\n\r\nabc").await;

        let fetcher = HttpFetcher::new(
            DownloaderConfig {
                output_dir: out_dir.clone(),
                show_progress: false,
                ..Default::default()
            },
            owner.clone(),
        )
        .unwrap();
        fetcher
            .fetch(&format!("{base}/small/z.mp3"), Some("A-T.mp3"))
            .await
            .unwrap();

        for path in [out_dir.clone(), out_dir.join("A-T.mp3")] {
            let after = std::fs::metadata(&path).unwrap();
            assert_eq!((after.uid(), after.gid()), (meta.uid(), meta.gid()));
            assert!(owner.apply(&path), "chown failed for {}", path.display());
        }
    }

    #[tokio::test]
    async fn invalid_url_is_rejected() {
        let temp = TempDir::new().unwrap();
        let err = fetcher(temp.path()).fetch("not a url", None).await.unwrap_err();
        assert!(matches!(err, DownloadError::InvalidUrl { .. }));
    }
}
