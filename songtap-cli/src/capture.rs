//! libpcap capture running on its own thread.
//!
//! The capture handle blocks in `next_packet`, so it lives on a dedicated OS thread and
//! hands owned frames to the async pipeline through a bounded channel. Dropping the
//! receiver stops the thread at the next frame or read timeout.

use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use pcap::{Activated, Capture, Device};
use tcp_segment::FrameLayout;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::CaptureConfig;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("No capture device found")]
    NoDevice,

    #[error("Failed to open {device}: {source} (capturing usually requires running as root)")]
    Open { device: String, source: pcap::Error },

    #[error("Failed to open capture file {path}: {source}")]
    OpenFile { path: PathBuf, source: pcap::Error },

    #[error("Invalid capture filter '{filter}': {source}")]
    Filter { filter: String, source: pcap::Error },

    #[error("Unsupported link type {name} ({dlt})")]
    UnsupportedLinktype { dlt: i32, name: String },

    #[error("Capture failed: {0}")]
    Pcap(#[from] pcap::Error),

    #[error("Failed to start capture thread: {0}")]
    Thread(#[from] std::io::Error),
}

/// A running capture.
pub struct FrameSource {
    /// Human-readable origin, a device name or a file path.
    pub origin: String,
    pub filter: String,
    pub layout: FrameLayout,
    pub frames: mpsc::Receiver<Vec<u8>>,
    worker: JoinHandle<Result<u64, CaptureError>>,
}

impl FrameSource {
    /// Start capturing live traffic.
    pub fn live(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let device = match &config.device {
            Some(name) => Device::from(name.as_str()),
            None => Device::lookup()?.ok_or(CaptureError::NoDevice)?,
        };
        let origin = device.name.clone();

        let mut cap = Capture::from_device(device)
            .and_then(|cap| {
                cap.promisc(config.promisc)
                    .snaplen(config.snaplen)
                    .timeout(config.timeout_ms)
                    .open()
            })
            .map_err(|source| CaptureError::Open {
                device: origin.clone(),
                source,
            })?;
        apply_filter(&mut cap, &config.filter)?;

        Self::spawn(cap, origin, config.filter.clone(), config.channel_capacity)
    }

    /// Read frames from a saved capture file.
    pub fn file(path: &Path, filter: Option<&str>, capacity: usize) -> Result<Self, CaptureError> {
        let mut cap = Capture::from_file(path).map_err(|source| CaptureError::OpenFile {
            path: path.to_path_buf(),
            source,
        })?;
        let filter = filter.unwrap_or_default().to_owned();
        if !filter.is_empty() {
            apply_filter(&mut cap, &filter)?;
        }

        Self::spawn(cap, path.display().to_string(), filter, capacity)
    }

    fn spawn<T>(
        cap: Capture<T>,
        origin: String,
        filter: String,
        capacity: usize,
    ) -> Result<Self, CaptureError>
    where
        T: Activated + 'static,
        Capture<T>: Send,
    {
        let layout = layout_for(&cap)?;
        let (tx, frames) = mpsc::channel(capacity.max(1));
        let worker = thread::Builder::new()
            .name("songtap-capture".into())
            .spawn(move || pump(cap, tx))?;

        Ok(Self {
            origin,
            filter,
            layout,
            frames,
            worker,
        })
    }

    /// Close the channel and wait for the capture thread. Returns the frames it read.
    pub async fn finish(self) -> Result<u64, CaptureError> {
        let Self { frames, worker, .. } = self;
        drop(frames);
        match tokio::task::spawn_blocking(move || worker.join()).await {
            Ok(Ok(result)) => result,
            _ => {
                warn!("Capture thread did not exit cleanly");
                Ok(0)
            }
        }
    }
}

fn apply_filter<T: Activated + ?Sized>(
    cap: &mut Capture<T>,
    filter: &str,
) -> Result<(), CaptureError> {
    cap.filter(filter, true)
        .map_err(|source| CaptureError::Filter {
            filter: filter.to_owned(),
            source,
        })
}

fn layout_for<T: Activated + ?Sized>(cap: &Capture<T>) -> Result<FrameLayout, CaptureError> {
    let linktype = cap.get_datalink();
    FrameLayout::for_linktype(linktype.0).ok_or_else(|| CaptureError::UnsupportedLinktype {
        dlt: linktype.0,
        name: linktype.get_name().unwrap_or_else(|_| "unknown".to_owned()),
    })
}

fn pump<T: Activated + ?Sized>(
    mut cap: Capture<T>,
    tx: mpsc::Sender<Vec<u8>>,
) -> Result<u64, CaptureError> {
    let mut count = 0u64;
    loop {
        match cap.next_packet() {
            Ok(packet) => {
                count += 1;
                if tx.blocking_send(packet.data.to_vec()).is_err() {
                    break;
                }
            }
            Err(pcap::Error::TimeoutExpired) => {
                if tx.is_closed() {
                    break;
                }
            }
            Err(pcap::Error::NoMorePackets) => break,
            Err(e) => return Err(e.into()),
        }
    }
    debug!(frames = count, "Capture thread finished");
    Ok(count)
}

/// Capture devices known to libpcap, with their description when there is one.
pub fn list_devices() -> Result<Vec<(String, Option<String>)>, CaptureError> {
    Ok(Device::list()?
        .into_iter()
        .map(|device| (device.name, device.desc))
        .collect())
}
