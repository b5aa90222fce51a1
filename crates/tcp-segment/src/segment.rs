use thiserror::Error;

use crate::addr::{Address, Port};
use crate::layout::{FrameLayout, IP_PROTOCOL_TCP};

/// Why a frame was not parsed as a TCP segment.
///
/// These are expected for most captured traffic and are not operator-facing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SegmentError {
    #[error("frame too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("not a TCP segment (IP protocol {protocol})")]
    NotTcp { protocol: u8 },
}

/// The 12-bit TCP flags field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpFlags(u16);

impl TcpFlags {
    const FIN: u16 = 1 << 0;
    const SYN: u16 = 1 << 1;
    const RST: u16 = 1 << 2;
    const PSH: u16 = 1 << 3;
    const ACK: u16 = 1 << 4;

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & 0x0fff)
    }

    pub const fn bits(&self) -> u16 {
        self.0
    }

    pub const fn is_push(&self) -> bool {
        self.0 & Self::PSH != 0
    }

    pub const fn is_ack(&self) -> bool {
        self.0 & Self::ACK != 0
    }

    pub const fn is_syn(&self) -> bool {
        self.0 & Self::SYN != 0
    }

    pub const fn is_fin(&self) -> bool {
        self.0 & Self::FIN != 0
    }

    pub const fn is_rst(&self) -> bool {
        self.0 & Self::RST != 0
    }
}

/// A parsed IPv4/TCP segment borrowing its payload from the captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpSegment<'a> {
    pub src: Address,
    pub dst: Address,
    pub src_port: Port,
    pub dst_port: Port,
    pub flags: TcpFlags,
    /// TCP header length in bytes (data offset × 4).
    pub header_len: usize,
    pub payload: &'a [u8],
}

impl<'a> TcpSegment<'a> {
    /// Parse a captured frame using the offsets of `layout`.
    ///
    /// A frame long enough for addresses and ports but truncated inside the rest of the
    /// TCP header parses with empty flags and an empty payload. A data offset pointing
    /// past the end of the frame also yields an empty payload.
    pub fn parse(frame: &'a [u8], layout: &FrameLayout) -> Result<Self, SegmentError> {
        let min = layout.min_frame_len();
        if frame.len() < min {
            return Err(SegmentError::TooShort {
                len: frame.len(),
                min,
            });
        }

        let ip = layout.link_header_len;
        let protocol = frame[ip + layout.ip_protocol];
        if protocol != IP_PROTOCOL_TCP {
            return Err(SegmentError::NotTcp { protocol });
        }

        let tcp = layout.tcp_start();
        let src = read_address(frame, ip + layout.ip_src);
        let dst = read_address(frame, ip + layout.ip_dst);
        let src_port = read_port(frame, tcp + layout.tcp_src_port);
        let dst_port = read_port(frame, tcp + layout.tcp_dst_port);

        let (flags, header_len, payload) = match (
            frame.get(tcp + layout.tcp_offset_flags),
            frame.get(tcp + layout.tcp_flags),
        ) {
            (Some(&offset_flags), Some(&low)) => {
                let flags =
                    TcpFlags::from_bits((u16::from(offset_flags & 0x0f) << 8) | u16::from(low));
                let header_len = usize::from(offset_flags >> 4) * 4;
                let payload = frame.get(tcp + header_len..).unwrap_or(&[]);
                (flags, header_len, payload)
            }
            _ => (TcpFlags::default(), frame.len() - tcp, &[][..]),
        };

        Ok(Self {
            src,
            dst,
            src_port,
            dst_port,
            flags,
            header_len,
            payload,
        })
    }
}

fn read_address(frame: &[u8], at: usize) -> Address {
    Address::new([frame[at], frame[at + 1], frame[at + 2], frame[at + 3]])
}

fn read_port(frame: &[u8], at: usize) -> Port {
    Port::new([frame[at], frame[at + 1]])
}
