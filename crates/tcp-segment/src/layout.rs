/// Byte offsets used to pull IPv4/TCP fields out of a captured frame.
///
/// IP offsets are relative to the end of the link-layer header, TCP offsets are
/// relative to the end of the fixed-size IP header. Adding an encapsulation is a
/// matter of adding a constant here; [`TcpSegment::parse`](crate::TcpSegment::parse)
/// never hardcodes an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub name: &'static str,
    /// Length of the link-layer header preceding the IP header.
    pub link_header_len: usize,
    /// IPv4 header length. Options are not supported.
    pub ip_header_len: usize,
    pub ip_protocol: usize,
    pub ip_src: usize,
    pub ip_dst: usize,
    pub tcp_src_port: usize,
    pub tcp_dst_port: usize,
    /// Byte holding the data offset (upper nibble) and the high flag bits (lower nibble).
    pub tcp_offset_flags: usize,
    /// Byte holding the low eight flag bits.
    pub tcp_flags: usize,
    /// Bytes of TCP header required past the IP header for a frame to be considered at all.
    pub tcp_min_len: usize,
}

/// IANA protocol number for TCP.
pub(crate) const IP_PROTOCOL_TCP: u8 = 6;

const IPV4: FrameLayout = FrameLayout {
    name: "raw",
    link_header_len: 0,
    ip_header_len: 20,
    ip_protocol: 9,
    ip_src: 12,
    ip_dst: 16,
    tcp_src_port: 0,
    tcp_dst_port: 2,
    tcp_offset_flags: 12,
    tcp_flags: 13,
    tcp_min_len: 10,
};

impl FrameLayout {
    /// Ethernet II (DLT_EN10MB). Minimum frame is 44 bytes.
    pub const ETHERNET: FrameLayout = FrameLayout {
        name: "ethernet",
        link_header_len: 14,
        ..IPV4
    };

    /// Linux cooked capture v1 (DLT_LINUX_SLL), used by the `any` device.
    pub const LINUX_SLL: FrameLayout = FrameLayout {
        name: "linux-sll",
        link_header_len: 16,
        ..IPV4
    };

    /// BSD loopback (DLT_NULL).
    pub const NULL: FrameLayout = FrameLayout {
        name: "null",
        link_header_len: 4,
        ..IPV4
    };

    /// Raw IP, no link-layer header (DLT_RAW).
    pub const RAW: FrameLayout = IPV4;

    /// Map a libpcap data link type number to a layout.
    pub fn for_linktype(dlt: i32) -> Option<FrameLayout> {
        match dlt {
            0 => Some(Self::NULL),
            1 => Some(Self::ETHERNET),
            12 | 14 | 101 => Some(Self::RAW),
            113 => Some(Self::LINUX_SLL),
            _ => None,
        }
    }

    /// Absolute offset of the first TCP header byte.
    pub const fn tcp_start(&self) -> usize {
        self.link_header_len + self.ip_header_len
    }

    /// Frames shorter than this are never parsed.
    pub const fn min_frame_len(&self) -> usize {
        self.tcp_start() + self.tcp_min_len
    }
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self::ETHERNET
    }
}
