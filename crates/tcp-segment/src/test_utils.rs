//! Synthetic frame construction for tests.

use crate::layout::{FrameLayout, IP_PROTOCOL_TCP};

const FLAG_PSH: u16 = 1 << 3;
const FLAG_ACK: u16 = 1 << 4;

/// Builds a link-layer frame carrying an IPv4/TCP segment.
///
/// Defaults: ACK set, ports 40000 -> 80, addresses 192.168.1.10 -> 198.51.100.1.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    layout: FrameLayout,
    src: [u8; 4],
    dst: [u8; 4],
    src_port: u16,
    dst_port: u16,
    flags: u16,
    options: Vec<u8>,
    payload: Vec<u8>,
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self::with_layout(FrameLayout::ETHERNET)
    }

    pub fn with_layout(layout: FrameLayout) -> Self {
        Self {
            layout,
            src: [192, 168, 1, 10],
            dst: [198, 51, 100, 1],
            src_port: 40000,
            dst_port: 80,
            flags: FLAG_ACK,
            options: Vec::new(),
            payload: Vec::new(),
        }
    }

    pub fn src(mut self, addr: [u8; 4], port: u16) -> Self {
        self.src = addr;
        self.src_port = port;
        self
    }

    pub fn dst(mut self, addr: [u8; 4], port: u16) -> Self {
        self.dst = addr;
        self.dst_port = port;
        self
    }

    pub fn push(mut self) -> Self {
        self.flags |= FLAG_PSH;
        self
    }

    pub fn flags(mut self, flags: u16) -> Self {
        self.flags = flags & 0x0fff;
        self
    }

    /// TCP options, padded to a multiple of four bytes.
    pub fn options(mut self, options: &[u8]) -> Self {
        self.options = options.to_vec();
        while self.options.len() % 4 != 0 {
            self.options.push(0);
        }
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let layout = self.layout;
        let tcp_header_len = 20 + self.options.len();
        let ip_total = layout.ip_header_len + tcp_header_len + self.payload.len();

        let mut frame = vec![0u8; layout.link_header_len];
        if layout == FrameLayout::ETHERNET {
            frame[12..14].copy_from_slice(&[0x08, 0x00]);
        }

        let mut ip = vec![0u8; layout.ip_header_len];
        ip[0] = 0x45;
        ip[2..4].copy_from_slice(&(ip_total as u16).to_be_bytes());
        ip[8] = 64;
        ip[layout.ip_protocol] = IP_PROTOCOL_TCP;
        ip[layout.ip_src..layout.ip_src + 4].copy_from_slice(&self.src);
        ip[layout.ip_dst..layout.ip_dst + 4].copy_from_slice(&self.dst);
        frame.extend_from_slice(&ip);

        let mut tcp = vec![0u8; 20];
        tcp[layout.tcp_src_port..layout.tcp_src_port + 2]
            .copy_from_slice(&self.src_port.to_be_bytes());
        tcp[layout.tcp_dst_port..layout.tcp_dst_port + 2]
            .copy_from_slice(&self.dst_port.to_be_bytes());
        tcp[layout.tcp_offset_flags] = ((tcp_header_len / 4) as u8) << 4 | (self.flags >> 8) as u8;
        tcp[layout.tcp_flags] = (self.flags & 0xff) as u8;
        tcp[14..16].copy_from_slice(&0xffffu16.to_be_bytes());
        frame.extend_from_slice(&tcp);
        frame.extend_from_slice(&self.options);
        frame.extend_from_slice(&self.payload);
        frame
    }
}
