//! # TCP Segment
//!
//! Zero-copy view over a captured link-layer frame carrying an IPv4/TCP segment.
//!
//! Parsing is driven by a [`FrameLayout`] table of fixed byte offsets, one per
//! link-layer encapsulation. IPv4 options and IPv6 are not supported: such frames
//! fail to parse and are meant to be skipped by the caller, not reported.
//!
//! ## Core Types
//!
//! - [`Address`] / [`Port`] - fixed-width values copied out of the frame
//! - [`FrameLayout`] - offset table for one encapsulation
//! - [`TcpSegment`] - parsed header fields and a borrowed payload slice
//! - [`SegmentError`] - why a frame is not a segment of interest

mod addr;
mod layout;
mod segment;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use addr::{Address, Port};
pub use layout::FrameLayout;
pub use segment::{SegmentError, TcpFlags, TcpSegment};
