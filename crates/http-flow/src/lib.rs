//! # HTTP Flow
//!
//! Reassembles one HTTP response at a time from captured TCP segments.
//!
//! The [`FlowTracker`] arms itself when an outbound request matching a pattern is
//! seen, collects the server's reply keyed only on the server address, and hands the
//! message back once a segment with the PUSH flag arrives.
//!
//! Segments are assumed to arrive in order and without duplicates. There is no
//! sequence-number tracking: loss, reordering or a second stream from the same
//! server address corrupts the message without being detected.

mod message;
mod split;
mod tracker;

pub use message::HttpMessage;
pub use split::{MessageParts, split_message};
pub use tracker::{
    DEFAULT_MIN_FIRST_BODY, DEFAULT_SERVER_PORT, FlowState, FlowTracker, Observation, TrackerConfig,
};
