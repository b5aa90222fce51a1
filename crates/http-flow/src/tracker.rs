use bytes::{Bytes, BytesMut};
use regex::bytes::Regex;
use tcp_segment::{Address, TcpSegment};
use tracing::{debug, trace};

use crate::message::HttpMessage;
use crate::split::split_message;

/// Default server port of the requests worth tracking.
pub const DEFAULT_SERVER_PORT: u16 = 80;

/// Bodies shorter than this on the first response segment are treated as a
/// premature capture and skipped.
pub const DEFAULT_MIN_FIRST_BODY: usize = 100;

/// What the tracker looks for.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Matched against the payload of outbound requests.
    pub request_pattern: Regex,
    pub server_port: u16,
    pub min_first_body: usize,
}

impl TrackerConfig {
    pub fn new(request_pattern: Regex) -> Self {
        Self {
            request_pattern,
            server_port: DEFAULT_SERVER_PORT,
            min_first_body: DEFAULT_MIN_FIRST_BODY,
        }
    }
}

/// Reassembly state. At most one flow is tracked at a time.
#[derive(Debug, Clone, Default)]
pub enum FlowState {
    #[default]
    Idle,
    /// A matching request went out; waiting for the first response segment.
    Armed { peer: Address },
    /// Header captured, body bytes collected so far.
    Accumulating {
        peer: Address,
        head: Bytes,
        body: BytesMut,
    },
}

impl FlowState {
    pub fn peer(&self) -> Option<Address> {
        match self {
            FlowState::Idle => None,
            FlowState::Armed { peer } | FlowState::Accumulating { peer, .. } => Some(*peer),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, FlowState::Idle)
    }
}

/// Outcome of showing one segment to the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Not part of the tracked flow.
    Unrelated,
    /// First response segment with an implausibly short body; the flow stays armed.
    Discarded,
    /// Appended to the flow, more segments expected.
    Absorbed,
    /// Terminal segment seen; the tracker is idle again.
    Completed(HttpMessage),
}

impl Observation {
    /// Whether the segment belonged to the flow and should not be routed elsewhere.
    pub fn is_consumed(&self) -> bool {
        matches!(self, Observation::Absorbed | Observation::Completed(_))
    }
}

/// Single-flow HTTP response reassembler.
#[derive(Debug)]
pub struct FlowTracker {
    config: TrackerConfig,
    state: FlowState,
}

impl FlowTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            state: FlowState::Idle,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Feed one segment, in capture order.
    pub fn observe(&mut self, segment: &TcpSegment<'_>) -> Observation {
        if segment.payload.is_empty() {
            return Observation::Unrelated;
        }

        if self.state.is_idle()
            && segment.dst_port.value() == self.config.server_port
            && self.config.request_pattern.is_match(segment.payload)
        {
            debug!(peer = %segment.dst, "Request matched, waiting for response");
            self.state = FlowState::Armed { peer: segment.dst };
        }

        match self.state.peer() {
            Some(peer) if peer == segment.src => {}
            _ => return Observation::Unrelated,
        }

        if let FlowState::Accumulating { body, .. } = &mut self.state {
            body.extend_from_slice(segment.payload);
            trace!(
                peer = %segment.src,
                appended = segment.payload.len(),
                total = body.len(),
                "Response segment appended"
            );
        } else {
            let parts = split_message(segment.payload);
            if parts.body.len() < self.config.min_first_body {
                debug!(
                    peer = %segment.src,
                    body_len = parts.body.len(),
                    "First response segment too short, still waiting"
                );
                return Observation::Discarded;
            }
            debug!(
                peer = %segment.src,
                head_len = parts.head.len(),
                body_len = parts.body.len(),
                "Response started"
            );
            self.state = FlowState::Accumulating {
                peer: segment.src,
                head: Bytes::copy_from_slice(parts.head),
                body: BytesMut::from(parts.body),
            };
        }

        if !segment.flags.is_push() {
            return Observation::Absorbed;
        }

        match std::mem::take(&mut self.state) {
            FlowState::Accumulating { peer, head, body } => {
                debug!(peer = %peer, body_len = body.len(), "Response complete");
                Observation::Completed(HttpMessage {
                    peer,
                    head,
                    body: body.freeze(),
                })
            }
            // Armed always moves to Accumulating or returns early above.
            state => {
                self.state = state;
                Observation::Absorbed
            }
        }
    }

    /// Drop any flow in progress.
    pub fn reset(&mut self) {
        self.state = FlowState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcp_segment::FrameLayout;
    use tcp_segment::test_utils::FrameBuilder;

    const CLIENT: [u8; 4] = [192, 168, 1, 10];
    const SERVER: [u8; 4] = [203, 0, 113, 80];
    const OTHER: [u8; 4] = [198, 51, 100, 9];

    fn tracker() -> FlowTracker {
        FlowTracker::new(TrackerConfig::new(
            Regex::new(r"j/mine/playlist\?type=[nps]").unwrap(),
        ))
    }

    fn observe(tracker: &mut FlowTracker, frame: &[u8]) -> Observation {
        let segment = TcpSegment::parse(frame, &FrameLayout::ETHERNET).unwrap();
        tracker.observe(&segment)
    }

    fn request() -> Vec<u8> {
        FrameBuilder::new()
            .src(CLIENT, 40000)
            .dst(SERVER, 80)
            .push()
            .payload(b"GET /j/mine/playlist?type=n&sid=1 HTTP/1.1\r\nHost: example\r\n\r\n")
            .build()
    }

    fn response(payload: &[u8], push: bool) -> Vec<u8> {
        let builder = FrameBuilder::new().src(SERVER, 80).dst(CLIENT, 40000);
        let builder = if push { builder.push() } else { builder };
        builder.payload(payload).build()
    }

    fn first_response(body: &[u8]) -> Vec<u8> {
        let mut payload = b"HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\n\r\n".to_vec();
        payload.extend_from_slice(body);
        response(&payload, false)
    }

    #[test]
    fn matching_request_arms_tracker() {
        let mut tracker = tracker();
        let obs = observe(&mut tracker, &request());
        assert_eq!(obs, Observation::Unrelated);
        assert!(!obs.is_consumed());
        assert_eq!(tracker.state().peer(), Some(Address::new(SERVER)));
        assert!(matches!(tracker.state(), FlowState::Armed { .. }));
    }

    #[test]
    fn request_to_other_port_is_ignored() {
        let mut tracker = tracker();
        let frame = FrameBuilder::new()
            .dst(SERVER, 8080)
            .payload(b"GET /j/mine/playlist?type=n HTTP/1.1\r\n\r\n")
            .build();
        observe(&mut tracker, &frame);
        assert!(tracker.state().is_idle());
    }

    #[test]
    fn non_matching_request_is_ignored() {
        let mut tracker = tracker();
        let frame = FrameBuilder::new()
            .dst(SERVER, 80)
            .payload(b"GET /j/mine/playlist?type=x HTTP/1.1\r\n\r\n")
            .build();
        observe(&mut tracker, &frame);
        assert!(tracker.state().is_idle());
    }

    #[test]
    fn short_first_body_keeps_tracker_armed() {
        let mut tracker = tracker();
        observe(&mut tracker, &request());

        let obs = observe(&mut tracker, &first_response(&[b'x'; 99]));
        assert_eq!(obs, Observation::Discarded);
        assert!(!obs.is_consumed());
        assert!(matches!(tracker.state(), FlowState::Armed { .. }));
    }

    #[test]
    fn reassembles_until_push() {
        let mut tracker = tracker();
        observe(&mut tracker, &request());

        let first_body = vec![b'a'; 120];
        let obs = observe(&mut tracker, &first_response(&first_body));
        assert_eq!(obs, Observation::Absorbed);
        assert!(obs.is_consumed());

        let obs = observe(&mut tracker, &response(b"middle", false));
        assert_eq!(obs, Observation::Absorbed);

        let obs = observe(&mut tracker, &response(b"tail\r\n\r\nnot a header", true));
        let Observation::Completed(message) = obs else {
            panic!("expected completed message, got {obs:?}");
        };

        let mut expected = first_body.clone();
        expected.extend_from_slice(b"middle");
        expected.extend_from_slice(b"tail\r\n\r\nnot a header");
        assert_eq!(message.body, expected);
        assert_eq!(message.peer, Address::new(SERVER));
        assert_eq!(message.header("Content-Encoding"), Some("gzip"));
        assert!(tracker.state().is_idle());
    }

    #[test]
    fn single_segment_response_completes_immediately() {
        let mut tracker = tracker();
        observe(&mut tracker, &request());

        let mut payload = b"HTTP/1.1 200 OK\r\n\r\n".to_vec();
        payload.extend_from_slice(&[b'z'; 150]);
        let obs = observe(&mut tracker, &response(&payload, true));
        let Observation::Completed(message) = obs else {
            panic!("expected completed message");
        };
        assert_eq!(message.body.len(), 150);
        assert!(tracker.state().is_idle());
    }

    #[test]
    fn unrelated_source_is_not_consumed() {
        let mut tracker = tracker();
        observe(&mut tracker, &request());
        observe(&mut tracker, &first_response(&[b'a'; 200]));

        let frame = FrameBuilder::new()
            .src(OTHER, 80)
            .dst(CLIENT, 40001)
            .push()
            .payload(b"unrelated")
            .build();
        assert_eq!(observe(&mut tracker, &frame), Observation::Unrelated);
        assert!(matches!(tracker.state(), FlowState::Accumulating { .. }));
    }

    #[test]
    fn empty_payload_is_ignored() {
        let mut tracker = tracker();
        observe(&mut tracker, &request());
        observe(&mut tracker, &first_response(&[b'a'; 200]));

        let ack = FrameBuilder::new().src(SERVER, 80).dst(CLIENT, 40000).push().build();
        assert_eq!(observe(&mut tracker, &ack), Observation::Unrelated);
        assert!(matches!(tracker.state(), FlowState::Accumulating { .. }));
    }

    #[test]
    fn second_match_while_active_is_ignored() {
        let mut tracker = tracker();
        observe(&mut tracker, &request());

        let other = FrameBuilder::new()
            .src(CLIENT, 40002)
            .dst(OTHER, 80)
            .payload(b"GET /j/mine/playlist?type=p HTTP/1.1\r\n\r\n")
            .build();
        observe(&mut tracker, &other);
        assert_eq!(tracker.state().peer(), Some(Address::new(SERVER)));
    }

    #[test]
    fn rearms_after_completion() {
        let mut tracker = tracker();
        for _ in 0..2 {
            observe(&mut tracker, &request());
            let mut payload = b"HTTP/1.1 200 OK\r\n\r\n".to_vec();
            payload.extend_from_slice(&[b'q'; 100]);
            let obs = observe(&mut tracker, &response(&payload, true));
            assert!(matches!(obs, Observation::Completed(_)));
        }
    }

    #[test]
    fn reset_drops_flow() {
        let mut tracker = tracker();
        observe(&mut tracker, &request());
        tracker.reset();
        assert!(tracker.state().is_idle());
    }
}
