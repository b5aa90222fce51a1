use std::sync::LazyLock;

use regex::bytes::Regex;

// Greedy head: everything up to and including the last blank line.
static BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s-u)\A(.*\r\n\r\n)(.*)").expect("boundary pattern is valid")
});

/// Header block and body block of an HTTP message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageParts<'a> {
    /// Start line and headers, including the terminating `\r\n\r\n`.
    pub head: &'a [u8],
    pub body: &'a [u8],
}

/// Split `data` on the CRLFCRLF boundary.
///
/// When the blob contains more than one boundary the head extends to the last one.
/// Without any boundary both parts are empty, which is what a continuation segment
/// carrying only body bytes looks like.
pub fn split_message(data: &[u8]) -> MessageParts<'_> {
    match BOUNDARY.captures(data) {
        Some(caps) => MessageParts {
            head: caps.get(1).map_or(&[][..], |m| m.as_bytes()),
            body: caps.get(2).map_or(&[][..], |m| m.as_bytes()),
        },
        None => MessageParts::default(),
    }
}
