use bytes::Bytes;
use tcp_segment::Address;

/// A reassembled HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpMessage {
    /// Server the response came from.
    pub peer: Address,
    /// Header block captured from the first segment, including the blank line.
    pub head: Bytes,
    /// Concatenated body bytes of every segment of the flow.
    pub body: Bytes,
}

impl HttpMessage {
    /// The status line, e.g. `HTTP/1.1 200 OK`.
    pub fn status_line(&self) -> Option<&str> {
        self.head_lines().next()
    }

    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head_lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim())
        })
    }

    fn head_lines(&self) -> impl Iterator<Item = &str> {
        std::str::from_utf8(&self.head)
            .unwrap_or_default()
            .split("\r\n")
            .filter(|line| !line.is_empty())
    }
}
