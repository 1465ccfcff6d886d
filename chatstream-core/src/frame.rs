//! Frame extraction from assembled lines.

/// Prefix of a payload-carrying line.
pub const DATA_PREFIX: &str = "data:";
/// Payload marking the end of the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    Sentinel,
    /// Trimmed payload text, expected to be JSON.
    Payload(&'a str),
}

/// Extracts the frame carried by `line`, if any.
///
/// Lines without the `data:` prefix (blank separators, `event:`, `id:`,
/// `retry:`, `:` comments) are not frames. Neither is a `data:` line with an
/// empty payload, which some proxies send as a keep-alive.
pub fn extract_frame(line: &str) -> Option<Frame<'_>> {
    let data = line.strip_prefix(DATA_PREFIX)?.trim();
    match data {
        "" => None,
        DONE_SENTINEL => Some(Frame::Sentinel),
        payload => Some(Frame::Payload(payload)),
    }
}
