//! Line assembly over an arbitrarily chunked byte stream.

/// Buffers raw bytes and hands out complete `\n`-terminated lines.
///
/// Bytes are only decoded once a full line is present. `\n` never appears
/// inside a multibyte UTF-8 sequence, so a chunk boundary that splits a
/// character cannot corrupt the text.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buf: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every line it completed, without the
    /// terminator (a trailing `\r` is stripped as well). The unterminated
    /// remainder stays buffered for the next call.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // the buffered tail never holds a `\n`, so only `chunk` needs scanning
        let Some(pos) = chunk.iter().rposition(|b| *b == b'\n') else {
            self.buf.extend_from_slice(chunk);
            return Vec::new();
        };
        let last_nl = self.buf.len() + pos;
        self.buf.extend_from_slice(chunk);
        let rest = self.buf.split_off(last_nl + 1);
        let complete = std::mem::replace(&mut self.buf, rest);
        complete[..last_nl].split(|b| *b == b'\n').map(decode_line).collect()
    }

    /// Number of bytes waiting for a line terminator.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Ends the stream. Whatever is still buffered is not a line and is
    /// returned only so the caller can log it.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let tail = std::mem::take(&mut self.buf);
        Some(String::from_utf8_lossy(&tail).into_owned())
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
