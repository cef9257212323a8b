//! Byte stream → line framing.
//!
//! TCP gives no message boundaries: one `read` may return half a line,
//! or several lines at once. [`LineDecoder`] buffers whatever arrives
//! and hands back complete lines.
//!
//! Lines longer than `max_line_len` bytes are cut into chunks of at most
//! that size, so one client cannot make the server buffer without bound.
//! Cuts land on UTF-8 character boundaries whenever the input allows it.

use bytes::{Buf, BytesMut};

/// Maximum payload bytes per line unless configured otherwise.
pub const DEFAULT_MAX_LINE_LEN: usize = 255;

#[derive(Debug)]
pub struct LineDecoder {
    buf: BytesMut,
    max_line_len: usize,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LEN)
    }
}

impl LineDecoder {
    pub fn new(max_line_len: usize) -> Self {
        LineDecoder {
            buf: BytesMut::with_capacity(max_line_len.saturating_add(1).min(64 * 1024)),
            max_line_len: max_line_len.max(1),
        }
    }

    /// Feed freshly read bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes received but not yet returned as a line.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Next complete line, without `\n` / `\r\n`.
    ///
    /// Invalid UTF-8 is replaced lossily.
    pub fn next_line(&mut self) -> Option<String> {
        let search = self.buf.len().min(self.max_line_len.saturating_add(1));
        if let Some(pos) = self.buf[..search].iter().position(|&b| b == b'\n') {
            let line = self.buf.split_to(pos);
            self.buf.advance(1);
            return Some(to_text(&line));
        }

        if self.buf.len() > self.max_line_len {
            let cut = char_boundary_at_or_before(&self.buf, self.max_line_len);
            let chunk = self.buf.split_to(cut);
            return Some(to_text(&chunk));
        }

        None
    }

    /// Whatever is left once the peer has closed the stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = self.buf.split();
        Some(to_text(&rest))
    }
}

/// Largest cut `<= at` that does not land inside a UTF-8 sequence.
///
/// Falls back to `at` when no lead byte is close enough, e.g. for binary
/// garbage or a limit smaller than one character.
fn char_boundary_at_or_before(buf: &[u8], at: usize) -> usize {
    let mut cut = at;
    // A UTF-8 sequence has at most three continuation bytes.
    while cut > 0 && at - cut < 4 && is_continuation(buf[cut]) {
        cut -= 1;
    }
    if cut == 0 || is_continuation(buf[cut]) {
        at
    } else {
        cut
    }
}

fn is_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}

fn to_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
