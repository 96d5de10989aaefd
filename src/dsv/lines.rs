//! Position-tracking line reader.

use std::borrow::Cow;
use std::io::{self, BufRead};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reads `\n`-terminated lines while tracking the absolute byte position.
///
/// The position always points at the first byte of the next unread line,
/// which is what the indexer records as a chunk boundary.
pub(crate) struct LineReader<R> {
    inner: R,
    position: u64,
}

impl<R: BufRead> LineReader<R> {
    /// Wrap a reader whose cursor sits at byte `position` of the source.
    pub(crate) fn new(inner: R, position: u64) -> Self {
        Self { inner, position }
    }

    /// Byte position of the next unread line.
    #[inline]
    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    /// Read the next line into `buf` without its terminator.
    ///
    /// `buf` is cleared first. Returns `false` at end of input. A trailing
    /// `\r` before the `\n` is treated as part of the terminator; a final line
    /// with no terminator is still returned.
    pub(crate) fn next_line(&mut self, buf: &mut Vec<u8>) -> io::Result<bool> {
        buf.clear();
        let n = self.inner.read_until(b'\n', buf)?;
        if n == 0 {
            return Ok(false);
        }
        self.position += n as u64;

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        Ok(true)
    }
}

/// Decode a line as UTF-8, replacing invalid sequences.
#[inline]
pub(crate) fn decode(line: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(line)
}

/// Strip a leading UTF-8 byte-order mark.
#[inline]
pub(crate) fn strip_bom(line: &[u8]) -> &[u8] {
    line.strip_prefix(UTF8_BOM).unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(text: &[u8]) -> Vec<(u64, Vec<u8>)> {
        let mut reader = LineReader::new(text, 0);
        let mut buf = Vec::new();
        let mut out = Vec::new();
        loop {
            let start = reader.position();
            if !reader.next_line(&mut buf).unwrap() {
                break;
            }
            out.push((start, buf.clone()));
        }
        out
    }

    #[test]
    fn test_positions() {
        let lines = collect(b"ab\ncde\n\nf");
        assert_eq!(
            lines,
            vec![
                (0, b"ab".to_vec()),
                (3, b"cde".to_vec()),
                (7, b"".to_vec()),
                (8, b"f".to_vec()),
            ]
        );
    }

    #[test]
    fn test_crlf() {
        let lines = collect(b"a\r\nb\r\n");
        assert_eq!(lines, vec![(0, b"a".to_vec()), (3, b"b".to_vec())]);
    }

    #[test]
    fn test_lone_cr_is_not_a_terminator() {
        let lines = collect(b"a\rb\n");
        assert_eq!(lines, vec![(0, b"a\rb".to_vec())]);
    }

    #[test]
    fn test_empty_input() {
        assert!(collect(b"").is_empty());
    }

    #[test]
    fn test_bom_and_decode() {
        assert_eq!(strip_bom(b"\xEF\xBB\xBFid,name"), b"id,name");
        assert_eq!(strip_bom(b"id"), b"id");
        assert_eq!(decode(b"caf\xC3\xA9"), "café");
        assert_eq!(decode(b"bad\xFF"), "bad\u{FFFD}");
    }
}
