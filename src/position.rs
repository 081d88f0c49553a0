//! Byte-offset to line/column mapping for error reporting
//!
//! `LineCounter` wraps an `io::Read` and records the offset of every line feed
//! (0x0A) that passes through it, so byte offsets handed out by the tokenizer can
//! later be resolved to 1-based line/column pairs. Files with CRLF line endings
//! count correctly as well.

use std::io::{self, Read};

/// Pass-through reader that records line-ending offsets.
pub struct LineCounter<R> {
    inner: R,
    newlines: Vec<usize>,
    consumed: usize,
}

impl<R> LineCounter<R> {
    pub fn new(inner: R) -> Self {
        LineCounter {
            inner,
            newlines: Vec::new(),
            consumed: 0,
        }
    }

    /// Total bytes read through this counter so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Resolve a byte offset to a 1-based (line, column) pair.
    ///
    /// Only offsets the stream has already been read past resolve meaningfully;
    /// offsets beyond the last recorded newline fall on the last known line.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        // First index whose newline offset is >= the queried offset; the newline
        // byte itself belongs to the line it terminates.
        let i = self.newlines.partition_point(|&nl| nl < offset);
        let line_start = if i == 0 { 0 } else { self.newlines[i - 1] + 1 };
        (i + 1, offset - line_start + 1)
    }

    fn scan(&mut self, chunk: &[u8]) {
        for (i, &b) in chunk.iter().enumerate() {
            if b == b'\n' {
                self.newlines.push(self.consumed + i);
            }
        }
        self.consumed += chunk.len();
    }
}

impl<R: Read> Read for LineCounter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.scan(&buf[..n]);
        Ok(n)
    }
}
