//! Bounded synchronous byte pipe
//!
//! Connects a producer generating HTML to the renderer consuming it: one writer,
//! one reader, a bounded channel in between. The writer blocks once the reader
//! falls `capacity` chunks behind, which gives natural backpressure and bounded
//! memory. The reader sees end-of-stream when the writer is dropped.
//!
//! There is no cancellation path: a reader that stops consuming without
//! dropping its end leaves the writer blocked. Dropping the reader unblocks the
//! writer with a `BrokenPipe` error instead.

use std::io::{self, Read, Write};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

/// Create a connected writer/reader pair holding at most `capacity` in-flight
/// write chunks.
pub fn pipe(capacity: usize) -> (PipeWriter, PipeReader) {
    let (tx, rx) = sync_channel(capacity);
    (
        PipeWriter { tx },
        PipeReader {
            rx,
            buf: Vec::new(),
            pos: 0,
        },
    )
}

pub struct PipeWriter {
    tx: SyncSender<Vec<u8>>,
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .send(buf.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader disconnected"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct PipeReader {
    rx: Receiver<Vec<u8>>,
    buf: Vec<u8>,
    pos: usize,
}

impl Read for PipeReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        if self.pos >= self.buf.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.buf = chunk;
                    self.pos = 0;
                }
                // Writer dropped: end of stream.
                Err(_) => return Ok(0),
            }
        }
        let n = (self.buf.len() - self.pos).min(out.len());
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_transfers_all_bytes() {
        let (mut writer, mut reader) = pipe(2);
        let producer = thread::spawn(move || {
            for chunk in [&b"<p>"[..], b"hello", b"</p>"] {
                writer.write_all(chunk).unwrap();
            }
        });
        let mut received = String::new();
        reader.read_to_string(&mut received).unwrap();
        producer.join().unwrap();
        assert_eq!(received, "<p>hello</p>");
    }

    #[test]
    fn test_small_destination_buffers() {
        let (mut writer, mut reader) = pipe(1);
        let producer = thread::spawn(move || {
            writer.write_all(b"abcdef").unwrap();
        });
        let mut out = Vec::new();
        let mut buf = [0u8; 2];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        producer.join().unwrap();
        assert_eq!(out, b"abcdef");
    }

    #[test]
    fn test_writer_blocks_until_reader_catches_up() {
        let (mut writer, mut reader) = pipe(1);
        let producer = thread::spawn(move || {
            // Second write can only complete once the reader drains the first.
            writer.write_all(b"one").unwrap();
            writer.write_all(b"two").unwrap();
        });
        let mut received = String::new();
        reader.read_to_string(&mut received).unwrap();
        producer.join().unwrap();
        assert_eq!(received, "onetwo");
    }

    #[test]
    fn test_dropped_reader_breaks_writes() {
        let (mut writer, reader) = pipe(1);
        drop(reader);
        let err = writer.write(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
