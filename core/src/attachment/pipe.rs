// ## 📂 File: `src/attachment/pipe.rs`
// ## In-memory conduit between the encrypting caller and the split worker

//! Synchronous byte pipe over a bounded crossbeam channel.
//!
//! - `PipeWriter: Write` sends each non-empty write as one `Bytes` message.
//! - `PipeReader: Read` hands out received messages, piecewise if the
//!   caller's buffer is smaller.
//! - Dropping the writer is end-of-stream for the reader.
//! - Dropping the reader makes further writes fail with `BrokenPipe`, so a
//!   writer never blocks on a dead consumer.
//!
//! With capacity 0 every send is a rendezvous: the writer waits until the
//! reader takes the chunk, which bounds memory to one chunk in flight.

use std::io::{self, Read, Write};

use bytes::{Buf, Bytes};
use crossbeam::channel::{bounded, Receiver, Sender};

pub fn pipe(capacity: usize) -> (PipeWriter, PipeReader) {
    let (tx, rx) = bounded::<Bytes>(capacity);
    (
        PipeWriter { tx },
        PipeReader {
            rx,
            current: Bytes::new(),
        },
    )
}

#[derive(Debug)]
pub struct PipeWriter {
    tx: Sender<Bytes>,
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .send(Bytes::copy_from_slice(buf))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
pub struct PipeReader {
    rx: Receiver<Bytes>,
    current: Bytes,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while !self.current.has_remaining() {
            match self.rx.recv() {
                Ok(chunk) => self.current = chunk,
                // all writers gone: end of stream
                Err(_) => return Ok(0),
            }
        }
        let n = self.current.remaining().min(buf.len());
        self.current.copy_to_slice(&mut buf[..n]);
        Ok(n)
    }
}
