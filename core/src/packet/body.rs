// ## 📂 File: `src/packet/body.rs`

//! Streaming packet bodies with partial body lengths.
//!
//! `PartialBodyWriter` lets a packet of unknown total size be emitted while it
//! is produced: full chunks go out as power-of-two partial lengths, the tail
//! goes out as a definite length on `finish()`. `PartialBodyReader` presents
//! such a body (or a plain definite/indeterminate one) as a flat `Read`.
//!
//! Invariants:
//! - The buffer never holds more than `chunk_size` bytes.
//! - The last length header of a packet is always definite (possibly zero).

use std::io::{self, Read, Write};

use tracing::trace;

use crate::constants::{MAX_PARTIAL_CHUNK_SIZE, MIN_PARTIAL_CHUNK_SIZE};
use crate::packet::header::{encode_body_length, read_body_length, write_packet_header};
use crate::packet::types::{BodyLength, PacketError, Tag};

pub struct PartialBodyWriter<W: Write> {
    inner: W,
    tag: Tag,
    chunk_size: usize,
    buf: Vec<u8>,
    started: bool,
    chunks: u64,
}

impl<W: Write> PartialBodyWriter<W> {
    pub fn new(inner: W, tag: Tag, chunk_size: usize) -> Result<Self, PacketError> {
        if !tag.allows_partial() {
            return Err(PacketError::InvalidLength(format!("{tag:?} packets cannot be streamed")));
        }
        if !chunk_size.is_power_of_two()
            || !(MIN_PARTIAL_CHUNK_SIZE..=MAX_PARTIAL_CHUNK_SIZE).contains(&chunk_size)
        {
            return Err(PacketError::InvalidLength(format!(
                "partial chunk size {chunk_size} must be a power of two in {MIN_PARTIAL_CHUNK_SIZE}..={MAX_PARTIAL_CHUNK_SIZE}"
            )));
        }
        Ok(Self {
            inner,
            tag,
            chunk_size,
            buf: Vec::with_capacity(chunk_size),
            started: false,
            chunks: 0,
        })
    }

    /// Emit the buffered tail with a definite length and return the sink.
    pub fn finish(mut self) -> Result<W, PacketError> {
        let len = self.buf.len() as u32;
        if self.started {
            let mut hdr = Vec::with_capacity(5);
            encode_body_length(BodyLength::Fixed(len), &mut hdr)?;
            self.inner.write_all(&hdr)?;
        } else {
            write_packet_header(&mut self.inner, self.tag, BodyLength::Fixed(len))?;
        }
        self.inner.write_all(&self.buf)?;
        self.inner.flush()?;
        trace!(tag = ?self.tag, partial_chunks = self.chunks, tail = len, "packet body finished");
        Ok(self.inner)
    }

    fn flush_chunk(&mut self) -> io::Result<()> {
        let mut hdr = Vec::with_capacity(2);
        if !self.started {
            hdr.push(self.tag.new_format_octet());
            self.started = true;
        }
        encode_body_length(BodyLength::Partial(self.chunk_size as u32), &mut hdr).map_err(io::Error::from)?;
        self.inner.write_all(&hdr)?;
        self.inner.write_all(&self.buf)?;
        self.buf.clear();
        self.chunks += 1;
        Ok(())
    }
}

impl<W: Write> Write for PartialBodyWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < data.len() {
            let room = self.chunk_size - self.buf.len();
            let take = room.min(data.len() - written);
            self.buf.extend_from_slice(&data[written..written + take]);
            written += take;
            if self.buf.len() == self.chunk_size {
                self.flush_chunk()?;
            }
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Only whole chunks can leave; the tail waits for finish().
        self.inner.flush()
    }
}

/// Reads a packet body, following partial length headers transparently.
pub struct PartialBodyReader<R: Read> {
    inner: R,
    remaining: u64,
    last: bool,
    indeterminate: bool,
}

impl<R: Read> PartialBodyReader<R> {
    pub fn new(inner: R, length: BodyLength) -> Self {
        let mut reader = Self {
            inner,
            remaining: 0,
            last: true,
            indeterminate: false,
        };
        reader.set_length(length);
        reader
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn set_length(&mut self, length: BodyLength) {
        match length {
            BodyLength::Fixed(n) => {
                self.remaining = n as u64;
                self.last = true;
            }
            BodyLength::Partial(n) => {
                self.remaining = n as u64;
                self.last = false;
            }
            BodyLength::Indeterminate => self.indeterminate = true,
        }
    }
}

impl<R: Read> Read for PartialBodyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.indeterminate {
                return self.inner.read(buf);
            }
            if self.remaining == 0 {
                if self.last {
                    return Ok(0);
                }
                let mut raw = Vec::with_capacity(5);
                let next = read_body_length(&mut self.inner, &mut raw).map_err(io::Error::from)?;
                self.set_length(next);
                continue;
            }

            let want = (buf.len() as u64).min(self.remaining) as usize;
            let n = self.inner.read(&mut buf[..want])?;
            if n == 0 {
                return Err(PacketError::Truncated.into());
            }
            self.remaining -= n as u64;
            return Ok(n);
        }
    }
}
