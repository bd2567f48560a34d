// ## 📂 File: `src/packet/seipd.rs`

//! src/packet/seipd.rs
//!
//! Symmetrically encrypted, integrity protected data (version 2).
//!
//! Body layout:
//! ```text
//! version(2) | cipher | aead mode | chunk octet c | salt(32) | chunk_0 .. chunk_n | final tag
//! ```
//!
//! Design notes:
//! - Chunk size is `1 << (c + 6)` plaintext octets; every chunk but the last is full.
//! - Message key and IV come from HKDF-SHA256(session key, salt, info), where
//!   info is the packet tag octet followed by the four fixed body octets.
//! - Chunk `i` is sealed under nonce `iv || i` with AAD = info.
//! - The final tag seals nothing under nonce `iv || n` with AAD = info || total
//!   plaintext octets, so truncation at a chunk boundary is detected.
//! - The reader keeps one chunk plus one tag of lookahead to tell the last
//!   chunk from the final tag without knowing the body length up front.

use std::io::{self, Read, Write};

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, trace};

use crate::constants::{MAX_AEAD_CHUNK_OCTET, SEIPD_SALT_LEN, SEIPD_VERSION, TAG_LEN};
use crate::crypto::{derive_chunk_nonce, derive_message_keys, ChunkCipher, SessionKey, GCM_IV_LEN};
use crate::packet::types::{AeadMode, PacketError, SymmetricAlgorithm, Tag};

/// AEAD info / AAD prefix length: tag octet + four body octets.
const INFO_LEN: usize = 5;

/// Fixed prefix of a v2 SEIPD body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeipdHeader {
    pub cipher: SymmetricAlgorithm,
    pub aead: AeadMode,
    pub chunk_octet: u8,
    pub salt: [u8; SEIPD_SALT_LEN],
}

impl SeipdHeader {
    pub const LEN: usize = 4 + SEIPD_SALT_LEN;

    pub fn new(chunk_octet: u8) -> Result<Self, PacketError> {
        check_chunk_octet(chunk_octet)?;
        let mut salt = [0u8; SEIPD_SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        Ok(Self {
            cipher: SymmetricAlgorithm::Aes256,
            aead: AeadMode::Gcm,
            chunk_octet,
            salt,
        })
    }

    pub fn chunk_size(&self) -> usize {
        1usize << (self.chunk_octet as u32 + 6)
    }

    pub fn info(&self) -> [u8; INFO_LEN] {
        [
            Tag::SymEncryptedIntegrityProtectedData.new_format_octet(),
            SEIPD_VERSION,
            self.cipher as u8,
            self.aead as u8,
            self.chunk_octet,
        ]
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[..4].copy_from_slice(&self.info()[1..]);
        out[4..].copy_from_slice(&self.salt);
        out
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self, PacketError> {
        let mut buf = [0u8; Self::LEN];
        r.read_exact(&mut buf)?;

        if buf[0] != SEIPD_VERSION {
            return Err(PacketError::UnsupportedVersion {
                packet: "SEIPD",
                version: buf[0],
            });
        }
        let cipher = parse_cipher(buf[1])?;
        let aead = AeadMode::try_from(buf[2]).map_err(|_| PacketError::UnsupportedAead(buf[2]))?;
        check_chunk_octet(buf[3])?;

        let mut salt = [0u8; SEIPD_SALT_LEN];
        salt.copy_from_slice(&buf[4..]);
        Ok(Self {
            cipher,
            aead,
            chunk_octet: buf[3],
            salt,
        })
    }
}

/// Map a cipher octet from a data packet to a known algorithm.
pub fn parse_cipher(raw: u8) -> Result<SymmetricAlgorithm, PacketError> {
    SymmetricAlgorithm::try_from(raw).map_err(|_| PacketError::UnsupportedCipher(raw))
}

fn check_chunk_octet(c: u8) -> Result<(), PacketError> {
    if c > MAX_AEAD_CHUNK_OCTET {
        return Err(PacketError::Malformed(format!(
            "AEAD chunk octet {c} exceeds {MAX_AEAD_CHUNK_OCTET}"
        )));
    }
    Ok(())
}

struct ChunkKeys {
    cipher: ChunkCipher,
    iv: [u8; GCM_IV_LEN],
    info: [u8; INFO_LEN],
}

impl ChunkKeys {
    fn derive(session_key: &SessionKey, header: &SeipdHeader) -> Result<Self, PacketError> {
        let info = header.info();
        let keys = derive_message_keys(session_key.as_bytes(), &header.salt, &info)?;
        Ok(Self {
            cipher: ChunkCipher::new(&keys.key[..])?,
            iv: keys.iv,
            info,
        })
    }

    fn final_aad(&self, total: u64) -> [u8; INFO_LEN + 8] {
        let mut aad = [0u8; INFO_LEN + 8];
        aad[..INFO_LEN].copy_from_slice(&self.info);
        aad[INFO_LEN..].copy_from_slice(&total.to_be_bytes());
        aad
    }
}

/// Encrypting side: buffers plaintext into chunks and seals them into `inner`.
pub struct AeadChunkWriter<W: Write> {
    inner: W,
    keys: ChunkKeys,
    chunk_size: usize,
    buf: Vec<u8>,
    index: u64,
    total: u64,
}

impl<W: Write> AeadChunkWriter<W> {
    /// Write the SEIPD v2 body prefix and derive the message keys.
    pub fn new(mut inner: W, session_key: &SessionKey, chunk_octet: u8) -> Result<Self, PacketError> {
        let header = SeipdHeader::new(chunk_octet)?;
        inner.write_all(&header.to_bytes())?;
        let keys = ChunkKeys::derive(session_key, &header)?;
        debug!(chunk_size = header.chunk_size(), cipher = %header.cipher, "AEAD stream started");
        Ok(Self {
            inner,
            keys,
            chunk_size: header.chunk_size(),
            buf: Vec::with_capacity(header.chunk_size()),
            index: 0,
            total: 0,
        })
    }

    fn seal_buffered(&mut self) -> Result<(), PacketError> {
        let nonce = derive_chunk_nonce(&self.keys.iv, self.index);
        let sealed = self.keys.cipher.seal(&nonce, &self.keys.info, &self.buf)?;
        self.inner.write_all(&sealed)?;
        self.total += self.buf.len() as u64;
        self.index += 1;
        self.buf.clear();
        Ok(())
    }

    /// Seal the last partial chunk and the final tag, then return the sink.
    pub fn finish(mut self) -> Result<W, PacketError> {
        if !self.buf.is_empty() {
            self.seal_buffered()?;
        }
        let nonce = derive_chunk_nonce(&self.keys.iv, self.index);
        let tag = self.keys.cipher.seal(&nonce, &self.keys.final_aad(self.total), &[])?;
        self.inner.write_all(&tag)?;
        trace!(chunks = self.index, plaintext = self.total, "AEAD stream finished");
        Ok(self.inner)
    }
}

impl<W: Write> Write for AeadChunkWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < data.len() {
            let take = (self.chunk_size - self.buf.len()).min(data.len() - written);
            self.buf.extend_from_slice(&data[written..written + take]);
            written += take;
            if self.buf.len() == self.chunk_size {
                self.seal_buffered().map_err(io::Error::from)?;
            }
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Decrypting side: yields plaintext one authenticated chunk at a time.
pub struct AeadChunkReader<R: Read> {
    inner: R,
    keys: ChunkKeys,
    chunk_size: usize,
    pending: Vec<u8>,
    plain: Vec<u8>,
    plain_pos: usize,
    index: u64,
    total: u64,
    eof: bool,
    done: bool,
}

impl<R: Read> AeadChunkReader<R> {
    /// Read the SEIPD v2 body prefix from `inner` and derive the message keys.
    pub fn new(mut inner: R, session_key: &SessionKey) -> Result<Self, PacketError> {
        let header = SeipdHeader::read(&mut inner)?;
        if header.cipher != SymmetricAlgorithm::Aes256 {
            return Err(PacketError::UnsupportedCipher(header.cipher as u8));
        }
        let keys = ChunkKeys::derive(session_key, &header)?;
        let chunk_size = header.chunk_size();
        Ok(Self {
            inner,
            keys,
            chunk_size,
            pending: Vec::with_capacity(chunk_size + 2 * TAG_LEN),
            plain: Vec::new(),
            plain_pos: 0,
            index: 0,
            total: 0,
            eof: false,
            done: false,
        })
    }

    /// Consume the rest of the stream and verify the final tag.
    ///
    /// Fails if any plaintext is left unread.
    pub fn finish(&mut self) -> Result<(), PacketError> {
        while !self.done {
            if self.plain_pos < self.plain.len() {
                break;
            }
            self.next_chunk()?;
        }
        if self.plain_pos < self.plain.len() {
            return Err(PacketError::Malformed("trailing data after literal packet".into()));
        }
        Ok(())
    }

    fn fill(&mut self) -> Result<(), PacketError> {
        let want = self.chunk_size + 2 * TAG_LEN;
        while !self.eof && self.pending.len() < want {
            let start = self.pending.len();
            self.pending.resize(want, 0);
            match self.inner.read(&mut self.pending[start..]) {
                Ok(n) => {
                    self.pending.truncate(start + n);
                    self.eof = n == 0;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => self.pending.truncate(start),
                Err(e) => {
                    self.pending.truncate(start);
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    fn open_chunk(&mut self, len: usize) -> Result<(), PacketError> {
        let nonce = derive_chunk_nonce(&self.keys.iv, self.index);
        let plain = self.keys.cipher.open(&nonce, &self.keys.info, &self.pending[..len])?;
        self.pending.drain(..len);
        self.index += 1;
        self.total += plain.len() as u64;
        self.plain = plain;
        self.plain_pos = 0;
        Ok(())
    }

    fn next_chunk(&mut self) -> Result<(), PacketError> {
        self.fill()?;
        let full = self.chunk_size + TAG_LEN;

        if self.pending.len() >= full + TAG_LEN {
            return self.open_chunk(full);
        }

        // End of body: what is left is an optional short chunk plus the final tag.
        if self.pending.len() < TAG_LEN {
            return Err(PacketError::Truncated);
        }
        let tail = self.pending.len() - TAG_LEN;
        if tail > 0 {
            if tail <= TAG_LEN {
                return Err(PacketError::Malformed(format!("AEAD chunk of {tail} octets")));
            }
            self.open_chunk(tail)?;
        }

        let nonce = derive_chunk_nonce(&self.keys.iv, self.index);
        let aad = self.keys.final_aad(self.total);
        self.keys.cipher.open(&nonce, &aad, &self.pending[..TAG_LEN])?;
        self.pending.clear();
        self.done = true;
        trace!(chunks = self.index, plaintext = self.total, "AEAD final tag verified");
        Ok(())
    }
}

impl<R: Read> Read for AeadChunkReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.plain_pos < self.plain.len() {
                let n = (self.plain.len() - self.plain_pos).min(buf.len());
                buf[..n].copy_from_slice(&self.plain[self.plain_pos..self.plain_pos + n]);
                self.plain_pos += n;
                return Ok(n);
            }
            if self.done {
                return Ok(0);
            }
            self.next_chunk().map_err(io::Error::from)?;
        }
    }
}
