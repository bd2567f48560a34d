// ## 📂 File: `src/packet/message.rs`

//! src/packet/message.rs
//!
//! Whole-message encryption and parsing.
//!
//! Writer stack (outermost first):
//! ```text
//! MessageWriter
//!   └─ PartialBodyWriter (literal data packet, tag 11)
//!        └─ AeadChunkWriter (SEIPD v2 chunk sealing)
//!             └─ PartialBodyWriter (SEIPD packet, tag 18)
//!                  └─ sink W
//! ```
//! The session-key packets are written to the sink before the data packet,
//! one per recipient.
//!
//! Reader: session-key packets are collected until the data packet header,
//! the first one that an unlocked ring key can open yields the session key,
//! and the literal body is exposed as a reader. The body is "unverified"
//! until it has been read to the end: each chunk is authenticated as it is
//! read, the final tag only at end of stream.

use std::io::{self, Read, Write};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::constants::{DEFAULT_AEAD_CHUNK_OCTET, DEFAULT_PARTIAL_CHUNK_SIZE};
use crate::crypto::{KeyEntity, KeyError, KeyRing, SessionKey};
use crate::packet::body::{PartialBodyReader, PartialBodyWriter};
use crate::packet::header::read_packet_header;
use crate::packet::literal::LiteralHeader;
use crate::packet::pkesk::Pkesk;
use crate::packet::seipd::{AeadChunkReader, AeadChunkWriter};
use crate::packet::types::{BodyLength, PacketError, Tag};

/// File metadata stored in the literal data packet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileHints {
    pub file_name: String,
    /// Modification time; `PacketConfig::time` when absent.
    pub modified: Option<DateTime<Utc>>,
}

impl FileHints {
    pub fn named(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            modified: None,
        }
    }
}

/// Per-message packet settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketConfig {
    /// "Now" for key validity and packet timestamps.
    pub time: DateTime<Utc>,
    pub partial_chunk_size: usize,
    pub aead_chunk_octet: u8,
}

impl PacketConfig {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            time,
            partial_chunk_size: DEFAULT_PARTIAL_CHUNK_SIZE,
            aead_chunk_octet: DEFAULT_AEAD_CHUNK_OCTET,
        }
    }
}

/// Streaming encryptor returned by [`encrypt`].
pub struct MessageWriter<W: Write> {
    literal: PartialBodyWriter<AeadChunkWriter<PartialBodyWriter<W>>>,
    written: u64,
}

impl<W: Write> MessageWriter<W> {
    /// Plaintext octets accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Close every layer in order and return the sink.
    pub fn finish(self) -> Result<W, PacketError> {
        let aead = self.literal.finish()?;
        let seipd = aead.finish()?;
        let sink = seipd.finish()?;
        debug!(plaintext = self.written, "message finished");
        Ok(sink)
    }
}

impl<W: Write> Write for MessageWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.literal.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.literal.flush()
    }
}

/// Start an encrypted message to `recipients` on `sink`.
///
/// Writes the session-key packets immediately; plaintext written to the
/// returned writer is encrypted as it arrives.
pub fn encrypt<W: Write>(
    mut sink: W,
    recipients: &[&KeyEntity],
    hints: &FileHints,
    config: &PacketConfig,
) -> Result<MessageWriter<W>, PacketError> {
    if recipients.is_empty() {
        return Err(KeyError::NoUsableKey("no recipients".into()).into());
    }
    if let Some(stale) = recipients.iter().find(|r| !r.is_valid_at(config.time)) {
        return Err(KeyError::NoUsableKey(format!(
            "key {} is not valid at {}",
            stale.key_id(),
            config.time.to_rfc3339()
        ))
        .into());
    }

    let session = SessionKey::generate();
    for recipient in recipients {
        Pkesk::for_recipient(&session, recipient)?.write(&mut sink)?;
    }

    let seipd = PartialBodyWriter::new(sink, Tag::SymEncryptedIntegrityProtectedData, config.partial_chunk_size)?;
    let aead = AeadChunkWriter::new(seipd, &session, config.aead_chunk_octet)?;
    let mut literal = PartialBodyWriter::new(aead, Tag::LiteralData, config.partial_chunk_size)?;

    let header = LiteralHeader::binary(&hints.file_name, hints.modified.unwrap_or(config.time));
    literal.write_all(&header.to_bytes())?;

    debug!(recipients = recipients.len(), file_name = %header.file_name, "message started");
    Ok(MessageWriter { literal, written: 0 })
}

/// Decrypted literal body. Verifies the AEAD final tag on end of stream.
pub struct LiteralBody<R: Read> {
    inner: PartialBodyReader<AeadChunkReader<PartialBodyReader<R>>>,
    verified: bool,
}

impl<R: Read> LiteralBody<R> {
    /// True once the whole message has been read and authenticated.
    pub fn is_verified(&self) -> bool {
        self.verified
    }
}

impl<R: Read> Read for LiteralBody<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() && !self.verified {
            self.inner.get_mut().finish().map_err(io::Error::from)?;
            self.verified = true;
        }
        Ok(n)
    }
}

/// Parsed message: literal metadata plus a reader over the plaintext.
pub struct MessageDetails<R: Read> {
    pub file_name: String,
    pub modified: DateTime<Utc>,
    pub unverified_body: LiteralBody<R>,
}

/// Parse a message from `source`, decrypting with the unlocked keys of `key_ring`.
pub fn read_message<R: Read>(
    mut source: R,
    key_ring: &KeyRing,
    config: &PacketConfig,
) -> Result<MessageDetails<R>, PacketError> {
    let mut key_packets = Vec::new();
    let data_length = loop {
        let header = read_packet_header(&mut source)?.ok_or(PacketError::MissingDataPacket)?;
        match header.tag {
            Tag::PublicKeyEncryptedSessionKey => {
                let mut body = Vec::new();
                PartialBodyReader::new(&mut source, header.length).read_to_end(&mut body)?;
                key_packets.push(Pkesk::parse(&body)?);
            }
            Tag::SymmetricKeyEncryptedSessionKey | Tag::Marker | Tag::Padding => {
                let skipped = io::copy(&mut PartialBodyReader::new(&mut source, header.length), &mut io::sink())?;
                debug!(tag = ?header.tag, skipped, "packet skipped");
            }
            Tag::SymEncryptedIntegrityProtectedData => break header.length,
            found => {
                return Err(PacketError::UnexpectedPacket {
                    found,
                    context: "expected session key or encrypted data",
                })
            }
        }
    };

    if key_packets.is_empty() {
        return Err(PacketError::MissingKeyPacket);
    }
    let session = open_session_key(&key_packets, key_ring, config.time)?;

    let mut aead = AeadChunkReader::new(PartialBodyReader::new(source, data_length), &session)?;
    let literal = read_packet_header(&mut aead)?.ok_or(PacketError::Truncated)?;
    if literal.tag != Tag::LiteralData {
        return Err(PacketError::UnexpectedPacket {
            found: literal.tag,
            context: "expected literal data inside encrypted data",
        });
    }
    if literal.length == BodyLength::Indeterminate {
        return Err(PacketError::InvalidLength("indeterminate literal data length".into()));
    }

    let mut body = PartialBodyReader::new(aead, literal.length);
    let header = LiteralHeader::read(&mut body)?;
    Ok(MessageDetails {
        file_name: header.file_name,
        modified: header.modified,
        unverified_body: LiteralBody {
            inner: body,
            verified: false,
        },
    })
}

fn open_session_key(
    key_packets: &[Pkesk],
    key_ring: &KeyRing,
    now: DateTime<Utc>,
) -> Result<SessionKey, PacketError> {
    for packet in key_packets {
        for entity in key_ring.decryption_keys(packet.key_id, now) {
            let Some(secret) = entity.secret() else { continue };
            match packet.decrypt(secret) {
                Ok(session) => {
                    debug!(key_id = %entity.key_id(), "session key recovered");
                    return Ok(session);
                }
                Err(e) => warn!(key_id = %entity.key_id(), error = %e, "key packet did not open"),
            }
        }
    }
    Err(PacketError::NoMatchingKey)
}
