// ## 📂 File: `src/attachment/processor.rs`

//! src/attachment/processor.rs
//!
//! Incremental attachment encryption session.
//!
//! ```text
//! caller ──process()──▶ MessageWriter ──▶ PipeWriter ═══conduit═══▶ PipeReader ──▶ split worker
//!                                                                                   │
//! caller ◀──finish()── EncryptedSplit ◀──────────── JoinHandle ◀────────────────────┘
//! ```
//!
//! Design notes:
//! - Exactly one worker thread per session; it is always joined, by `finish`,
//!   by a failed `process`, or by `Drop`.
//! - The join handle is the completion signal and the result slot in one:
//!   the split is read exactly once, after the worker has exited.
//! - The first error poisons the session. Every later call returns a clone
//!   of it; nothing is retried.
//! - A broken pipe on the caller side only means the worker stopped reading,
//!   so the worker's own error is recorded in its place.

use std::any::Any;
use std::io::{self, Write};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::attachment::pipe::{pipe, PipeReader, PipeWriter};
use crate::attachment::separator::{separate_with_counters, SplitReport};
use crate::crypto::KeyEntity;
use crate::packet::{encrypt, FileHints, MessageWriter, PacketConfig, PacketError};
use crate::telemetry::{Stage, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::types::{AttachmentError, EncryptedSplit};

type SplitHandle = JoinHandle<Result<SplitReport, AttachmentError>>;

/// Settings for one session, resolved by the caller.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub estimated_size: usize,
    pub hints: FileHints,
    pub packet: PacketConfig,
    pub conduit_capacity: usize,
    /// 0 disables periodic reclamation.
    pub reclaim_threshold: usize,
}

pub struct AttachmentProcessor {
    writer: Option<MessageWriter<PipeWriter>>,
    worker: Option<SplitHandle>,
    error: Option<AttachmentError>,
    reclaim_threshold: usize,
    counters: TelemetryCounters,
    timer: TelemetryTimer,
}

impl std::fmt::Debug for AttachmentProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentProcessor")
            .field("open", &self.writer.is_some())
            .field("error", &self.error)
            .field("reclaim_threshold", &self.reclaim_threshold)
            .finish()
    }
}

impl AttachmentProcessor {
    /// Build the conduit, start the split worker and the encryption front-end.
    ///
    /// If the front-end cannot be built, the conduit is closed and the worker
    /// joined before the error is returned.
    pub fn start(recipients: &[&KeyEntity], params: SessionParams) -> Result<Self, AttachmentError> {
        let estimated_size = params.estimated_size;
        let reclaim_threshold = params.reclaim_threshold;
        Self::start_with(recipients, params, move |reader| {
            separate_with_counters(reader, estimated_size, reclaim_threshold)
        })
    }

    /// `start` with the consumer of the conduit supplied by the caller.
    fn start_with<F>(recipients: &[&KeyEntity], params: SessionParams, consume: F) -> Result<Self, AttachmentError>
    where
        F: FnOnce(PipeReader) -> Result<SplitReport, AttachmentError> + Send + 'static,
    {
        let (writer, reader) = pipe(params.conduit_capacity);
        let estimated_size = params.estimated_size;
        let reclaim_threshold = params.reclaim_threshold;

        let worker = thread::Builder::new()
            .name("attachment-split".into())
            .spawn(move || consume(reader))
            .map_err(|e| AttachmentError::Worker(format!("cannot spawn split worker: {e}")))?;

        // `encrypt` owns the write end; on failure it is dropped there, which
        // is end-of-stream for the worker.
        let front = match encrypt(writer, recipients, &params.hints, &params.packet) {
            Ok(front) => front,
            Err(e) => {
                if let Err(consequence) = join_worker(worker) {
                    debug!(error = %consequence, "split worker stopped after failed start");
                }
                warn!(error = %e, "attachment encryption could not start");
                return Err(AttachmentError::Construction(e));
            }
        };

        info!(
            estimated_size,
            reclaim_threshold,
            conduit_capacity = params.conduit_capacity,
            "attachment session started"
        );
        Ok(Self {
            writer: Some(front),
            worker: Some(worker),
            error: None,
            reclaim_threshold,
            counters: TelemetryCounters::default(),
            timer: TelemetryTimer::new(),
        })
    }

    /// Encrypt the next piece of plaintext.
    pub fn process(&mut self, chunk: &[u8]) -> Result<(), AttachmentError> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        let writer = self.writer.as_mut().ok_or(AttachmentError::Finished)?;

        let t = Instant::now();
        let res = writer.write_all(chunk);
        self.timer.add_stage_time(Stage::Write, t.elapsed());

        match res {
            Ok(()) => {
                self.counters.add_write(chunk.len());
                Ok(())
            }
            Err(e) => Err(self.poison(PacketError::from(e))),
        }
    }

    /// Close the message, wait for the worker and return the split.
    pub fn finish(&mut self) -> Result<EncryptedSplit, AttachmentError> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        let writer = self.writer.take().ok_or(AttachmentError::Finished)?;

        let t = Instant::now();
        // Dropping the returned PipeWriter is end-of-stream for the worker.
        let closed = writer.finish().map(drop);
        self.timer.add_stage_time(Stage::Finish, t.elapsed());

        let joined = self.join();
        let report = match (closed, joined) {
            (Ok(()), Ok(report)) => report,
            (Err(front), joined) => return Err(self.record(origin_error(front, joined))),
            (Ok(()), Err(e)) => return Err(self.record(e)),
        };

        let mut split = report.split;
        self.counters.merge(&report.counters);
        self.timer.add_stage_time(Stage::Split, report.elapsed);
        if self.reclaim_threshold > 0 {
            split.shrink_to_fit();
        }
        self.timer.finish();

        info!(
            plaintext = self.counters.bytes_plaintext,
            key_packet = split.key_packet.len(),
            data_packet = split.data_packet.len(),
            "attachment session finished"
        );
        Ok(split)
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        TelemetrySnapshot::from(&self.counters, &self.timer)
    }

    /// Error recorded by an earlier call, if any.
    pub fn error(&self) -> Option<&AttachmentError> {
        self.error.as_ref()
    }

    fn join(&mut self) -> Result<SplitReport, AttachmentError> {
        match self.worker.take() {
            Some(handle) => join_worker(handle),
            None => Err(AttachmentError::Worker("split worker already joined".into())),
        }
    }

    /// Tear down after a failed write and record the error that caused it.
    fn poison(&mut self, write_error: PacketError) -> AttachmentError {
        drop(self.writer.take());
        let joined = self.join();
        let err = origin_error(write_error, joined);
        self.record(err)
    }

    fn record(&mut self, err: AttachmentError) -> AttachmentError {
        warn!(error = %err, "attachment session failed");
        self.timer.finish();
        self.error.get_or_insert(err).clone()
    }
}

impl Drop for AttachmentProcessor {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            debug!("attachment processor dropped before finish");
        }
        if let Some(handle) = self.worker.take() {
            // the pipe is closed, so the worker ends with a truncation error
            let _ = join_worker(handle);
        }
    }
}

fn join_worker(handle: SplitHandle) -> Result<SplitReport, AttachmentError> {
    handle
        .join()
        .map_err(|panic| AttachmentError::Worker(panic_message(panic.as_ref())))?
}

/// Pick the error that started the failure.
///
/// A broken pipe on the writing side is a symptom of the worker failing;
/// anything else originated in the front-end.
fn origin_error(front: PacketError, worker: Result<SplitReport, AttachmentError>) -> AttachmentError {
    match worker {
        Err(worker_error) if is_broken_pipe(&front) => worker_error,
        _ => AttachmentError::Write(front),
    }
}

fn is_broken_pipe(e: &PacketError) -> bool {
    matches!(e, PacketError::Io(io) if io.kind() == io::ErrorKind::BrokenPipe)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "split worker panicked".into()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Read};

    use chrono::{TimeZone, Utc};

    use super::*;

    fn recipient() -> KeyEntity {
        KeyEntity::from_secret([11; 32], Utc.timestamp_opt(1_600_000_000, 0).unwrap())
    }

    fn params() -> SessionParams {
        let mut packet = PacketConfig::at(Utc::now());
        packet.partial_chunk_size = 512;
        packet.aead_chunk_octet = 0;
        SessionParams {
            estimated_size: 0,
            hints: FileHints::named("fail.bin"),
            packet,
            conduit_capacity: 0,
            reclaim_threshold: 0,
        }
    }

    fn plaintext() -> Vec<u8> {
        (0..10_000).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn worker_error_replaces_broken_pipe() {
        let key = recipient();
        // Takes the key packet and a little more, then gives up.
        let mut processor = AttachmentProcessor::start_with(&[&key], params(), |mut reader: PipeReader| {
            io::copy(&mut (&mut reader).take(200), &mut io::sink()).map_err(PacketError::from)?;
            Err(AttachmentError::Packet(PacketError::MissingDataPacket))
        })
        .unwrap();

        let err = processor.process(&plaintext()).unwrap_err();
        assert!(matches!(err, AttachmentError::Packet(PacketError::MissingDataPacket)));
        assert!(matches!(
            processor.error(),
            Some(AttachmentError::Packet(PacketError::MissingDataPacket))
        ));

        // every later call hands back the same error
        let again = processor.process(b"more").unwrap_err();
        assert_eq!(again.to_string(), err.to_string());
        let finished = processor.finish().unwrap_err();
        assert_eq!(finished.to_string(), err.to_string());
        let finished_again = processor.finish().unwrap_err();
        assert_eq!(finished_again.to_string(), err.to_string());
    }

    #[test]
    fn worker_error_at_finish_is_sticky() {
        let key = recipient();
        // Reads the whole stream, then rejects it.
        let mut processor = AttachmentProcessor::start_with(&[&key], params(), |mut reader: PipeReader| {
            io::copy(&mut reader, &mut io::sink()).map_err(PacketError::from)?;
            Err(AttachmentError::Packet(PacketError::MissingKeyPacket))
        })
        .unwrap();

        processor.process(&plaintext()).unwrap();
        let err = processor.finish().unwrap_err();
        assert!(matches!(err, AttachmentError::Packet(PacketError::MissingKeyPacket)));
        assert!(processor.error().is_some());

        let again = processor.finish().unwrap_err();
        assert!(matches!(again, AttachmentError::Packet(PacketError::MissingKeyPacket)));
        assert!(matches!(
            processor.process(b"late"),
            Err(AttachmentError::Packet(PacketError::MissingKeyPacket))
        ));
    }

    #[test]
    fn front_errors_other_than_broken_pipe_are_kept() {
        let worker = || Err(AttachmentError::Packet(PacketError::Truncated));

        let broken = PacketError::from(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(matches!(
            origin_error(broken, worker()),
            AttachmentError::Packet(PacketError::Truncated)
        ));

        let other = PacketError::from(io::Error::from(io::ErrorKind::WriteZero));
        assert!(matches!(
            origin_error(other, worker()),
            AttachmentError::Write(PacketError::Io(_))
        ));
    }
}
