//! Physical I/O and collective replication.
//!
//! Every decode step that touches the backing store goes through a
//! [`Transport`]: the coordinator participant seeks and reads, then the bytes
//! are broadcast so that every participant decodes an identical buffer.  In a
//! single-participant deployment [`Transport::broadcast`] does nothing.
//!
//! # Fatal path
//! A failure that would leave cooperating participants out of step (the
//! coordinator cannot read, or a broadcast breaks) cannot be reported as an
//! ordinary error: the other participants are already blocked waiting for the
//! broadcast.  [`fetch`] calls [`abort`] in that case.  A lone participant has
//! nobody to desynchronise and gets a normal error instead.

pub mod group;

use byteorder::{ByteOrder, LittleEndian};
use std::io::{self, Read, Seek, SeekFrom};
use thiserror::Error;
use tracing::{error, trace};

pub use group::{LocalGroup, LocalParticipant};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Participant {rank} has no backing store")]
    NoBackingStore { rank: usize },
    #[error("Broadcast length mismatch: coordinator sent {sent} bytes, {expected} expected")]
    LengthMismatch { sent: usize, expected: usize },
    #[error("Broadcast peer disconnected")]
    Disconnected,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Transport trait ──────────────────────────────────────────────────────────

/// Collective access to the bytes of one container.
///
/// Only the coordinator ever calls [`seek`](Transport::seek) and
/// [`read_bytes`](Transport::read_bytes); every participant calls
/// [`broadcast`](Transport::broadcast) the same number of times with buffers
/// of the same length.
pub trait Transport {
    /// Rank of the local participant.
    fn rank(&self) -> usize;

    /// Rank of the participant that performs physical I/O.
    fn coordinator(&self) -> usize;

    /// Number of participants in the collective.
    fn participants(&self) -> usize {
        1
    }

    fn is_coordinator(&self) -> bool {
        self.rank() == self.coordinator()
    }

    /// Reposition physical I/O to an absolute byte offset.
    fn seek(&mut self, position: u64) -> Result<(), TransportError>;

    /// Blocking read of exactly `buf.len()` bytes at the current position.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), TransportError>;

    /// Read up to `buf.len()` bytes at the current position.  Returns the
    /// count read, which is short only at end of data.
    fn read_partial(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Replicate the coordinator's `buf` to every participant.
    fn broadcast(&mut self, buf: &mut [u8]) -> Result<(), TransportError>;

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), TransportError> {
        self.seek(offset)?;
        self.read_bytes(buf)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn rank(&self) -> usize { (**self).rank() }
    fn coordinator(&self) -> usize { (**self).coordinator() }
    fn participants(&self) -> usize { (**self).participants() }
    fn seek(&mut self, position: u64) -> Result<(), TransportError> { (**self).seek(position) }
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), TransportError> { (**self).read_bytes(buf) }
    fn read_partial(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> { (**self).read_partial(buf) }
    fn broadcast(&mut self, buf: &mut [u8]) -> Result<(), TransportError> { (**self).broadcast(buf) }
}

// ── Single-participant transport ─────────────────────────────────────────────

/// Pass-through transport over any seekable reader.  Always the coordinator;
/// `broadcast` is a no-op.
pub struct FileTransport<R: Read + Seek> {
    reader: R,
}

impl<R: Read + Seek> FileTransport<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Seek> Transport for FileTransport<R> {
    fn rank(&self) -> usize { 0 }
    fn coordinator(&self) -> usize { 0 }

    fn seek(&mut self, position: u64) -> Result<(), TransportError> {
        self.reader.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        self.reader.read_exact(buf)?;
        Ok(())
    }

    fn read_partial(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(read_up_to(&mut self.reader, buf)?)
    }

    fn broadcast(&mut self, _buf: &mut [u8]) -> Result<(), TransportError> {
        Ok(())
    }
}

// ── Collective fetch ─────────────────────────────────────────────────────────

/// Fill `buf` from `reader` until it is full or the reader is exhausted.
pub(crate) fn read_up_to<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// On a collective, a failed step cannot be returned: peers are blocked.
fn or_abort<V>(collective: bool, what: &str, result: Result<V, TransportError>) -> Result<V, TransportError> {
    match result {
        Err(e) if collective => abort(&format!("{what} failed: {e}")),
        other => other,
    }
}

/// Read `len` bytes at `offset` on the coordinator and replicate them to every
/// participant.  Returns the replicated buffer on all participants.
pub fn fetch<T: Transport + ?Sized>(
    transport: &mut T,
    offset:    u64,
    len:       usize,
) -> Result<Vec<u8>, TransportError> {
    let collective = transport.participants() > 1;
    let mut buf = vec![0u8; len];

    if transport.is_coordinator() {
        trace!(offset, len, "coordinator read");
        let read = transport.read_at(offset, &mut buf);
        or_abort(collective, &format!("coordinator read of {len} bytes at {offset}"), read)?;
    }

    let sent = transport.broadcast(&mut buf);
    or_abort(collective, &format!("broadcast of {len} bytes"), sent)?;
    Ok(buf)
}

/// Like [`fetch`], but a store shorter than `offset + len` is not an error:
/// every participant gets the bytes that exist, possibly none.
///
/// The coordinator broadcasts the count it read before the bytes, so the
/// participants stay in step whatever the store holds.
pub fn fetch_prefix<T: Transport + ?Sized>(
    transport: &mut T,
    offset:    u64,
    len:       usize,
) -> Result<Vec<u8>, TransportError> {
    let collective = transport.participants() > 1;
    let mut buf = vec![0u8; len];
    let mut count = [0u8; 8];

    if transport.is_coordinator() {
        let read = transport.seek(offset).and_then(|()| transport.read_partial(&mut buf));
        let n = or_abort(collective, &format!("coordinator read of up to {len} bytes at {offset}"), read)?;
        trace!(offset, len, read = n, "coordinator prefix read");
        LittleEndian::write_u64(&mut count, n as u64);
    }

    let sent = transport.broadcast(&mut count);
    or_abort(collective, "broadcast of read length", sent)?;
    let sent = transport.broadcast(&mut buf);
    or_abort(collective, &format!("broadcast of {len} bytes"), sent)?;

    let n = usize::try_from(LittleEndian::read_u64(&count)).unwrap_or(len).min(len);
    buf.truncate(n);
    Ok(buf)
}

/// Terminate the process immediately.  No unwinding, no cleanup: used only
/// when continuing would leave the collective in an inconsistent state.
pub fn abort(reason: &str) -> ! {
    error!("fatal collective failure: {reason}");
    std::process::abort()
}
