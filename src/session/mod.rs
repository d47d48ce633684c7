//! Collective metadata reader. One [`Session`] per open container.
//!
//! # Call order
//! Every participant of a collective must issue the same sequence of calls:
//! [`Session::read_header`], then [`Session::read_blocklist`] (or
//! [`Session::load_summary`] followed by incremental block calls).  Each call
//! that touches storage is a synchronisation point: the coordinator reads,
//! everybody blocks until the broadcast completes.  Divergent call sequences
//! deadlock; the session does not detect them.
//!
//! # Idempotence
//! Header, block-header and block-info decoding may be repeated freely.  A
//! repeated call on a node that already reached the requested state only
//! repositions the logical cursor.  The header decode is one-shot: a failure
//! closes the session.
//!
//! # Scratch buffers
//! The preamble and the summary region are the only bytes ever fetched.  The
//! preamble buffer lives for the duration of [`Session::read_header`]; the
//! summary buffer from [`Session::load_summary`] to
//! [`Session::release_summary`] (both done internally by
//! [`Session::read_blocklist`]).

use tracing::{debug, error, warn};

use crate::block::{Block, BlockState};
use crate::blocklist::{BlockCursor, BlockList};
use crate::datatype::BlockType;
use crate::error::{Result, SdfError};
use crate::external::{DeferredInfo, InfoDecoder};
use crate::field::FieldReader;
use crate::header::{Header, HEADER_LENGTH};
use crate::info::{decode_constant, decode_stitched};
use crate::options::{ReaderOptions, UnknownBlockPolicy};
use crate::transport::{fetch, fetch_prefix, Transport};

/// Outcome of an idempotent decode step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Decoded,
    AlreadyDone,
    /// Left to the external decoder, which declined the block.
    Deferred,
}

pub struct Session<T: Transport> {
    transport: T,
    options:   ReaderOptions,
    header:    Option<Header>,
    closed:    bool,
    /// Replicated summary region; its first byte is at `summary_location`.
    summary:   Option<Vec<u8>>,
    /// Logical cursor: current byte offset into the conceptual file.
    location:  u64,
    blocks:    BlockList,
    /// Set once a full walk of the summary region has succeeded.
    walked:    bool,
    external:  Box<dyn InfoDecoder>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, ReaderOptions::default())
    }

    pub fn with_options(transport: T, options: ReaderOptions) -> Self {
        Self {
            transport,
            options,
            header:   None,
            closed:   false,
            summary:  None,
            location: 0,
            blocks:   BlockList::new(),
            walked:   false,
            external: Box::new(DeferredInfo),
        }
    }

    /// Install the decoder for mesh and variable metadata.
    pub fn with_info_decoder(mut self, decoder: Box<dyn InfoDecoder>) -> Self {
        self.external = decoder;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn rank(&self) -> usize { self.transport.rank() }
    pub fn coordinator(&self) -> usize { self.transport.coordinator() }
    pub fn options(&self) -> &ReaderOptions { &self.options }
    pub fn header(&self) -> Option<&Header> { self.header.as_ref() }
    pub fn is_closed(&self) -> bool { self.closed }
    pub fn location(&self) -> u64 { self.location }
    pub fn summary_loaded(&self) -> bool { self.summary.is_some() }

    /// Nodes built so far, in file order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ { self.blocks.iter() }
    pub fn block_count(&self) -> usize { self.blocks.len() }
    pub fn block(&self, index: usize) -> Option<&Block> { self.blocks.get(index) }
    pub fn block_mut(&mut self, index: usize) -> Option<&mut Block> { self.blocks.get_mut(index) }
    pub fn find_block(&self, id: &str) -> Option<&Block> { self.blocks.find(id) }

    /// Block at the cursor's position, if any.
    pub fn current(&self, cursor: &BlockCursor) -> Option<&Block> {
        cursor.current().and_then(|i| self.blocks.get(i))
    }

    // ── Header ───────────────────────────────────────────────────────────────

    /// Fetch, replicate and decode the fixed preamble.
    ///
    /// Any failure closes the session; it must not be retried.
    pub fn read_header(&mut self) -> Result<Progress> {
        if self.closed {
            return Err(SdfError::Closed);
        }
        if self.header.is_some() {
            return Ok(Progress::AlreadyDone);
        }

        self.location = 0;
        let decoded = fetch_prefix(&mut self.transport, 0, HEADER_LENGTH)
            .map_err(SdfError::from)
            .and_then(|buf| Header::decode(&buf));

        match decoded {
            Ok(header) => {
                self.header = Some(header);
                self.location = HEADER_LENGTH as u64;
                Ok(Progress::Decoded)
            }
            Err(e) => {
                if self.transport.is_coordinator() {
                    error!("SDF header decode failed: {e}");
                }
                self.close();
                Err(e)
            }
        }
    }

    /// Release every piece of session state.  Any later decode call fails
    /// with `Closed`.
    pub fn close(&mut self) {
        self.header = None;
        self.summary = None;
        self.blocks = BlockList::new();
        self.walked = false;
        self.location = 0;
        self.closed = true;
    }

    // ── Summary buffer ───────────────────────────────────────────────────────

    /// Fetch and replicate the whole summary region.  Collective.
    pub fn load_summary(&mut self) -> Result<()> {
        let (location, size) = match &self.header {
            Some(h) => (h.summary_location, h.summary_size),
            None => return Err(self.not_ready("SDF header has not been read")),
        };
        if size > self.options.max_summary_size {
            return Err(SdfError::DecodeBounds {
                offset: location,
                width:  size.into(),
                start:  location,
                end:    location + u64::from(self.options.max_summary_size),
            });
        }

        let buf = fetch(&mut self.transport, location, size as usize)?;
        debug!(location, size, "loaded summary");
        self.summary = Some(buf);
        self.location = location;
        Ok(())
    }

    pub fn release_summary(&mut self) {
        self.summary = None;
    }

    // ── Block list ───────────────────────────────────────────────────────────

    /// Step `cursor` to the next block node, creating it when the traversal
    /// runs past the end of the list.
    pub fn advance(&mut self, cursor: &mut BlockCursor) -> Result<usize> {
        let (location, nblocks) = self.summary_geometry()?;
        self.blocks.advance(cursor, location, nblocks)
    }

    /// Advance `cursor` and decode that block's fixed header.
    ///
    /// Without a loaded summary only nodes whose header is already decoded can
    /// be revisited; anything else is `NotReady` and leaves the list and the
    /// cursor untouched.  If the header fails to decode the cursor is
    /// restored, so the pending node is revisited by the next call.
    pub fn read_next_block_header(&mut self, cursor: &mut BlockCursor) -> Result<usize> {
        if self.closed {
            return Err(SdfError::Closed);
        }
        let (id_length, string_length, endian, bhl) = match &self.header {
            Some(h) => (h.id_length, h.string_length, h.endianness, u64::from(h.block_header_length)),
            None => return Err(self.not_ready("SDF header has not been read")),
        };

        if self.summary.is_none() {
            let revisit = self.blocks.peek(cursor).and_then(|i| self.blocks.get(i));
            if !revisit.is_some_and(|b| b.state.header_done()) {
                return Err(self.not_ready("SDF summary has not been loaded"));
            }
        }

        let before = *cursor;
        let index = self.advance(cursor)?;
        let summary_location = self.summary_geometry()?.0;
        let coordinator = self.transport.is_coordinator();

        let Session { blocks, summary, location, .. } = self;
        let block = match blocks.get_mut(index) {
            Some(b) => b,
            None => return Err(not_ready(coordinator, "SDF block not initialised")),
        };

        if block.state.header_done() {
            *location = block.block_start + bhl;
            return Ok(index);
        }

        let Some(buf) = summary.as_deref() else {
            *cursor = before;
            return Err(not_ready(coordinator, "SDF summary has not been loaded"));
        };
        let mut fields = FieldReader::new(buf, summary_location, endian)
            .with_lengths(id_length, string_length);
        if let Err(e) = block.decode_header(&mut fields) {
            *cursor = before;
            return Err(e);
        }
        *location = block.block_start + bhl;
        Ok(index)
    }

    /// Advance `cursor`, decode the block header, then the type-specific
    /// metadata of that block.
    pub fn read_block_info(&mut self, cursor: &mut BlockCursor) -> Result<usize> {
        let index = self.read_next_block_header(cursor)?;
        self.decode_info(index)?;
        Ok(index)
    }

    /// Dispatch on the block type of the header-decoded node at `index`.
    pub fn decode_info(&mut self, index: usize) -> Result<Progress> {
        let (id_length, string_length, endian, bhl, summary_location) = match &self.header {
            Some(h) => (
                h.id_length,
                h.string_length,
                h.endianness,
                u64::from(h.block_header_length),
                h.summary_location,
            ),
            None => return Err(self.not_ready("SDF header has not been read")),
        };
        let policy = self.options.unknown_blocks;
        let coordinator = self.transport.is_coordinator();

        let Session { blocks, summary, external, location, .. } = self;
        let block = match blocks.get_mut(index) {
            Some(b) if b.state.header_done() => b,
            _ => return Err(not_ready(coordinator, "SDF block header has not been read")),
        };
        if block.state.info_done() || block.state == BlockState::Skipped {
            return Ok(Progress::AlreadyDone);
        }

        let kind = block.kind();
        let handled = match kind {
            BlockType::Constant => true,
            k if k.is_stitched() => true,
            k if k.is_external() => external.handles(k),
            _ => match policy {
                UnknownBlockPolicy::Error => {
                    return Err(SdfError::UnknownBlockType { blocktype: kind.to_string(), id: block.id.clone() });
                }
                UnknownBlockPolicy::Skip => {
                    debug!(id = %block.id, blocktype = %kind, "skipping block without decoder");
                    block.state = BlockState::Skipped;
                    return Ok(Progress::Decoded);
                }
            },
        };
        if !handled {
            debug!(id = %block.id, blocktype = %kind, "metadata deferred to external decoder");
            return Ok(Progress::Deferred);
        }

        let Some(buf) = summary.as_deref() else {
            return Err(not_ready(coordinator, "SDF summary has not been loaded"));
        };
        let mut fields = FieldReader::new(buf, summary_location, endian)
            .with_lengths(id_length, string_length);

        // Marked before decoding: a failure below is final for this node.
        block.state = BlockState::Info;
        let result = match kind {
            BlockType::Constant => decode_constant(block, &mut fields, bhl),
            k if k.is_stitched() => decode_stitched(block, &mut fields, bhl),
            _ => {
                fields.seek(block.block_start + bhl);
                external.decode_info(block, &mut fields)
            }
        };
        *location = fields.position();
        result.map(|()| Progress::Decoded)
    }

    /// Build the whole block list in one collective call and return a cursor
    /// positioned before its head.
    ///
    /// Only a walk that completed makes later calls a no-op.  Nodes built
    /// earlier by incremental calls, or by a walk that failed, are revisited
    /// in place.
    ///
    /// Decodes exactly `nblocks` block records, the count the header
    /// declares.  A block whose type-specific metadata fails to decode is
    /// logged and left as it is; a block header that fails to decode ends the
    /// walk, since its successor's position is unknown.
    pub fn read_blocklist(&mut self) -> Result<BlockCursor> {
        if self.walked {
            return Ok(BlockCursor::new());
        }
        self.read_header()?;
        self.load_summary()?;

        let result = self.walk_summary();
        self.release_summary();
        result?;
        self.walked = true;
        Ok(BlockCursor::new())
    }

    fn walk_summary(&mut self) -> Result<()> {
        let nblocks = self.summary_geometry()?.1;
        let mut cursor = BlockCursor::new();
        for _ in 0..nblocks {
            let index = self.read_next_block_header(&mut cursor)?;
            if let Err(e) = self.decode_info(index) {
                if self.transport.is_coordinator() {
                    let id = self.blocks.get(index).map(|b| b.id.as_str()).unwrap_or("");
                    warn!("block {index} ('{id}'): {e}");
                }
            }
        }
        Ok(())
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn summary_geometry(&self) -> Result<(u64, u32)> {
        match &self.header {
            Some(h) => Ok((h.summary_location, h.nblocks)),
            None => Err(self.not_ready("SDF header has not been read")),
        }
    }

    fn not_ready(&self, what: &'static str) -> SdfError {
        not_ready(self.transport.is_coordinator(), what)
    }
}

/// Prerequisite missing: reported on the coordinator only, then returned.
fn not_ready(coordinator: bool, what: &'static str) -> SdfError {
    if coordinator {
        error!("*** ERROR *** {what}. Ignoring call.");
    }
    SdfError::NotReady(what)
}
