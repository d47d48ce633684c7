//! Seam for mesh and variable metadata decoders that live outside this crate.
//!
//! PLAIN_MESH, POINT_MESH, PLAIN_VARIABLE and POINT_VARIABLE blocks carry
//! geometry and payload descriptions this crate does not interpret.  The
//! session forwards them to an [`InfoDecoder`] supplied at construction.
//!
//! # Contract
//! - `decode_info` is called at most once per block, with the reader already
//!   positioned at `block_start + block_header_length` and the node already
//!   marked info-decoded.  A failure is final for that node.
//! - Implementations must not perform I/O: every byte they may read is in the
//!   replicated summary buffer behind `fields`.
//! - In a collective session every participant must be given an equivalent
//!   decoder so that all of them consume the same fields.

use crate::block::Block;
use crate::datatype::BlockType;
use crate::error::Result;
use crate::field::FieldReader;

pub trait InfoDecoder {
    /// Whether this decoder takes blocks of `blocktype`.  Blocks it declines
    /// stay header-decoded only.
    fn handles(&self, blocktype: BlockType) -> bool;

    fn decode_info(&mut self, block: &mut Block, fields: &mut FieldReader<'_>) -> Result<()>;
}

/// Declines every block type, leaving mesh and variable nodes for a later
/// consumer.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeferredInfo;

impl InfoDecoder for DeferredInfo {
    fn handles(&self, _blocktype: BlockType) -> bool {
        false
    }

    fn decode_info(&mut self, _block: &mut Block, _fields: &mut FieldReader<'_>) -> Result<()> {
        Ok(())
    }
}
