//! Type-specific metadata that follows the fixed block header.
//!
//! | Type              | Fields, in order                                              |
//! |-------------------|---------------------------------------------------------------|
//! | CONSTANT          | one element of the block's datatype                           |
//! | STITCHED_TENSOR   | stagger, mesh id, `ndims` variable ids                        |
//! | STITCHED_MATERIAL | stagger, mesh id, `ndims` material names, `ndims` variable ids |
//! | STITCHED_MATVAR   | stagger, mesh id, material id, `ndims` variable ids           |
//! | STITCHED_SPECIES  | stagger, mesh id, material id, material name,                 |
//! |                   | `ndims` species names, `ndims` variable ids                   |
//!
//! Each decoder expects a node whose header is decoded and whose state the
//! caller has already moved past `Header`, so a failure partway through is
//! never retried.  Fields decoded before the failure stay on the node.

mod stitched;

pub use stitched::decode_stitched;

use tracing::debug;

use crate::block::{Block, BlockState};
use crate::datatype::{ConstValue, Datatype, Stagger};
use crate::error::{Result, SdfError};
use crate::field::FieldReader;

/// Decode a CONSTANT block's value.  The value is the block's whole payload,
/// so the node finishes in the `Data` state.
pub fn decode_constant(block: &mut Block, r: &mut FieldReader<'_>, block_header_length: u64) -> Result<()> {
    let info_start = block.block_start + block_header_length;
    r.seek(info_start);

    let datatype = block.datatype.unwrap_or(Datatype::Null);
    let value = match datatype {
        Datatype::Integer4  => ConstValue::Integer4(r.read_i4()?),
        Datatype::Integer8  => ConstValue::Integer8(r.read_i8()?),
        Datatype::Real4     => ConstValue::Real4(r.read_f4()?),
        Datatype::Real8     => ConstValue::Real8(r.read_f8()?),
        Datatype::Character => ConstValue::Character(r.read_u1()?),
        Datatype::Logical   => ConstValue::Logical(r.read_logical()?),
        other => return Err(SdfError::UnsupportedDatatype(other.name())),
    };

    block.const_value = Some(value);
    block.stagger = Stagger::Vertex;
    block.state = BlockState::Data;
    r.seek(info_start + block.type_size.unwrap_or(0) as u64);

    debug!(id = %block.id, %value, "decoded constant");
    Ok(())
}
