use tracing::debug;

use crate::block::{Block, BlockState};
use crate::datatype::{BlockType, Stagger};
use crate::error::{Result, SdfError};
use crate::field::FieldReader;

/// Decode the metadata of any STITCHED_* block.  Stitched blocks carry no
/// bulk payload, so success leaves the node in the `Data` state.
pub fn decode_stitched(block: &mut Block, r: &mut FieldReader<'_>, block_header_length: u64) -> Result<()> {
    let kind = block.kind();
    if !kind.is_stitched() {
        return Err(SdfError::UnknownBlockType { blocktype: kind.to_string(), id: block.id.clone() });
    }
    r.seek(block.block_start + block_header_length);
    let n = block.ndims as usize;

    block.stagger = Stagger::from_tag(r.read_i4()?)?;
    block.mesh_id = Some(r.read_id()?);

    if matches!(kind, BlockType::StitchedMatvar | BlockType::StitchedSpecies) {
        block.material_id = Some(r.read_id()?);
    }
    if kind == BlockType::StitchedSpecies {
        block.material_name = Some(r.read_string()?);
    }
    if matches!(kind, BlockType::StitchedMaterial | BlockType::StitchedSpecies) {
        block.material_names = r.read_string_array(n)?;
    }
    block.variable_ids = r.read_id_array(n)?;

    block.state = BlockState::Data;
    debug!(
        id = %block.id,
        blocktype = %kind,
        mesh = block.mesh_id.as_deref().unwrap_or(""),
        components = n,
        "decoded stitched block"
    );
    Ok(())
}
