use serde::Serialize;
use tracing::debug;

use crate::datatype::{BlockType, ConstValue, Datatype, Stagger, WireType};
use crate::error::Result;
use crate::field::FieldReader;

/// Decode progress of one block descriptor.
///
/// The order is fixed: a node's header is always decoded before its
/// type-specific info, and its info before its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BlockState {
    /// Position known, nothing decoded.
    #[default]
    Pending,
    Header,
    Info,
    Data,
    /// Header decoded; type-specific info will never be decoded because the
    /// block type has no decoder and the session skips such blocks.
    Skipped,
}

impl BlockState {
    pub fn header_done(self) -> bool { !matches!(self, BlockState::Pending) }
    pub fn info_done(self) -> bool { matches!(self, BlockState::Info | BlockState::Data) }
    pub fn data_done(self) -> bool { matches!(self, BlockState::Data) }
}

/// Descriptor of one block record in the summary region.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Block {
    pub state:               BlockState,
    pub block_start:         u64,
    /// Valid only once the header is decoded.
    pub next_block_location: u64,
    pub data_location:       u64,
    pub id:                  String,
    pub data_length:         u64,
    pub blocktype:           Option<BlockType>,
    pub datatype:            Option<Datatype>,
    pub ndims:               u32,
    pub name:                String,
    pub dims:                [u64; 3],

    pub type_size:           Option<usize>,
    pub datatype_out:        Option<Datatype>,
    pub type_size_out:       Option<usize>,
    pub wire_type:           Option<WireType>,
    pub wire_type_out:       Option<WireType>,
    pub stagger:             Stagger,

    pub mesh_id:             Option<String>,
    pub material_id:         Option<String>,
    pub material_name:       Option<String>,
    pub material_names:      Vec<String>,
    pub variable_ids:        Vec<String>,
    pub const_value:         Option<ConstValue>,
}

impl Block {
    pub fn pending(block_start: u64) -> Self {
        Self { block_start, ..Self::default() }
    }

    /// Block type, or `Null` while the header is pending.
    pub fn kind(&self) -> BlockType {
        self.blocktype.unwrap_or(BlockType::Null)
    }

    /// Decode the fixed block header at `self.block_start`.
    ///
    /// Fields are committed only when every one of them decoded, so a failed
    /// call leaves the node `Pending`.
    pub fn decode_header(&mut self, r: &mut FieldReader<'_>) -> Result<()> {
        r.seek(self.block_start);

        let next_block_location = r.read_offset("next_block_location")?;
        let data_location       = r.read_offset("data_location")?;
        let id                  = r.read_id()?;
        let data_length         = r.read_offset("data_length")?;
        let blocktype           = BlockType::from(r.read_tag()?);
        let datatype            = Datatype::from_tag(r.read_tag()?)?;
        let ndims               = r.read_count("ndims")?;
        let name                = r.read_string()?;

        self.next_block_location = next_block_location;
        self.data_location       = data_location;
        self.id                  = id;
        self.data_length         = data_length;
        self.blocktype           = Some(blocktype);
        self.datatype            = Some(datatype);
        self.ndims               = ndims;
        self.name                = name;

        self.stagger = Stagger::CellCentre;
        self.dims = [1; 3];

        self.type_size     = datatype.element_size();
        self.datatype_out  = Some(datatype);
        self.type_size_out = self.type_size;
        self.wire_type     = datatype.wire_type();
        self.wire_type_out = self.wire_type;

        self.state = BlockState::Header;
        debug!(
            id = %self.id,
            name = %self.name,
            blocktype = %blocktype,
            datatype = %datatype,
            ndims,
            start = self.block_start,
            next = self.next_block_location,
            "decoded block header"
        );
        Ok(())
    }

    /// Override the output representation, e.g. to convert REAL4 payloads to
    /// REAL8 on read.
    pub fn set_output_datatype(&mut self, datatype: Datatype) {
        self.datatype_out  = Some(datatype);
        self.type_size_out = datatype.element_size();
        self.wire_type_out = datatype.wire_type();
    }
}
