//! Registry of on-disk enumerants: block types, element datatypes, stagger.
//!
//! # Tags
//! Every enumerant is stored on disk as a 4-byte integer.  The values below
//! are frozen by the format; a tag is never reused.
//!
//! # Element layout
//! [`Datatype::element_size`] and [`Datatype::wire_type`] form the single
//! mapping from an element datatype to its byte size and to the transfer
//! representation used when payloads are replicated.  Datatypes without a
//! fixed element (NULL, OTHER) map to `None`; callers that need a value of
//! such a type fail with `UnsupportedDatatype` instead of reading zero bytes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SdfError};

// ── Block type ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockType {
    Null,
    PlainMesh,
    PointMesh,
    PlainVariable,
    PointVariable,
    Constant,
    Array,
    RunInfo,
    Source,
    StitchedTensor,
    StitchedMaterial,
    StitchedMatvar,
    StitchedSpecies,
    /// A tag this reader does not know.  Kept so the block header still
    /// decodes and the list can continue past it.
    Unrecognized(i32),
}

impl BlockType {
    pub fn tag(self) -> i32 {
        match self {
            BlockType::Null             => 0,
            BlockType::PlainMesh        => 1,
            BlockType::PointMesh        => 2,
            BlockType::PlainVariable    => 3,
            BlockType::PointVariable    => 4,
            BlockType::Constant         => 5,
            BlockType::Array            => 6,
            BlockType::RunInfo          => 7,
            BlockType::Source           => 8,
            BlockType::StitchedTensor   => 9,
            BlockType::StitchedMaterial => 10,
            BlockType::StitchedMatvar   => 11,
            BlockType::StitchedSpecies  => 12,
            BlockType::Unrecognized(t)  => t,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BlockType::Null             => "NULL",
            BlockType::PlainMesh        => "PLAIN_MESH",
            BlockType::PointMesh        => "POINT_MESH",
            BlockType::PlainVariable    => "PLAIN_VARIABLE",
            BlockType::PointVariable    => "POINT_VARIABLE",
            BlockType::Constant         => "CONSTANT",
            BlockType::Array            => "ARRAY",
            BlockType::RunInfo          => "RUN_INFO",
            BlockType::Source           => "SOURCE",
            BlockType::StitchedTensor   => "STITCHED_TENSOR",
            BlockType::StitchedMaterial => "STITCHED_MATERIAL",
            BlockType::StitchedMatvar   => "STITCHED_MATVAR",
            BlockType::StitchedSpecies  => "STITCHED_SPECIES",
            BlockType::Unrecognized(_)  => "UNRECOGNIZED",
        }
    }

    /// Composite block referencing other blocks by identifier.
    pub fn is_stitched(self) -> bool {
        matches!(
            self,
            BlockType::StitchedTensor
                | BlockType::StitchedMaterial
                | BlockType::StitchedMatvar
                | BlockType::StitchedSpecies
        )
    }

    /// Mesh or variable block whose metadata is decoded outside this crate.
    pub fn is_external(self) -> bool {
        matches!(
            self,
            BlockType::PlainMesh
                | BlockType::PointMesh
                | BlockType::PlainVariable
                | BlockType::PointVariable
        )
    }
}

impl From<i32> for BlockType {
    fn from(tag: i32) -> Self {
        match tag {
            0  => BlockType::Null,
            1  => BlockType::PlainMesh,
            2  => BlockType::PointMesh,
            3  => BlockType::PlainVariable,
            4  => BlockType::PointVariable,
            5  => BlockType::Constant,
            6  => BlockType::Array,
            7  => BlockType::RunInfo,
            8  => BlockType::Source,
            9  => BlockType::StitchedTensor,
            10 => BlockType::StitchedMaterial,
            11 => BlockType::StitchedMatvar,
            12 => BlockType::StitchedSpecies,
            t  => BlockType::Unrecognized(t),
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Unrecognized(t) => write!(f, "UNRECOGNIZED({t})"),
            other => f.write_str(other.name()),
        }
    }
}

// ── Element datatype ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Datatype {
    Null,
    Integer4,
    Integer8,
    Real4,
    Real8,
    Real16,
    Character,
    Logical,
    Other,
}

/// Transfer representation of one element when payloads are replicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireType {
    Float,
    Double,
    Int32,
    Int64,
    Byte,
}

impl WireType {
    pub fn size(self) -> usize {
        match self {
            WireType::Float  => 4,
            WireType::Double => 8,
            WireType::Int32  => 4,
            WireType::Int64  => 8,
            WireType::Byte   => 1,
        }
    }
}

impl Datatype {
    pub fn from_tag(tag: i32) -> Result<Self> {
        Ok(match tag {
            0 => Datatype::Null,
            1 => Datatype::Integer4,
            2 => Datatype::Integer8,
            3 => Datatype::Real4,
            4 => Datatype::Real8,
            5 => Datatype::Real16,
            6 => Datatype::Character,
            7 => Datatype::Logical,
            8 => Datatype::Other,
            t => return Err(SdfError::UnknownDatatype(t)),
        })
    }

    pub fn tag(self) -> i32 {
        match self {
            Datatype::Null      => 0,
            Datatype::Integer4  => 1,
            Datatype::Integer8  => 2,
            Datatype::Real4     => 3,
            Datatype::Real8     => 4,
            Datatype::Real16    => 5,
            Datatype::Character => 6,
            Datatype::Logical   => 7,
            Datatype::Other     => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Datatype::Null      => "NULL",
            Datatype::Integer4  => "INTEGER4",
            Datatype::Integer8  => "INTEGER8",
            Datatype::Real4     => "REAL4",
            Datatype::Real8     => "REAL8",
            Datatype::Real16    => "REAL16",
            Datatype::Character => "CHARACTER",
            Datatype::Logical   => "LOGICAL",
            Datatype::Other     => "OTHER",
        }
    }

    /// Bytes per element on disk.
    #[inline]
    pub fn element_size(self) -> Option<usize> {
        match self {
            Datatype::Real4     => Some(4),
            Datatype::Real8     => Some(8),
            Datatype::Integer4  => Some(4),
            Datatype::Integer8  => Some(8),
            Datatype::Character => Some(1),
            Datatype::Logical   => Some(1),
            Datatype::Real16 | Datatype::Null | Datatype::Other => None,
        }
    }

    /// Transfer type for replicated payloads.
    #[inline]
    pub fn wire_type(self) -> Option<WireType> {
        match self {
            Datatype::Real4     => Some(WireType::Float),
            Datatype::Real8     => Some(WireType::Double),
            Datatype::Integer4  => Some(WireType::Int32),
            Datatype::Integer8  => Some(WireType::Int64),
            Datatype::Character => Some(WireType::Byte),
            Datatype::Logical   => Some(WireType::Byte),
            Datatype::Real16 | Datatype::Null | Datatype::Other => None,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Stagger ──────────────────────────────────────────────────────────────────

/// Placement of a block's values relative to its mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Stagger {
    #[default]
    CellCentre,
    FaceX,
    FaceY,
    EdgeZ,
    FaceZ,
    EdgeY,
    EdgeX,
    Vertex,
}

impl Stagger {
    pub fn from_tag(tag: i32) -> Result<Self> {
        Ok(match tag {
            0 => Stagger::CellCentre,
            1 => Stagger::FaceX,
            2 => Stagger::FaceY,
            3 => Stagger::EdgeZ,
            4 => Stagger::FaceZ,
            5 => Stagger::EdgeY,
            6 => Stagger::EdgeX,
            7 => Stagger::Vertex,
            t => return Err(SdfError::InvalidStagger(t)),
        })
    }

    pub fn tag(self) -> i32 {
        match self {
            Stagger::CellCentre => 0,
            Stagger::FaceX      => 1,
            Stagger::FaceY      => 2,
            Stagger::EdgeZ      => 3,
            Stagger::FaceZ      => 4,
            Stagger::EdgeY      => 5,
            Stagger::EdgeX      => 6,
            Stagger::Vertex     => 7,
        }
    }
}

// ── Constant value ───────────────────────────────────────────────────────────

/// The single value carried by a CONSTANT block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    Integer4(i32),
    Integer8(i64),
    Real4(f32),
    Real8(f64),
    Character(u8),
    Logical(bool),
}

impl ConstValue {
    pub fn datatype(&self) -> Datatype {
        match self {
            ConstValue::Integer4(_)  => Datatype::Integer4,
            ConstValue::Integer8(_)  => Datatype::Integer8,
            ConstValue::Real4(_)     => Datatype::Real4,
            ConstValue::Real8(_)     => Datatype::Real8,
            ConstValue::Character(_) => Datatype::Character,
            ConstValue::Logical(_)   => Datatype::Logical,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Integer4(v)  => write!(f, "{v}"),
            ConstValue::Integer8(v)  => write!(f, "{v}"),
            ConstValue::Real4(v)     => write!(f, "{v}"),
            ConstValue::Real8(v)     => write!(f, "{v}"),
            ConstValue::Character(v) => write!(f, "{}", *v as char),
            ConstValue::Logical(v)   => write!(f, "{v}"),
        }
    }
}
