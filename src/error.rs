//! Error type shared by every decode step.
//!
//! Header failures (`NotThisFormat`, `UnsupportedVersion`, `UnknownEndianness`)
//! close the session.  Per-block failures are local to one node: siblings that
//! were already decoded stay valid, but the failing node is never retried.

use std::io;
use thiserror::Error;

use crate::transport::TransportError;

pub type Result<T> = std::result::Result<T, SdfError>;

#[derive(Error, Debug)]
pub enum SdfError {
    #[error("Not an SDF file: magic is {} (expected {})", hex::encode(.found), hex::encode(crate::header::MAGIC))]
    NotThisFormat { found: [u8; 4] },

    #[error("Unsupported SDF version {found} (this reader understands up to {supported})")]
    UnsupportedVersion { found: i32, supported: i32 },

    #[error("Unknown endianness tag {0:#010x}")]
    UnknownEndianness(u32),

    /// A field read would run past the bytes that were replicated for the
    /// current decode step.
    #[error("Field of {width} bytes at file offset {offset} lies outside the buffer [{start}, {end})")]
    DecodeBounds { offset: u64, width: u64, start: u64, end: u64 },

    /// A decode step was invoked before its prerequisite.
    #[error("{0}. Ignoring call.")]
    NotReady(&'static str),

    #[error("No metadata decoder for block type {blocktype} (block '{id}')")]
    UnknownBlockType { blocktype: String, id: String },

    #[error("Unknown element datatype tag {0}")]
    UnknownDatatype(i32),

    #[error("Datatype {0} has no element layout")]
    UnsupportedDatatype(&'static str),

    #[error("Invalid stagger tag {0}")]
    InvalidStagger(i32),

    #[error("Field '{field}' decoded as negative ({value})")]
    NegativeField { field: &'static str, value: i64 },

    #[error("Field width '{0}' is zero")]
    ZeroWidth(&'static str),

    #[error("Block list already holds the declared {nblocks} blocks")]
    BlockCountExceeded { nblocks: u32 },

    #[error("Session was closed after a failed header decode")]
    Closed,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
