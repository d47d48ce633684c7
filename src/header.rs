//! Fixed preamble at offset 0 of every SDF container.
//!
//! Layout (after endianness resolution; `id` = [`ID_LENGTH`] bytes):
//!
//! | Field                 | Width |
//! |-----------------------|-------|
//! | magic `"SDF1"`        | 4     |
//! | endianness marker     | int4  |
//! | file version          | int4  |
//! | file revision         | int4  |
//! | code name             | id    |
//! | first block location  | int8  |
//! | summary location      | int8  |
//! | summary size          | int4  |
//! | block count           | int4  |
//! | block header length   | int4  |
//! | step                  | int4  |
//! | time                  | real8 |
//! | job id 1, job id 2    | int4  |
//! | string length         | int4  |
//! | code I/O version      | int4  |
//! | restart flag          | 1     |
//! | other domains flag    | 1     |

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SdfError};
use crate::field::{Endianness, FieldReader};

pub const MAGIC: &[u8; 4] = b"SDF1";
/// Highest file version this reader understands.
pub const VERSION: i32 = 1;
pub const REVISION: i32 = 1;
/// Written natively by the producer; reads back byte-swapped on a machine of
/// the other byte order.
pub const ENDIANNESS_MARKER: u32 = 16_911_887;
/// Width of identifier fields for format version 1.
pub const ID_LENGTH: usize = 32;
pub const HEADER_LENGTH: usize = 4 + 11 * 4 + 2 * 8 + 8 + 2 + ID_LENGTH;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub endianness:           Endianness,
    pub file_version:         i32,
    pub file_revision:        i32,
    pub code_name:            String,
    pub first_block_location: u64,
    pub summary_location:     u64,
    pub summary_size:         u32,
    pub nblocks:              u32,
    pub block_header_length:  u32,
    pub step:                 i32,
    pub time:                 f64,
    pub jobid1:               i32,
    pub jobid2:               i32,
    pub id_length:            usize,
    pub string_length:        usize,
    pub code_io_version:      i32,
    pub restart_flag:         bool,
    pub other_domains:        bool,
}

impl Header {
    /// Decode the preamble from the first [`HEADER_LENGTH`] bytes of a file.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut magic = [0u8; 4];
        if let Some(found) = buf.get(..4) {
            magic.copy_from_slice(found);
        }
        if &magic != MAGIC {
            return Err(SdfError::NotThisFormat { found: magic });
        }
        if buf.len() < HEADER_LENGTH {
            return Err(SdfError::DecodeBounds {
                offset: 0,
                width:  HEADER_LENGTH as u64,
                start:  0,
                end:    buf.len() as u64,
            });
        }

        let mut r = FieldReader::new(buf, 0, Endianness::Little).with_lengths(ID_LENGTH, 0);
        r.seek(4);

        let endianness = resolve_endianness(r.read_i4()? as u32)?;
        r.set_endian(endianness);

        let file_version = r.read_i4()?;
        if file_version > VERSION {
            return Err(SdfError::UnsupportedVersion { found: file_version, supported: VERSION });
        }

        let header = Header {
            endianness,
            file_version,
            file_revision:        r.read_i4()?,
            code_name:            r.read_id()?,
            first_block_location: r.read_offset("first_block_location")?,
            summary_location:     r.read_offset("summary_location")?,
            summary_size:         r.read_count("summary_size")?,
            nblocks:              r.read_count("nblocks")?,
            block_header_length:  r.read_count("block_header_length")?,
            step:                 r.read_i4()?,
            time:                 r.read_f8()?,
            jobid1:               r.read_i4()?,
            jobid2:               r.read_i4()?,
            id_length:            ID_LENGTH,
            string_length:        read_width(&mut r, "string_length")?,
            code_io_version:      r.read_i4()?,
            restart_flag:         r.read_logical()?,
            other_domains:        r.read_logical()?,
        };

        debug!(
            version = header.file_version,
            revision = header.file_revision,
            code = %header.code_name,
            nblocks = header.nblocks,
            summary_location = header.summary_location,
            summary_size = header.summary_size,
            "decoded SDF header"
        );
        Ok(header)
    }
}

/// A text field width; zero would let a corrupt count decode without ever
/// reaching the end of the buffer.
fn read_width(r: &mut FieldReader<'_>, field: &'static str) -> Result<usize> {
    match r.read_count(field)? {
        0 => Err(SdfError::ZeroWidth(field)),
        n => Ok(n as usize),
    }
}

fn resolve_endianness(raw_le: u32) -> Result<Endianness> {
    if raw_le == ENDIANNESS_MARKER {
        Ok(Endianness::Little)
    } else if raw_le.swap_bytes() == ENDIANNESS_MARKER {
        Ok(Endianness::Big)
    } else {
        Err(SdfError::UnknownEndianness(raw_le))
    }
}
