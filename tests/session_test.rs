mod common;

use common::{three_block_container, ContainerBuilder, BLOCK_HEADER_LENGTH};
use proptest::prelude::*;
use sdfread::block::BlockState;
use sdfread::blocklist::BlockCursor;
use sdfread::external::InfoDecoder;
use sdfread::field::{Endianness, FieldReader};
use sdfread::header::HEADER_LENGTH;
use sdfread::{
    Block, BlockType, ConstValue, FileTransport, Progress, ReaderOptions, SdfError, SdfFile, Session, Stagger,
    UnknownBlockPolicy,
};
use std::io::{Cursor, Write};
use tempfile::NamedTempFile;

fn session(bytes: Vec<u8>) -> Session<FileTransport<Cursor<Vec<u8>>>> {
    Session::new(FileTransport::new(Cursor::new(bytes)))
}

#[test]
fn test_header_decode_is_idempotent() {
    let mut s = session(three_block_container().build());
    assert_eq!(s.read_header().unwrap(), Progress::Decoded);
    let first = s.header().unwrap().clone();
    assert_eq!(s.location(), HEADER_LENGTH as u64);

    assert_eq!(s.read_header().unwrap(), Progress::AlreadyDone);
    assert_eq!(s.header().unwrap(), &first);
    assert_eq!(first.step, 42);
    assert_eq!(first.nblocks, 3);
    assert_eq!(first.code_name, "test-suite");
    assert_eq!(first.block_header_length as usize, BLOCK_HEADER_LENGTH);
    assert!(first.other_domains);
    assert!(!first.restart_flag);
}

#[test]
fn test_bad_magic_closes_session() {
    let mut bytes = three_block_container().build();
    bytes[..4].copy_from_slice(b"HDF5");
    let mut s = session(bytes);

    assert!(matches!(s.read_header(), Err(SdfError::NotThisFormat { found }) if &found == b"HDF5"));
    assert!(s.is_closed());
    assert!(s.header().is_none());
    assert!(matches!(s.read_header(), Err(SdfError::Closed)));
    assert!(matches!(s.read_blocklist(), Err(SdfError::Closed)));
    assert!(matches!(s.read_next_block_header(&mut BlockCursor::new()), Err(SdfError::Closed)));
}

#[test]
fn test_newer_version_is_rejected() {
    let mut c = three_block_container();
    c.version = 2;
    let mut s = session(c.build());
    assert!(matches!(s.read_header(), Err(SdfError::UnsupportedVersion { found: 2, .. })));
    assert!(s.is_closed());
}

#[test]
fn test_short_foreign_file_is_not_this_format() {
    let mut s = session(b"GIF89a-not-sdf".to_vec());
    assert!(matches!(s.read_header(), Err(SdfError::NotThisFormat { found }) if &found == b"GIF8"));
    assert!(s.is_closed());

    let mut empty = session(Vec::new());
    assert!(matches!(empty.read_header(), Err(SdfError::NotThisFormat { found: [0, 0, 0, 0] })));
}

#[test]
fn test_truncated_preamble_closes_session() {
    let mut bytes = three_block_container().build();
    bytes.truncate(50);
    let mut s = session(bytes);
    assert!(matches!(s.read_header(), Err(SdfError::DecodeBounds { width: 106, end: 50, .. })));
    assert!(s.is_closed());
}

#[test]
fn test_zero_string_length_is_rejected() {
    let mut bytes = three_block_container().build();
    // int4 string length precedes the I/O version and the two flag bytes
    let at = HEADER_LENGTH - 2 - 4 - 4;
    bytes[at..at + 4].copy_from_slice(&0i32.to_le_bytes());
    let mut s = session(bytes);
    assert!(matches!(s.read_header(), Err(SdfError::ZeroWidth("string_length"))));
}

#[test]
fn test_blocklist_roundtrip() {
    let mut s = session(three_block_container().build());
    s.read_blocklist().unwrap();

    assert_eq!(s.block_count(), 3);
    assert!(!s.summary_loaded());
    let blocks: Vec<&Block> = s.blocks().collect();
    assert!(blocks.iter().all(|b| b.state.info_done()));
    assert!(blocks.windows(2).all(|w| w[0].block_start < w[1].block_start));

    let constant = blocks[0];
    assert_eq!(constant.id, "dt");
    assert_eq!(constant.kind(), BlockType::Constant);
    assert_eq!(constant.const_value, Some(ConstValue::Real8(3.5)));
    assert_eq!(constant.stagger, Stagger::Vertex);

    let tensor = blocks[1];
    assert_eq!(tensor.name, "Electric Field");
    assert_eq!(tensor.mesh_id.as_deref(), Some("grid"));
    assert_eq!(tensor.variable_ids, vec!["ex", "ey"]);
    assert_eq!(tensor.state, BlockState::Data);

    let species = blocks[2];
    assert_eq!(species.material_id.as_deref(), Some("electron"));
    assert_eq!(species.material_name.as_deref(), Some("Electron"));
    assert_eq!(species.material_names, vec!["e_hot", "e_cold"]);
    assert_eq!(species.variable_ids, vec!["n_hot", "n_cold"]);

    assert_eq!(s.find_block("efield").unwrap().ndims, 2);
    assert!(s.find_block("missing").is_none());
}

#[test]
fn test_big_endian_container() {
    let mut c = three_block_container();
    c.big_endian = true;
    // Info bytes were encoded little-endian by the fixture; re-encode them.
    c.blocks[0].info = c.f8(3.5);
    c.blocks[1].info = c.tensor_info(0, "grid", &["ex", "ey"]);
    c.blocks[2].info = c.species_info(0, "grid", "electron", "Electron", &["e_hot", "e_cold"], &["n_hot", "n_cold"]);

    let mut s = session(c.build());
    s.read_blocklist().unwrap();
    assert_eq!(s.header().unwrap().endianness, Endianness::Big);
    assert_eq!(s.block(0).unwrap().const_value, Some(ConstValue::Real8(3.5)));
    assert_eq!(s.block(2).unwrap().variable_ids, vec!["n_hot", "n_cold"]);
}

#[test]
fn test_orchestration_binds_to_declared_count() {
    let mut c = three_block_container();
    c.nblocks = Some(2);
    let mut s = session(c.build());
    s.read_blocklist().unwrap();
    assert_eq!(s.block_count(), 2);
    assert_eq!(s.block(1).unwrap().id, "efield");
}

#[test]
fn test_blocklist_is_idempotent() {
    let mut s = session(three_block_container().build());
    let cursor = s.read_blocklist().unwrap();
    assert_eq!(cursor.current(), None);
    let snapshot: Vec<String> = s.blocks().map(|b| b.id.clone()).collect();

    s.read_blocklist().unwrap();
    let again: Vec<String> = s.blocks().map(|b| b.id.clone()).collect();
    assert_eq!(snapshot, again);
}

#[test]
fn test_block_header_before_file_header_is_not_ready() {
    let mut s = session(three_block_container().build());
    let mut cursor = BlockCursor::new();
    assert!(matches!(s.read_next_block_header(&mut cursor), Err(SdfError::NotReady(_))));
    assert_eq!(s.block_count(), 0);
    assert_eq!(cursor.current(), None);
    assert!(!s.is_closed());
}

#[test]
fn test_incremental_walk_matches_orchestration() {
    let c = three_block_container();
    let mut s = session(c.build());
    s.read_header().unwrap();

    // No summary buffer yet: nothing is decoded, the cursor does not move.
    let mut cursor = BlockCursor::new();
    assert!(matches!(s.read_next_block_header(&mut cursor), Err(SdfError::NotReady(_))));
    assert_eq!(cursor.current(), None);
    assert_eq!(s.block_count(), 0);

    s.load_summary().unwrap();
    for k in 0..3 {
        let index = s.read_next_block_header(&mut cursor).unwrap();
        assert_eq!(index, k);
        assert_eq!(s.location(), c.block_start(k) + BLOCK_HEADER_LENGTH as u64);
        assert_eq!(s.block(k).unwrap().state, BlockState::Header);
    }
    assert!(matches!(
        s.read_next_block_header(&mut cursor),
        Err(SdfError::BlockCountExceeded { nblocks: 3 })
    ));

    // Info decoding on a second traversal never changes header fields.
    let headers: Vec<Block> = s.blocks().cloned().collect();
    let mut second = BlockCursor::new();
    for k in 0..3 {
        assert_eq!(s.read_block_info(&mut second).unwrap(), k);
        let b = s.block(k).unwrap();
        assert!(b.state.info_done());
        assert_eq!(b.id, headers[k].id);
        assert_eq!(b.name, headers[k].name);
        assert_eq!(b.block_start, headers[k].block_start);
        assert_eq!(b.next_block_location, headers[k].next_block_location);
        assert_eq!(b.data_location, headers[k].data_location);
        assert_eq!(b.blocktype, headers[k].blocktype);
        assert_eq!(b.datatype, headers[k].datatype);
        assert_eq!(b.ndims, headers[k].ndims);
        assert_eq!(b.type_size, headers[k].type_size);
    }

    // Repeating a finished step only repositions the cursor.
    assert_eq!(s.decode_info(1).unwrap(), Progress::AlreadyDone);
    s.release_summary();
    let mut third = BlockCursor::new();
    s.read_next_block_header(&mut third).unwrap();
    assert_eq!(s.location(), c.block_start(0) + BLOCK_HEADER_LENGTH as u64);
}

#[test]
fn test_premature_block_call_does_not_spoil_orchestration() {
    let mut s = session(three_block_container().build());
    s.read_header().unwrap();
    assert!(matches!(s.read_next_block_header(&mut BlockCursor::new()), Err(SdfError::NotReady(_))));
    assert_eq!(s.block_count(), 0);

    s.read_blocklist().unwrap();
    assert_eq!(s.block_count(), 3);
    assert!(s.blocks().all(|b| b.state.info_done()));
}

#[test]
fn test_orchestration_resumes_an_incremental_walk() {
    let mut s = session(three_block_container().build());
    s.read_header().unwrap();
    s.load_summary().unwrap();
    let mut cursor = BlockCursor::new();
    s.read_next_block_header(&mut cursor).unwrap();
    s.release_summary();
    assert_eq!(s.block_count(), 1);

    s.read_blocklist().unwrap();
    assert_eq!(s.block_count(), 3);
    assert!(s.blocks().all(|b| b.state.info_done()));
    assert_eq!(s.block(0).unwrap().const_value, Some(ConstValue::Real8(3.5)));
}

#[test]
fn test_material_and_matvar_blocks() {
    let c = ContainerBuilder::new();
    let material = c.material_info(1, "grid", &["Gold", "Water"], &["vf_au", "vf_h2o"]);
    let matvar = c.matvar_info(7, "grid", "gold", &["rho_au"]);
    let c = c.block("mat", "Material", 10, 0, 2, material).block("rho", "Density", 11, 0, 1, matvar);

    let mut s = session(c.build());
    s.read_blocklist().unwrap();

    let material = s.find_block("mat").unwrap();
    assert_eq!(material.state, BlockState::Data);
    assert_eq!(material.stagger, Stagger::FaceX);
    assert_eq!(material.material_names, vec!["Gold", "Water"]);
    assert_eq!(material.variable_ids, vec!["vf_au", "vf_h2o"]);
    assert!(material.material_id.is_none());

    let matvar = s.find_block("rho").unwrap();
    assert_eq!(matvar.stagger, Stagger::Vertex);
    assert_eq!(matvar.material_id.as_deref(), Some("gold"));
    assert_eq!(matvar.variable_ids, vec!["rho_au"]);
    assert!(matvar.material_names.is_empty());
}

#[test]
fn test_corrupt_component_count_fails_without_allocating() {
    let c = ContainerBuilder::new();
    let info = c.material_info(0, "grid", &["Gold"], &["vf_au"]);
    let c = c.block("mat", "Material", 10, 0, i32::MAX, info);

    let mut s = session(c.build());
    s.read_blocklist().unwrap();
    let b = s.block(0).unwrap();
    assert_eq!(b.state, BlockState::Info);
    assert!(b.material_names.is_empty());
    assert!(matches!(s.decode_info(0), Ok(Progress::AlreadyDone)));
}

#[test]
fn test_unknown_block_type_policies() {
    let c = ContainerBuilder::new().block("run", "Run info", 7, 0, 0, vec![0; 16]).block(
        "mystery",
        "Mystery",
        99,
        0,
        0,
        Vec::new(),
    );
    let bytes = c.build();

    let mut strict = session(bytes.clone());
    strict.read_blocklist().unwrap();
    assert_eq!(strict.block_count(), 2);
    assert!(strict.blocks().all(|b| b.state == BlockState::Header));
    assert!(matches!(strict.decode_info(0), Err(SdfError::UnknownBlockType { .. })));

    let opts = ReaderOptions { unknown_blocks: UnknownBlockPolicy::Skip, ..ReaderOptions::default() };
    let mut lenient = Session::with_options(FileTransport::new(Cursor::new(bytes)), opts);
    lenient.read_blocklist().unwrap();
    assert!(lenient.blocks().all(|b| b.state == BlockState::Skipped));
    assert_eq!(lenient.block(1).unwrap().kind(), BlockType::Unrecognized(99));
    assert_eq!(lenient.decode_info(1).unwrap(), Progress::AlreadyDone);
}

#[test]
fn test_failed_info_is_not_retried_and_siblings_survive() {
    // A tensor whose stagger tag is invalid, between two good blocks.
    let c = ContainerBuilder::new();
    let good = c.tensor_info(0, "grid", &["a"]);
    let bad = c.tensor_info(12, "grid", &["b"]);
    let c = c
        .block("t1", "first", 9, 0, 1, good.clone())
        .block("t2", "second", 9, 0, 1, bad)
        .block("t3", "third", 9, 0, 1, good);

    let mut s = session(c.build());
    s.read_blocklist().unwrap();
    assert_eq!(s.block(0).unwrap().variable_ids, vec!["a"]);
    assert_eq!(s.block(2).unwrap().variable_ids, vec!["a"]);

    let failed = s.block(1).unwrap();
    assert_eq!(failed.state, BlockState::Info);
    assert!(failed.variable_ids.is_empty());
    assert_eq!(s.decode_info(1).unwrap(), Progress::AlreadyDone);
}

#[test]
fn test_unknown_datatype_stops_the_walk() {
    let c = ContainerBuilder::new().block("c", "c", 5, 4, 0, vec![0; 8]).block("d", "d", 5, 31, 0, vec![0; 8]);
    let mut s = session(c.build());
    assert!(matches!(s.read_blocklist(), Err(SdfError::UnknownDatatype(31))));
    assert!(!s.summary_loaded());
    // A failed walk is not mistaken for a finished one.
    assert!(matches!(s.read_blocklist(), Err(SdfError::UnknownDatatype(31))));
    assert_eq!(s.block_count(), 2);
    assert_eq!(s.block(0).unwrap().const_value, Some(ConstValue::Real8(0.0)));
    assert_eq!(s.block(1).unwrap().state, BlockState::Pending);
}

#[test]
fn test_oversized_summary_is_rejected() {
    let opts = ReaderOptions { max_summary_size: 16, ..ReaderOptions::default() };
    let mut s = Session::with_options(FileTransport::new(Cursor::new(three_block_container().build())), opts);
    assert!(matches!(s.read_blocklist(), Err(SdfError::DecodeBounds { .. })));
    assert_eq!(s.block_count(), 0);
}

struct MeshDims;

impl InfoDecoder for MeshDims {
    fn handles(&self, blocktype: BlockType) -> bool {
        blocktype == BlockType::PlainMesh
    }

    fn decode_info(&mut self, block: &mut Block, fields: &mut FieldReader<'_>) -> sdfread::Result<()> {
        for axis in 0..block.ndims as usize {
            block.dims[axis] = fields.read_offset("dims")?;
        }
        block.state = BlockState::Info;
        Ok(())
    }
}

#[test]
fn test_mesh_blocks_go_to_external_decoder() {
    let c = ContainerBuilder::new();
    let mut dims = c.i8(16);
    dims.extend(c.i8(8));
    let c = c.block("grid", "Grid", 1, 4, 2, dims).block("ex", "Ex", 3, 4, 2, Vec::new());
    let bytes = c.build();

    let mut deferred = session(bytes.clone());
    deferred.read_blocklist().unwrap();
    assert!(deferred.blocks().all(|b| b.state == BlockState::Header));
    assert_eq!(deferred.decode_info(0).unwrap(), Progress::Deferred);

    let mut s = session(bytes).with_info_decoder(Box::new(MeshDims));
    s.read_blocklist().unwrap();
    assert_eq!(s.block(0).unwrap().dims, [16, 8, 1]);
    assert!(s.block(0).unwrap().state.info_done());
    assert_eq!(s.block(1).unwrap().state, BlockState::Header);
}

#[test]
fn test_open_from_disk_and_export_json() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&three_block_container().build()).unwrap();
    file.flush().unwrap();

    let sdf = SdfFile::open(file.path()).unwrap();
    assert_eq!(sdf.header().nblocks, 3);
    assert_eq!(sdf.blocks().count(), 3);

    let json: serde_json::Value = serde_json::from_str(&sdf.to_json().unwrap()).unwrap();
    assert_eq!(json["header"]["step"], 42);
    assert_eq!(json["blocks"][1]["variable_ids"][1], "ey");
}

proptest! {
    #[test]
    fn header_decode_twice_is_stable(step in any::<i32>(), time in any::<f64>().prop_filter("nan", |t| !t.is_nan()), big in any::<bool>()) {
        let mut c = ContainerBuilder::new();
        c.step = step;
        c.time = time;
        c.big_endian = big;
        let mut s = session(c.build());
        s.read_header().unwrap();
        let first = s.header().unwrap().clone();
        prop_assert_eq!(s.read_header().unwrap(), Progress::AlreadyDone);
        prop_assert_eq!(s.header().unwrap(), &first);
        prop_assert_eq!(first.step, step);
        prop_assert_eq!(first.time, time);
    }

    #[test]
    fn corrupt_summaries_never_panic(flips in proptest::collection::vec((0usize..2000, any::<u8>()), 1..16)) {
        let mut bytes = three_block_container().build();
        let len = bytes.len();
        for (at, v) in flips {
            let at = HEADER_LENGTH + at % (len - HEADER_LENGTH);
            bytes[at] = v;
        }
        let mut s = session(bytes);
        let _ = s.read_blocklist();
        prop_assert!(s.block_count() <= 3);
        prop_assert!(!s.summary_loaded());
    }
}
