#![allow(dead_code)]

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use sdfread::header::{ENDIANNESS_MARKER, HEADER_LENGTH, ID_LENGTH, MAGIC};

pub const STRING_LENGTH: usize = 64;
pub const BLOCK_HEADER_LENGTH: usize = 8 + 8 + ID_LENGTH + 8 + 4 + 4 + 4 + STRING_LENGTH;

pub struct BlockSpec {
    pub id:        String,
    pub name:      String,
    pub blocktype: i32,
    pub datatype:  i32,
    pub ndims:     i32,
    pub info:      Vec<u8>,
}

/// Writes syntactically valid SDF containers for tests.
pub struct ContainerBuilder {
    pub big_endian: bool,
    pub version:    i32,
    pub step:       i32,
    pub time:       f64,
    /// Block count written to the header; defaults to the number of blocks.
    pub nblocks:    Option<i32>,
    pub blocks:     Vec<BlockSpec>,
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self { big_endian: false, version: 1, step: 42, time: 1.25e-9, nblocks: None, blocks: Vec::new() }
    }
}

pub fn pad(s: &str, width: usize) -> Vec<u8> {
    let mut v = s.as_bytes().to_vec();
    v.resize(width, 0);
    v
}

pub fn id(s: &str) -> Vec<u8> { pad(s, ID_LENGTH) }
pub fn string(s: &str) -> Vec<u8> { pad(s, STRING_LENGTH) }

impl ContainerBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn block(mut self, id: &str, name: &str, blocktype: i32, datatype: i32, ndims: i32, info: Vec<u8>) -> Self {
        self.blocks.push(BlockSpec { id: id.into(), name: name.into(), blocktype, datatype, ndims, info });
        self
    }

    pub fn i4(&self, v: i32) -> Vec<u8> {
        let mut out = Vec::new();
        if self.big_endian { out.write_i32::<BigEndian>(v).unwrap() } else { out.write_i32::<LittleEndian>(v).unwrap() }
        out
    }

    pub fn i8(&self, v: i64) -> Vec<u8> {
        let mut out = Vec::new();
        if self.big_endian { out.write_i64::<BigEndian>(v).unwrap() } else { out.write_i64::<LittleEndian>(v).unwrap() }
        out
    }

    pub fn f8(&self, v: f64) -> Vec<u8> {
        let mut out = Vec::new();
        if self.big_endian { out.write_f64::<BigEndian>(v).unwrap() } else { out.write_f64::<LittleEndian>(v).unwrap() }
        out
    }

    pub fn tensor_info(&self, stagger: i32, mesh: &str, vars: &[&str]) -> Vec<u8> {
        let mut b = self.i4(stagger);
        b.extend(id(mesh));
        vars.iter().for_each(|v| b.extend(id(v)));
        b
    }

    pub fn material_info(&self, stagger: i32, mesh: &str, materials: &[&str], vars: &[&str]) -> Vec<u8> {
        let mut b = self.i4(stagger);
        b.extend(id(mesh));
        materials.iter().for_each(|m| b.extend(string(m)));
        vars.iter().for_each(|v| b.extend(id(v)));
        b
    }

    pub fn matvar_info(&self, stagger: i32, mesh: &str, material: &str, vars: &[&str]) -> Vec<u8> {
        let mut b = self.i4(stagger);
        b.extend(id(mesh));
        b.extend(id(material));
        vars.iter().for_each(|v| b.extend(id(v)));
        b
    }

    pub fn species_info(&self, stagger: i32, mesh: &str, material: &str, material_name: &str, species: &[&str], vars: &[&str]) -> Vec<u8> {
        let mut b = self.i4(stagger);
        b.extend(id(mesh));
        b.extend(id(material));
        b.extend(string(material_name));
        species.iter().for_each(|s| b.extend(string(s)));
        vars.iter().for_each(|v| b.extend(id(v)));
        b
    }

    /// Byte offset of block `k` in the built container.
    pub fn block_start(&self, k: usize) -> u64 {
        (HEADER_LENGTH + self.blocks[..k].iter().map(|b| BLOCK_HEADER_LENGTH + b.info.len()).sum::<usize>()) as u64
    }

    pub fn build(&self) -> Vec<u8> {
        let summary_location = HEADER_LENGTH as i64;
        let summary_size: usize = self.blocks.iter().map(|b| BLOCK_HEADER_LENGTH + b.info.len()).sum();
        let nblocks = self.nblocks.unwrap_or(self.blocks.len() as i32);

        let mut out = MAGIC.to_vec();
        out.extend(self.i4(ENDIANNESS_MARKER as i32));
        out.extend(self.i4(self.version));
        out.extend(self.i4(1));
        out.extend(id("test-suite"));
        out.extend(self.i8(summary_location));
        out.extend(self.i8(summary_location));
        out.extend(self.i4(summary_size as i32));
        out.extend(self.i4(nblocks));
        out.extend(self.i4(BLOCK_HEADER_LENGTH as i32));
        out.extend(self.i4(self.step));
        out.extend(self.f8(self.time));
        out.extend(self.i4(7));
        out.extend(self.i4(9));
        out.extend(self.i4(STRING_LENGTH as i32));
        out.extend(self.i4(1));
        out.push(0);
        out.push(1);
        assert_eq!(out.len(), HEADER_LENGTH);

        let data_location = (HEADER_LENGTH + summary_size) as i64;
        for b in &self.blocks {
            let start = out.len();
            let next = start + BLOCK_HEADER_LENGTH + b.info.len();
            out.extend(self.i8(next as i64));
            out.extend(self.i8(data_location));
            out.extend(id(&b.id));
            out.extend(self.i8(0));
            out.extend(self.i4(b.blocktype));
            out.extend(self.i4(b.datatype));
            out.extend(self.i4(b.ndims));
            out.extend(string(&b.name));
            assert_eq!(out.len() - start, BLOCK_HEADER_LENGTH);
            out.extend(&b.info);
        }
        out
    }
}

/// The three-block container used across the suite: a REAL8 constant, a
/// two-component tensor and a two-species species block.
pub fn three_block_container() -> ContainerBuilder {
    let c = ContainerBuilder::new();
    let constant = c.f8(3.5);
    let tensor = c.tensor_info(0, "grid", &["ex", "ey"]);
    let species = c.species_info(0, "grid", "electron", "Electron", &["e_hot", "e_cold"], &["n_hot", "n_cold"]);
    c.block("dt", "Timestep", 5, 4, 0, constant)
        .block("efield", "Electric Field", 9, 0, 2, tensor)
        .block("species", "Electron Species", 12, 0, 2, species)
}
