//! High-level [`SdfFile`] API: open a container on disk in one call.
//!
//! ```no_run
//! use sdfread::file::SdfFile;
//!
//! let sdf = SdfFile::open("0001.sdf")?;
//! println!("step {} at t = {}", sdf.header().step, sdf.header().time);
//! for block in sdf.blocks() {
//!     println!("{:<24} {}", block.id, block.name);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::block::Block;
use crate::error::{Result, SdfError};
use crate::header::Header;
use crate::options::ReaderOptions;
use crate::session::Session;
use crate::transport::FileTransport;

/// Serialisable snapshot of a decoded container.
#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    pub header: &'a Header,
    pub blocks: Vec<&'a Block>,
}

/// A single-process session over a file on disk with header and block list
/// already decoded.
pub struct SdfFile {
    path:    PathBuf,
    header:  Header,
    session: Session<FileTransport<BufReader<File>>>,
}

impl SdfFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ReaderOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ReaderOptions) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let transport = FileTransport::new(BufReader::new(File::open(&path)?));
        let mut session = Session::with_options(transport, options);
        session.read_header()?;
        session.read_blocklist()?;
        let header = session.header().cloned().ok_or(SdfError::Closed)?;
        Ok(Self { path, header, session })
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn header(&self) -> &Header { &self.header }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ { self.session.blocks() }

    pub fn find_block(&self, id: &str) -> Option<&Block> { self.session.find_block(id) }

    pub fn summary(&self) -> Summary<'_> {
        Summary { header: self.header(), blocks: self.blocks().collect() }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.summary())?)
    }

    pub fn session(&self) -> &Session<FileTransport<BufReader<File>>> { &self.session }

    pub fn into_session(self) -> Session<FileTransport<BufReader<File>>> { self.session }
}
