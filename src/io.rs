//! Block I/O: a random-access byte source over the dictionary file. Kept
//! as a trait so an embedder can hand in a different backing store
//! (e.g. a memory-mapped file); the file-backed implementation here is
//! synchronous.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::Result;

pub trait ByteSource {
    /// Reads exactly `len` bytes starting at `offset`.
    fn read(&mut self, offset: u64, len: usize) -> Result<Vec<u8>>;
}

/// A `ByteSource` backed by a plain file handle.
pub struct FileSource(File);

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(FileSource(File::open(path)?))
    }
}

impl ByteSource for FileSource {
    fn read(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.0.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        self.0.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// Sequential cursor over a `ByteSource`, used while walking the file's
/// fixed top-level layout.
pub(crate) struct FileCursor<'a, S: ByteSource> {
    source: &'a mut S,
    pos: u64,
}

impl<'a, S: ByteSource> FileCursor<'a, S> {
    pub fn new(source: &'a mut S) -> Self {
        FileCursor { source, pos: 0 }
    }

    pub fn fetch(&mut self, len: usize) -> Result<Vec<u8>> {
        let buf = self.source.read(self.pos, len)?;
        self.pos += len as u64;
        Ok(buf)
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn seek(&mut self, pos: u64) {
        self.pos = pos;
    }
}
