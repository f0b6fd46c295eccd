// Module: FileOpener
// Local file source for the FILE action. Files are read to EOF up
// front, so the handle is released on every exit path of the
// surrounding test.

use std::fs;
use std::io;
use std::path::PathBuf;

pub trait FileOpener: Send + Sync {
    fn open(&self, name: &str) -> io::Result<Vec<u8>>;
}

/// Resolves names against the group directory.
pub struct DiskOpener {
    base: PathBuf,
}

impl DiskOpener {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl FileOpener for DiskOpener {
    fn open(&self, name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.base.join(name))
    }
}
