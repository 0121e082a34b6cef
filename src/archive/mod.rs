//! # Archive Containers
//!
//! This module owns the two supported container formats and the sequential
//! writer abstraction the creation pipeline appends into:
//!
//! - **zip**: per-entry store/deflate, digest kept in the trailing comment.
//! - **tar.gz**: a tar stream inside one gzip member, digest kept in a
//!   `<archive>.sha256` sidecar file.
//!
//! A container is only ever touched by one thread. Workers hand finished
//! reads to the writer through a channel; they never see the sink.

pub(crate) mod targz;
pub(crate) mod zip_format;

pub use targz::TarGzSink;
pub use zip_format::ZipSink;

use crate::common::{EntryInfo, FileJob};
use crate::error::{ArchiverError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Zip local header, empty-archive end record, and spanned-archive markers.
const ZIP_MAGICS: &[&[u8; 4]] = &[b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];
const GZIP_MAGIC: &[u8; 2] = b"\x1f\x8b";

/// Supported container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
        }
    }

    /// Identifies a container from its leading bytes.
    pub fn from_magic(header: &[u8]) -> Option<Self> {
        if header.len() >= 4 && ZIP_MAGICS.iter().any(|m| header[..4] == m[..]) {
            Some(ArchiveFormat::Zip)
        } else if header.starts_with(GZIP_MAGIC) {
            Some(ArchiveFormat::TarGz)
        } else {
            None
        }
    }

    /// Opens `path` and sniffs its container type. The file extension is ignored.
    pub fn detect(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| ArchiverError::io(e, path))?;
        let mut header = [0u8; 4];
        let mut filled = 0;
        while filled < header.len() {
            let n = file.read(&mut header[filled..]).map_err(|e| ArchiverError::io(e, path))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Self::from_magic(&header[..filled])
            .ok_or_else(|| ArchiverError::UnsupportedFormat { path: path.to_path_buf() })
    }
}

/// The single sequential owner of an archive being written.
///
/// Entries are appended in the order the calls arrive. `finish` flushes and
/// closes the underlying file; the archive is complete only after it returns.
pub trait EntrySink {
    fn add_directory(&mut self, job: &FileJob) -> Result<()>;
    fn add_file(&mut self, job: &FileJob, data: &[u8]) -> Result<()>;
    fn finish(self) -> Result<()>;
}

/// Lists every entry of an archive in physical order.
pub fn list_archive(path: &Path) -> Result<Vec<EntryInfo>> {
    match ArchiveFormat::detect(path)? {
        ArchiveFormat::Zip => zip_format::list(path),
        ArchiveFormat::TarGz => targz::list(path),
    }
}
