//! Common types shared by the scanner, the worker pool and the archive writers.

use serde::Serialize;
use std::fs::Metadata;
use std::path::PathBuf;

/// Result of creating an archive.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    /// Sum of the sizes of every regular file written into the archive.
    pub total_bytes: u64,
    /// Number of regular files written into the archive.
    pub file_count: usize,
    /// Hex-encoded SHA-256 digest of the finished archive.
    pub checksum: String,
}

/// Totals taken from archive metadata before extraction starts.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub total_bytes: u64,
    pub file_count: usize,
}

/// One unit of scan output: a file or directory waiting to be archived.
#[derive(Debug, Clone)]
pub struct FileJob {
    pub source_path: PathBuf,
    /// Path relative to the scanned root, using the platform separator.
    pub relative_path: PathBuf,
    pub metadata: Metadata,
    pub is_dir: bool,
}

impl FileJob {
    /// Archive entry name: forward slashes, trailing `/` for directories.
    pub fn entry_name(&self) -> String {
        let mut name = self
            .relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if self.is_dir {
            name.push('/');
        }
        name
    }

    /// Unix permission bits, if the platform exposes them.
    pub fn permissions(&self) -> Option<u32> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            Some(self.metadata.permissions().mode() & 0o7777)
        }
        #[cfg(not(unix))]
        {
            None
        }
    }

    /// Modification time as seconds since the Unix epoch (0 when unavailable).
    pub fn modified_secs(&self) -> u64 {
        self.metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// A completed read handed from a worker to the sequential writer.
/// Directories travel with an empty payload.
#[derive(Debug)]
pub struct FileData {
    pub job: FileJob,
    pub data: Vec<u8>,
}

/// A single entry as reported by [`crate::list_archive`].
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
}
