use std::path::PathBuf;

/// The primary error type for all operations in the `pzip` crate.
#[derive(Debug, thiserror::Error)]
pub enum ArchiverError {
    /// An I/O error occurred, typically while reading or writing a file.
    /// Includes the path where the error happened.
    #[error("I/O error on path '{}': {source}", path.display())]
    Io { source: std::io::Error, path: PathBuf },

    /// The source tree could not be walked. Scanning is all-or-nothing.
    #[error("failed to scan source tree: {0}")]
    Scan(#[from] walkdir::Error),

    /// An error occurred when trying to strip the source root from a walked path.
    #[error("could not strip prefix '{}' from path '{}'", prefix.display(), path.display())]
    StripPrefix { prefix: PathBuf, path: PathBuf },

    /// The zip container could not be written or parsed.
    #[error("zip container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An archive entry would be written outside the destination directory.
    #[error("unsafe entry path '{entry}' escapes the destination directory")]
    UnsafePath { entry: String },

    /// The archive carries no stored digest (no zip comment tag, no sidecar file).
    #[error("no checksum found for archive '{}'", archive.display())]
    ChecksumMissing { archive: PathBuf },

    /// A stored digest exists but cannot be parsed.
    #[error("malformed checksum record in '{}'", path.display())]
    ChecksumFormat { path: PathBuf },

    /// The file is neither a zip nor a gzip-compressed tar archive.
    #[error("unsupported archive format: '{}'", path.display())]
    UnsupportedFormat { path: PathBuf },

    /// A pool thread panicked before it could report its result.
    #[error("a worker thread panicked")]
    WorkerPanicked,
}

impl ArchiverError {
    /// Attaches a path to a raw I/O error.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ArchiverError::Io { source, path: path.into() }
    }
}

// Generic IO error conversion that doesn't require a path
impl From<std::io::Error> for ArchiverError {
    fn from(err: std::io::Error) -> Self {
        ArchiverError::Io { source: err, path: PathBuf::new() }
    }
}

pub type Result<T> = std::result::Result<T, ArchiverError>;
