//! # pzip Core Library
//!
//! This crate provides the core functionality for the `pz` archiver: parallel
//! creation, extraction and verification of zip and tar.gz archives.
//!
//! It is designed to be used by the `pz` command-line application, but its public API
//! can also be used to programmatically create, inspect, verify and extract archives.
//!
//! ## Key Modules
//!
//! - [`scan`]: Walks the source tree and computes payload totals.
//! - [`compress`]: Chooses store/deflate per file and the effort tier per archive.
//! - [`workers`]: Parallel archive creation (reader pool + single writer).
//! - [`archive`]: Zip and tar.gz containers, format detection and listing.
//! - [`checksum`]: SHA-256 digests stored in the zip comment or a `.sha256` sidecar.
//! - [`extract`]: Guarded, parallel extraction.
//! - [`progress`]: Serialized progress reporting.
//!
//! ## Examples
//!
//! ```no_run
//! use pzip::{create_zip, extract_archive, verify_archive, ArchiveOptions};
//! use std::path::Path;
//!
//! let options = ArchiveOptions::default();
//! let stats = create_zip(Path::new("photos"), Path::new("photos.zip"), &options, None)?;
//! let (ok, digest) = verify_archive(Path::new("photos.zip"))?;
//! assert!(ok && digest == stats.checksum);
//! extract_archive(Path::new("photos.zip"), Path::new("restored"), &options, None)?;
//! # Ok::<(), pzip::ArchiverError>(())
//! ```

pub mod archive;
pub mod checksum;
pub mod cli;
pub mod cli_runner;
pub mod common;
pub mod compress;
pub mod config;
pub mod error;
pub mod extract;
pub mod progress;
pub mod scan;
pub mod workers;

// Cross-platform filesystem wrapper
pub mod fsx;

pub use archive::{list_archive, ArchiveFormat};
pub use checksum::verify_archive;
pub use common::{ArchiveStats, EntryInfo, ExtractStats};
pub use compress::{CompressionPolicy, EffortTier, StorageMethod};
pub use config::{ArchiveOptions, WORKERS_ENV};
pub use error::{ArchiverError, Result};
pub use extract::extract_archive;
pub use progress::{bytes_only, ProgressCallback, ProgressState};
pub use workers::{create_archive, create_tar_gz, create_zip};
