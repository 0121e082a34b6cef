//! Directory scanning.
//!
//! A single depth-first walk produces both the payload totals and the list of
//! [`FileJob`]s fed to the worker pool. Any traversal error aborts the scan;
//! a partial listing is never returned.

use crate::common::FileJob;
use crate::error::{ArchiverError, Result};
use std::path::Path;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Directory names treated as build output, caches or VCS metadata.
const JUNK_DIRS: &[&str] = &[
    "node_modules", "__pycache__", ".git", ".svn", ".hg", ".vscode", ".idea", ".vs",
    "bin", "obj", "target", "build", "dist", ".cache", "temp", "tmp", ".temp", ".tmp",
];

const JUNK_SUFFIXES: &[&str] = &[".tmp", ".temp", "~", ".bak", ".swp"];

const JUNK_FILES: &[&str] = &["thumbs.db", "desktop.ini", ".ds_store"];

/// Output of a scan: totals over regular files plus every entry to archive.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub total_bytes: u64,
    pub file_count: usize,
    /// Directories and regular files in walk order. The root is not included.
    pub jobs: Vec<FileJob>,
}

/// Returns true for hidden entries, build/cache directories, editor and
/// temporary files, and OS metadata files.
pub fn is_junk(name: &str, is_dir: bool) -> bool {
    if name.starts_with('.') {
        return true;
    }
    let lower = name.to_lowercase();
    if is_dir && JUNK_DIRS.contains(&lower.as_str()) {
        return true;
    }
    if JUNK_SUFFIXES.iter().any(|s| lower.ends_with(s)) || lower.starts_with("~$") {
        return true;
    }
    JUNK_FILES.contains(&lower.as_str())
}

fn keep_entry(entry: &DirEntry, exclude_junk: bool) -> bool {
    // Depth 0 is the root itself; its name is never filtered.
    if !exclude_junk || entry.depth() == 0 {
        return true;
    }
    !is_junk(&entry.file_name().to_string_lossy(), entry.file_type().is_dir())
}

/// Walks `root` recursively.
///
/// With `exclude_junk` set, entries matching [`is_junk`] are pruned (a junk
/// directory drops its whole subtree). Symbolic links are not followed and
/// are left out of the archive.
pub fn scan_directory(root: &Path, exclude_junk: bool) -> Result<ScanResult> {
    let mut result = ScanResult::default();

    let walker = WalkDir::new(root)
        .min_depth(0)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| keep_entry(e, exclude_junk));

    for entry in walker {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }
        let file_type = entry.file_type();
        if !file_type.is_dir() && !file_type.is_file() {
            debug!(path = %entry.path().display(), "skipping non-regular entry");
            continue;
        }

        let metadata = entry.metadata()?;
        let relative_path = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| ArchiverError::StripPrefix {
                prefix: root.to_path_buf(),
                path: entry.path().to_path_buf(),
            })?
            .to_path_buf();

        if file_type.is_file() {
            result.total_bytes += metadata.len();
            result.file_count += 1;
        }

        result.jobs.push(FileJob {
            source_path: entry.path().to_path_buf(),
            relative_path,
            metadata,
            is_dir: file_type.is_dir(),
        });
    }

    debug!(
        root = %root.display(),
        files = result.file_count,
        bytes = result.total_bytes,
        entries = result.jobs.len(),
        "scan complete"
    );
    Ok(result)
}
