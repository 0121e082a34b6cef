//! # Extraction
//!
//! Extraction runs in three phases:
//!
//! 1. **Plan.** Every entry is read from the archive metadata. Each name goes
//!    through the path guard, and the totals are computed. An unsafe name aborts
//!    here, before anything is written.
//! 2. **Directories.** The destination root and every directory entry are
//!    created up front.
//! 3. **Files.** Regular files are handed to the writer pool. For zip each
//!    worker inflates entries from its own archive handle. tar.gz is a single
//!    compressed stream, so the calling thread decodes entries in order and the
//!    pool only writes them.
//!
//! Directory permission bits are applied last so read-only directories do not
//! block the files inside them. Symlinks, hard links and device entries found
//! in tar archives are not materialized.

mod guard;
mod writer_pool;

pub use guard::{resolve_entry_path, sanitize_entry_name};

use crate::archive::{targz, ArchiveFormat};
use crate::common::ExtractStats;
use crate::config::ArchiveOptions;
use crate::error::{ArchiverError, Result};
use crate::fsx as fs;
use crate::progress::{ProgressCallback, ProgressTracker};
use writer_pool::{ExtractJob, Payload};

use fs::File;
use std::collections::HashMap;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::ZipArchive;

/// A regular file scheduled for extraction.
#[derive(Debug)]
struct PlannedFile {
    /// Position of the entry in the archive.
    index: usize,
    name: String,
    dest: PathBuf,
    size: u64,
    mode: Option<u32>,
    /// A later entry resolves to the same destination.
    superseded: bool,
}

/// Everything known about an archive before the first write.
#[derive(Debug, Default)]
struct Plan {
    directories: Vec<(PathBuf, Option<u32>)>,
    files: Vec<PlannedFile>,
    /// Destination -> position in `files` of the entry that currently owns it.
    owners: HashMap<PathBuf, usize>,
    stats: ExtractStats,
}

impl Plan {
    fn add_directory(&mut self, root: &Path, name: &str, mode: Option<u32>) -> Result<()> {
        let relative = sanitize_entry_name(name)?;
        // `./` and friends name the destination root itself.
        if !relative.as_os_str().is_empty() {
            self.directories.push((root.join(relative), mode));
        }
        Ok(())
    }

    /// Plans a regular file. When several entries resolve to the same
    /// destination the last one wins, so no two workers ever write one path.
    fn add_file(&mut self, root: &Path, index: usize, name: String, size: u64, mode: Option<u32>) -> Result<()> {
        let dest = resolve_entry_path(root, &name)?;
        if let Some(previous) = self.owners.insert(dest.clone(), self.files.len()) {
            let old = &mut self.files[previous];
            debug!(entry = %name, replaces = %old.name, "duplicate destination");
            old.superseded = true;
            self.stats.total_bytes -= old.size;
            self.stats.file_count -= 1;
        }
        self.stats.total_bytes += size;
        self.stats.file_count += 1;
        self.files.push(PlannedFile { index, name, dest, size, mode, superseded: false });
        Ok(())
    }

    /// Files to dispatch, in archive order.
    fn into_parts(self) -> (Vec<(PathBuf, Option<u32>)>, Vec<PlannedFile>, ExtractStats) {
        let files = self.files.into_iter().filter(|f| !f.superseded).collect();
        (self.directories, files, self.stats)
    }
}

fn open_zip(path: &Path) -> Result<ZipArchive<BufReader<File>>> {
    let file = File::open(path).map_err(|e| ArchiverError::io(e, path))?;
    Ok(ZipArchive::new(BufReader::new(file))?)
}

fn plan_zip(archive_path: &Path, root: &Path) -> Result<Plan> {
    let mut archive = open_zip(archive_path)?;
    let mut plan = Plan::default();
    for index in 0..archive.len() {
        // Raw access reads the local header only; nothing is inflated.
        let entry = archive.by_index_raw(index)?;
        let mode = entry.unix_mode().map(|m| m & 0o7777);
        if entry.is_dir() {
            plan.add_directory(root, entry.name(), mode)?;
        } else {
            plan.add_file(root, index, entry.name().to_string(), entry.size(), mode)?;
        }
    }
    Ok(plan)
}

fn plan_tar_gz(archive_path: &Path, root: &Path) -> Result<Plan> {
    let io_err = |e| ArchiverError::io(e, archive_path);
    let mut archive = targz::open(archive_path)?;
    let mut plan = Plan::default();
    for (index, entry) in archive.entries().map_err(io_err)?.enumerate() {
        let entry = entry.map_err(io_err)?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let header = entry.header();
        let kind = header.entry_type();
        let mode = header.mode().ok().map(|m| m & 0o7777);

        if kind.is_dir() {
            plan.add_directory(root, &name, mode)?;
        } else if kind.is_file() {
            plan.add_file(root, index, name, entry.size(), mode)?;
        } else {
            // Still rejected when unsafe, even though it is never written.
            sanitize_entry_name(&name)?;
            warn!(entry = %name, ?kind, "skipping unsupported tar entry");
        }
    }
    Ok(plan)
}

fn dispatch_zip(
    archive_path: &Path,
    files: Vec<PlannedFile>,
    workers: usize,
    tracker: &ProgressTracker,
) -> Result<()> {
    // The queue holds every job, so dispatch never waits on the pool.
    let capacity = files.len();
    writer_pool::run(workers, capacity, Some(archive_path), tracker, |jobs, failure| {
        for file in files {
            if failure.is_set() {
                break;
            }
            let job = ExtractJob {
                name: file.name,
                dest: file.dest,
                payload: Payload::ZipIndex(file.index),
                mode: file.mode,
            };
            if jobs.send(job).is_err() {
                break;
            }
        }
        Ok(())
    })
}

fn dispatch_tar_gz(
    archive_path: &Path,
    files: Vec<PlannedFile>,
    workers: usize,
    tracker: &ProgressTracker,
) -> Result<()> {
    let io_err = |e| ArchiverError::io(e, archive_path);
    // At most `workers` decoded payloads wait in memory at once.
    writer_pool::run(workers, workers, None, tracker, |jobs, failure| {
        let mut archive = targz::open(archive_path)?;
        let mut planned = files.into_iter().peekable();
        for (index, entry) in archive.entries().map_err(io_err)?.enumerate() {
            if failure.is_set() {
                break;
            }
            let mut entry = entry.map_err(io_err)?;
            let Some(next) = planned.peek() else { break };
            if next.index != index {
                continue;
            }
            let Some(file) = planned.next() else { break };

            let mut data = Vec::new();
            entry.read_to_end(&mut data).map_err(io_err)?;
            let job = ExtractJob {
                name: file.name,
                dest: file.dest,
                payload: Payload::Bytes(data),
                mode: file.mode,
            };
            if jobs.send(job).is_err() {
                break;
            }
        }
        Ok(())
    })
}

/// Applies recorded directory modes, deepest directories first.
fn apply_directory_modes(directories: &mut [(PathBuf, Option<u32>)]) -> Result<()> {
    directories.sort_by_key(|(path, _)| std::cmp::Reverse(path.components().count()));
    for (path, mode) in directories.iter() {
        if let Some(mode) = mode {
            fs::set_unix_permissions(path, *mode).map_err(|e| ArchiverError::io(e, path))?;
        }
    }
    Ok(())
}

/// Extracts `archive_path` into `dest_dir`, creating it if needed.
///
/// The format is detected from the file's leading bytes. Every entry name is
/// validated before any file or directory is created; an entry that would land
/// outside `dest_dir` fails the whole call with [`ArchiverError::UnsafePath`].
/// Existing files are overwritten. The returned totals come from archive
/// metadata and are known before the first byte is written.
///
/// On a write or decode error the pool stops taking new work and the first
/// error is returned; files already written are left in place.
pub fn extract_archive(
    archive_path: &Path,
    dest_dir: &Path,
    options: &ArchiveOptions,
    progress: Option<Box<ProgressCallback>>,
) -> Result<ExtractStats> {
    let format = ArchiveFormat::detect(archive_path)?;
    let plan = match format {
        ArchiveFormat::Zip => plan_zip(archive_path, dest_dir)?,
        ArchiveFormat::TarGz => plan_tar_gz(archive_path, dest_dir)?,
    };
    let (mut directories, files, stats) = plan.into_parts();
    let workers = options.resolved_workers();
    debug!(?format, workers, files = stats.file_count, bytes = stats.total_bytes, "starting extraction");

    let tracker = ProgressTracker::new(stats.total_bytes, progress);
    tracker.emit();

    fs::create_dir_all(dest_dir).map_err(|e| ArchiverError::io(e, dest_dir))?;
    for (dir, _) in &directories {
        fs::create_dir_all(dir).map_err(|e| ArchiverError::io(e, dir))?;
    }

    match format {
        ArchiveFormat::Zip => dispatch_zip(archive_path, files, workers, &tracker)?,
        ArchiveFormat::TarGz => dispatch_tar_gz(archive_path, files, workers, &tracker)?,
    }

    apply_directory_modes(&mut directories)?;
    tracker.finish();
    info!(archive = %archive_path.display(), dest = %dest_dir.display(), files = stats.file_count, bytes = stats.total_bytes, "archive extracted");
    Ok(stats)
}
