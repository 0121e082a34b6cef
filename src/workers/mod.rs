//! Parallel archive creation.
//!
//! A fixed pool of reader threads loads source files concurrently while the
//! calling thread acts as the single writer:
//!
//! ```text
//! scan ─► job queue ─► [reader × N] ─► bounded result channel ─► writer ─► sink
//! ```
//!
//! The job queue is sized to hold every job, so filling it never blocks. The
//! result channel holds at most N completed reads, which throttles readers when
//! the writer falls behind. Entries are appended in completion order, so two
//! runs over the same tree can produce different bytes (and digests) while the
//! extracted content stays identical.

use crate::archive::{ArchiveFormat, EntrySink, TarGzSink, ZipSink};
use crate::checksum;
use crate::common::{ArchiveStats, FileData, FileJob};
use crate::config::ArchiveOptions;
use crate::error::{ArchiverError, Result};
use crate::progress::{ProgressCallback, ProgressTracker};
use crate::scan::scan_directory;

use crossbeam_channel::{bounded, Receiver, Sender};
use std::fs;
use std::path::Path;
use std::thread::{self, ScopedJoinHandle};
use tracing::{debug, info, warn};

/// Totals of what actually reached the archive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Written {
    files: usize,
    bytes: u64,
}

/// Joins every pool thread, mapping any panic to [`ArchiverError::WorkerPanicked`].
pub(crate) fn join_workers(handles: Vec<ScopedJoinHandle<'_, ()>>) -> Result<()> {
    let mut panicked = false;
    for handle in handles {
        panicked |= handle.join().is_err();
    }
    if panicked {
        Err(ArchiverError::WorkerPanicked)
    } else {
        Ok(())
    }
}

/// Reader thread body: loads each job's bytes and hands them to the writer.
/// Unreadable files are logged and skipped.
fn read_worker(id: usize, jobs: Receiver<FileJob>, results: Sender<FileData>) {
    for job in jobs {
        let data = if job.is_dir {
            Vec::new()
        } else {
            match fs::read(&job.source_path) {
                Ok(data) => data,
                Err(e) => {
                    warn!(worker = id, path = %job.source_path.display(), error = %e, "skipping unreadable file");
                    continue;
                }
            }
        };
        if results.send(FileData { job, data }).is_err() {
            // Writer stopped; nothing left to do.
            break;
        }
    }
}

/// Writer loop: the only code that touches the sink.
fn drain_results<S: EntrySink>(
    results: Receiver<FileData>,
    mut sink: S,
    tracker: &ProgressTracker,
) -> Result<Written> {
    let mut written = Written::default();
    for FileData { job, data } in results {
        if job.is_dir {
            sink.add_directory(&job)?;
            continue;
        }
        sink.add_file(&job, &data)?;
        written.files += 1;
        written.bytes += data.len() as u64;
        // Progress total was fixed at scan time; a file that grew since then
        // must not push `bytes_done` past it.
        let progressed = (data.len() as u64).min(job.metadata.len());
        tracker.record_file(progressed, &job.entry_name());
    }
    sink.finish()?;
    Ok(written)
}

fn write_parallel<S: EntrySink>(
    jobs: Vec<FileJob>,
    workers: usize,
    sink: S,
    tracker: &ProgressTracker,
) -> Result<Written> {
    let (job_sender, job_receiver) = bounded::<FileJob>(jobs.len().max(1));
    for job in jobs {
        // Capacity covers every job and the receiver is alive, so this cannot fail.
        let _ = job_sender.send(job);
    }
    drop(job_sender);

    let (result_sender, result_receiver) = bounded::<FileData>(workers);

    thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let jobs = job_receiver.clone();
                let results = result_sender.clone();
                s.spawn(move || read_worker(id, jobs, results))
            })
            .collect();
        drop(result_sender);

        // Dropping the receiver on error unblocks readers waiting to send.
        let outcome = drain_results(result_receiver, sink, tracker);
        let joined = join_workers(handles);
        let written = outcome?;
        joined?;
        Ok(written)
    })
}

/// Archives the contents of `source` into `archive_path`.
///
/// The tree is scanned first (any traversal error aborts before the archive is
/// created), the effort tier is chosen from the total payload, files are read
/// by the worker pool and appended by this thread, and once the archive is
/// closed its digest is computed and persisted (zip comment or `.sha256`
/// sidecar). Files that cannot be read are skipped and left out of the
/// returned totals. A partially written archive is left in place on error.
pub fn create_archive(
    source: &Path,
    archive_path: &Path,
    format: ArchiveFormat,
    options: &ArchiveOptions,
    progress: Option<Box<ProgressCallback>>,
) -> Result<ArchiveStats> {
    let scan = scan_directory(source, options.exclude_junk)?;
    let tier = options.policy.select_effort(scan.total_bytes);
    let workers = options.resolved_workers();
    debug!(?format, ?tier, workers, files = scan.file_count, bytes = scan.total_bytes, "starting archive creation");

    let tracker = ProgressTracker::new(scan.total_bytes, progress);
    tracker.emit();

    let written = match format {
        ArchiveFormat::Zip => {
            let sink = ZipSink::create(archive_path, &options.policy, tier)?;
            write_parallel(scan.jobs, workers, sink, &tracker)?
        }
        ArchiveFormat::TarGz => {
            let sink = TarGzSink::create(archive_path, tier)?;
            write_parallel(scan.jobs, workers, sink, &tracker)?
        }
    };
    tracker.finish();

    let checksum = match format {
        ArchiveFormat::Zip => checksum::seal_zip(archive_path)?,
        ArchiveFormat::TarGz => checksum::write_sidecar(archive_path)?,
    };

    if written.files < scan.file_count {
        warn!(skipped = scan.file_count - written.files, "some files could not be read and were skipped");
    }
    info!(archive = %archive_path.display(), files = written.files, bytes = written.bytes, "archive created");

    Ok(ArchiveStats { total_bytes: written.bytes, file_count: written.files, checksum })
}

/// [`create_archive`] producing a zip archive.
pub fn create_zip(
    source: &Path,
    archive_path: &Path,
    options: &ArchiveOptions,
    progress: Option<Box<ProgressCallback>>,
) -> Result<ArchiveStats> {
    create_archive(source, archive_path, ArchiveFormat::Zip, options, progress)
}

/// [`create_archive`] producing a gzip-compressed tar archive.
pub fn create_tar_gz(
    source: &Path,
    archive_path: &Path,
    options: &ArchiveOptions,
    progress: Option<Box<ProgressCallback>>,
) -> Result<ArchiveStats> {
    create_archive(source, archive_path, ArchiveFormat::TarGz, options, progress)
}
