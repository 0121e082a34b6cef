//! Worker pool that writes extracted files to disk.
//!
//! The archive reader runs on the calling thread and produces [`ExtractJob`]s;
//! pool threads create the destination files. Any failure is fatal: the first
//! error recorded wins, later jobs are drained without being written, and the
//! reader stops dispatching as soon as it notices.

use crate::error::{ArchiverError, Result};
use crate::fsx as fs;
use crate::progress::ProgressTracker;
use crate::workers::join_workers;

use crossbeam_channel::{bounded, Receiver, Sender};
use fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;
use tracing::debug;
use zip::ZipArchive;

/// Where a job's bytes come from.
#[derive(Debug)]
pub(crate) enum Payload {
    /// Entry index in the zip archive; the worker inflates it from its own handle.
    ZipIndex(usize),
    /// Bytes already decoded by the sequential reader.
    Bytes(Vec<u8>),
}

/// One regular file to write.
#[derive(Debug)]
pub(crate) struct ExtractJob {
    /// Entry name as stored in the archive, used for progress and errors.
    pub name: String,
    /// Destination, already validated by the path guard.
    pub dest: PathBuf,
    pub payload: Payload,
    pub mode: Option<u32>,
}

/// First fatal error observed by any participant.
#[derive(Default)]
pub(crate) struct FirstError {
    failed: AtomicBool,
    error: Mutex<Option<ArchiverError>>,
}

impl FirstError {
    pub fn record(&self, err: ArchiverError) {
        let mut slot = self.error.lock().unwrap_or_else(|p| p.into_inner());
        if slot.is_none() {
            debug!(error = %err, "extraction failed");
            *slot = Some(err);
            self.failed.store(true, Ordering::SeqCst);
        }
    }

    pub fn is_set(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    fn take(self) -> Option<ArchiverError> {
        self.error.into_inner().unwrap_or_else(|p| p.into_inner())
    }
}

type ZipHandle = ZipArchive<BufReader<File>>;

fn open_zip(path: &Path) -> Result<ZipHandle> {
    let file = File::open(path).map_err(|e| ArchiverError::io(e, path))?;
    Ok(ZipArchive::new(BufReader::new(file))?)
}

fn write_entry(job: &ExtractJob, zip: Option<&mut ZipHandle>) -> Result<u64> {
    let io_err = |e| ArchiverError::io(e, &job.dest);
    if let Some(parent) = job.dest.parent() {
        fs::create_dir_all(parent).map_err(|e| ArchiverError::io(e, parent))?;
    }

    let mut out = BufWriter::new(File::create(&job.dest).map_err(io_err)?);
    let written = match (&job.payload, zip) {
        (Payload::Bytes(bytes), _) => {
            out.write_all(bytes).map_err(io_err)?;
            bytes.len() as u64
        }
        (Payload::ZipIndex(index), Some(archive)) => {
            let mut entry = archive.by_index(*index)?;
            io::copy(&mut entry, &mut out).map_err(io_err)?
        }
        (Payload::ZipIndex(_), None) => {
            return Err(io_err(io::Error::other("zip entry dispatched without an archive handle")))
        }
    };
    out.flush().map_err(io_err)?;
    drop(out);

    if let Some(mode) = job.mode {
        fs::set_unix_permissions(&job.dest, mode).map_err(io_err)?;
    }
    Ok(written)
}

fn write_worker(
    id: usize,
    jobs: Receiver<ExtractJob>,
    zip_path: Option<&Path>,
    tracker: &ProgressTracker,
    failure: &FirstError,
) {
    // Each worker inflates from its own archive handle.
    let mut zip = match zip_path.map(open_zip).transpose() {
        Ok(zip) => zip,
        Err(e) => {
            failure.record(e);
            None
        }
    };
    for job in jobs {
        if failure.is_set() {
            continue;
        }
        match write_entry(&job, zip.as_mut()) {
            Ok(written) => tracker.record_file(written, &job.name),
            Err(e) => {
                debug!(worker = id, entry = %job.name, "write failed");
                failure.record(e);
            }
        }
    }
}

/// Runs `produce` on the calling thread while `workers` threads write the
/// jobs it sends.
///
/// `capacity` bounds the job queue. `produce` should stop once
/// [`FirstError::is_set`] reports a failure or a send fails (all workers gone).
/// Returns the first error from either side.
pub(crate) fn run<P>(
    workers: usize,
    capacity: usize,
    zip_path: Option<&Path>,
    tracker: &ProgressTracker,
    produce: P,
) -> Result<()>
where
    P: FnOnce(&Sender<ExtractJob>, &FirstError) -> Result<()>,
{
    let failure = FirstError::default();
    let (job_sender, job_receiver) = bounded::<ExtractJob>(capacity.max(1));

    let joined = thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let jobs = job_receiver.clone();
                let failure = &failure;
                s.spawn(move || write_worker(id, jobs, zip_path, tracker, failure))
            })
            .collect();
        // Only workers hold receivers, so sends fail if every worker has exited.
        drop(job_receiver);

        if let Err(e) = produce(&job_sender, &failure) {
            failure.record(e);
        }
        drop(job_sender);
        join_workers(handles)
    });

    match failure.take() {
        Some(e) => Err(e),
        None => joined,
    }
}
