//! Command dispatch for the `pz` binary.
//!
//! Kept in the library so integration tests and the binary share one
//! implementation.

use crate::archive::{list_archive, ArchiveFormat};
use crate::checksum::verify_archive;
use crate::cli::{self, Commands};
use crate::config::ArchiveOptions;
use crate::extract::extract_archive;
use crate::progress::{ProgressCallback, ProgressState};
use crate::workers::create_archive;

use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// JSON document printed by `create --json`.
#[derive(Serialize)]
struct CreateReport<'a> {
    archive: &'a Path,
    #[serde(flatten)]
    stats: &'a crate::common::ArchiveStats,
}

/// Parses the command line and runs it. Returns the process exit code for
/// outcomes that are not errors, such as a digest mismatch.
pub fn run_cli_app() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let command = cli::run()?;

    match command {
        Commands::Create { source, output, format, workers, exclude_junk, json, progress } => {
            let format = ArchiveFormat::from(format);
            let output = match output {
                Some(path) => path,
                None => auto_archive_path(&source, format)?,
            };
            let options = options_with_workers(workers).exclude_junk(exclude_junk);
            let progress_cb = progress.then(|| cli_progress_callback("create"));

            let stats = create_archive(&source, &output, format, &options, progress_cb)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&CreateReport { archive: &output, stats: &stats })?);
            } else {
                println!(
                    "{}: {} files, {} bytes, sha256 {}",
                    output.display(),
                    stats.file_count,
                    stats.total_bytes,
                    stats.checksum
                );
            }
        }
        Commands::Extract { archive, output, workers, json, progress } => {
            let dest = match output {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            let progress_cb = progress.then(|| cli_progress_callback("extract"));

            let stats = extract_archive(&archive, &dest, &options_with_workers(workers), progress_cb)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{}: {} files, {} bytes", dest.display(), stats.file_count, stats.total_bytes);
            }
        }
        Commands::Verify { archive } => {
            let (matches, digest) = verify_archive(&archive)?;
            if matches {
                println!("OK {digest}");
            } else {
                println!("MISMATCH {digest}");
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::List { archive } => {
            for entry in list_archive(&archive)? {
                if entry.is_dir {
                    println!("{:>12}  {}", "-", entry.name);
                } else {
                    println!("{:>12}  {}", entry.size, entry.name);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn options_with_workers(workers: Option<usize>) -> ArchiveOptions {
    match workers {
        Some(n) => ArchiveOptions::default().with_workers(n),
        None => ArchiveOptions::default(),
    }
}

/// Picks `<dir>.<ext>` beside `source`, then `<dir>-2.<ext>`, `<dir>-3.<ext>`, ...
/// until a free name is found.
pub fn auto_archive_path(source: &Path, format: ArchiveFormat) -> io::Result<PathBuf> {
    let source = source.canonicalize()?;
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    let parent = source.parent().unwrap_or(&source);
    let ext = format.extension();

    let mut candidate = parent.join(format!("{name}.{ext}"));
    let mut n = 2;
    while candidate.exists() {
        candidate = parent.join(format!("{name}-{n}.{ext}"));
        n += 1;
    }
    Ok(candidate)
}

// --- utils for CLI progress -------------------------------------------------

fn format_eta(seconds: f64) -> String {
    if seconds > 60.0 {
        format!("{:.1}m", seconds / 60.0)
    } else {
        format!("{:.1}s", seconds)
    }
}

fn cli_progress_callback(operation: &str) -> Box<ProgressCallback> {
    let operation = operation.to_uppercase();
    let start_time = Instant::now();
    let last_update = Mutex::new(None::<Instant>);
    let prev_len = Mutex::new(0usize);
    let done = AtomicBool::new(false);

    Box::new(move |state: ProgressState| {
        if done.load(Ordering::Relaxed) {
            return;
        }
        let complete = state.bytes_done >= state.total_bytes;
        let now = Instant::now();
        // Redraw at most every 100ms, but always draw completion.
        {
            let mut last = last_update.lock().unwrap_or_else(|p| p.into_inner());
            if !complete && last.is_some_and(|t| now.duration_since(t).as_millis() < 100) {
                return;
            }
            *last = Some(now);
        }

        let term_width = term_size::dimensions().map(|(w, _)| w).unwrap_or(80);
        let fraction = state.fraction();
        let elapsed = start_time.elapsed().as_secs_f64();
        let mbps = if elapsed > 0.0 { state.bytes_done as f64 / 1_048_576.0 / elapsed } else { 0.0 };
        let eta = if fraction > 0.0 && !complete {
            format_eta(elapsed * (1.0 - fraction) / fraction)
        } else {
            "--".to_string()
        };
        let current = state.current_file.as_deref().unwrap_or("");

        let build_line = |bar_width: usize| {
            let filled = (fraction * bar_width as f64) as usize;
            format!(
                "[{}] [{}{}] {:.1}% | {:.1}/{:.1} MB | {:.1} MB/s | ETA: {} | {}",
                operation,
                "█".repeat(filled),
                "░".repeat(bar_width - filled),
                fraction * 100.0,
                state.bytes_done as f64 / 1_048_576.0,
                state.total_bytes as f64 / 1_048_576.0,
                mbps,
                eta,
                current
            )
        };

        // Shrink the bar until the line fits the terminal.
        let mut bar_width = 40;
        let mut line = build_line(bar_width);
        while line.chars().count() > term_width && bar_width > 10 {
            bar_width -= 4;
            line = build_line(bar_width);
        }
        let line: String = line.chars().take(term_width).collect();

        let mut padded = line;
        {
            let mut prev = prev_len.lock().unwrap_or_else(|p| p.into_inner());
            let len = padded.chars().count();
            if *prev > len {
                padded.push_str(&" ".repeat(*prev - len));
            }
            *prev = len;
        }
        let mut stderr = io::stderr();
        let _ = write!(stderr, "\r{padded}");
        if complete {
            let _ = writeln!(stderr);
            done.store(true, Ordering::Relaxed);
        }
        let _ = stderr.flush();
    })
}
