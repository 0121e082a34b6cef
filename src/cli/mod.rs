use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::archive::ArchiveFormat;

#[derive(Parser, Debug)]
#[command(name = "pz", author, version, about = "Parallel zip and tar.gz archiver", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Archive a directory.
    #[command(alias = "c")]
    Create {
        /// Directory to archive.
        #[arg(required = true)]
        source: PathBuf,

        /// Output archive. Defaults to `<dir>.zip` or `<dir>.tar.gz` next to the
        /// source, with `-2`, `-3`, ... appended if that name is taken.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Container format.
        #[arg(short, long, value_enum, default_value_t = FormatArg::Zip)]
        format: FormatArg,

        /// Number of I/O worker threads. [default: PZ_WORKERS or cpus/5]
        #[arg(long)]
        workers: Option<usize>,

        /// Skip hidden files, VCS/build/cache directories and temp files.
        #[arg(long)]
        exclude_junk: bool,

        /// Print the resulting statistics as JSON on stdout.
        #[arg(long)]
        json: bool,

        /// Show a progress bar on stderr.
        #[arg(long)]
        progress: bool,
    },

    /// Extract an archive. The format is detected from the file contents.
    #[command(alias = "x")]
    Extract {
        /// The archive file to extract.
        #[arg(required = true)]
        archive: PathBuf,

        /// The directory where files will be extracted. Defaults to the current directory.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of I/O worker threads. [default: PZ_WORKERS or cpus/5]
        #[arg(long)]
        workers: Option<usize>,

        /// Print the resulting statistics as JSON on stdout.
        #[arg(long)]
        json: bool,

        /// Show a progress bar on stderr.
        #[arg(long)]
        progress: bool,
    },

    /// Check an archive against its stored SHA-256 digest.
    #[command(alias = "v")]
    Verify {
        #[arg(required = true)]
        archive: PathBuf,
    },

    /// List the contents of an archive without extracting it.
    #[command(alias = "l")]
    List {
        /// The archive file to list contents of.
        #[arg(required = true)]
        archive: PathBuf,
    },
}

/// Container format as spelled on the command line.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum FormatArg {
    /// Zip archive, digest stored in the archive comment.
    Zip,
    /// Gzip-compressed tar archive with a `.sha256` sidecar.
    #[value(alias = "tar.gz", alias = "tgz")]
    Gz,
}

impl From<FormatArg> for ArchiveFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Zip => ArchiveFormat::Zip,
            FormatArg::Gz => ArchiveFormat::TarGz,
        }
    }
}

/// Parses command-line arguments using `clap` and returns the command to execute.
pub fn run() -> Result<Commands, Box<dyn std::error::Error>> {
    let args = Args::parse();
    Ok(args.command)
}
