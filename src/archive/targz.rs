use super::EntrySink;
use crate::common::{EntryInfo, FileJob};
use crate::compress::EffortTier;
use crate::error::{ArchiverError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tar::{Builder, EntryType, Header};

const DEFAULT_DIR_MODE: u32 = 0o755;
const DEFAULT_FILE_MODE: u32 = 0o644;

/// Tar stream wrapped in a single gzip member at the archive's effort tier.
pub struct TarGzSink {
    builder: Builder<GzEncoder<BufWriter<File>>>,
    path: PathBuf,
}

impl TarGzSink {
    pub fn create(path: &Path, tier: EffortTier) -> Result<Self> {
        let file = File::create(path).map_err(|e| ArchiverError::io(e, path))?;
        let encoder = GzEncoder::new(BufWriter::new(file), Compression::new(tier.level()));
        Ok(Self { builder: Builder::new(encoder), path: path.to_path_buf() })
    }

    fn header(job: &FileJob, kind: EntryType, size: u64, default_mode: u32) -> Header {
        let mut header = Header::new_gnu();
        header.set_entry_type(kind);
        header.set_size(size);
        header.set_mode(job.permissions().unwrap_or(default_mode));
        header.set_mtime(job.modified_secs());
        header
    }
}

impl EntrySink for TarGzSink {
    fn add_directory(&mut self, job: &FileJob) -> Result<()> {
        let mut header = Self::header(job, EntryType::Directory, 0, DEFAULT_DIR_MODE);
        self.builder
            .append_data(&mut header, job.entry_name(), io::empty())
            .map_err(|e| ArchiverError::io(e, &self.path))
    }

    fn add_file(&mut self, job: &FileJob, data: &[u8]) -> Result<()> {
        let mut header = Self::header(job, EntryType::Regular, data.len() as u64, DEFAULT_FILE_MODE);
        self.builder
            .append_data(&mut header, job.entry_name(), data)
            .map_err(|e| ArchiverError::io(e, &self.path))
    }

    fn finish(self) -> Result<()> {
        let path = self.path;
        let encoder = self.builder.into_inner().map_err(|e| ArchiverError::io(e, &path))?;
        let mut inner = encoder.finish().map_err(|e| ArchiverError::io(e, &path))?;
        inner.flush().map_err(|e| ArchiverError::io(e, &path))?;
        let file = inner
            .into_inner()
            .map_err(|e| ArchiverError::io(e.into_error(), &path))?;
        file.sync_all().map_err(|e| ArchiverError::io(e, &path))?;
        Ok(())
    }
}

/// Opens a tar.gz archive for sequential reading.
pub(crate) fn open(path: &Path) -> Result<tar::Archive<GzDecoder<BufReader<File>>>> {
    let file = File::open(path).map_err(|e| ArchiverError::io(e, path))?;
    Ok(tar::Archive::new(GzDecoder::new(BufReader::new(file))))
}

pub(super) fn list(path: &Path) -> Result<Vec<EntryInfo>> {
    let mut archive = open(path)?;
    let mut entries = Vec::new();
    for entry in archive.entries().map_err(|e| ArchiverError::io(e, path))? {
        let entry = entry.map_err(|e| ArchiverError::io(e, path))?;
        let header = entry.header();
        entries.push(EntryInfo {
            name: String::from_utf8_lossy(&entry.path_bytes()).into_owned(),
            size: header.size().map_err(|e| ArchiverError::io(e, path))?,
            is_dir: header.entry_type().is_dir(),
        });
    }
    Ok(entries)
}
