use super::EntrySink;
use crate::common::{EntryInfo, FileJob};
use crate::compress::{CompressionPolicy, EffortTier, StorageMethod};
use crate::error::{ArchiverError, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

/// Zip writer choosing store/deflate per entry from the policy.
pub struct ZipSink<'p> {
    writer: ZipWriter<BufWriter<File>>,
    policy: &'p CompressionPolicy,
    tier: EffortTier,
    path: PathBuf,
}

impl<'p> ZipSink<'p> {
    pub fn create(path: &Path, policy: &'p CompressionPolicy, tier: EffortTier) -> Result<Self> {
        let file = File::create(path).map_err(|e| ArchiverError::io(e, path))?;
        Ok(Self {
            writer: ZipWriter::new(BufWriter::new(file)),
            policy,
            tier,
            path: path.to_path_buf(),
        })
    }

    fn base_options(job: &FileJob) -> FileOptions {
        let options = FileOptions::default();
        match job.permissions() {
            Some(mode) => options.unix_permissions(mode),
            None => options,
        }
    }
}

impl EntrySink for ZipSink<'_> {
    fn add_directory(&mut self, job: &FileJob) -> Result<()> {
        let options = Self::base_options(job).compression_method(zip::CompressionMethod::Stored);
        self.writer.add_directory(job.entry_name(), options)?;
        Ok(())
    }

    fn add_file(&mut self, job: &FileJob, data: &[u8]) -> Result<()> {
        let method = self.policy.select_method(&job.relative_path);
        let mut options = Self::base_options(job)
            .compression_method(method.to_zip())
            .large_file(data.len() as u64 >= u32::MAX as u64);
        if method == StorageMethod::Deflate {
            options = options.compression_level(Some(self.tier.level() as i32));
        }
        self.writer.start_file(job.entry_name(), options)?;
        self.writer
            .write_all(data)
            .map_err(|e| ArchiverError::io(e, &self.path))?;
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        let mut inner = self.writer.finish()?;
        inner.flush().map_err(|e| ArchiverError::io(e, &self.path))?;
        let file = inner
            .into_inner()
            .map_err(|e| ArchiverError::io(e.into_error(), &self.path))?;
        file.sync_all().map_err(|e| ArchiverError::io(e, &self.path))?;
        Ok(())
    }
}

pub(super) fn list(path: &Path) -> Result<Vec<EntryInfo>> {
    let file = File::open(path).map_err(|e| ArchiverError::io(e, path))?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        entries.push(EntryInfo {
            name: entry.name().to_string(),
            size: entry.size(),
            is_dir: entry.is_dir(),
        });
    }
    Ok(entries)
}
