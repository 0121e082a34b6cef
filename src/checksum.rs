//! Archive integrity digests.
//!
//! Digests are SHA-256, hex encoded, and are computed only after the archive
//! stream has been flushed and closed.
//!
//! - **zip**: the digest covers every byte up to (not including) the
//!   end-of-central-directory comment length and comment. It is stored in the
//!   comment as `SHA256: <hex>`, so writing it leaves the covered bytes intact.
//! - **tar.gz**: the digest covers the whole file and is stored next to it in
//!   `<archive>.sha256` as `<hex> *<archive-file-name>\n`.

use crate::archive::ArchiveFormat;
use crate::error::{ArchiverError, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Tag placed in front of the hex digest in the zip comment.
pub const ZIP_COMMENT_PREFIX: &str = "SHA256: ";

/// Extension appended to a tar.gz archive's file name for its sidecar.
pub const SIDECAR_EXTENSION: &str = "sha256";

const EOCD_SIGNATURE: [u8; 4] = *b"PK\x05\x06";
const EOCD_LEN: u64 = 22;
/// Offset of the comment length field inside the end record.
const EOCD_COMMENT_LEN_OFFSET: u64 = 20;
const MAX_COMMENT_LEN: u64 = u16::MAX as u64;

/// Position of a zip end-of-central-directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EndRecord {
    offset: u64,
    comment_len: u16,
}

impl EndRecord {
    /// Length of the digest-covered prefix.
    fn covered_len(self) -> u64 {
        self.offset + EOCD_COMMENT_LEN_OFFSET
    }
}

/// SHA-256 of an entire file.
pub fn file_digest(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| ArchiverError::io(e, path))?;
    let len = file.metadata().map_err(|e| ArchiverError::io(e, path))?.len();
    digest_prefix(&mut file, len).map_err(|e| ArchiverError::io(e, path))
}

fn digest_prefix<R: Read>(reader: &mut R, len: u64) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut limited = reader.take(len);
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = limited.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Finds the end record by scanning backwards from the end of the file.
/// A candidate is accepted only if its comment runs exactly to end of file.
fn locate_end_record(file: &mut File) -> io::Result<Option<EndRecord>> {
    let len = file.metadata()?.len();
    if len < EOCD_LEN {
        return Ok(None);
    }
    let tail_len = len.min(EOCD_LEN + MAX_COMMENT_LEN);
    let tail_start = len - tail_len;
    file.seek(SeekFrom::Start(tail_start))?;
    let mut tail = vec![0u8; tail_len as usize];
    file.read_exact(&mut tail)?;

    let last_candidate = tail.len() - EOCD_LEN as usize;
    for i in (0..=last_candidate).rev() {
        if tail[i..i + 4] != EOCD_SIGNATURE {
            continue;
        }
        let at = i + EOCD_COMMENT_LEN_OFFSET as usize;
        let comment_len = u16::from_le_bytes([tail[at], tail[at + 1]]);
        if i + EOCD_LEN as usize + comment_len as usize == tail.len() {
            return Ok(Some(EndRecord { offset: tail_start + i as u64, comment_len }));
        }
    }
    Ok(None)
}

fn read_comment(file: &mut File, record: EndRecord) -> io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(record.offset + EOCD_LEN))?;
    let mut comment = vec![0u8; record.comment_len as usize];
    file.read_exact(&mut comment)?;
    Ok(comment)
}

fn not_a_zip(path: &Path) -> ArchiverError {
    debug!(path = %path.display(), "zip end record not found");
    ArchiverError::Zip(zip::result::ZipError::InvalidArchive(
        "could not find end of central directory",
    ))
}

/// Digests a closed zip archive and writes `SHA256: <hex>` into its comment.
///
/// Any existing comment is replaced. Returns the digest.
pub fn seal_zip(path: &Path) -> Result<String> {
    let io_err = |e| ArchiverError::io(e, path);
    let mut file = OpenOptions::new().read(true).write(true).open(path).map_err(io_err)?;
    let record = locate_end_record(&mut file).map_err(io_err)?.ok_or_else(|| not_a_zip(path))?;

    file.seek(SeekFrom::Start(0)).map_err(io_err)?;
    let digest = digest_prefix(&mut file, record.covered_len()).map_err(io_err)?;

    let comment = format!("{ZIP_COMMENT_PREFIX}{digest}");
    file.seek(SeekFrom::Start(record.covered_len())).map_err(io_err)?;
    file.write_all(&(comment.len() as u16).to_le_bytes()).map_err(io_err)?;
    file.write_all(comment.as_bytes()).map_err(io_err)?;
    file.set_len(record.offset + EOCD_LEN + comment.len() as u64).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;

    debug!(path = %path.display(), %digest, "zip comment digest written");
    Ok(digest)
}

/// `<archive>.sha256` next to the archive.
pub fn sidecar_path(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_os_string();
    name.push(".");
    name.push(SIDECAR_EXTENSION);
    PathBuf::from(name)
}

/// Digests a closed tar.gz archive and writes its sidecar. Returns the digest.
pub fn write_sidecar(archive: &Path) -> Result<String> {
    let digest = file_digest(archive)?;
    let base = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sidecar = sidecar_path(archive);
    fs::write(&sidecar, format!("{digest} *{base}\n")).map_err(|e| ArchiverError::io(e, &sidecar))?;
    debug!(sidecar = %sidecar.display(), %digest, "sidecar digest written");
    Ok(digest)
}

fn verify_zip(path: &Path) -> Result<(bool, String)> {
    let io_err = |e| ArchiverError::io(e, path);
    let mut file = File::open(path).map_err(io_err)?;
    let record = locate_end_record(&mut file).map_err(io_err)?.ok_or_else(|| not_a_zip(path))?;

    let comment = read_comment(&mut file, record).map_err(io_err)?;
    let comment = String::from_utf8_lossy(&comment);
    let stored = comment
        .strip_prefix(ZIP_COMMENT_PREFIX)
        .map(|s| s.trim().to_ascii_lowercase())
        .ok_or_else(|| ArchiverError::ChecksumMissing { archive: path.to_path_buf() })?;

    file.seek(SeekFrom::Start(0)).map_err(io_err)?;
    let actual = digest_prefix(&mut file, record.covered_len()).map_err(io_err)?;
    Ok((actual == stored, stored))
}

fn verify_tar_gz(path: &Path) -> Result<(bool, String)> {
    let sidecar = sidecar_path(path);
    let record = match fs::read_to_string(&sidecar) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ArchiverError::ChecksumMissing { archive: path.to_path_buf() })
        }
        Err(e) => return Err(ArchiverError::io(e, &sidecar)),
    };
    let stored = record
        .split_whitespace()
        .next()
        .map(str::to_ascii_lowercase)
        .ok_or(ArchiverError::ChecksumFormat { path: sidecar })?;

    let actual = file_digest(path)?;
    Ok((actual == stored, stored))
}

/// Recomputes an archive's digest and compares it with the stored one.
///
/// Returns `(matches, stored_digest)`. A mismatch is not an error; a missing
/// digest is [`ArchiverError::ChecksumMissing`]. The archive is never modified.
pub fn verify_archive(path: &Path) -> Result<(bool, String)> {
    match ArchiveFormat::detect(path)? {
        ArchiveFormat::Zip => verify_zip(path),
        ArchiveFormat::TarGz => verify_tar_gz(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn small_zip(path: &Path, comment: Option<&str>) {
        let mut zw = zip::ZipWriter::new(File::create(path).unwrap());
        zw.start_file("hello.txt", zip::write::FileOptions::default()).unwrap();
        zw.write_all(b"hello world").unwrap();
        if let Some(c) = comment {
            zw.set_comment(c);
        }
        zw.finish().unwrap();
    }

    #[test]
    fn end_record_is_found_with_and_without_comment() {
        let dir = tempdir().unwrap();
        let plain = dir.path().join("plain.zip");
        small_zip(&plain, None);
        let rec = locate_end_record(&mut File::open(&plain).unwrap()).unwrap().unwrap();
        assert_eq!(rec.comment_len, 0);
        assert_eq!(rec.offset + EOCD_LEN, fs::metadata(&plain).unwrap().len());

        let commented = dir.path().join("commented.zip");
        small_zip(&commented, Some("a note"));
        let rec = locate_end_record(&mut File::open(&commented).unwrap()).unwrap().unwrap();
        assert_eq!(rec.comment_len, 6);
    }

    #[test]
    fn seal_then_verify_zip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.zip");
        small_zip(&path, None);
        let digest = seal_zip(&path).unwrap();
        assert_eq!(digest.len(), 64);

        let archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.comment(), format!("SHA256: {digest}").as_bytes());

        assert_eq!(verify_archive(&path).unwrap(), (true, digest));
    }

    #[test]
    fn resealing_replaces_the_old_comment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.zip");
        small_zip(&path, Some("an old and rather long comment"));
        let digest = seal_zip(&path).unwrap();
        assert_eq!(verify_archive(&path).unwrap(), (true, digest.clone()));
        assert_eq!(seal_zip(&path).unwrap(), digest);
    }

    #[test]
    fn zip_without_tag_is_missing_checksum() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.zip");
        small_zip(&path, Some("not a digest"));
        assert!(matches!(verify_archive(&path), Err(ArchiverError::ChecksumMissing { .. })));
    }

    #[test]
    fn sidecar_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.tar.gz");
        fs::write(&path, [0x1f, 0x8b, 1, 2, 3]).unwrap();
        let digest = write_sidecar(&path).unwrap();
        let sidecar = fs::read_to_string(dir.path().join("data.tar.gz.sha256")).unwrap();
        assert_eq!(sidecar, format!("{digest} *data.tar.gz\n"));
        assert_eq!(verify_archive(&path).unwrap(), (true, digest));
    }

    #[test]
    fn missing_and_malformed_sidecar() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.tar.gz");
        fs::write(&path, [0x1f, 0x8b, 1, 2, 3]).unwrap();
        assert!(matches!(verify_archive(&path), Err(ArchiverError::ChecksumMissing { .. })));

        fs::write(sidecar_path(&path), "   \n").unwrap();
        assert!(matches!(verify_archive(&path), Err(ArchiverError::ChecksumFormat { .. })));
    }

    #[test]
    fn known_digest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("abc");
        fs::write(&path, b"abc").unwrap();
        assert_eq!(
            file_digest(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
