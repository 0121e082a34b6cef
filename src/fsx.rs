//! Filesystem shim used by extraction.
//!
//! Re-exports `std::fs` and adds [`set_unix_permissions`], which restores the
//! mode bits recorded in an archive. On Windows mode bits have no meaning and
//! the call does nothing, so call-sites stay identical across platforms.

use std::io;
use std::path::Path;

pub use std::fs::*;

/// Applies POSIX permission bits (`mode & 0o7777`).
#[cfg(unix)]
pub fn set_unix_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777))
}

/// No-op: POSIX permission bits are not restored on this platform.
#[cfg(not(unix))]
pub fn set_unix_permissions(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
