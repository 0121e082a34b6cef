//! Path-safety checks for archive entry names.
//!
//! Every entry name is validated before anything is written for it, including
//! its parent directories. Names are split on both `/` and `\` so archives
//! produced on Windows cannot smuggle separators past the check.

use crate::error::{ArchiverError, Result};
use std::path::{Path, PathBuf};

fn unsafe_path(name: &str) -> ArchiverError {
    ArchiverError::UnsafePath { entry: name.to_string() }
}

/// Any `:` can form a drive prefix (`C:x`) or an alternate data stream
/// (`file:stream`) on Windows, wherever the component sits in the name.
fn is_volume_component(component: &str) -> bool {
    component.contains(':')
}

/// Normalizes an entry name into a relative path that stays inside its root.
///
/// Rejects absolute names, drive or UNC prefixes, components containing `:`,
/// NUL bytes, and `..` components that climb above the root. `a/../b` is accepted as `b`. The
/// result is empty for names that refer to the root itself, such as `./`.
pub fn sanitize_entry_name(name: &str) -> Result<PathBuf> {
    if name.contains('\0') || name.starts_with('/') || name.starts_with('\\') {
        return Err(unsafe_path(name));
    }

    let mut parts: Vec<&str> = Vec::new();
    for component in name.split(['/', '\\']) {
        match component {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(unsafe_path(name));
                }
            }
            c if is_volume_component(c) => return Err(unsafe_path(name)),
            c => parts.push(c),
        }
    }
    Ok(parts.iter().collect())
}

/// Resolves `name` under `root`. Fails for unsafe names and for names that
/// resolve to the root itself.
pub fn resolve_entry_path(root: &Path, name: &str) -> Result<PathBuf> {
    let relative = sanitize_entry_name(name)?;
    if relative.as_os_str().is_empty() {
        return Err(unsafe_path(name));
    }
    Ok(root.join(relative))
}
