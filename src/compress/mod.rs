//! # Compression Policy
//!
//! Two independent decisions drive how payload bytes are encoded:
//!
//! - **Per-file method**: files that are already compressed (images, audio/video,
//!   archives, office documents) are stored verbatim, everything else is deflated.
//! - **Effort tier**: chosen once from the total payload size and applied to every
//!   compressed entry of the archive. Small archives get maximum compression, very
//!   large ones get the fastest setting.
//!
//! The policy is a plain value carried by [`crate::ArchiveOptions`] so callers and
//! tests can substitute their own tables.

use std::collections::HashSet;
use std::path::Path;

const MB: u64 = 1024 * 1024;

/// Extensions of formats whose contents are already dense.
pub const DEFAULT_STORED_EXTENSIONS: &[&str] = &[
    "zip", "gz", "7z", "rar",
    "jpg", "jpeg", "png", "gif", "webp",
    "mp3", "mp4", "avi", "mkv", "mov",
    "pdf", "docx", "xlsx", "pptx",
];

/// How a single entry's payload is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMethod {
    /// Bytes are written verbatim.
    Store,
    /// Bytes pass through deflate at the archive's effort tier.
    Deflate,
}

impl StorageMethod {
    pub(crate) fn to_zip(self) -> zip::CompressionMethod {
        match self {
            StorageMethod::Store => zip::CompressionMethod::Stored,
            StorageMethod::Deflate => zip::CompressionMethod::Deflated,
        }
    }
}

/// Archive-wide compression effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EffortTier {
    /// Maximum ratio.
    Best,
    /// Balanced.
    Default,
    /// Favor speed.
    Fast,
    /// Minimum latency.
    Fastest,
}

impl EffortTier {
    /// Deflate level (0-9) used by both zip entries and the gzip stream.
    pub fn level(self) -> u32 {
        match self {
            EffortTier::Best => 9,
            EffortTier::Default => 6,
            EffortTier::Fast => 4,
            EffortTier::Fastest => 1,
        }
    }
}

/// Extension set and size thresholds used to pick methods and tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionPolicy {
    stored_extensions: HashSet<String>,
    /// Upper bounds (exclusive) for `Best`, `Default` and `Fast`; anything at or
    /// above the last bound is `Fastest`.
    tier_bounds: [u64; 3],
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_STORED_EXTENSIONS.iter().copied(), [10 * MB, 100 * MB, 500 * MB])
    }
}

impl CompressionPolicy {
    /// Builds a policy from an extension list (without the leading dot,
    /// case-insensitive) and ascending tier bounds in bytes.
    pub fn new<'a, I>(stored_extensions: I, tier_bounds: [u64; 3]) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let stored_extensions = stored_extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        Self { stored_extensions, tier_bounds }
    }

    /// Store for already-compressed formats, deflate for everything else.
    pub fn select_method(&self, name: &Path) -> StorageMethod {
        let ext = name
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext {
            Some(ext) if self.stored_extensions.contains(&ext) => StorageMethod::Store,
            _ => StorageMethod::Deflate,
        }
    }

    /// Picks the effort tier for an archive whose payload totals `total_bytes`.
    pub fn select_effort(&self, total_bytes: u64) -> EffortTier {
        let [best, default, fast] = self.tier_bounds;
        if total_bytes < best {
            EffortTier::Best
        } else if total_bytes < default {
            EffortTier::Default
        } else if total_bytes < fast {
            EffortTier::Fast
        } else {
            EffortTier::Fastest
        }
    }
}
