//! Pipeline configuration.

use crate::compress::CompressionPolicy;

/// Environment variable overriding the worker count when no explicit value is set.
pub const WORKERS_ENV: &str = "PZ_WORKERS";

/// Share of the available CPUs given to I/O workers (one worker per five cores).
const CPUS_PER_WORKER: usize = 5;

/// Options shared by creation and extraction.
#[derive(Debug, Clone, Default)]
pub struct ArchiveOptions {
    /// Fixed worker count. `None` falls back to [`WORKERS_ENV`] and then to
    /// [`default_worker_count`].
    pub workers: Option<usize>,
    /// Store/deflate extension set and effort-tier thresholds.
    pub policy: CompressionPolicy,
    /// Prune hidden files, build/cache directories and temp files while scanning.
    pub exclude_junk: bool,
}

impl ArchiveOptions {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_policy(mut self, policy: CompressionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn exclude_junk(mut self, exclude: bool) -> Self {
        self.exclude_junk = exclude;
        self
    }

    /// Resolves the number of pool threads. Always at least 1.
    pub fn resolved_workers(&self) -> usize {
        if let Some(n) = self.workers {
            return n.max(1);
        }
        std::env::var(WORKERS_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .map(|n| n.max(1))
            .unwrap_or_else(default_worker_count)
    }
}

/// `max(1, cpus / 5)`: leaves headroom for the single writer and other load.
pub fn default_worker_count() -> usize {
    (num_cpus::get() / CPUS_PER_WORKER).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_workers_win_and_are_clamped() {
        assert_eq!(ArchiveOptions::default().with_workers(3).resolved_workers(), 3);
        assert_eq!(ArchiveOptions::default().with_workers(0).resolved_workers(), 1);
    }

    #[test]
    fn default_is_at_least_one() {
        assert!(default_worker_count() >= 1);
        assert!(default_worker_count() <= num_cpus::get().max(1));
    }
}
