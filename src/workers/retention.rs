//! Retention worker
//!
//! Keeps the report store bounded: each granularity file is truncated to its
//! maximum retained point count (oldest records dropped from the front,
//! since files are oldest-first), user directories are removed once empty,
//! and aged export artifacts are deleted. One pass per timer tick; a pass
//! with no new data is a no-op, and a missing data directory is not an
//! error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::time::interval;

use crate::error::StorageError;
use crate::storage::{parse_filename, ReportStore};
use crate::types::Granularity;

use super::framework::{Service, ServiceError, ServiceStatus};

/// Retention policy for the worker
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// Time between passes
    pub interval: Duration,

    /// Maximum retained points per minute-granularity file
    pub minute_points: usize,

    /// Maximum retained points per hourly-granularity file
    pub hourly_points: usize,

    /// Maximum retained points per daily-granularity file
    pub daily_points: usize,

    /// Directory holding export artifacts, if export cleanup is enabled
    pub export_dir: Option<PathBuf>,

    /// Export artifacts older than this are deleted
    pub export_retention: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(6 * 3600),
            // caps cover the largest period window per granularity
            minute_points: 720,
            hourly_points: 336,
            daily_points: 365,
            export_dir: None,
            export_retention: Duration::from_secs(30 * 24 * 3600),
        }
    }
}

impl RetentionPolicy {
    /// Point cap for one granularity
    pub fn cap(&self, granularity: Granularity) -> usize {
        match granularity {
            Granularity::Minute => self.minute_points,
            Granularity::Hourly => self.hourly_points,
            Granularity::Daily => self.daily_points,
        }
    }
}

/// Counters for one retention pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetentionStats {
    /// Files truncated to their cap
    pub truncated_files: u64,
    /// Empty user directories removed
    pub removed_dirs: u64,
    /// Aged export artifacts removed
    pub removed_exports: u64,
}

/// Background worker enforcing [`RetentionPolicy`]
pub struct RetentionWorker {
    policy: RetentionPolicy,
    store: Arc<ReportStore>,
    status: RwLock<ServiceStatus>,
}

impl RetentionWorker {
    /// Create a new worker
    pub fn new(policy: RetentionPolicy, store: Arc<ReportStore>) -> Self {
        Self {
            policy,
            store,
            status: RwLock::new(ServiceStatus::Stopped),
        }
    }

    /// Run one full retention pass
    ///
    /// Per-user failures are logged and do not abort the remaining users.
    pub fn run_pass(&self) -> RetentionStats {
        let mut stats = RetentionStats::default();

        let entries = match fs::read_dir(self.store.data_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return stats,
            Err(e) => {
                tracing::error!(error = %e, "Retention pass could not list data directory");
                return stats;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            match self.process_user_dir(&path, &mut stats) {
                Ok(()) => {}
                Err(e) => {
                    tracing::warn!(dir = %path.display(), error = %e, "Retention failed for user directory");
                }
            }
        }

        if let Some(export_dir) = &self.policy.export_dir {
            stats.removed_exports = self.cleanup_exports(export_dir);
        }
        stats
    }

    /// Truncate every oversized report file in one user directory, then
    /// remove the directory when it ends up empty
    fn process_user_dir(&self, dir: &Path, stats: &mut RetentionStats) -> Result<(), StorageError> {
        for entry in fs::read_dir(dir)?.flatten() {
            let path = entry.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            let parsed = match parse_filename(name) {
                Some(parsed) => parsed,
                None => continue,
            };

            let cap = self.policy.cap(parsed.granularity);
            if self.store.truncate_to_newest(&path, cap)? {
                stats.truncated_files += 1;
            }
        }

        let empty = fs::read_dir(dir)?.next().is_none();
        if empty {
            // a concurrent append may repopulate the dir; losing that race
            // just leaves the dir for the next pass
            match fs::remove_dir(dir) {
                Ok(()) => stats.removed_dirs += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::debug!(dir = %dir.display(), error = %e, "Could not remove user directory");
                }
            }
        }
        Ok(())
    }

    /// Delete `.csv.gz` artifacts older than the export retention age
    fn cleanup_exports(&self, export_dir: &Path) -> u64 {
        let entries = match fs::read_dir(export_dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let mut removed = 0;
        let now = SystemTime::now();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_artifact = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".csv.gz"));
            if !is_artifact {
                continue;
            }

            let modified = entry.metadata().and_then(|m| m.modified());
            let expired = match modified {
                Ok(modified) => now
                    .duration_since(modified)
                    .map(|age| age >= self.policy.export_retention)
                    .unwrap_or(false),
                Err(_) => false,
            };
            if expired && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        removed
    }
}

#[async_trait::async_trait]
impl Service for RetentionWorker {
    async fn start(&self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServiceError> {
        *self.status.write() = ServiceStatus::Running;
        tracing::debug!(interval = ?self.policy.interval, "Retention worker started");

        let mut ticker = interval(self.policy.interval);
        loop {
            tokio::select! {
                result = shutdown.recv() => {
                    match result {
                        Ok(()) | Err(broadcast::error::RecvError::Closed) => break,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::debug!(missed = n, "Retention worker shutdown receiver lagged");
                        }
                    }
                }
                _ = ticker.tick() => {
                    let stats = self.run_pass();
                    tracing::debug!(
                        truncated = stats.truncated_files,
                        removed_dirs = stats.removed_dirs,
                        removed_exports = stats.removed_exports,
                        "Retention pass complete"
                    );
                }
            }
        }

        *self.status.write() = ServiceStatus::Stopped;
        tracing::debug!("Retention worker stopped");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "retention"
    }

    fn status(&self) -> ServiceStatus {
        self.status.read().clone()
    }
}
