//! Orphan file collector
//!
//! Deletes pin files that no widget references anymore. Each pass takes one
//! snapshot of a user's referenced pins from the profile model (the
//! implementor guarantees the snapshot covers the full widget tree including
//! tiles, templates and tag membership), then walks that user's report
//! directory, parses each filename back into its pin address and deletes
//! files outside the reference set.
//!
//! Users are enumerated from the profile model, not from disk, so a report
//! directory whose owner is missing from the snapshot is left alone rather
//! than mass-deleted. A file recreated by a concurrent append after deletion
//! is caught on the next pass.

use std::fs;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::time::interval;

use crate::profile::ProfileView;
use crate::storage::{parse_filename, ReportStore};
use crate::types::PinAddress;

use super::framework::{Service, ServiceError, ServiceStatus};

/// Counters for one collection pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OrphanStats {
    /// Report files examined
    pub scanned_files: u64,
    /// Orphaned files deleted
    pub deleted_files: u64,
}

/// Background worker deleting unreferenced pin files
pub struct OrphanCollector {
    store: Arc<ReportStore>,
    profile: Arc<dyn ProfileView>,
    run_interval: Duration,
    status: RwLock<ServiceStatus>,
}

impl OrphanCollector {
    /// Create a new collector
    pub fn new(store: Arc<ReportStore>, profile: Arc<dyn ProfileView>, run_interval: Duration) -> Self {
        Self {
            store,
            profile,
            run_interval,
            status: RwLock::new(ServiceStatus::Stopped),
        }
    }

    /// Run one full collection pass
    ///
    /// Per-user failures are logged and do not abort the remaining users.
    pub fn run_pass(&self) -> OrphanStats {
        let mut stats = OrphanStats::default();

        for user in self.profile.users() {
            let referenced = self.profile.referenced_pins(&user);
            if let Err(e) = self.collect_user(&user, &referenced, &mut stats) {
                tracing::warn!(user = %user, error = %e, "Orphan collection failed for user");
            }
        }
        stats
    }

    fn collect_user(
        &self,
        user: &str,
        referenced: &std::collections::HashSet<PinAddress>,
        stats: &mut OrphanStats,
    ) -> Result<(), crate::error::StorageError> {
        let dir = self.store.user_dir(user)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            let parsed = match parse_filename(name) {
                Some(parsed) => parsed,
                None => {
                    tracing::warn!(user = %user, file = %name, "Skipping unparseable report filename");
                    continue;
                }
            };
            stats.scanned_files += 1;

            let address = PinAddress::new(parsed.device_id, parsed.pin_type, parsed.pin);
            if !referenced.contains(&address) {
                self.store.delete_at(&path)?;
                stats.deleted_files += 1;
                tracing::debug!(user = %user, file = %name, "Deleted orphaned report file");
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Service for OrphanCollector {
    async fn start(&self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServiceError> {
        *self.status.write() = ServiceStatus::Running;
        tracing::debug!(interval = ?self.run_interval, "Orphan collector started");

        let mut ticker = interval(self.run_interval);
        loop {
            tokio::select! {
                result = shutdown.recv() => {
                    match result {
                        Ok(()) | Err(broadcast::error::RecvError::Closed) => break,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::debug!(missed = n, "Orphan collector shutdown receiver lagged");
                        }
                    }
                }
                _ = ticker.tick() => {
                    let stats = self.run_pass();
                    tracing::debug!(
                        scanned = stats.scanned_files,
                        deleted = stats.deleted_files,
                        "Orphan collection pass complete"
                    );
                }
            }
        }

        *self.status.write() = ServiceStatus::Stopped;
        tracing::debug!("Orphan collector stopped");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "orphan_collector"
    }

    fn status(&self) -> ServiceStatus {
        self.status.read().clone()
    }
}
