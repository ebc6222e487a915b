//! Pintail - binary per-pin telemetry report store
//!
//! A flat-file history store for device pin telemetry:
//! - 16-byte big-endian records (f64 value + i64 epoch-ms timestamp)
//! - filename-as-index layout, one file per (user, dash, device, pin, granularity)
//! - in-memory live ring for LIVE graph windows
//! - index-wise multi-device aggregation with gzip-compressed wire responses
//! - background retention and orphan-file collection workers
//! - gzip CSV export handed to a pluggable mail collaborator

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod live;
pub mod profile;
pub mod storage;
pub mod types;

/// Configuration management with TOML support
pub mod config;

/// CSV export service with a pluggable mail seam
pub mod export;

/// Graph query engine: period resolution, tag fan-out, merge, wire encoding
pub mod query;

/// Background services for retention enforcement and orphan collection
pub mod workers;

use std::sync::Arc;

use live::{LiveBuffer, LiveKey};
use profile::ProfileView;
use query::GraphQueryEngine;
use storage::ReportStore;
use workers::{OrphanCollector, RetentionPolicy, RetentionWorker};

// Re-export main types
pub use error::{Error, Result};
pub use types::{
    AggregationFunction, Granularity, GraphDataStream, GraphPeriod, PinType, Point, ReportKey,
};

/// Facade tying the disk store and live buffer together
///
/// Owns the shared [`ReportStore`] and [`LiveBuffer`] and wires them into the
/// query engine and background workers. Cheap to clone via the inner `Arc`s.
pub struct ReportingDb {
    store: Arc<ReportStore>,
    live: Arc<LiveBuffer>,
}

impl ReportingDb {
    /// Open a database rooted at the configured data directory
    pub fn open(config: &config::Config) -> Result<Self> {
        config.validate().map_err(Error::Configuration)?;
        let store = Arc::new(ReportStore::new(config.storage.data_dir.clone())?);
        let live = Arc::new(LiveBuffer::new(config.live.capacity));
        tracing::info!(data_dir = %config.storage.data_dir.display(), "Report store opened");
        Ok(Self { store, live })
    }

    /// Shared handle to the disk store
    pub fn store(&self) -> Arc<ReportStore> {
        Arc::clone(&self.store)
    }

    /// Shared handle to the live buffer
    pub fn live(&self) -> Arc<LiveBuffer> {
        Arc::clone(&self.live)
    }

    /// Append one aggregated record for the key
    ///
    /// Minute-granularity records also feed the live ring; coarser
    /// granularities only persist.
    pub fn record(&self, key: &ReportKey, value: f64, timestamp: i64) -> Result<()> {
        self.store.append(key, value, timestamp)?;
        if key.granularity == Granularity::Minute {
            self.live.push(LiveKey::from(key), value, timestamp);
        }
        Ok(())
    }

    /// Query engine bound to the given profile model
    pub fn query_engine(&self, profile: Arc<dyn ProfileView>) -> GraphQueryEngine {
        GraphQueryEngine::new(self.store(), self.live(), profile)
    }

    /// Retention worker bound to this database's store
    pub fn retention_worker(&self, policy: RetentionPolicy) -> RetentionWorker {
        RetentionWorker::new(policy, self.store())
    }

    /// Orphan collector bound to this database's store
    pub fn orphan_collector(
        &self,
        profile: Arc<dyn ProfileView>,
        run_interval: std::time::Duration,
    ) -> OrphanCollector {
        OrphanCollector::new(self.store(), profile, run_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_db(dir: &TempDir) -> ReportingDb {
        let mut config = config::Config::default();
        config.storage.data_dir = dir.path().to_path_buf();
        ReportingDb::open(&config).unwrap()
    }

    #[test]
    fn test_record_persists() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let key = ReportKey::new("mark", 1, 0, PinType::Virtual, 4, Granularity::Hourly);
        db.record(&key, 1.5, 1000).unwrap();
        assert_eq!(db.store().file_size(&key).unwrap(), 16);
    }

    #[test]
    fn test_minute_record_feeds_live_ring() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let minute = ReportKey::new("mark", 1, 0, PinType::Virtual, 4, Granularity::Minute);
        let hourly = ReportKey::new("mark", 1, 0, PinType::Virtual, 5, Granularity::Hourly);
        db.record(&minute, 1.5, 1000).unwrap();
        db.record(&hourly, 2.5, 2000).unwrap();

        assert_eq!(db.live().snapshot(&LiveKey::from(&minute), 60).len(), 1);
        assert!(db.live().snapshot(&LiveKey::from(&hourly), 60).is_empty());
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let mut config = config::Config::default();
        config.storage.data_dir = dir.path().to_path_buf();
        config.live.capacity = 0;
        assert!(ReportingDb::open(&config).is_err());
    }
}
