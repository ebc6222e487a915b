//! In-memory live buffer
//!
//! Holds the most recent points per pin key so LIVE graph queries never
//! touch disk. Bounded per key; evicts oldest on overflow. Purely in-memory
//! and lost on restart by design: the disk store captures the same points
//! once an ingestion boundary passes.

use std::collections::VecDeque;

use dashmap::DashMap;

use crate::types::{PinType, Point, ReportKey};

/// Default number of points retained per key
pub const DEFAULT_LIVE_CAPACITY: usize = 60;

/// Key of one live ring: the report key minus granularity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LiveKey {
    /// Owning user
    pub user: String,
    /// Dashboard id
    pub dash_id: u32,
    /// Device id
    pub device_id: u32,
    /// Pin type
    pub pin_type: PinType,
    /// Pin number
    pub pin: u8,
}

impl LiveKey {
    /// Create a new live key
    pub fn new(user: impl Into<String>, dash_id: u32, device_id: u32, pin_type: PinType, pin: u8) -> Self {
        Self {
            user: user.into(),
            dash_id,
            device_id,
            pin_type,
            pin,
        }
    }
}

impl From<&ReportKey> for LiveKey {
    fn from(key: &ReportKey) -> Self {
        Self {
            user: key.user.clone(),
            dash_id: key.dash_id,
            device_id: key.device_id,
            pin_type: key.pin_type,
            pin: key.pin,
        }
    }
}

/// Bounded per-key ring of the most recent points
pub struct LiveBuffer {
    capacity: usize,
    rings: DashMap<LiveKey, VecDeque<Point>>,
}

impl LiveBuffer {
    /// Create a buffer retaining up to `capacity` points per key
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            rings: DashMap::new(),
        }
    }

    /// Capacity per key
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a point for `key`, evicting the oldest past capacity
    pub fn push(&self, key: LiveKey, value: f64, timestamp: i64) {
        let mut ring = self.rings.entry(key).or_default();
        ring.push_back(Point::new(value, timestamp));
        while ring.len() > self.capacity {
            ring.pop_front();
        }
    }

    /// Up to `max_points` most recent points in chronological order
    ///
    /// A key that has never been pushed yields an empty vector (NoData).
    pub fn snapshot(&self, key: &LiveKey, max_points: usize) -> Vec<Point> {
        match self.rings.get(key) {
            Some(ring) => {
                let skip = ring.len().saturating_sub(max_points);
                ring.iter().skip(skip).copied().collect()
            }
            None => Vec::new(),
        }
    }
}

impl Default for LiveBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LIVE_CAPACITY)
    }
}
