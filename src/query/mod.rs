//! Aggregation query engine
//!
//! Turns a graph widget's declared data streams plus a period/page into one
//! gzip-compressed binary response: resolves the period to a granularity and
//! point bound, fans tags out to member devices through the profile model,
//! reads the live buffer or the disk store per device, merges multi-device
//! series index-wise, and serializes the wire payload.
//!
//! Failure semantics are local by design: an unreadable file degrades that
//! one device to an empty series with a warning, never failing sibling
//! streams; the whole request is NoData only when every stream is empty.

pub mod merge;
pub mod wire;

use std::sync::Arc;

use bytes::Bytes;

use crate::error::QueryError;
use crate::live::{LiveBuffer, LiveKey};
use crate::profile::ProfileView;
use crate::storage::ReportStore;
use crate::types::{GraphDataStream, GraphPeriod, Point, ReportKey, StreamTarget};

/// One graph widget query
#[derive(Debug, Clone)]
pub struct GraphQueryRequest {
    /// Owning user
    pub user: String,
    /// Dashboard the widget lives on
    pub dash_id: u32,
    /// Declared data streams, in widget order
    pub streams: Vec<GraphDataStream>,
    /// Requested window
    pub period: GraphPeriod,
    /// Page index (front-to-back through the granularity file)
    pub page: usize,
}

/// Query engine over the report store, live buffer and profile model
pub struct GraphQueryEngine {
    store: Arc<ReportStore>,
    live: Arc<LiveBuffer>,
    profile: Arc<dyn ProfileView>,
}

impl GraphQueryEngine {
    /// Create a new engine
    pub fn new(store: Arc<ReportStore>, live: Arc<LiveBuffer>, profile: Arc<dyn ProfileView>) -> Self {
        Self {
            store,
            live,
            profile,
        }
    }

    /// Execute a graph query
    ///
    /// `Ok(None)` is the NoData outcome: every stream resolved to zero
    /// points. Otherwise the gzip-compressed wire payload is returned.
    pub fn query(&self, request: &GraphQueryRequest) -> Result<Option<Bytes>, QueryError> {
        let points_bound = request.period.number_of_points();

        let mut results: Vec<Vec<Point>> = Vec::with_capacity(request.streams.len());
        for stream in &request.streams {
            results.push(self.fetch_stream(request, stream, points_bound));
        }

        let payload = match wire::serialize_response(request.dash_id, &results) {
            Some(payload) => payload,
            None => return Ok(None),
        };
        Ok(Some(wire::compress(&payload)?))
    }

    /// Resolve and fetch one stream, merging multi-device series
    fn fetch_stream(
        &self,
        request: &GraphQueryRequest,
        stream: &GraphDataStream,
        points_bound: usize,
    ) -> Vec<Point> {
        let data_stream = match stream.data_stream {
            Some(ds) => ds,
            // widget exists but no pin was ever configured
            None => return Vec::new(),
        };

        let devices: Vec<u32> = match stream.target {
            StreamTarget::Device(id) => vec![id],
            StreamTarget::Tag(tag_id) => {
                self.profile
                    .tag_devices(&request.user, request.dash_id, tag_id)
            }
        };
        if devices.is_empty() {
            return Vec::new();
        }

        let series: Vec<Vec<Point>> = devices
            .iter()
            .map(|&device_id| self.fetch_device(request, data_stream.pin_type, data_stream.pin, device_id, points_bound))
            .collect();

        merge::merge_series(series, stream.function)
    }

    /// Fetch one device's series from the live buffer or the disk store
    fn fetch_device(
        &self,
        request: &GraphQueryRequest,
        pin_type: crate::types::PinType,
        pin: u8,
        device_id: u32,
        points_bound: usize,
    ) -> Vec<Point> {
        match request.period.granularity() {
            None => {
                let key = LiveKey::new(request.user.clone(), request.dash_id, device_id, pin_type, pin);
                self.live.snapshot(&key, points_bound)
            }
            Some(granularity) => {
                let key = ReportKey::new(
                    request.user.clone(),
                    request.dash_id,
                    device_id,
                    pin_type,
                    pin,
                    granularity,
                );
                match self.store.read_page(&key, request.page, points_bound) {
                    Ok(points) => points,
                    Err(e) => {
                        tracing::warn!(
                            user = %request.user,
                            device = device_id,
                            pin = pin,
                            error = %e,
                            "Report read failed, stream degrades to empty"
                        );
                        Vec::new()
                    }
                }
            }
        }
    }

    /// Drop one pin's history file (the protocol's delete-graph-data command)
    pub fn delete_graph_data(&self, key: &ReportKey) -> Result<(), QueryError> {
        self.store.delete(key)?;
        Ok(())
    }
}
