//! Graph query response wire format
//!
//! Pre-gzip payload layout, all fields big-endian:
//!
//! ```text
//! u32                   dashboard id of the request
//! per stream, in request order:
//!   u32                 point count (0 for a stream with no data)
//!   count times:
//!     f64               value
//!     i64               timestamp (epoch ms)
//! ```
//!
//! The leading dashboard id echoes the request so the client can route the
//! payload; see DESIGN.md for the compatibility note. When every stream is
//! empty the response is NoData (`None`), never an empty payload.

use std::io::Write;

use bytes::{BufMut, Bytes, BytesMut};
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::codec::RECORD_SIZE;
use crate::error::QueryError;
use crate::types::Point;

/// Serialize per-stream series into the pre-gzip payload
///
/// Returns `None` (NoData) when every stream is empty.
pub fn serialize_response(dash_id: u32, streams: &[Vec<Point>]) -> Option<Bytes> {
    if streams.iter().all(|s| s.is_empty()) {
        return None;
    }

    let body: usize = streams.iter().map(|s| 4 + s.len() * RECORD_SIZE).sum();
    let mut buf = BytesMut::with_capacity(4 + body);

    buf.put_u32(dash_id);
    for stream in streams {
        buf.put_u32(stream.len() as u32);
        for point in stream {
            buf.put_f64(point.value);
            buf.put_i64(point.timestamp);
        }
    }
    Some(buf.freeze())
}

/// Gzip-compress a serialized payload
pub fn compress(payload: &[u8]) -> Result<Bytes, QueryError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(payload.len() / 2 + 16), Compression::default());
    encoder
        .write_all(payload)
        .map_err(|e| QueryError::Compression(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| QueryError::Compression(e.to_string()))?;
    Ok(Bytes::from(compressed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_layout_single_stream() {
        let streams = vec![vec![Point::new(1.11, 1_111_111), Point::new(1.22, 2_222_222)]];
        let payload = serialize_response(1, &streams).unwrap();

        assert_eq!(payload.len(), 4 + 4 + 2 * 16);
        assert_eq!(&payload[0..4], &1u32.to_be_bytes());
        assert_eq!(&payload[4..8], &2u32.to_be_bytes());
        assert_eq!(&payload[8..16], &1.11f64.to_be_bytes());
        assert_eq!(&payload[16..24], &1_111_111i64.to_be_bytes());
        assert_eq!(&payload[24..32], &1.22f64.to_be_bytes());
        assert_eq!(&payload[32..40], &2_222_222i64.to_be_bytes());
    }

    #[test]
    fn test_empty_stream_gets_zero_count() {
        let streams = vec![vec![Point::new(1.0, 1)], Vec::new()];
        let payload = serialize_response(7, &streams).unwrap();

        assert_eq!(&payload[0..4], &7u32.to_be_bytes());
        assert_eq!(&payload[4..8], &1u32.to_be_bytes());
        let tail = payload.len() - 4;
        assert_eq!(&payload[tail..], &0u32.to_be_bytes());
    }

    #[test]
    fn test_all_empty_is_no_data() {
        assert!(serialize_response(1, &[Vec::new(), Vec::new()]).is_none());
        assert!(serialize_response(1, &[]).is_none());
    }

    #[test]
    fn test_gzip_round_trip() {
        let streams = vec![vec![Point::new(3.5, 42)]];
        let payload = serialize_response(1, &streams).unwrap();
        let compressed = compress(&payload).unwrap();

        let mut decoder = GzDecoder::new(&compressed[..]);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).unwrap();
        assert_eq!(&decompressed[..], &payload[..]);
    }
}
