//! Fixed-size binary record codec
//!
//! Every stored record is exactly 16 bytes: a big-endian IEEE 754 double
//! (bytes 0-7) followed by a big-endian signed 64-bit epoch-millisecond
//! timestamp (bytes 8-15). Files are plain sequences of these records with
//! no header or footer, so a file size that is not a multiple of 16 signals
//! trailing corruption; [`decode_all`] simply ignores the partial tail.

use crate::error::StorageError;
use crate::types::Point;

/// Size of one encoded record in bytes
pub const RECORD_SIZE: usize = 16;

/// Encode a record into its 16-byte on-disk form
pub fn encode_record(value: f64, timestamp: i64) -> [u8; RECORD_SIZE] {
    let mut buf = [0u8; RECORD_SIZE];
    buf[..8].copy_from_slice(&value.to_be_bytes());
    buf[8..].copy_from_slice(&timestamp.to_be_bytes());
    buf
}

/// Decode one record from the front of `bytes`
///
/// Fails with [`StorageError::MalformedRecord`] when fewer than 16 bytes are
/// available.
pub fn decode_record(bytes: &[u8]) -> Result<Point, StorageError> {
    if bytes.len() < RECORD_SIZE {
        return Err(StorageError::MalformedRecord { len: bytes.len() });
    }
    let mut value = [0u8; 8];
    value.copy_from_slice(&bytes[..8]);
    let mut timestamp = [0u8; 8];
    timestamp.copy_from_slice(&bytes[8..RECORD_SIZE]);
    Ok(Point {
        value: f64::from_be_bytes(value),
        timestamp: i64::from_be_bytes(timestamp),
    })
}

/// Decode every complete record in `bytes`, in order
///
/// Trailing bytes that do not form a complete record are dropped rather than
/// treated as a fatal error.
pub fn decode_all(bytes: &[u8]) -> Vec<Point> {
    bytes
        .chunks_exact(RECORD_SIZE)
        .map(|chunk| {
            let mut value = [0u8; 8];
            value.copy_from_slice(&chunk[..8]);
            let mut timestamp = [0u8; 8];
            timestamp.copy_from_slice(&chunk[8..]);
            Point {
                value: f64::from_be_bytes(value),
                timestamp: i64::from_be_bytes(timestamp),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let cases = [
            (0.0, 0i64),
            (1.11, 1_111_111),
            (-273.15, -1),
            (f64::MAX, i64::MAX),
            (f64::MIN_POSITIVE, i64::MIN),
        ];
        for (value, timestamp) in cases {
            let encoded = encode_record(value, timestamp);
            let decoded = decode_record(&encoded).unwrap();
            assert_eq!(decoded.value, value);
            assert_eq!(decoded.timestamp, timestamp);
        }
    }

    #[test]
    fn test_big_endian_layout() {
        // 1.0 is 0x3FF0000000000000; timestamp 1 ends with a single 0x01 byte
        let encoded = encode_record(1.0, 1);
        assert_eq!(encoded[0], 0x3F);
        assert_eq!(encoded[1], 0xF0);
        assert_eq!(encoded[15], 0x01);
    }

    #[test]
    fn test_short_buffer_is_malformed() {
        let err = decode_record(&[0u8; 15]).unwrap_err();
        assert!(matches!(err, StorageError::MalformedRecord { len: 15 }));
    }

    #[test]
    fn test_decode_all_drops_partial_tail() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&encode_record(1.0, 100));
        bytes.extend_from_slice(&encode_record(2.0, 200));
        bytes.extend_from_slice(&[0xAB; 7]); // corrupt tail

        let points = decode_all(&bytes);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], Point::new(1.0, 100));
        assert_eq!(points[1], Point::new(2.0, 200));
    }

    #[test]
    fn test_decode_all_empty() {
        assert!(decode_all(&[]).is_empty());
    }
}
