//! Core data types for the pin report store
//!
//! The fundamental vocabulary of the system:
//!
//! - **`Point`**: a single measurement (value + epoch-millisecond timestamp)
//! - **`PinType`** / **`Granularity`**: the pin and sampling-resolution halves
//!   of a report file's identity, both with character/label round-trips used
//!   by the filename codec
//! - **`ReportKey`**: the full key tuple that maps to exactly one file
//! - **`GraphPeriod`**: client-facing window mapped to `(granularity, points)`
//! - **`AggregationFunction`**: closed enum of cross-device merge functions
//! - **`GraphDataStream`**: one declared data stream of a graph widget

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of a device pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinType {
    /// Digital pin (on/off)
    Digital,
    /// Analog pin
    Analog,
    /// Virtual pin (application-defined)
    Virtual,
}

impl PinType {
    /// Single-character encoding used inside report filenames
    pub fn as_char(self) -> char {
        match self {
            PinType::Digital => 'd',
            PinType::Analog => 'a',
            PinType::Virtual => 'v',
        }
    }

    /// Inverse of [`PinType::as_char`]
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'd' => Some(PinType::Digital),
            'a' => Some(PinType::Analog),
            'v' => Some(PinType::Virtual),
            _ => None,
        }
    }
}

impl fmt::Display for PinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Sampling resolution of a stored report file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    /// One point per minute
    Minute,
    /// One point per hour
    Hourly,
    /// One point per day
    Daily,
}

impl Granularity {
    /// Label used inside report filenames
    pub fn label(self) -> &'static str {
        match self {
            Granularity::Minute => "minute",
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
        }
    }

    /// Inverse of [`Granularity::label`]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "minute" => Some(Granularity::Minute),
            "hourly" => Some(Granularity::Hourly),
            "daily" => Some(Granularity::Daily),
            _ => None,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Client-facing time window for a graph request
///
/// Each period maps to the granularity file it reads and the maximum number
/// of points one page of the response may carry. `Live` bypasses the file
/// store entirely and reads only the in-memory live buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphPeriod {
    /// Most recent in-memory points only
    Live,
    /// 15 minutes of minute data
    FifteenMinutes,
    /// 30 minutes of minute data
    ThirtyMinutes,
    /// 1 hour of minute data
    OneHour,
    /// 3 hours of minute data
    ThreeHours,
    /// 6 hours of minute data
    SixHours,
    /// 12 hours of minute data
    TwelveHours,
    /// 1 day of hourly data
    Day,
    /// 3 days of hourly data
    ThreeDays,
    /// 1 week of hourly data
    Week,
    /// 2 weeks of hourly data
    TwoWeeks,
    /// 1 month of daily data
    Month,
    /// 3 months of daily data
    ThreeMonths,
}

impl GraphPeriod {
    /// Granularity file this period reads, `None` for the live-only period
    pub fn granularity(self) -> Option<Granularity> {
        match self {
            GraphPeriod::Live => None,
            GraphPeriod::FifteenMinutes
            | GraphPeriod::ThirtyMinutes
            | GraphPeriod::OneHour
            | GraphPeriod::ThreeHours
            | GraphPeriod::SixHours
            | GraphPeriod::TwelveHours => Some(Granularity::Minute),
            GraphPeriod::Day | GraphPeriod::ThreeDays | GraphPeriod::Week | GraphPeriod::TwoWeeks => {
                Some(Granularity::Hourly)
            }
            GraphPeriod::Month | GraphPeriod::ThreeMonths => Some(Granularity::Daily),
        }
    }

    /// Upper bound on the number of records one response page may carry
    pub fn number_of_points(self) -> usize {
        match self {
            GraphPeriod::Live => 60,
            GraphPeriod::FifteenMinutes => 15,
            GraphPeriod::ThirtyMinutes => 30,
            GraphPeriod::OneHour => 60,
            GraphPeriod::ThreeHours => 180,
            GraphPeriod::SixHours => 360,
            GraphPeriod::TwelveHours => 720,
            GraphPeriod::Day => 24,
            GraphPeriod::ThreeDays => 72,
            GraphPeriod::Week => 168,
            GraphPeriod::TwoWeeks => 336,
            GraphPeriod::Month => 30,
            GraphPeriod::ThreeMonths => 90,
        }
    }

    /// Whether this period reads only the live buffer
    pub fn is_live(self) -> bool {
        matches!(self, GraphPeriod::Live)
    }
}

/// Function used to merge per-device series index-wise
///
/// Modeled as a closed enum with one pure function per case rather than
/// dynamic dispatch; the set is extended by adding a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AggregationFunction {
    /// No merge; a single device's series passes through unchanged
    #[default]
    None,
    /// Largest value at each index
    Max,
    /// Smallest value at each index
    Min,
    /// Arithmetic mean at each index
    Avg,
    /// Sum at each index
    Sum,
    /// Median at each index (middle element after sorting; upper middle
    /// for even counts)
    Median,
}

impl AggregationFunction {
    /// Apply the function to the values collected at one index
    ///
    /// Returns `None` for an empty slice. `AggregationFunction::None` passes
    /// the first value through.
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let merged = match self {
            AggregationFunction::None => values[0],
            AggregationFunction::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            AggregationFunction::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            AggregationFunction::Sum => values.iter().sum(),
            AggregationFunction::Avg => values.iter().sum::<f64>() / values.len() as f64,
            AggregationFunction::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                sorted[sorted.len() / 2]
            }
        };
        Some(merged)
    }
}

/// A single stored measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// IEEE 754 double-precision measurement value
    pub value: f64,

    /// Unix timestamp in milliseconds since epoch
    pub timestamp: i64,
}

impl Point {
    /// Create a new point
    pub fn new(value: f64, timestamp: i64) -> Self {
        Self { value, timestamp }
    }
}

/// Full key tuple identifying one report file
///
/// The key maps to a file path deterministically; the path encoding is the
/// only index the store keeps. Two keys differing in any field map to
/// distinct files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportKey {
    /// Owning user (becomes the per-user directory)
    pub user: String,
    /// Dashboard id
    pub dash_id: u32,
    /// Device id
    pub device_id: u32,
    /// Pin type
    pub pin_type: PinType,
    /// Pin number
    pub pin: u8,
    /// Sampling resolution of the file
    pub granularity: Granularity,
}

impl ReportKey {
    /// Create a new report key
    pub fn new(
        user: impl Into<String>,
        dash_id: u32,
        device_id: u32,
        pin_type: PinType,
        pin: u8,
        granularity: Granularity,
    ) -> Self {
        Self {
            user: user.into(),
            dash_id,
            device_id,
            pin_type,
            pin,
            granularity,
        }
    }

    /// The pin address portion of the key, as used by the orphan collector
    pub fn address(&self) -> PinAddress {
        PinAddress {
            device_id: self.device_id,
            pin_type: self.pin_type,
            pin: self.pin,
        }
    }
}

/// A `(device, pin type, pin)` triple — the unit of widget reference
///
/// The orphan collector compares the addresses parsed from on-disk filenames
/// against the set of addresses referenced by widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinAddress {
    /// Device id
    pub device_id: u32,
    /// Pin type
    pub pin_type: PinType,
    /// Pin number
    pub pin: u8,
}

impl PinAddress {
    /// Create a new pin address
    pub fn new(device_id: u32, pin_type: PinType, pin: u8) -> Self {
        Self {
            device_id,
            pin_type,
            pin,
        }
    }
}

/// The pin half of a graph widget's data stream declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataStream {
    /// Pin number
    pub pin: u8,
    /// Pin type
    pub pin_type: PinType,
}

/// Source of the device set a data stream reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamTarget {
    /// A single device
    Device(u32),
    /// A named device group; resolved to member devices via the profile model
    Tag(u32),
}

/// One declared data stream of a graph widget
///
/// A stream with `data_stream: None` (widget created but pin never
/// configured) contributes an empty series without failing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphDataStream {
    /// Pin declaration, absent while the widget is unconfigured
    pub data_stream: Option<DataStream>,
    /// Device or tag the stream reads from
    pub target: StreamTarget,
    /// Cross-device merge function
    pub function: AggregationFunction,
}

impl GraphDataStream {
    /// Stream reading one pin of one device
    pub fn device(device_id: u32, pin_type: PinType, pin: u8) -> Self {
        Self {
            data_stream: Some(DataStream { pin, pin_type }),
            target: StreamTarget::Device(device_id),
            function: AggregationFunction::None,
        }
    }

    /// Stream reading one pin across a tag's member devices
    pub fn tag(tag_id: u32, pin_type: PinType, pin: u8, function: AggregationFunction) -> Self {
        Self {
            data_stream: Some(DataStream { pin, pin_type }),
            target: StreamTarget::Tag(tag_id),
            function,
        }
    }

    /// Stream whose widget has no pin configured yet
    pub fn unconfigured(target: StreamTarget) -> Self {
        Self {
            data_stream: None,
            target,
            function: AggregationFunction::None,
        }
    }
}
