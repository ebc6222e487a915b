//! Report filename codec
//!
//! The filename is the only index the store keeps: it embeds every key field
//! except the user (which is the directory), so the background workers can
//! recover the key from a directory listing without a catalog.
//! [`generate_filename`] and [`parse_filename`] are exact inverses.
//!
//! Layout: `history_{dash_id}_{device_id}_{pin_type_char}{pin}_{granularity}.bin`

use crate::types::{Granularity, PinType};

const PREFIX: &str = "history";
const EXTENSION: &str = ".bin";

/// Key fields recovered from a report filename
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedFilename {
    /// Dashboard id
    pub dash_id: u32,
    /// Device id
    pub device_id: u32,
    /// Pin type
    pub pin_type: PinType,
    /// Pin number
    pub pin: u8,
    /// Sampling resolution
    pub granularity: Granularity,
}

/// Build the on-disk name for a report file
pub fn generate_filename(
    dash_id: u32,
    device_id: u32,
    pin_type: PinType,
    pin: u8,
    granularity: Granularity,
) -> String {
    format!(
        "{PREFIX}_{dash_id}_{device_id}_{}{pin}_{}{EXTENSION}",
        pin_type.as_char(),
        granularity.label()
    )
}

/// Parse a report filename back into its key fields
///
/// Returns `None` for names that were not produced by [`generate_filename`]
/// (foreign files in a user directory are skipped, not errors).
pub fn parse_filename(name: &str) -> Option<ParsedFilename> {
    let stem = name.strip_suffix(EXTENSION)?;
    let mut parts = stem.split('_');

    if parts.next()? != PREFIX {
        return None;
    }
    let dash_id = parts.next()?.parse().ok()?;
    let device_id = parts.next()?.parse().ok()?;

    let pin_part = parts.next()?;
    let mut chars = pin_part.chars();
    let pin_type = PinType::from_char(chars.next()?)?;
    let pin = chars.as_str().parse().ok()?;

    let granularity = Granularity::from_label(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }

    Some(ParsedFilename {
        dash_id,
        device_id,
        pin_type,
        pin,
        granularity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate() {
        assert_eq!(
            generate_filename(1, 0, PinType::Digital, 8, Granularity::Hourly),
            "history_1_0_d8_hourly.bin"
        );
        assert_eq!(
            generate_filename(432, 7, PinType::Virtual, 88, Granularity::Daily),
            "history_432_7_v88_daily.bin"
        );
    }

    #[test]
    fn test_round_trip() {
        for pin_type in [PinType::Digital, PinType::Analog, PinType::Virtual] {
            for granularity in [Granularity::Minute, Granularity::Hourly, Granularity::Daily] {
                let name = generate_filename(12, 345, pin_type, 255, granularity);
                let parsed = parse_filename(&name).unwrap();
                assert_eq!(parsed.dash_id, 12);
                assert_eq!(parsed.device_id, 345);
                assert_eq!(parsed.pin_type, pin_type);
                assert_eq!(parsed.pin, 255);
                assert_eq!(parsed.granularity, granularity);
            }
        }
    }

    #[test]
    fn test_rejects_foreign_names() {
        assert!(parse_filename("metadata.json").is_none());
        assert!(parse_filename("history_1_0_d8_hourly.csv.gz").is_none());
        assert!(parse_filename("history_1_0_x8_hourly.bin").is_none());
        assert!(parse_filename("history_1_0_d8_weekly.bin").is_none());
        assert!(parse_filename("history_1_0_d8_hourly_extra.bin").is_none());
        assert!(parse_filename("history_one_0_d8_hourly.bin").is_none());
    }
}
