//! Timestamp encoding for TEXT columns.
//!
//! Every timestamp is written as fixed-width UTC with microseconds,
//! `2024-03-10T14:05:09.000123Z`. Equal width and a single zone make
//! string comparison in SQL agree with chronological order, which the
//! report window queries rely on. sqlx decodes the same text back into
//! `DateTime<Utc>` as RFC 3339.

use chrono::{DateTime, SubsecRound, Utc};

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Encodes `at` for storage or for comparison against stored values.
pub fn encode(at: DateTime<Utc>) -> String {
    at.format(FORMAT).to_string()
}

/// Current time truncated to the stored precision.
///
/// Values returned to callers then compare equal to what is read back.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width() {
        let whole = DateTime::parse_from_rfc3339("2024-03-10T14:05:09Z")
            .unwrap()
            .with_timezone(&Utc);
        let fraction = DateTime::parse_from_rfc3339("2024-03-10T14:05:09.5Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(encode(whole), "2024-03-10T14:05:09.000000Z");
        assert_eq!(encode(fraction), "2024-03-10T14:05:09.500000Z");
        assert!(encode(whole) < encode(fraction));
    }

    #[test]
    fn test_round_trips_through_rfc3339() {
        let at = now();
        let parsed = DateTime::parse_from_rfc3339(&encode(at))
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parsed, at);
    }
}
