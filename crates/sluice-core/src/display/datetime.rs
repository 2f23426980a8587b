//! Timestamp formatting in the local time zone.

use std::fmt;

use jiff::{tz::TimeZone, Timestamp};

/// Formats a UTC timestamp as `YYYY-MM-DD HH:MM:SS TZ` in the system time
/// zone.
///
/// History rows are stored in UTC; operators read them in local time.
pub struct LocalDateTime<'a>(pub &'a Timestamp);

impl fmt::Display for LocalDateTime<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.0
                .to_zoned(TimeZone::system())
                .strftime("%Y-%m-%d %H:%M:%S %Z")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_shape() {
        let ts: Timestamp = "2024-03-01T12:30:45Z".parse().unwrap();
        let text = LocalDateTime(&ts).to_string();
        let (date_time, zone) = text.rsplit_once(' ').unwrap();
        assert_eq!(date_time.len(), "2024-03-01 12:30:45".len());
        assert!(!zone.is_empty());
    }
}
