//! Time values: instants and intervals.
//!
//! Stored time columns come in start/end pairs. Depending on which
//! endpoints are set they read back as a single [`TimeInstant`] or as a
//! [`TimeInterval`]; [`TimeValue`] is the closed union of the two.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// A single point in time, or the "no time" instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeInstant(pub Option<DateTime<Utc>>);

impl TimeInstant {
    /// An instant at the given time.
    pub const fn at(time: DateTime<Utc>) -> Self {
        Self(Some(time))
    }

    /// The "no time" instant.
    pub const fn unset() -> Self {
        Self(None)
    }

    /// The wrapped time, if any.
    pub const fn time(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    /// JSON form: an ISO-8601 string, or `null` for the unset instant.
    pub fn to_json(&self) -> Value {
        self.0.map_or(Value::Null, |t| Value::String(format_time(&t)))
    }
}

/// A closed time interval. `start <= end` always holds for intervals read
/// from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeInterval {
    /// Start of the interval.
    pub start: DateTime<Utc>,
    /// End of the interval.
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    /// JSON form: `"<start>/<end>"`.
    pub fn to_json(&self) -> Value {
        Value::String(format!(
            "{}/{}",
            format_time(&self.start),
            format_time(&self.end)
        ))
    }
}

/// Either an instant or an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeValue {
    /// A single point in time.
    Instant(TimeInstant),
    /// A time span.
    Interval(TimeInterval),
}

impl TimeValue {
    /// JSON form of the wrapped value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Instant(instant) => instant.to_json(),
            Self::Interval(interval) => interval.to_json(),
        }
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn instant_formats_as_utc_millis() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).single();
        let instant = TimeInstant(t);
        assert_eq!(
            instant.to_json(),
            Value::String("2024-03-01T12:30:00.000Z".to_owned())
        );
        assert_eq!(TimeInstant::unset().to_json(), Value::Null);
    }

    #[test]
    fn interval_formats_with_slash() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).single();
        let (Some(start), Some(end)) = (start, end) else {
            return;
        };
        let value = TimeValue::Interval(TimeInterval { start, end });
        assert_eq!(
            value.to_json(),
            Value::String("2024-01-01T00:00:00.000Z/2024-01-02T00:00:00.000Z".to_owned())
        );
    }
}
