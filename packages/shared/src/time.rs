use chrono::{DateTime, SecondsFormat, Utc};

/// Current time in UTC.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp as RFC 3339 with microsecond precision, e.g.
/// `2024-05-01T12:00:00.123456+00:00`.
pub fn to_rfc3339(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, false)
}
