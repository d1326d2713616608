use chrono::{DateTime, NaiveDate, NaiveDateTime};

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parses the timestamp shapes the platform and older state files emit.
///
/// Offsets are folded into UTC; naive values are assumed to already be UTC.
pub(crate) fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, ISO_FORMAT) {
        return Some(dt);
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    None
}

pub(crate) fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(ISO_FORMAT).to_string()
}
