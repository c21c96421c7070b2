pub mod headline;
pub mod source;

pub use headline::Headline;
pub use source::{Source, SourceConfig, SourceStatus};

use chrono::{DateTime, SecondsFormat, Utc};

/// Wire format for every timestamp we hand out: RFC 3339, UTC, `Z` suffix.
pub fn to_utc_string(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn utc_string_uses_z_suffix() {
        let ts = Utc.with_ymd_and_hms(2025, 9, 11, 8, 30, 0).unwrap();
        assert_eq!(to_utc_string(ts), "2025-09-11T08:30:00Z");
    }
}
