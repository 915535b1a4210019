//! Helpers for building and applying `FindingFilter` values.

pub use crate::storage::types::FindingFilter;
use crate::storage::types::Finding;
use chrono::{DateTime, Utc};

/// Build a `FindingFilter` that matches findings for an exact host.
pub fn by_host<S: Into<String>>(host: S) -> FindingFilter {
    FindingFilter {
        host: Some(host.into()),
        ..Default::default()
    }
}

/// Build a `FindingFilter` that matches findings captured at or after `since`.
pub fn since(since: DateTime<Utc>) -> FindingFilter {
    FindingFilter {
        since: Some(since),
        ..Default::default()
    }
}

impl FindingFilter {
    /// In-memory evaluation of the filter, used by backends without a query language.
    pub fn matches(&self, finding: &Finding) -> bool {
        let millis = finding.captured_at_epoch_millis;
        if let Some(since) = self.since {
            if millis < since.timestamp_millis() {
                return false;
            }
        }
        if let Some(until) = self.until {
            if millis > until.timestamp_millis() {
                return false;
            }
        }
        if let Some(ref host) = self.host {
            if finding.host.as_deref() != Some(host.as_bytes()) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn finding_at(millis: i64, host: &str) -> Finding {
        Finding {
            captured_at_epoch_millis: millis,
            timezone_id: "UTC".into(),
            request_path: None,
            host: Some(host.as_bytes().to_vec()),
            referer: None,
        }
    }

    #[test]
    fn test_default_filter_matches_everything() {
        assert!(FindingFilter::default().matches(&finding_at(0, "x.com")));
    }

    #[test]
    fn test_host_filter() {
        let filter = by_host("x.com");
        assert!(filter.matches(&finding_at(0, "x.com")));
        assert!(!filter.matches(&finding_at(0, "y.com")));
    }

    #[test]
    fn test_time_window() {
        let start = Utc.timestamp_millis_opt(1_000).unwrap();
        let end = Utc.timestamp_millis_opt(2_000).unwrap();
        let filter = FindingFilter {
            since: Some(start),
            until: Some(end),
            host: None,
        };
        assert!(!filter.matches(&finding_at(999, "x.com")));
        assert!(filter.matches(&finding_at(1_000, "x.com")));
        assert!(filter.matches(&finding_at(2_000, "x.com")));
        assert!(!filter.matches(&finding_at(2_001, "x.com")));
        assert!(since(start).matches(&finding_at(5_000, "x.com")));
    }
}
