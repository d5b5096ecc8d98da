//! Version stamping for rescoped packages

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Run-wide versioning choice. Never mixed within one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionStrategy {
    /// Every manifest gets this version and aliases pin it
    Fixed(String),
    /// Every manifest is stamped from the clock at rewrite time; aliases use `*`
    Timestamp,
}

impl VersionStrategy {
    /// `Fixed` for a non-blank configured version, `Timestamp` otherwise
    pub fn from_config(version: Option<&str>) -> Self {
        match version.map(str::trim) {
            Some(v) if !v.is_empty() => Self::Fixed(v.to_string()),
            _ => Self::Timestamp,
        }
    }

    /// Version for the next manifest
    pub fn stamp(&self) -> String {
        self.stamp_at(Utc::now())
    }

    pub fn stamp_at(&self, now: DateTime<Utc>) -> String {
        match self {
            Self::Fixed(version) => version.clone(),
            Self::Timestamp => timestamp_version(now),
        }
    }

    /// Version placed in alias specifiers (`None` means wildcard)
    pub fn alias_version(&self) -> Option<&str> {
        match self {
            Self::Fixed(version) => Some(version),
            Self::Timestamp => None,
        }
    }
}

/// `{year}.{month0}.{day}-{hour}{minute}{second}` in UTC.
///
/// The month is zero-based and no field is zero-padded, so the value is
/// neither unique within a second nor guaranteed to sort monotonically.
pub fn timestamp_version(now: DateTime<Utc>) -> String {
    format!(
        "{}.{}.{}-{}{}{}",
        now.year(),
        now.month0(),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_version_format() {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 3, 4, 9).unwrap();
        assert_eq!(timestamp_version(now), "2024.0.5-349");
    }

    #[test]
    fn test_timestamp_version_december() {
        let now = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 58).unwrap();
        assert_eq!(timestamp_version(now), "2023.11.31-235958");
    }

    #[test]
    fn test_fixed_strategy() {
        let strategy = VersionStrategy::from_config(Some(" 9.9.9 "));
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 3, 4, 9).unwrap();

        assert_eq!(strategy, VersionStrategy::Fixed("9.9.9".to_string()));
        assert_eq!(strategy.stamp_at(now), "9.9.9");
        assert_eq!(strategy.alias_version(), Some("9.9.9"));
    }

    #[test]
    fn test_timestamp_strategy() {
        let strategy = VersionStrategy::from_config(Some("   "));
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        assert_eq!(strategy, VersionStrategy::Timestamp);
        assert_eq!(strategy.stamp_at(now), "2024.5.1-1200");
        assert_eq!(strategy.alias_version(), None);
        assert_eq!(VersionStrategy::from_config(None), VersionStrategy::Timestamp);
    }
}
