use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};

/// Offset used when none is configured (IST, UTC+05:30).
pub const DEFAULT_MATCH_DAY_OFFSET_MINUTES: i32 = 330;

/// Derives the calendar "match day" that daily matches are keyed by.
///
/// Keeping the offset in one place avoids disagreements between the store's
/// `match_date` column and application code.
#[derive(Debug, Clone, Copy)]
pub struct MatchDayClock {
    offset: FixedOffset,
}

impl Default for MatchDayClock {
    fn default() -> Self {
        Self::from_offset_minutes(DEFAULT_MATCH_DAY_OFFSET_MINUTES)
    }
}

impl MatchDayClock {
    /// Out-of-range offsets fall back to UTC.
    pub fn from_offset_minutes(minutes: i32) -> Self {
        let offset = FixedOffset::east_opt(minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    pub fn offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }

    pub fn match_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    pub fn days_ago(&self, now: DateTime<Utc>, days: i64) -> NaiveDate {
        self.match_date(now) - Duration::days(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn match_day_follows_offset() {
        let clock = MatchDayClock::from_offset_minutes(330);
        let late_utc = Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap();
        assert_eq!(
            clock.match_date(late_utc),
            NaiveDate::from_ymd_opt(2025, 3, 2).unwrap()
        );

        let utc = MatchDayClock::from_offset_minutes(0);
        assert_eq!(
            utc.match_date(late_utc),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
    }

    #[test]
    fn invalid_offset_falls_back_to_utc() {
        let clock = MatchDayClock::from_offset_minutes(100_000);
        assert_eq!(clock.offset_minutes(), 0);
    }

    #[test]
    fn days_ago_counts_calendar_days() {
        let clock = MatchDayClock::from_offset_minutes(0);
        let now = Utc.with_ymd_and_hms(2025, 3, 8, 12, 0, 0).unwrap();
        assert_eq!(
            clock.days_ago(now, 7),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
    }
}
