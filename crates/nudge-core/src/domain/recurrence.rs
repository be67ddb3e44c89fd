//! Next-occurrence arithmetic for recurring standalone reminders.

use chrono::{DateTime, Days, Months, NaiveTime, Utc};

use super::entity::{Frequency, Recurrence};
use super::time::TimeResolver;

/// What to do after a recurring reminder fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextOccurrence {
    /// Create a successor due at this instant.
    At(DateTime<Utc>),
    /// The successor would fall after the recurrence end date.
    PastEnd,
    /// Recurrence absent or disabled.
    NotRecurring,
}

impl Recurrence {
    /// Step `due_at` forward by `interval` units of `frequency`.
    ///
    /// Steps are taken on the home-zone wall clock, so a weekly reminder at
    /// 09:00 local stays at 09:00 local across a DST change; month ends are
    /// clamped (Jan 31 -> Feb 29). `None` when the step overflows.
    pub fn step(&self, due_at: DateTime<Utc>, resolver: &TimeResolver) -> Option<DateTime<Utc>> {
        let interval = self.interval.max(1);
        let local = resolver.to_local(due_at);
        let next = match self.frequency {
            Frequency::Daily => local.checked_add_days(Days::new(u64::from(interval))),
            Frequency::Weekly => {
                local.checked_add_days(Days::new(u64::from(interval).checked_mul(7)?))
            }
            Frequency::Monthly => local.checked_add_months(Months::new(interval)),
            Frequency::Yearly => local.checked_add_months(Months::new(interval.checked_mul(12)?)),
        }?;
        resolver.local_to_utc(next)
    }

    /// Last instant a successor may be due at. A date-only end date covers
    /// the whole local day.
    pub fn end_bound(&self, resolver: &TimeResolver) -> Option<DateTime<Utc>> {
        let raw = self.end_date.as_deref()?;
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59)?;
        match resolver.resolve_detailed(raw, end_of_day) {
            Ok(resolved) => Some(resolved.instant),
            Err(err) => {
                tracing::warn!(raw, %err, "ignoring unparseable recurrence end date");
                None
            }
        }
    }

    pub fn next_after(&self, due_at: DateTime<Utc>, resolver: &TimeResolver) -> NextOccurrence {
        if !self.enabled {
            return NextOccurrence::NotRecurring;
        }
        let Some(next) = self.step(due_at, resolver) else {
            return NextOccurrence::PastEnd;
        };
        match self.end_bound(resolver) {
            Some(end) if next > end => NextOccurrence::PastEnd,
            _ => NextOccurrence::At(next),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn resolver() -> TimeResolver {
        TimeResolver::from_zone_str("+02:00").unwrap()
    }

    fn weekly(end: Option<&str>) -> Recurrence {
        Recurrence {
            enabled: true,
            frequency: Frequency::Weekly,
            interval: 1,
            end_date: end.map(str::to_string),
        }
    }

    #[rstest]
    #[case(Frequency::Daily, 1, (2024, 3, 11, 7))]
    #[case(Frequency::Daily, 3, (2024, 3, 13, 7))]
    #[case(Frequency::Weekly, 2, (2024, 3, 24, 7))]
    #[case(Frequency::Monthly, 1, (2024, 4, 10, 7))]
    #[case(Frequency::Yearly, 1, (2025, 3, 10, 7))]
    fn steps_on_the_local_calendar(
        #[case] frequency: Frequency,
        #[case] interval: u32,
        #[case] expected: (i32, u32, u32, u32),
    ) {
        let rule = Recurrence {
            enabled: true,
            frequency,
            interval,
            end_date: None,
        };
        let due = Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap();
        let (y, m, d, h) = expected;
        assert_eq!(
            rule.step(due, &resolver()),
            Some(Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap())
        );
    }

    #[test]
    fn monthly_clamps_to_month_end() {
        let rule = Recurrence {
            enabled: true,
            frequency: Frequency::Monthly,
            interval: 1,
            end_date: None,
        };
        // Jan 31 09:00 local
        let due = Utc.with_ymd_and_hms(2024, 1, 31, 7, 0, 0).unwrap();
        assert_eq!(
            rule.step(due, &resolver()),
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 7, 0, 0).unwrap())
        );
    }

    #[test]
    fn end_date_exactly_one_week_later_allows_exactly_one_successor() {
        let r = resolver();
        let rule = weekly(Some("2024-03-17"));
        let due = Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap();

        let NextOccurrence::At(first) = rule.next_after(due, &r) else {
            panic!("expected a successor");
        };
        assert_eq!(first, Utc.with_ymd_and_hms(2024, 3, 17, 7, 0, 0).unwrap());
        assert_eq!(rule.next_after(first, &r), NextOccurrence::PastEnd);
    }

    #[test]
    fn end_timestamp_equal_to_next_is_inclusive() {
        let r = resolver();
        let rule = weekly(Some("2024-03-17T09:00:00"));
        let due = Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap();
        assert!(matches!(rule.next_after(due, &r), NextOccurrence::At(_)));
    }

    #[test]
    fn disabled_rule_never_recurs() {
        let mut rule = weekly(None);
        rule.enabled = false;
        let due = Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap();
        assert_eq!(rule.next_after(due, &resolver()), NextOccurrence::NotRecurring);
    }

    #[test]
    fn weekly_step_keeps_local_time_across_spring_forward() {
        let berlin = TimeResolver::new(chrono_tz::Europe::Berlin);
        let rule = weekly(None);
        // 09:00 CET
        let due = Utc.with_ymd_and_hms(2024, 3, 24, 8, 0, 0).unwrap();
        let next = rule.step(due, &berlin).unwrap();
        // 09:00 CEST
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 31, 7, 0, 0).unwrap());
        assert_eq!(berlin.format_local(next), "2024-03-31 09:00");
    }

    #[rstest]
    #[case(Frequency::Weekly)]
    #[case(Frequency::Yearly)]
    #[case(Frequency::Daily)]
    fn huge_interval_ends_the_series_instead_of_overflowing(#[case] frequency: Frequency) {
        let rule = Recurrence {
            enabled: true,
            frequency,
            interval: u32::MAX,
            end_date: None,
        };
        let due = Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap();
        assert_eq!(rule.step(due, &resolver()), None);
        assert_eq!(rule.next_after(due, &resolver()), NextOccurrence::PastEnd);
    }

    #[test]
    fn zero_interval_is_treated_as_one() {
        let mut rule = weekly(None);
        rule.interval = 0;
        let due = Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap();
        assert_eq!(
            rule.step(due, &resolver()),
            Some(Utc.with_ymd_and_hms(2024, 3, 17, 7, 0, 0).unwrap())
        );
    }
}
