//! Timestamp resolution: raw store strings into absolute instants.
//!
//! The hosted store keeps timestamps as free-form strings. Some carry a `Z` or
//! an explicit offset, many are bare wall-clock times typed by users in the
//! business's home timezone. `TimeResolver` turns all of them into
//! `DateTime<Utc>` so nothing downstream ever sees an ambiguous local time.

use std::fmt;

use chrono::{
    DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone,
    Utc,
};
use chrono_tz::Tz;
use thiserror::Error;

/// Explicit-zone formats, tried after RFC 3339. `Z` is normalized to `+00:00`
/// and a space separator to `T` before these are tried.
const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M",
    "%Y/%m/%d %H:%M",
];

const FALLBACK_DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d.%m.%Y", "%Y/%m/%d"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("empty timestamp")]
    Empty,

    #[error("unparseable timestamp {0:?}")]
    Unparseable(String),

    #[error("invalid utc offset {0:?} (expected e.g. \"+02:00\")")]
    InvalidOffset(String),

    #[error("unknown timezone {0:?} (expected an IANA name such as \"Europe/Berlin\" or an offset such as \"+02:00\")")]
    UnknownZone(String),
}

/// The business's home zone: a named IANA zone (with its DST rules) or a
/// fixed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeZone {
    Fixed(FixedOffset),
    Named(Tz),
}

impl HomeZone {
    /// `"Europe/Berlin"`, `"+02:00"`, `"Z"` or `"UTC"`.
    pub fn parse(raw: &str) -> Result<Self, TimeError> {
        let s = raw.trim();
        if s.starts_with(['+', '-']) || s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
            return parse_utc_offset(s).map(HomeZone::Fixed);
        }
        s.parse::<Tz>()
            .map(HomeZone::Named)
            .map_err(|_| TimeError::UnknownZone(raw.to_string()))
    }
}

impl From<FixedOffset> for HomeZone {
    fn from(offset: FixedOffset) -> Self {
        HomeZone::Fixed(offset)
    }
}

impl From<Tz> for HomeZone {
    fn from(tz: Tz) -> Self {
        HomeZone::Named(tz)
    }
}

impl fmt::Display for HomeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomeZone::Fixed(offset) => offset.fmt(f),
            HomeZone::Named(tz) => f.write_str(tz.name()),
        }
    }
}

/// How a raw string was interpreted. Useful for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpretation {
    /// Carried `Z` or an explicit offset.
    Explicit,
    /// Wall-clock time in the home zone.
    Local,
    /// Calendar date only; the caller's default time of day was applied.
    DateOnly,
    /// Matched only by the best-effort fallback formats.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub instant: DateTime<Utc>,
    pub interpretation: Interpretation,
}

/// Parses raw timestamps against one configured home timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeResolver {
    home: HomeZone,
}

impl TimeResolver {
    pub fn new(home: impl Into<HomeZone>) -> Self {
        Self { home: home.into() }
    }

    /// Resolver for a configured zone string, see [`HomeZone::parse`].
    pub fn from_zone_str(zone: &str) -> Result<Self, TimeError> {
        HomeZone::parse(zone).map(Self::new)
    }

    pub fn home(&self) -> HomeZone {
        self.home
    }

    /// Resolve `raw` to an absolute instant. A date-only value means local midnight.
    pub fn resolve(&self, raw: &str) -> Result<DateTime<Utc>, TimeError> {
        self.resolve_detailed(raw, NaiveTime::default()).map(|r| r.instant)
    }

    /// Like [`resolve`](Self::resolve), but a date-only value gets
    /// `default_time` as its local time of day.
    pub fn resolve_with_default_time(
        &self,
        raw: &str,
        default_time: NaiveTime,
    ) -> Result<DateTime<Utc>, TimeError> {
        self.resolve_detailed(raw, default_time).map(|r| r.instant)
    }

    pub fn resolve_detailed(
        &self,
        raw: &str,
        default_time: NaiveTime,
    ) -> Result<Resolved, TimeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TimeError::Empty);
        }

        if let Some(instant) = parse_explicit(trimmed) {
            return Ok(Resolved {
                instant,
                interpretation: Interpretation::Explicit,
            });
        }

        let normalized = normalize_separator(trimmed);
        for fmt in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, fmt) {
                return self.localize(naive, Interpretation::Local, trimmed);
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return self.localize(date.and_time(default_time), Interpretation::DateOnly, trimmed);
        }

        self.fallback(trimmed, default_time)
    }

    /// Wall-clock `naive` in the home zone as an absolute instant.
    ///
    /// A repeated hour (clocks going back) takes the earlier instant. A skipped
    /// hour (clocks going forward) is read one hour later, so 02:30 on a
    /// spring-forward night lands on 03:30 local.
    pub fn local_to_utc(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self.home {
            HomeZone::Fixed(offset) => earliest_utc(&offset, naive),
            HomeZone::Named(tz) => earliest_utc(&tz, naive),
        }
    }

    /// Home-zone wall clock at `instant`.
    pub fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self.home {
            HomeZone::Fixed(offset) => instant.with_timezone(&offset).naive_local(),
            HomeZone::Named(tz) => instant.with_timezone(&tz).naive_local(),
        }
    }

    /// Render an instant as home-zone wall-clock text for message bodies.
    pub fn format_local(&self, instant: DateTime<Utc>) -> String {
        self.to_local(instant).format("%Y-%m-%d %H:%M").to_string()
    }

    fn localize(
        &self,
        naive: NaiveDateTime,
        interpretation: Interpretation,
        raw: &str,
    ) -> Result<Resolved, TimeError> {
        self.local_to_utc(naive)
            .map(|instant| Resolved {
                instant,
                interpretation,
            })
            .ok_or_else(|| TimeError::Unparseable(raw.to_string()))
    }

    fn fallback(&self, raw: &str, default_time: NaiveTime) -> Result<Resolved, TimeError> {
        tracing::debug!(raw, "timestamp did not match a primary format, trying fallbacks");

        if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
            return Ok(Resolved {
                instant: dt.with_timezone(&Utc),
                interpretation: Interpretation::Fallback,
            });
        }
        for fmt in FALLBACK_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
                return self.localize(naive, Interpretation::Fallback, raw);
            }
        }
        for fmt in FALLBACK_DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
                return self.localize(date.and_time(default_time), Interpretation::Fallback, raw);
            }
        }
        if let Some(instant) = parse_epoch(raw) {
            return Ok(Resolved {
                instant,
                interpretation: Interpretation::Fallback,
            });
        }

        Err(TimeError::Unparseable(raw.to_string()))
    }
}

fn earliest_utc<Z: TimeZone>(zone: &Z, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    let local = match zone.from_local_datetime(&naive) {
        LocalResult::None => zone
            .from_local_datetime(&naive.checked_add_signed(TimeDelta::hours(1))?)
            .earliest(),
        other => other.earliest(),
    }?;
    Some(local.with_timezone(&Utc))
}

fn parse_explicit(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let mut normalized = normalize_separator(raw);
    if normalized.ends_with('Z') || normalized.ends_with('z') {
        normalized.pop();
        normalized.push_str("+00:00");
    }
    ZONED_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(&normalized, fmt).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// `2024-03-10 09:00` -> `2024-03-10T09:00`
fn normalize_separator(raw: &str) -> String {
    let bytes = raw.as_bytes();
    if bytes.len() > 10 && bytes[10] == b' ' {
        let mut s = String::with_capacity(raw.len());
        s.push_str(&raw[..10]);
        s.push('T');
        s.push_str(raw[11..].trim_start());
        s
    } else {
        raw.to_string()
    }
}

fn parse_epoch(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: i64 = raw.parse().ok()?;
    // 12+ digits can only be milliseconds for any plausible date
    if raw.len() >= 12 {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

/// Parse `"+02:00"`, `"-0530"`, `"+3"`, `"Z"` or `"UTC"` into a fixed offset.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, TimeError> {
    let s = raw.trim();
    let invalid = || TimeError::InvalidOffset(raw.to_string());

    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => return Err(invalid()),
    };
    if !rest.is_ascii() {
        return Err(invalid());
    }
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveTime, Timelike};
    use rand::Rng;
    use rstest::rstest;

    fn resolver(offset: &str) -> TimeResolver {
        TimeResolver::from_zone_str(offset).unwrap()
    }

    fn nine() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 0, 0).unwrap()
    }

    #[rstest]
    #[case("+02:00", 2 * 3600)]
    #[case("-05:30", -(5 * 3600 + 30 * 60))]
    #[case("+0330", 3 * 3600 + 30 * 60)]
    #[case("+3", 3 * 3600)]
    #[case("Z", 0)]
    #[case("UTC", 0)]
    fn parses_offsets(#[case] raw: &str, #[case] seconds: i32) {
        assert_eq!(parse_utc_offset(raw).unwrap().local_minus_utc(), seconds);
    }

    #[rstest]
    #[case("")]
    #[case("02:00")]
    #[case("+25:00")]
    #[case("+02:75")]
    #[case("+xx")]
    #[case("+1é2")]
    #[case("-é")]
    fn rejects_bad_offsets(#[case] raw: &str) {
        assert!(matches!(parse_utc_offset(raw), Err(TimeError::InvalidOffset(_))));
    }

    #[rstest]
    #[case("2024-03-10T09:00:00Z", Interpretation::Explicit)]
    #[case("2024-03-10T09:00:00.123Z", Interpretation::Explicit)]
    #[case("2024-03-10T11:00:00+02:00", Interpretation::Explicit)]
    #[case("2024-03-10 11:00:00+02:00", Interpretation::Explicit)]
    #[case("2024-03-10T09:00Z", Interpretation::Explicit)]
    #[case("2024-03-10T11:00+0200", Interpretation::Explicit)]
    #[case("2024-03-10T11:00:00", Interpretation::Local)]
    #[case("2024-03-10T11:00", Interpretation::Local)]
    #[case("2024-03-10 11:00", Interpretation::Local)]
    #[case("2024-03-10T11:00:00.000", Interpretation::Local)]
    #[case("10/03/2024 11:00", Interpretation::Fallback)]
    #[case("1710061200", Interpretation::Fallback)]
    #[case("1710061200000", Interpretation::Fallback)]
    fn every_form_lands_on_the_same_instant(
        #[case] raw: &str,
        #[case] interpretation: Interpretation,
    ) {
        let expected = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        let resolved = resolver("+02:00").resolve_detailed(raw, NaiveTime::default()).unwrap();
        assert_eq!(resolved.instant.with_nanosecond(0).unwrap(), expected);
        assert_eq!(resolved.interpretation, interpretation);
    }

    #[test]
    fn date_only_uses_the_default_time_of_day() {
        let r = resolver("+02:00");
        assert_eq!(
            r.resolve("2024-03-10").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 9, 22, 0, 0).unwrap()
        );
        assert_eq!(
            r.resolve_with_default_time("2024-03-10", nine()).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap()
        );
    }

    #[test]
    fn garbage_is_an_error_not_a_panic() {
        let r = resolver("+02:00");
        assert_eq!(r.resolve("   "), Err(TimeError::Empty));
        assert!(matches!(r.resolve("next tuesday"), Err(TimeError::Unparseable(_))));
    }

    #[rstest]
    #[case("Europe/Berlin", HomeZone::Named(chrono_tz::Europe::Berlin))]
    #[case("America/New_York", HomeZone::Named(chrono_tz::America::New_York))]
    #[case("+02:00", HomeZone::Fixed(FixedOffset::east_opt(7200).unwrap()))]
    #[case("UTC", HomeZone::Fixed(FixedOffset::east_opt(0).unwrap()))]
    fn parses_home_zones(#[case] raw: &str, #[case] zone: HomeZone) {
        assert_eq!(HomeZone::parse(raw).unwrap(), zone);
    }

    #[test]
    fn unknown_zone_name_is_rejected() {
        assert!(matches!(
            HomeZone::parse("Mars/Olympus_Mons"),
            Err(TimeError::UnknownZone(_))
        ));
        assert!(matches!(HomeZone::parse("+99:00"), Err(TimeError::InvalidOffset(_))));
    }

    // Europe/Berlin: CET (+01:00) until 2024-03-31 02:00, CEST (+02:00) until
    // 2024-10-27 03:00.
    #[rstest]
    #[case::winter("2024-01-15T09:00", (2024, 1, 15, 8, 0))]
    #[case::day_before_spring_forward("2024-03-30T09:00", (2024, 3, 30, 8, 0))]
    #[case::day_of_spring_forward("2024-03-31T09:00", (2024, 3, 31, 7, 0))]
    #[case::summer("2024-07-01T09:00", (2024, 7, 1, 7, 0))]
    #[case::day_after_fall_back("2024-10-28T09:00", (2024, 10, 28, 8, 0))]
    #[case::skipped_hour_moves_forward("2024-03-31T02:30", (2024, 3, 31, 1, 30))]
    #[case::repeated_hour_takes_earliest("2024-10-27T02:30", (2024, 10, 27, 0, 30))]
    fn named_zone_follows_daylight_saving(
        #[case] raw: &str,
        #[case] expected: (i32, u32, u32, u32, u32),
    ) {
        let (y, m, d, h, min) = expected;
        assert_eq!(
            resolver("Europe/Berlin").resolve(raw).unwrap(),
            Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
        );
    }

    #[test]
    fn date_only_default_time_follows_daylight_saving() {
        let r = resolver("Europe/Berlin");
        assert_eq!(
            r.resolve_with_default_time("2024-01-15", nine()).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap()
        );
        assert_eq!(
            r.resolve_with_default_time("2024-07-01", nine()).unwrap(),
            Utc.with_ymd_and_hms(2024, 7, 1, 7, 0, 0).unwrap()
        );
        assert_eq!(
            r.format_local(Utc.with_ymd_and_hms(2024, 7, 1, 7, 0, 0).unwrap()),
            "2024-07-01 09:00"
        );
    }

    #[test]
    fn explicit_offset_ignores_named_zone() {
        assert_eq!(
            resolver("Europe/Berlin").resolve("2024-07-01T09:00:00Z").unwrap(),
            Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn format_local_renders_home_wall_clock() {
        let r = resolver("+02:00");
        let instant = Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap();
        assert_eq!(r.format_local(instant), "2024-03-10 09:00");
    }

    // Property: a naive string resolves to the same instant as the same string
    // annotated with the configured offset.
    #[test]
    fn naive_equals_explicitly_annotated_for_random_instants() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let offset_minutes: i32 = rng.gen_range(-12 * 60..=14 * 60);
            let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap();
            let r = TimeResolver::new(offset);

            let secs: i64 = rng.gen_range(0..4_102_444_800);
            let naive = DateTime::from_timestamp(secs, 0).unwrap().naive_utc();
            let wall = naive.format("%Y-%m-%dT%H:%M:%S").to_string();
            let annotated = format!("{wall}{offset}");

            assert_eq!(
                r.resolve(&wall).unwrap(),
                r.resolve(&annotated).unwrap(),
                "wall={wall} annotated={annotated}"
            );
            assert_eq!(
                r.resolve(&wall).unwrap(),
                DateTime::parse_from_rfc3339(&annotated).unwrap().with_timezone(&Utc)
            );
        }
    }

    // Property: explicit zones ignore the configured home zone entirely.
    #[test]
    fn explicit_zone_ignores_configured_zone_for_random_instants() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let secs: i64 = rng.gen_range(0..4_102_444_800);
            let instant = DateTime::from_timestamp(secs, 0).unwrap();
            let marker_offset =
                FixedOffset::east_opt(rng.gen_range(-12 * 60..=14 * 60) * 60).unwrap();
            let with_z = instant.format("%Y-%m-%dT%H:%M:%SZ").to_string();
            let with_offset = instant.with_timezone(&marker_offset).to_rfc3339();

            let a = TimeResolver::new(FixedOffset::east_opt(rng.gen_range(-43_200..=50_400)).unwrap());
            let b = TimeResolver::new(FixedOffset::east_opt(rng.gen_range(-43_200..=50_400)).unwrap());

            assert_eq!(a.resolve(&with_z).unwrap(), instant);
            assert_eq!(b.resolve(&with_z).unwrap(), instant);
            assert_eq!(a.resolve(&with_offset).unwrap(), instant);
            assert_eq!(b.resolve(&with_offset).unwrap(), instant);
        }
    }

    #[test]
    fn resolution_is_pure() {
        let r = resolver("+05:30");
        let first = r.resolve("2024-07-01 18:45").unwrap();
        let second = r.resolve("2024-07-01 18:45").unwrap();
        assert_eq!(first, second);
        assert_eq!(first + Duration::minutes(330), Utc.with_ymd_and_hms(2024, 7, 1, 18, 45, 0).unwrap());
    }
}
