//! Time zone helpers for date-range filters.
//!
//! Records are stored with RFC-3339 UTC timestamps (millisecond precision, so
//! they sort lexicographically). Users, however, pick *local calendar days*
//! when they filter history. [`DayRange`] turns a pair of local dates into
//! the UTC instants `[start 00:00:00, end 23:59:59.999]`.
//!
//! Local midnight does not exist in every zone on every day (some zones
//! switch DST at 00:00), so day starts are resolved with
//! [`DstPolicy::ShiftForward`] and day ends with [`DstPolicy::PreferLatest`].

use anyhow::{Context, bail};
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// RFC-3339 with offset -> UTC.
pub fn parse_ts_to_utc(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let dt = DateTime::parse_from_rfc3339(s).with_context(|| format!("bad rfc3339: {s}"))?;
    Ok(dt.with_timezone(&Utc))
}

/// Format a UTC datetime as an RFC-3339 string with millisecond precision.
pub fn to_rfc3339_millis(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn parse_tz(name: &str) -> anyhow::Result<Tz> {
    name.trim().parse::<Tz>().map_err(|e| anyhow::anyhow!("bad tz `{name}`: {e}"))
}

/// How to resolve local wall times that DST makes ambiguous or skips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DstPolicy {
    /// Error on ambiguous or nonexistent local times.
    Strict,
    PreferEarliest,
    PreferLatest,
    /// Step forward a minute at a time (max 2 hours) out of a DST gap.
    /// Ambiguous times pick the earliest instant.
    ShiftForward,
}

pub fn from_local_naive_with_policy(
    naive: NaiveDateTime,
    tz: Tz,
    policy: DstPolicy,
) -> anyhow::Result<DateTime<Utc>> {
    use chrono::offset::LocalResult::*;
    match tz.from_local_datetime(&naive) {
        Single(dt) => Ok(dt.with_timezone(&Utc)),
        Ambiguous(a, b) => match policy {
            DstPolicy::PreferEarliest | DstPolicy::ShiftForward => Ok(a.with_timezone(&Utc)),
            DstPolicy::PreferLatest => Ok(b.with_timezone(&Utc)),
            DstPolicy::Strict => bail!("ambiguous local time {naive} in {tz}"),
        },
        None => {
            if policy != DstPolicy::ShiftForward {
                bail!("nonexistent local time {naive} in {tz}");
            }
            let mut t = naive;
            for _ in 0..120 {
                t += chrono::Duration::minutes(1);
                if let Single(dt) = tz.from_local_datetime(&t) {
                    return Ok(dt.with_timezone(&Utc));
                }
            }
            bail!("nonexistent local time {naive} in {tz}")
        }
    }
}

/// Calendar date "today" in `tz` at instant `now`.
pub fn local_today(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Inclusive range of local calendar days, resolved to UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayRange {
    /// `from 00:00:00.000` through `to 23:59:59.999`, both local to `tz`.
    pub fn local(from: NaiveDate, to: NaiveDate, tz: Tz) -> anyhow::Result<Self> {
        if from > to {
            bail!("date range starts after it ends ({from} > {to})");
        }
        let start = from_local_naive_with_policy(from.and_time(NaiveTime::MIN), tz, DstPolicy::ShiftForward)?;
        let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).context("end of day")?;
        let end = from_local_naive_with_policy(to.and_time(end_of_day), tz, DstPolicy::PreferLatest)?;
        Ok(Self { start, end })
    }

    /// The `days` calendar days before today, plus today.
    pub fn last_days(days: u64, tz: Tz, now: DateTime<Utc>) -> anyhow::Result<Self> {
        let today = local_today(tz, now);
        let from = today
            .checked_sub_days(Days::new(days))
            .context("date range out of bounds")?;
        Self::local(from, today, tz)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_rfc3339_offset_to_utc() {
        let got = parse_ts_to_utc("2024-03-10T09:30:00-05:00").unwrap();
        assert_eq!(got, Utc.with_ymd_and_hms(2024, 3, 10, 14, 30, 0).unwrap());
    }

    #[test]
    fn millis_format_sorts_lexicographically() {
        let a = to_rfc3339_millis(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        assert_eq!(a, "2024-01-02T03:04:05.000Z");
        let b = to_rfc3339_millis(Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap());
        assert!(a < b);
    }

    #[test]
    fn utc_day_range() {
        let r = DayRange::local(date(2025, 5, 1), date(2025, 5, 3), Tz::UTC).unwrap();
        assert_eq!(to_rfc3339_millis(r.start), "2025-05-01T00:00:00.000Z");
        assert_eq!(to_rfc3339_millis(r.end), "2025-05-03T23:59:59.999Z");
    }

    #[test]
    fn nairobi_day_range_is_shifted() {
        let tz = parse_tz("Africa/Nairobi").unwrap();
        let r = DayRange::local(date(2025, 5, 1), date(2025, 5, 1), tz).unwrap();
        assert_eq!(to_rfc3339_millis(r.start), "2025-04-30T21:00:00.000Z");
        assert_eq!(to_rfc3339_millis(r.end), "2025-05-01T20:59:59.999Z");
    }

    #[test]
    fn reversed_range_is_rejected() {
        assert!(DayRange::local(date(2025, 5, 3), date(2025, 5, 1), Tz::UTC).is_err());
    }

    #[test]
    fn last_week_covers_eight_calendar_days() {
        let now = Utc.with_ymd_and_hms(2025, 5, 8, 10, 0, 0).unwrap();
        let r = DayRange::last_days(7, Tz::UTC, now).unwrap();
        assert_eq!(to_rfc3339_millis(r.start), "2025-05-01T00:00:00.000Z");
        assert!(r.contains(now));
    }

    #[test]
    fn ny_spring_forward_gap() {
        let tz = parse_tz("America/New_York").unwrap();
        let naive = date(2024, 3, 10).and_hms_opt(2, 30, 0).unwrap();
        assert!(from_local_naive_with_policy(naive, tz, DstPolicy::Strict).is_err());
        let got = from_local_naive_with_policy(naive, tz, DstPolicy::ShiftForward).unwrap();
        assert_eq!(got, Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap());
    }

    #[test]
    fn ny_fall_back_prefer_earliest_and_latest() {
        let tz = parse_tz("America/New_York").unwrap();
        let naive = date(2024, 11, 3).and_hms_opt(1, 30, 0).unwrap();
        let early = from_local_naive_with_policy(naive, tz, DstPolicy::PreferEarliest).unwrap();
        let late = from_local_naive_with_policy(naive, tz, DstPolicy::PreferLatest).unwrap();
        assert_eq!(early, Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap());
        assert_eq!(late, Utc.with_ymd_and_hms(2024, 11, 3, 6, 30, 0).unwrap());
    }

    #[test]
    fn bad_zone_name() {
        assert!(parse_tz("Mars/Olympus").is_err());
    }
}
