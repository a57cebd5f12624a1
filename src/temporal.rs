//! Temporal value types, their canonical ISO-8601 text, and UUID parsing.
//!
//! chrono covers instants, local dates/times and offset date-times; the
//! remaining ISO shapes (year, year-month, month-day, offset time, zoned
//! date-time, period, legacy calendar) are small value types defined here.
use std::fmt::{self, Write as _};
use std::str::FromStr;
use std::time::SystemTime;

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta, Utc,
};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

use crate::reflect::Reflect;
use crate::types::TemporalKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TemporalError(String);

impl TemporalError {
    fn invalid(what: &str, text: &str) -> Self { TemporalError(format!("not a valid {what}: {text:?}")) }
}

// -------------------------------- Offsets --------------------------------- //

fn write_offset(out: &mut String, offset: &FixedOffset) {
    let secs = offset.local_minus_utc();
    if secs == 0 {
        out.push('Z');
        return;
    }
    let sign = if secs < 0 { '-' } else { '+' };
    let abs = secs.abs();
    let _ = write!(out, "{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60);
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    if text == "Z" || text == "z" {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match text.split_at_checked(1)? {
        ("+", rest) => (1, rest),
        ("-", rest) => (-1, rest),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (h, m) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    FixedOffset::east_opt(sign * (h * 3600 + m * 60))
}

// ---------------------------------- Year ---------------------------------- //

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Year(pub i32);

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl FromStr for Year {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i32>().map(Year).map_err(|_| TemporalError::invalid("year", s))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:04}-{:02}", self.year, self.month) }
}

impl FromStr for YearMonth {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || TemporalError::invalid("year-month", s);
        let (y, m) = s.rsplit_once('-').ok_or_else(bad)?;
        let year = y.parse::<i32>().map_err(|_| bad())?;
        let month = m.parse::<u32>().map_err(|_| bad())?;
        if m.len() != 2 || !(1..=12).contains(&month) {
            return Err(bad());
        }
        Ok(YearMonth { year, month })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "--{:02}-{:02}", self.month, self.day) }
}

impl FromStr for MonthDay {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || TemporalError::invalid("month-day", s);
        let (m, d) = s.strip_prefix("--").and_then(|r| r.split_once('-')).ok_or_else(bad)?;
        let month = m.parse::<u32>().map_err(|_| bad())?;
        let day = d.parse::<u32>().map_err(|_| bad())?;
        // leap year so --02-29 is accepted
        NaiveDate::from_ymd_opt(2000, month, day).ok_or_else(bad)?;
        Ok(MonthDay { month, day })
    }
}

// ------------------------------ Offset time ------------------------------- //

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OffsetTime {
    pub time: NaiveTime,
    pub offset: FixedOffset,
}

impl fmt::Display for OffsetTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = self.time.format("%H:%M:%S%.f").to_string();
        write_offset(&mut out, &self.offset);
        f.write_str(&out)
    }
}

impl FromStr for OffsetTime {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || TemporalError::invalid("offset time", s);
        let split = s.rfind(['+', '-', 'Z', 'z']).ok_or_else(bad)?;
        let (time, offset) = s.split_at(split);
        Ok(OffsetTime {
            time: parse_local_time(time).ok_or_else(bad)?,
            offset: parse_offset(offset).ok_or_else(bad)?,
        })
    }
}

fn parse_local_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

// ---------------------------- Zoned date-time ----------------------------- //

/// Offset date-time with an optional region id, `2007-12-03T10:15:30+01:00[Europe/Paris]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ZonedDateTime {
    pub date_time: DateTime<FixedOffset>,
    pub zone: Option<String>,
}

impl fmt::Display for ZonedDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.date_time.to_rfc3339_opts(SecondsFormat::AutoSi, true))?;
        match &self.zone {
            Some(zone) => write!(f, "[{zone}]"),
            None => Ok(()),
        }
    }
}

impl FromStr for ZonedDateTime {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || TemporalError::invalid("zoned date-time", s);
        let (stamp, zone) = match s.strip_suffix(']').and_then(|r| r.split_once('[')) {
            Some((stamp, zone)) => (stamp, Some(zone.to_owned())),
            None => (s, None),
        };
        let date_time = DateTime::parse_from_rfc3339(stamp).map_err(|_| bad())?;
        Ok(ZonedDateTime { date_time, zone })
    }
}

// -------------------------------- Period ---------------------------------- //

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Period {
    pub years: i32,
    pub months: i32,
    pub days: i32,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Period::default() {
            return f.write_str("P0D");
        }
        f.write_str("P")?;
        if self.years != 0 {
            write!(f, "{}Y", self.years)?;
        }
        if self.months != 0 {
            write!(f, "{}M", self.months)?;
        }
        if self.days != 0 {
            write!(f, "{}D", self.days)?;
        }
        Ok(())
    }
}

static PERIOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([-+]?)P(?:([-+]?[0-9]+)Y)?(?:([-+]?[0-9]+)M)?(?:([-+]?[0-9]+)W)?(?:([-+]?[0-9]+)D)?$")
        .unwrap_or_else(|e| panic!("period pattern: {e}"))
});

impl FromStr for Period {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || TemporalError::invalid("period", s);
        let caps = PERIOD.captures(s).ok_or_else(bad)?;
        if (2..=5).all(|i| caps.get(i).is_none()) {
            return Err(bad());
        }
        let part = |i: usize| -> Result<i32, TemporalError> {
            caps.get(i).map_or(Ok(0), |m| m.as_str().parse::<i32>().map_err(|_| bad()))
        };
        let sign = if &caps[1] == "-" { -1 } else { 1 };
        let (weeks, days) = (part(4)?, part(5)?);
        let days = weeks.checked_mul(7).and_then(|w| w.checked_add(days)).ok_or_else(bad)?;
        Ok(Period { years: sign * part(2)?, months: sign * part(3)?, days: sign * days })
    }
}

// ------------------------------- Duration --------------------------------- //

/// ISO-8601 duration text, hours as the largest unit: `PT8H6M12.345S`.
pub fn format_duration(d: &TimeDelta) -> String {
    if d.is_zero() {
        return "PT0S".to_owned();
    }
    let total = d.num_seconds();
    let nanos = d.subsec_nanos();
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    let mut out = String::from("PT");
    if hours != 0 {
        let _ = write!(out, "{hours}H");
    }
    if minutes != 0 {
        let _ = write!(out, "{minutes}M");
    }
    if secs == 0 && nanos == 0 {
        return out;
    }
    if secs == 0 && nanos < 0 {
        out.push_str("-0");
    } else {
        let _ = write!(out, "{secs}");
    }
    if nanos != 0 {
        let frac = format!("{:09}", nanos.unsigned_abs());
        let _ = write!(out, ".{}", frac.trim_end_matches('0'));
    }
    out.push('S');
    out
}

static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^([-+]?)P(?:([-+]?[0-9]+)D)?(T(?:([-+]?[0-9]+)H)?(?:([-+]?[0-9]+)M)?(?:([-+]?)([0-9]+)(?:[.,]([0-9]{0,9}))?S)?)?$",
    )
    .unwrap_or_else(|e| panic!("duration pattern: {e}"))
});

pub fn parse_duration(s: &str) -> Result<TimeDelta, TemporalError> {
    let bad = || TemporalError::invalid("duration", s);
    let caps = DURATION.captures(s).ok_or_else(bad)?;
    let has_time = caps.get(4).is_some() || caps.get(5).is_some() || caps.get(7).is_some();
    if caps.get(3).is_some() && !has_time || caps.get(2).is_none() && !has_time {
        return Err(bad());
    }
    let num = |i: usize| -> Result<i64, TemporalError> {
        caps.get(i).map_or(Ok(0), |m| m.as_str().parse::<i64>().map_err(|_| bad()))
    };
    let sec_sign = if caps.get(6).is_some_and(|m| m.as_str() == "-") { -1 } else { 1 };
    let (days, hours, minutes, secs) = (num(2)?, num(4)?, num(5)?, num(7)?);
    let seconds = days
        .checked_mul(86_400)
        .and_then(|t| t.checked_add(hours.checked_mul(3600)?))
        .and_then(|t| t.checked_add(minutes.checked_mul(60)?))
        .and_then(|t| t.checked_add(sec_sign * secs))
        .ok_or_else(bad)?;
    let nanos = match caps.get(8) {
        Some(m) if !m.as_str().is_empty() => {
            let padded = format!("{:0<9}", m.as_str());
            sec_sign * padded.parse::<i64>().map_err(|_| bad())?
        }
        _ => 0,
    };
    let delta = TimeDelta::try_seconds(seconds)
        .and_then(|d| d.checked_add(&TimeDelta::nanoseconds(nanos)))
        .ok_or_else(bad)?;
    Ok(if &caps[1] == "-" { -delta } else { delta })
}

// ---------------------------- Legacy calendar ----------------------------- //

/// Legacy calendar value: always written as `yyyy-MM-ddTHH:mm:ss.SSS` plus offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Calendar(pub DateTime<FixedOffset>);

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&format_calendar(&self.0)) }
}

impl FromStr for Calendar {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { parse_legacy(s).map(Calendar) }
}

pub fn format_calendar(dt: &DateTime<FixedOffset>) -> String {
    let mut out = dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string();
    write_offset(&mut out, dt.offset());
    out
}

/// Fixed ISO-8601 decoder for legacy dates: full timestamps with or without
/// offset (no offset means UTC), or a bare date at midnight UTC.
pub fn parse_legacy(s: &str) -> Result<DateTime<FixedOffset>, TemporalError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    let utc = |n: NaiveDateTime| n.and_utc().fixed_offset();
    if let Ok(n) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(utc(n));
    }
    if let Ok(n) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M") {
        return Ok(utc(n));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(utc)
        .ok_or_else(|| TemporalError::invalid("date", s))
}

pub fn system_time_to_calendar(t: &SystemTime) -> DateTime<FixedOffset> { DateTime::<Utc>::from(*t).fixed_offset() }

// ------------------------------- Canonical -------------------------------- //

pub fn format_instant(t: &DateTime<Utc>) -> String { t.to_rfc3339_opts(SecondsFormat::AutoSi, true) }

pub fn format_offset_date_time(t: &DateTime<FixedOffset>) -> String { t.to_rfc3339_opts(SecondsFormat::AutoSi, true) }

pub fn format_local_date_time(t: &NaiveDateTime) -> String { t.format("%Y-%m-%dT%H:%M:%S%.f").to_string() }

pub fn format_local_date(d: &NaiveDate) -> String {
    if (0..=9999).contains(&d.year()) { d.format("%Y-%m-%d").to_string() } else { d.to_string() }
}

/// Parse `text` as the temporal type `kind` names, boxed for the deserializer.
pub(crate) fn parse_text(kind: TemporalKind, text: &str) -> Result<Box<dyn Reflect>, TemporalError> {
    let bad = |what: &str| TemporalError::invalid(what, text);
    Ok(match kind {
        TemporalKind::Instant => Box::new(
            DateTime::parse_from_rfc3339(text).map_err(|_| bad("instant"))?.with_timezone(&Utc),
        ),
        TemporalKind::LocalDate => Box::new(text.parse::<NaiveDate>().map_err(|_| bad("local date"))?),
        TemporalKind::LocalDateTime => Box::new(
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"))
                .map_err(|_| bad("local date-time"))?,
        ),
        TemporalKind::LocalTime => Box::new(parse_local_time(text).ok_or_else(|| bad("local time"))?),
        TemporalKind::OffsetTime => Box::new(text.parse::<OffsetTime>()?),
        TemporalKind::OffsetDateTime => {
            Box::new(DateTime::parse_from_rfc3339(text).map_err(|_| bad("offset date-time"))?)
        }
        TemporalKind::ZonedDateTime => Box::new(text.parse::<ZonedDateTime>()?),
        TemporalKind::Year => Box::new(text.parse::<Year>()?),
        TemporalKind::YearMonth => Box::new(text.parse::<YearMonth>()?),
        TemporalKind::MonthDay => Box::new(text.parse::<MonthDay>()?),
        TemporalKind::Duration => Box::new(parse_duration(text)?),
        TemporalKind::Period => Box::new(text.parse::<Period>()?),
        TemporalKind::Date => Box::new(SystemTime::from(parse_legacy(text)?)),
        TemporalKind::Calendar => Box::new(text.parse::<Calendar>()?),
    })
}

// --------------------------------- UUID ----------------------------------- //

static UUID_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap_or_else(|e| panic!("uuid pattern: {e}"))
});

/// Strict 36-character hyphenated form only.
pub fn parse_uuid(s: &str) -> Result<Uuid, TemporalError> {
    let bad = || TemporalError(format!("Not a valid UUID - {s}"));
    if !UUID_TEXT.is_match(s) {
        return Err(bad());
    }
    Uuid::parse_str(s).map_err(|_| bad())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_month_day_shapes() {
        assert_eq!("2019-04".parse::<YearMonth>().unwrap(), YearMonth { year: 2019, month: 4 });
        assert_eq!(YearMonth { year: 2019, month: 4 }.to_string(), "2019-04");
        assert!("2019-13".parse::<YearMonth>().is_err());
        assert_eq!("--02-29".parse::<MonthDay>().unwrap().to_string(), "--02-29");
        assert!("--02-30".parse::<MonthDay>().is_err());
        assert_eq!("1984".parse::<Year>().unwrap(), Year(1984));
    }

    #[test]
    fn offset_time_round_trip() {
        let t: OffsetTime = "10:15:30+01:00".parse().unwrap();
        assert_eq!(t.offset.local_minus_utc(), 3600);
        assert_eq!(t.to_string(), "10:15:30+01:00");
        assert_eq!("23:00:00Z".parse::<OffsetTime>().unwrap().to_string(), "23:00:00Z");
    }

    #[test]
    fn zoned_keeps_region() {
        let z: ZonedDateTime = "2007-12-03T10:15:30+01:00[Europe/Paris]".parse().unwrap();
        assert_eq!(z.zone.as_deref(), Some("Europe/Paris"));
        assert_eq!(z.to_string(), "2007-12-03T10:15:30+01:00[Europe/Paris]");
    }

    #[test]
    fn period_text() {
        let p: Period = "P1Y2M3D".parse().unwrap();
        assert_eq!(p, Period { years: 1, months: 2, days: 3 });
        assert_eq!(p.to_string(), "P1Y2M3D");
        assert_eq!("P2W".parse::<Period>().unwrap().days, 14);
        assert_eq!(Period::default().to_string(), "P0D");
        assert!("P".parse::<Period>().is_err());
    }

    #[test]
    fn duration_text() {
        let d = parse_duration("PT8H6M12.345S").unwrap();
        assert_eq!(d, TimeDelta::milliseconds(29_172_345));
        assert_eq!(format_duration(&d), "PT8H6M12.345S");
        assert_eq!(format_duration(&TimeDelta::zero()), "PT0S");
        assert_eq!(parse_duration("P2D").unwrap(), TimeDelta::days(2));
        assert_eq!(format_duration(&TimeDelta::minutes(-90)), "PT-1H-30M");
        assert!(parse_duration("PT").is_err());
    }

    #[test]
    fn legacy_calendar_format() {
        let dt = parse_legacy("2019-04-25T18:52:47.123+10:00").unwrap();
        assert_eq!(format_calendar(&dt), "2019-04-25T18:52:47.123+10:00");
        let utc = parse_legacy("2019-04-25").unwrap();
        assert_eq!(format_calendar(&utc), "2019-04-25T00:00:00.000Z");
    }

    #[test]
    fn uuid_is_strict() {
        assert!(parse_uuid("b082f1ac-6a1c-11e9-b2d8-0b7a1c2e6a1d").is_ok());
        let err = parse_uuid("b082f1ac6a1c11e9b2d80b7a1c2e6a1d").unwrap_err();
        assert_eq!(err.to_string(), "Not a valid UUID - b082f1ac6a1c11e9b2d80b7a1c2e6a1d");
    }
}
