//! # Granularity
//!
//! Calendar buckets used to partition shard tables.
//!
//! Buckets are evaluated in the calendar of the timestamp's own time zone:
//! a `Day` bucket in `+08:00` starts at local midnight, not at UTC midnight.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike,
};
use serde::{Deserialize, Serialize};

use super::errors::ShardError;

/// How far past a DST gap we search for the first representable local minute.
const GAP_SEARCH_MINUTES: u32 = 3 * 60;

/// Sharding granularity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One table per hour, suffix `YYYYMMDDHH`.
    Hour,
    /// One table per day, suffix `YYYYMMDD`.
    Day,
    /// One table per month, suffix `YYYYMM`.
    Month,
    /// One table per year, suffix `YYYY`.
    Year,
}

impl Granularity {
    /// Every granularity, finest first.
    pub const ALL: [Granularity; 4] = [Self::Hour, Self::Day, Self::Month, Self::Year];

    /// Numeric wire code (Hour=10, Day=20, Month=30, Year=40).
    pub const fn code(self) -> u8 {
        match self {
            Self::Hour => 10,
            Self::Day => 20,
            Self::Month => 30,
            Self::Year => 40,
        }
    }

    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// `strftime` pattern for the table suffix.
    pub const fn suffix_format(self) -> &'static str {
        match self {
            Self::Hour => "%Y%m%d%H",
            Self::Day => "%Y%m%d",
            Self::Month => "%Y%m",
            Self::Year => "%Y",
        }
    }

    /// Table suffix for the bucket containing `t`, in `t`'s local calendar.
    pub fn suffix<Tz: TimeZone>(self, t: &DateTime<Tz>) -> String {
        t.naive_local().format(self.suffix_format()).to_string()
    }

    /// Physical table name `<primary>_<suffix>` for the bucket containing `t`.
    pub fn table_name<Tz: TimeZone>(self, primary: &str, t: &DateTime<Tz>) -> String {
        format!("{}_{}", primary, self.suffix(t))
    }

    /// Start of the bucket containing `t`.
    ///
    /// Buckets are wall-clock units: a local hour repeated by a DST
    /// fall-back is one longer bucket, and a bucket shortened by a DST gap
    /// starts at the first representable local minute after the gap. An
    /// ambiguous bucket start resolves to its earliest instant.
    pub fn floor<Tz: TimeZone>(self, t: &DateTime<Tz>) -> Result<DateTime<Tz>, ShardError> {
        resolve_local(&t.timezone(), self.local_floor(t.naive_local())?)
    }

    /// First bucket boundary strictly after `t`: the local bucket start plus
    /// one calendar unit, resolved the same way as [`floor`](Self::floor).
    pub fn next_boundary<Tz: TimeZone>(
        self,
        t: &DateTime<Tz>,
    ) -> Result<DateTime<Tz>, ShardError> {
        let local = self.local_step(self.local_floor(t.naive_local())?)?;
        let next = resolve_local(&t.timezone(), local)?;

        if next <= *t {
            return Err(ShardError::Calendar(format!(
                "{} boundary after {} does not advance",
                self,
                t.naive_local()
            )));
        }
        Ok(next)
    }

    /// Whether `a` and `b` fall in the same bucket.
    pub fn same_bucket<Tz: TimeZone>(
        self,
        a: &DateTime<Tz>,
        b: &DateTime<Tz>,
    ) -> Result<bool, ShardError> {
        Ok(self.floor(a)? == self.floor(b)?)
    }

    fn local_floor(self, t: NaiveDateTime) -> Result<NaiveDateTime, ShardError> {
        let date = t.date();
        let floored = match self {
            Self::Hour => date.and_hms_opt(t.hour(), 0, 0),
            Self::Day => date.and_hms_opt(0, 0, 0),
            Self::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
            Self::Year => {
                NaiveDate::from_ymd_opt(date.year(), 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
            }
        };
        floored.ok_or_else(|| overflow(self, &t))
    }

    fn local_step(self, start: NaiveDateTime) -> Result<NaiveDateTime, ShardError> {
        let date = start.date();
        let next = match self {
            Self::Hour => start.checked_add_signed(Duration::hours(1)),
            Self::Day => date.succ_opt().and_then(|d| d.and_hms_opt(0, 0, 0)),
            Self::Month => {
                let (year, month) = if date.month() == 12 {
                    (date.year() + 1, 1)
                } else {
                    (date.year(), date.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
            }
            Self::Year => NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        };
        next.ok_or_else(|| overflow(self, &start))
    }
}

/// Instant of a local bucket start: the earliest of two candidates, or the
/// first minute after a DST gap.
fn resolve_local<Tz: TimeZone>(
    tz: &Tz,
    local: NaiveDateTime,
) -> Result<DateTime<Tz>, ShardError> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(start) => Ok(start),
        LocalResult::Ambiguous(early, _) => Ok(early),
        LocalResult::None => first_after_gap(tz, local),
    }
}

fn first_after_gap<Tz: TimeZone>(
    tz: &Tz,
    local: NaiveDateTime,
) -> Result<DateTime<Tz>, ShardError> {
    let mut probe = local;
    for _ in 0..GAP_SEARCH_MINUTES {
        probe = probe
            .checked_add_signed(Duration::minutes(1))
            .ok_or_else(|| ShardError::Calendar(format!("local time {} overflows", local)))?;
        if let Some(resolved) = tz.from_local_datetime(&probe).earliest() {
            return Ok(resolved);
        }
    }
    Err(ShardError::Calendar(format!(
        "local time {} does not exist in this time zone",
        local
    )))
}

fn overflow(granularity: Granularity, t: &NaiveDateTime) -> ShardError {
    ShardError::Calendar(format!(
        "{} bucket around {} is out of range",
        granularity, t
    ))
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ShardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(ShardError::validation(
                "granularity",
                format!("unknown granularity {:?}", other),
            )),
        }
    }
}

impl TryFrom<i64> for Granularity {
    type Error = ShardError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|g| i64::from(g.code()) == code)
            .ok_or_else(|| {
                ShardError::validation("granularity", format!("unknown granularity code {}", code))
            })
    }
}
