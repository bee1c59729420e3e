//! Time handling for CMAQ hourly output files.
//!
//! CMAQ files carry a `TFLAG` variable with one `(YYYYDDD, HHMMSS)` pair per
//! time step. A daily emissions file covers 25 hourly steps: 00:00 of the
//! date through 00:00 of the next day inclusive.

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Serialize};

/// Number of hourly steps in a daily output file (both midnights included).
pub const HOURS_PER_OUTPUT_DAY: usize = 25;

/// CMAQ time step attribute for hourly files (`HHMMSS`).
pub const HOURLY_TSTEP: i32 = 10000;

/// Timestamp format used in WRF-Chem emission file names.
pub const WRFCHEMI_TIME_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// Midnight UTC at the start of `date`.
pub fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}

/// Generate `count` hourly timestamps starting at midnight of `date`.
pub fn hourly_steps(date: NaiveDate, count: usize) -> Vec<DateTime<Utc>> {
    let start = midnight(date);
    (0..count)
        .map(|h| start + Duration::hours(h as i64))
        .collect()
}

/// Date/time flag for a single CMAQ time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tflag {
    /// Year * 1000 + day of year.
    pub yyyyddd: i32,
    /// Hours * 10000 + minutes * 100 + seconds.
    pub hhmmss: i32,
}

impl Tflag {
    pub fn new(yyyyddd: i32, hhmmss: i32) -> Self {
        Self { yyyyddd, hhmmss }
    }

    /// Encode a timestamp.
    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        let yyyyddd = dt.year() * 1000 + dt.ordinal() as i32;
        let hhmmss = (dt.hour() * 10000 + dt.minute() * 100 + dt.second()) as i32;
        Self { yyyyddd, hhmmss }
    }

    /// Decode back into a timestamp.
    pub fn to_datetime(&self) -> Result<DateTime<Utc>, TimeParseError> {
        let year = self.yyyyddd / 1000;
        let day = (self.yyyyddd % 1000) as u32;
        let date = NaiveDate::from_yo_opt(year, day)
            .ok_or_else(|| TimeParseError::InvalidTflag(self.yyyyddd, self.hhmmss))?;
        let hh = (self.hhmmss / 10000) as u32;
        let mm = ((self.hhmmss / 100) % 100) as u32;
        let ss = (self.hhmmss % 100) as u32;
        let ndt = date
            .and_hms_opt(hh, mm, ss)
            .ok_or_else(|| TimeParseError::InvalidTflag(self.yyyyddd, self.hhmmss))?;
        Ok(Utc.from_utc_datetime(&ndt))
    }

    /// Flags for the 25 hourly steps of an output day.
    pub fn for_day(date: NaiveDate) -> Vec<Tflag> {
        hourly_steps(date, HOURS_PER_OUTPUT_DAY)
            .iter()
            .map(Tflag::from_datetime)
            .collect()
    }
}

/// Parse the timestamp suffix of a `wrfchemi_<domain>_<timestamp>` file name.
pub fn parse_wrfchemi_timestamp(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    NaiveDateTime::parse_from_str(s, WRFCHEMI_TIME_FORMAT)
        .map(|ndt| Utc.from_utc_datetime(&ndt))
        .map_err(|_| TimeParseError::InvalidFormat(s.to_string()))
}

/// Format a timestamp the way WRF-Chem names its emission files.
pub fn format_wrfchemi_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format(WRFCHEMI_TIME_FORMAT).to_string()
}

/// Convert an "hours since `epoch`" axis value (e.g. GFAS time) to a timestamp.
pub fn from_hours_since(epoch: DateTime<Utc>, hours: f64) -> DateTime<Utc> {
    epoch + Duration::seconds((hours * 3600.0).round() as i64)
}

/// Convert a "days since `epoch`" axis value (e.g. global CTM time) to a timestamp.
pub fn from_days_since(epoch: DateTime<Utc>, days: f64) -> DateTime<Utc> {
    epoch + Duration::seconds((days * 86400.0).round() as i64)
}

/// Time parsing errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Invalid TFLAG value: ({0}, {1})")]
    InvalidTflag(i32, i32),
}
