//! Core types for the forecast subsystem.

use chrono::{Days, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive span of calendar days, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawRange> for DateRange {
    type Error = ForecastError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ForecastError> {
        if start > end {
            return Err(ForecastError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// `days` consecutive days beginning at `start`.
    pub fn with_days(start: NaiveDate, days: u32) -> Result<Self, ForecastError> {
        let last = days
            .checked_sub(1)
            .ok_or(ForecastError::InvalidRange { start, end: start })?;
        let end = start
            .checked_add_days(Days::new(u64::from(last)))
            .ok_or(ForecastError::InvalidRange { start, end: start })?;
        Self::new(start, end)
    }

    /// The standard 7-day window starting at `start`.
    pub fn week_from(start: NaiveDate) -> Self {
        let end = start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    /// The calendar date right now in `tz`.
    pub fn today_in(tz: Tz) -> NaiveDate {
        Utc::now().with_timezone(&tz).date_naive()
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn num_days(&self) -> usize {
        usize::try_from((self.end - self.start).num_days()).map_or(0, |n| n + 1)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every date in the range, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \u{2192} {} ({} days)", self.start, self.end, self.num_days())
    }
}

/// Optional metric groups to request alongside temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Features {
    pub precipitation: bool,
    pub wind: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            precipitation: true,
            wind: false,
        }
    }
}

/// Precipitation for one day. Present iff precipitation was requested;
/// individual values are `None` where the source reported nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Precipitation {
    /// Daily sum in mm.
    pub sum_mm: Option<f64>,
    /// Maximum probability over the day, in percent.
    pub probability_pct: Option<f64>,
}

/// Wind for one day. Present iff wind was requested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// Maximum 10 m wind speed in m/s.
    pub max_ms: Option<f64>,
}

/// One row of the forecast table: a place on a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    /// Maximum temperature in °C.
    pub tmax: f64,
    /// Minimum temperature in °C.
    pub tmin: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitation: Option<Precipitation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind: Option<Wind>,
    /// Canonical name of the owning place.
    pub place: String,
    pub lat: f64,
    pub lon: f64,
}

impl DailyRecord {
    pub fn precip_mm(&self) -> Option<f64> {
        self.precipitation.and_then(|p| p.sum_mm)
    }

    pub fn precip_prob(&self) -> Option<f64> {
        self.precipitation.and_then(|p| p.probability_pct)
    }

    pub fn wind_max(&self) -> Option<f64> {
        self.wind.and_then(|w| w.max_ms)
    }
}

/// Forecast retrieval errors. Every variant except `InvalidRange` is a
/// "no result" outcome for the place.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForecastError {
    #[error("Invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid forecast response: {0}")]
    InvalidResponse(String),
    #[error("No forecast data for {place} between {start} and {end}")]
    NoData {
        place: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("Incomplete forecast for {place}: {reason}")]
    Malformed { place: String, reason: String },
}

impl ForecastError {
    pub fn is_not_found(&self) -> bool {
        !matches!(self, Self::InvalidRange { .. })
    }
}
