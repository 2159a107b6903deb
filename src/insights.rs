//! Short per-place summaries: warmest and coldest day, wettest and windiest
//! day when those metrics were fetched.

use crate::forecast::DailyRecord;
use crate::table::ForecastTable;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// A value and the day it occurs on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DayValue {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceInsight {
    pub place: String,
    /// Highest daily maximum.
    pub warmest: DayValue,
    /// Lowest daily minimum.
    pub coldest: DayValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wettest: Option<DayValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windiest: Option<DayValue>,
}

impl fmt::Display for PlaceInsight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: highest max {:.1}\u{00B0}C ({}), lowest min {:.1}\u{00B0}C ({})",
            self.place, self.warmest.value, self.warmest.date, self.coldest.value, self.coldest.date
        )?;
        if let Some(w) = &self.wettest {
            write!(f, ", wettest day {} ({:.1} mm)", w.date, w.value)?;
        }
        if let Some(w) = &self.windiest {
            write!(f, ", windiest day {} ({:.1} m/s)", w.date, w.value)?;
        }
        write!(f, ".")
    }
}

/// One insight per place, in table order. Ties go to the earliest date.
pub fn summarize(table: &ForecastTable) -> Vec<PlaceInsight> {
    table
        .places()
        .into_iter()
        .filter_map(|place| {
            let mut rows: Vec<&DailyRecord> = table.rows_for(place).collect();
            rows.sort_by_key(|r| r.date);
            summarize_place(place, &rows)
        })
        .collect()
}

fn summarize_place(place: &str, rows: &[&DailyRecord]) -> Option<PlaceInsight> {
    let warmest = extreme(rows, |r| Some(r.tmax), |a, b| a > b)?;
    let coldest = extreme(rows, |r| Some(r.tmin), |a, b| a < b)?;
    let wettest = extreme(rows, DailyRecord::precip_mm, |a, b| a > b);
    let windiest = extreme(rows, DailyRecord::wind_max, |a, b| a > b);

    Some(PlaceInsight {
        place: place.to_string(),
        warmest,
        coldest,
        wettest,
        windiest,
    })
}

/// First row (in date order) holding the extreme value; rows without a
/// value are skipped.
fn extreme(
    rows: &[&DailyRecord],
    value: impl Fn(&DailyRecord) -> Option<f64>,
    better: impl Fn(f64, f64) -> bool,
) -> Option<DayValue> {
    let mut best: Option<DayValue> = None;
    for &row in rows {
        let Some(v) = value(row) else { continue };
        match best {
            Some(b) if !better(v, b.value) => {}
            _ => best = Some(DayValue { date: row.date, value: v }),
        }
    }
    best
}
