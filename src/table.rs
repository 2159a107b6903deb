//! The combined forecast table handed to presentation code.
//!
//! Rows keep request order: all days of the first place, then the next.
//! Sorting, per-day slicing and CSV export are read-only views over it.

use crate::forecast::{DailyRecord, Features};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastTable {
    /// Metric groups requested for the run; decides which optional columns exist.
    pub features: Features,
    rows: Vec<DailyRecord>,
}

impl ForecastTable {
    pub fn new(features: Features) -> Self {
        Self {
            features,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(features: Features, rows: Vec<DailyRecord>) -> Self {
        Self { features, rows }
    }

    /// Append one place's records.
    pub fn extend(&mut self, records: impl IntoIterator<Item = DailyRecord>) {
        self.rows.extend(records);
    }

    pub fn rows(&self) -> &[DailyRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct place names in order of first appearance.
    pub fn places(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.place.as_str()) {
                seen.push(row.place.as_str());
            }
        }
        seen
    }

    /// Distinct dates, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows
            .iter()
            .map(|r| r.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn rows_for<'a>(&'a self, place: &'a str) -> impl Iterator<Item = &'a DailyRecord> + 'a {
        self.rows.iter().filter(move |r| r.place == place)
    }

    /// Rows ordered by place name, then date.
    pub fn sorted_by_place_date(&self) -> Vec<&DailyRecord> {
        let mut sorted: Vec<&DailyRecord> = self.rows.iter().collect();
        sorted.sort_by(|a, b| a.place.cmp(&b.place).then(a.date.cmp(&b.date)));
        sorted
    }

    /// All rows for a single day, in table order.
    pub fn snapshot(&self, day: MapDay) -> Vec<&DailyRecord> {
        let dates = self.dates();
        let target = match day {
            MapDay::First => dates.first().copied(),
            MapDay::Last => dates.last().copied(),
            MapDay::Date(d) => Some(d),
        };
        match target {
            Some(d) => self.rows.iter().filter(|r| r.date == d).collect(),
            None => Vec::new(),
        }
    }

    /// Column names for CSV export, given the run's features.
    pub fn columns(&self) -> Vec<&'static str> {
        let mut cols = vec!["date", "tmax", "tmin"];
        if self.features.precipitation {
            cols.push("precip_mm");
            cols.push("precip_prob");
        }
        if self.features.wind {
            cols.push("wind_max");
        }
        cols.extend(["city", "lat", "lon"]);
        cols
    }

    /// Write the table as CSV, sorted by place then date.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(self.columns())?;

        for row in self.sorted_by_place_date() {
            let mut record = vec![row.date.to_string(), row.tmax.to_string(), row.tmin.to_string()];
            if self.features.precipitation {
                record.push(cell(row.precip_mm()));
                record.push(cell(row.precip_prob()));
            }
            if self.features.wind {
                record.push(cell(row.wind_max()));
            }
            record.push(row.place.clone());
            record.push(row.lat.to_string());
            record.push(row.lon.to_string());
            out.write_record(&record)?;
        }

        out.flush()?;
        Ok(())
    }

    pub fn to_csv(&self) -> Result<String, csv::Error> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        String::from_utf8(buf)
            .map_err(|e| csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}

/// Fixed-width text rendering, one block per place, for terminals.
pub fn render_text(table: &ForecastTable) -> String {
    let mut out = String::new();
    for place in table.places() {
        out.push_str(&format!("  {}\n", place));
        let mut header = format!("    {:<10}  {:>6}  {:>6}", "date", "max", "min");
        if table.features.precipitation {
            header.push_str(&format!("  {:>7}  {:>5}", "mm", "%"));
        }
        if table.features.wind {
            header.push_str(&format!("  {:>6}", "m/s"));
        }
        out.push_str(&header);
        out.push('\n');

        for row in table.rows_for(place) {
            let mut line = format!("    {:<10}  {:>6.1}  {:>6.1}", row.date, row.tmax, row.tmin);
            if table.features.precipitation {
                line.push_str(&format!(
                    "  {:>7}  {:>5}",
                    text_cell(row.precip_mm(), 1),
                    text_cell(row.precip_prob(), 0)
                ));
            }
            if table.features.wind {
                line.push_str(&format!("  {:>6}", text_cell(row.wind_max(), 1)));
            }
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

fn text_cell(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "-".into(),
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Which day a single-day view (such as a map) shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapDay {
    First,
    #[default]
    Last,
    Date(NaiveDate),
}

impl FromStr for MapDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
                .map(Self::Date)
                .map_err(|_| format!("Unknown day '{}'. Use 'first', 'last' or YYYY-MM-DD.", s)),
        }
    }
}
