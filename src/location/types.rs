//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A place name mapped to coordinates and a country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlace {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub country: String,
    /// First-level administrative area (county), when the geocoder reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin1: Option<String>,
}

impl ResolvedPlace {
    pub fn display_line(&self) -> String {
        let region = match &self.admin1 {
            Some(a) => format!("{}, ", a),
            None => String::new(),
        };
        format!(
            "{} ({}{}) {}",
            self.name,
            region,
            self.country,
            format_coords(self.lat, self.lon)
        )
    }
}

/// Whether a coordinate pair lies on the globe.
pub fn valid_coords(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Format coordinates as "58.1467°N, 7.9956°E".
pub fn format_coords(lat: f64, lon: f64) -> String {
    let ns = if lat >= 0.0 { 'N' } else { 'S' };
    let ew = if lon >= 0.0 { 'E' } else { 'W' };
    format!("{:.4}\u{00B0}{}, {:.4}\u{00B0}{}", lat.abs(), ns, lon.abs(), ew)
}

/// Allow-list of country names used to reject same-named places abroad.
///
/// An empty filter accepts any country.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CountryFilter(BTreeSet<String>);

impl CountryFilter {
    pub fn new<I, S>(countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            countries
                .into_iter()
                .map(|c| Into::<String>::into(c).trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
        )
    }

    /// A filter that accepts every candidate.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, country: &str) -> bool {
        self.0.contains(country)
    }

    /// Whether a candidate with this country passes. Candidates without a
    /// country only pass an empty filter.
    pub fn accepts(&self, country: Option<&str>) -> bool {
        if self.is_empty() {
            return true;
        }
        country.is_some_and(|c| self.contains(c))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for CountryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "any country");
        }
        let names: Vec<&str> = self.iter().collect();
        write!(f, "{}", names.join(", "))
    }
}

/// Location resolution errors.
///
/// Every variant except the two input checks means "no result" for the
/// query; callers record it and move on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("No place name given")]
    EmptyQuery,
    #[error("Candidate count must be at least 1, got {0}")]
    InvalidCandidateCount(usize),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid geocoding response: {0}")]
    InvalidResponse(String),
    #[error("Location not found: '{0}'")]
    NotFound(String),
    #[error("No match for '{query}' in {filter}")]
    FilteredOut { query: String, filter: String },
}

impl LocationError {
    /// True when the lookup ran and produced nothing usable.
    pub fn is_not_found(&self) -> bool {
        !matches!(self, Self::EmptyQuery | Self::InvalidCandidateCount(_))
    }
}
