//! Open-Meteo geocoding provider and the candidate selection policy.

use super::types::{valid_coords, CountryFilter, LocationError, ResolvedPlace};
use crate::http::{HttpError, HttpGet};
use serde::Deserialize;
use std::sync::Arc;

// ─── Wire types ─────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct SearchResponse {
    #[serde(default)]
    results: Option<Vec<GeocodingCandidate>>,
}

/// One ranked match returned by the geocoder.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct GeocodingCandidate {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub admin1: Option<String>,
}

impl GeocodingCandidate {
    fn to_resolved(&self) -> ResolvedPlace {
        ResolvedPlace {
            name: self.name.clone(),
            lat: self.latitude,
            lon: self.longitude,
            country: self.country.clone().unwrap_or_default(),
            admin1: self.admin1.clone(),
        }
    }
}

// ─── Selection ──────────────────────────────────────────────────

/// Pick the first candidate, in ranked order, whose country passes the
/// filter. Candidates with out-of-range coordinates are skipped.
pub fn select_candidate<'a>(
    candidates: &'a [GeocodingCandidate],
    filter: &CountryFilter,
) -> Option<&'a GeocodingCandidate> {
    candidates.iter().find(|c| {
        valid_coords(c.latitude, c.longitude) && filter.accepts(c.country.as_deref())
    })
}

// ─── Provider ───────────────────────────────────────────────────

/// Name search against the Open-Meteo geocoding endpoint.
pub struct GeocodingProvider {
    http: Arc<dyn HttpGet>,
    url: String,
    language: String,
}

impl GeocodingProvider {
    pub fn new(http: Arc<dyn HttpGet>, url: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            language: language.into(),
        }
    }

    /// Fetch up to `count` ranked candidates for `name`.
    ///
    /// An absent or empty `results` field is `NotFound`.
    pub fn search(&self, name: &str, count: usize) -> Result<Vec<GeocodingCandidate>, LocationError> {
        let params = [
            ("name", name.to_string()),
            ("count", count.to_string()),
            ("language", self.language.clone()),
            ("format", "json".to_string()),
        ];

        let body = self.http.get_json(&self.url, &params).map_err(|e| match e {
            HttpError::Decode(msg) => LocationError::InvalidResponse(msg),
            other => LocationError::Network(other.to_string()),
        })?;

        let response: SearchResponse = serde_json::from_value(body)
            .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;

        match response.results {
            Some(results) if !results.is_empty() => Ok(results),
            _ => Err(LocationError::NotFound(name.to_string())),
        }
    }

    /// Search and apply the country filter.
    pub fn resolve(
        &self,
        name: &str,
        filter: &CountryFilter,
        count: usize,
    ) -> Result<ResolvedPlace, LocationError> {
        let candidates = self.search(name, count)?;
        match select_candidate(&candidates, filter) {
            Some(c) => Ok(c.to_resolved()),
            None => {
                tracing::debug!(
                    query = name,
                    candidates = candidates.len(),
                    %filter,
                    "no candidate passed the country filter"
                );
                Err(LocationError::FilteredOut {
                    query: name.to_string(),
                    filter: filter.to_string(),
                })
            }
        }
    }
}
