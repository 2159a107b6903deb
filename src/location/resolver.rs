//! Location resolver: input checks, then memo, then the geocoding provider.

use super::cache::ResolveCache;
use super::providers::GeocodingProvider;
use super::types::{CountryFilter, LocationError, ResolvedPlace};
use crate::config::Settings;
use crate::http::HttpGet;
use std::sync::Arc;

/// Maps free-text place names to a [`ResolvedPlace`], memoizing per session.
pub struct LocationResolver {
    provider: GeocodingProvider,
    cache: ResolveCache,
}

impl LocationResolver {
    pub fn new(provider: GeocodingProvider) -> Self {
        Self {
            provider,
            cache: ResolveCache::new(),
        }
    }

    pub fn from_settings(settings: &Settings, http: Arc<dyn HttpGet>) -> Self {
        Self::new(GeocodingProvider::new(
            http,
            settings.geocoding_url.clone(),
            settings.language.clone(),
        ))
    }

    /// Resolve `query` to the first ranked candidate whose country is in
    /// `filter` (or simply the first candidate if `filter` is empty).
    ///
    /// Outcomes, including failures, are memoized for the resolver's
    /// lifetime. Input-check failures are not cached.
    pub fn resolve(
        &mut self,
        query: &str,
        filter: &CountryFilter,
        max_candidates: usize,
    ) -> Result<ResolvedPlace, LocationError> {
        let name = query.trim();
        if name.is_empty() {
            return Err(LocationError::EmptyQuery);
        }
        if max_candidates == 0 {
            return Err(LocationError::InvalidCandidateCount(max_candidates));
        }

        if let Some(outcome) = self.cache.get(name, filter, max_candidates) {
            tracing::debug!(query = name, hit = outcome.is_ok(), "resolver cache hit");
            return outcome;
        }

        let outcome = self.provider.resolve(name, filter, max_candidates);
        match &outcome {
            Ok(place) => tracing::debug!(
                query = name,
                resolved = %place.name,
                country = %place.country,
                "resolved"
            ),
            Err(e) => tracing::debug!(query = name, error = %e, "resolution failed"),
        }
        self.cache.put(name, filter, max_candidates, outcome.clone());
        outcome
    }

    pub fn cache(&self) -> &ResolveCache {
        &self.cache
    }
}
