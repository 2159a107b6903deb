//! Session-scoped memo of fetched series, keyed by place, range and features.

use super::types::{DailyRecord, DateRange, Features, ForecastError};
use crate::location::ResolvedPlace;
use std::collections::HashMap;

/// Identity of a place for caching: canonical name plus exact coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaceKey {
    name: String,
    lat_bits: u64,
    lon_bits: u64,
}

impl PlaceKey {
    pub fn of(place: &ResolvedPlace) -> Self {
        Self {
            name: place.name.clone(),
            lat_bits: place.lat.to_bits(),
            lon_bits: place.lon.to_bits(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FetchKey {
    place: PlaceKey,
    range: DateRange,
    features: Features,
}

#[derive(Debug, Default)]
pub struct ForecastCache {
    entries: HashMap<FetchKey, Result<Vec<DailyRecord>, ForecastError>>,
    hits: u64,
}

impl ForecastCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &mut self,
        place: &ResolvedPlace,
        range: &DateRange,
        features: Features,
    ) -> Option<Result<Vec<DailyRecord>, ForecastError>> {
        let key = FetchKey {
            place: PlaceKey::of(place),
            range: *range,
            features,
        };
        let outcome = self.entries.get(&key).cloned();
        if outcome.is_some() {
            self.hits += 1;
        }
        outcome
    }

    pub fn put(
        &mut self,
        place: &ResolvedPlace,
        range: &DateRange,
        features: Features,
        outcome: Result<Vec<DailyRecord>, ForecastError>,
    ) {
        let key = FetchKey {
            place: PlaceKey::of(place),
            range: *range,
            features,
        };
        self.entries.insert(key, outcome);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }
}
