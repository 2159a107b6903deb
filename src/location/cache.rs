//! Session-scoped memo of resolver outcomes.
//!
//! Keys carry the filter and candidate count so a changed configuration
//! never reuses an old answer. Failures are stored as well, so a repeated
//! miss costs no request. Nothing is written to disk; the cache lives as
//! long as its resolver.

use super::types::{CountryFilter, LocationError, ResolvedPlace};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolveKey {
    query: String,
    filter: CountryFilter,
    max_candidates: usize,
}

/// The resolver's memo table.
#[derive(Debug, Default)]
pub struct ResolveCache {
    entries: HashMap<ResolveKey, Result<ResolvedPlace, LocationError>>,
    hits: u64,
    misses: u64,
}

impl ResolveCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &mut self,
        query: &str,
        filter: &CountryFilter,
        max_candidates: usize,
    ) -> Option<Result<ResolvedPlace, LocationError>> {
        let key = ResolveKey {
            query: query.to_string(),
            filter: filter.clone(),
            max_candidates,
        };
        match self.entries.get(&key) {
            Some(outcome) => {
                self.hits += 1;
                Some(outcome.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(
        &mut self,
        query: &str,
        filter: &CountryFilter,
        max_candidates: usize,
        outcome: Result<ResolvedPlace, LocationError>,
    ) {
        let key = ResolveKey {
            query: query.to_string(),
            filter: filter.clone(),
            max_candidates,
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

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
