//! Place-name resolution for the forecast pipeline.
//!
//! Turns a free-text town name into coordinates through the Open-Meteo
//! geocoder, keeping only candidates from the accepted countries.

pub mod cache;
pub mod providers;
pub mod resolver;
pub mod types;

pub use providers::{select_candidate, GeocodingCandidate, GeocodingProvider};
pub use resolver::LocationResolver;
pub use types::{format_coords, valid_coords, CountryFilter, LocationError, ResolvedPlace};
