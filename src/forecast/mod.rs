//! Daily forecast retrieval and normalization.

pub mod cache;
pub mod fetcher;
pub mod open_meteo;
pub mod types;

pub use fetcher::ForecastFetcher;
pub use open_meteo::{daily_variables, parse_daily, DailyVariable, ForecastProvider};
pub use types::{DailyRecord, DateRange, Features, ForecastError, Precipitation, Wind};
