//! Forecast fetcher: memo in front of the Open-Meteo provider.

use super::cache::ForecastCache;
use super::open_meteo::ForecastProvider;
use super::types::{DailyRecord, DateRange, Features, ForecastError};
use crate::config::Settings;
use crate::http::HttpGet;
use crate::location::ResolvedPlace;
use std::sync::Arc;

pub struct ForecastFetcher {
    provider: ForecastProvider,
    cache: ForecastCache,
}

impl ForecastFetcher {
    pub fn new(provider: ForecastProvider) -> Self {
        Self {
            provider,
            cache: ForecastCache::new(),
        }
    }

    pub fn from_settings(settings: &Settings, http: Arc<dyn HttpGet>) -> Self {
        Self::new(ForecastProvider::new(
            http,
            settings.forecast_url.clone(),
            settings.timezone.clone(),
        ))
    }

    /// Daily records for `place` over `range`, one per day.
    ///
    /// Repeated calls with the same place, range and features return the
    /// stored outcome without a new request.
    pub fn fetch_daily(
        &mut self,
        place: &ResolvedPlace,
        range: &DateRange,
        features: Features,
    ) -> Result<Vec<DailyRecord>, ForecastError> {
        if let Some(outcome) = self.cache.get(place, range, features) {
            tracing::debug!(place = %place.name, %range, "forecast cache hit");
            return outcome;
        }

        let outcome = self.provider.fetch(place, range, features);
        match &outcome {
            Ok(records) => tracing::debug!(place = %place.name, days = records.len(), "fetched forecast"),
            Err(e) => tracing::debug!(place = %place.name, error = %e, "forecast fetch failed"),
        }
        self.cache.put(place, range, features, outcome.clone());
        outcome
    }

    pub fn cache(&self) -> &ForecastCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::{param, FakeHttp};
    use crate::http::HttpError;
    use chrono::{Days, NaiveDate};
    use serde_json::{json, Value};

    /// Serves a well-formed series for whatever range is asked.
    fn series_server() -> Arc<FakeHttp> {
        Arc::new(FakeHttp::new(|_, query| {
            let start: NaiveDate = param(query, "start_date").unwrap().parse().unwrap();
            let end: NaiveDate = param(query, "end_date").unwrap().parse().unwrap();
            let vars = param(query, "daily").unwrap().to_string();
            let n = (end - start).num_days() as u64 + 1;

            let time: Vec<String> = (0..n)
                .map(|i| (start + Days::new(i)).to_string())
                .collect();
            let mut daily = serde_json::Map::new();
            daily.insert("time".into(), json!(time));
            for (k, var) in vars.split(',').enumerate() {
                let values: Vec<f64> = (0..n).map(|i| (k as f64) * 10.0 + i as f64).collect();
                daily.insert(var.to_string(), json!(values));
            }
            Ok(json!({ "daily": Value::Object(daily) }))
        }))
    }

    fn fetcher(http: Arc<FakeHttp>) -> ForecastFetcher {
        ForecastFetcher::new(ForecastProvider::new(http, "http://wx.test", "Europe/Oslo"))
    }

    fn egersund() -> ResolvedPlace {
        ResolvedPlace {
            name: "Egersund".into(),
            lat: 58.4516,
            lon: 5.9997,
            country: "Norway".into(),
            admin1: Some("Rogaland".into()),
        }
    }

    fn june(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    #[test]
    fn test_length_matches_range_and_dates_consecutive() {
        let mut f = fetcher(series_server());
        let range = DateRange::week_from(june(26));
        let records = f.fetch_daily(&egersund(), &range, Features::default()).unwrap();

        assert_eq!(records.len(), range.num_days());
        let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
        let expected: Vec<NaiveDate> = range.days().collect();
        assert_eq!(dates, expected);
    }

    #[test]
    fn test_single_day_range_yields_one_record() {
        let mut f = fetcher(series_server());
        let range = DateRange::new(june(3), june(3)).unwrap();
        let records = f.fetch_daily(&egersund(), &range, Features::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, june(3));
    }

    #[test]
    fn test_precipitation_flag_round_trip() {
        let mut f = fetcher(series_server());
        let range = DateRange::week_from(june(1));

        let without = f
            .fetch_daily(&egersund(), &range, Features { precipitation: false, wind: false })
            .unwrap();
        assert!(without.iter().all(|r| r.precipitation.is_none()));

        let with = f
            .fetch_daily(&egersund(), &range, Features { precipitation: true, wind: false })
            .unwrap();
        assert!(with.iter().all(|r| r.precip_mm().is_some() && r.precip_prob().is_some()));
        assert!(with.iter().all(|r| r.wind.is_none()));
    }

    #[test]
    fn test_wind_flag_round_trip() {
        let mut f = fetcher(series_server());
        let range = DateRange::week_from(june(1));
        let records = f
            .fetch_daily(&egersund(), &range, Features { precipitation: false, wind: true })
            .unwrap();
        assert!(records.iter().all(|r| r.wind_max().is_some()));
        assert!(records.iter().all(|r| r.precipitation.is_none()));
    }

    #[test]
    fn test_memoized_per_place_range_features() {
        let http = series_server();
        let mut f = fetcher(http.clone());
        let range = DateRange::week_from(june(1));

        let a = f.fetch_daily(&egersund(), &range, Features::default()).unwrap();
        let b = f.fetch_daily(&egersund(), &range, Features::default()).unwrap();
        assert_eq!(a, b);
        assert_eq!(http.call_count(), 1);

        f.fetch_daily(&egersund(), &range, Features { precipitation: true, wind: true })
            .unwrap();
        assert_eq!(http.call_count(), 2);
        assert_eq!(f.cache().hits(), 1);
    }

    #[test]
    fn test_failure_is_memoized() {
        let http = Arc::new(FakeHttp::new(|_, _| Err(HttpError::Transport("timed out".into()))));
        let mut f = fetcher(http.clone());
        let range = DateRange::week_from(june(1));

        assert!(f.fetch_daily(&egersund(), &range, Features::default()).is_err());
        assert!(f.fetch_daily(&egersund(), &range, Features::default()).is_err());
        assert_eq!(http.call_count(), 1);
    }
}
