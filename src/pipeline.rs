//! Orchestration: resolve each town, fetch its series, merge into one table.
//!
//! Runs strictly in query order on the calling thread. A town that cannot
//! be resolved or fetched becomes a [`Warning`] and the run continues; only
//! an empty final table stops the run.

use crate::config::Settings;
use crate::forecast::{DateRange, Features, ForecastError, ForecastFetcher};
use crate::http::{HttpGet, UreqClient};
use crate::location::{CountryFilter, LocationError, LocationResolver, ResolvedPlace};
use crate::table::ForecastTable;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A per-town failure, keyed by the query text the caller supplied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The name could not be mapped to a place in the accepted countries.
    Resolution { query: String, reason: String },
    /// The place resolved but produced no usable forecast.
    Fetch {
        query: String,
        place: String,
        reason: String,
    },
    /// The name resolved to a place already in the table.
    Duplicate { query: String, place: String },
}

impl Warning {
    pub fn query(&self) -> &str {
        match self {
            Self::Resolution { query, .. } | Self::Fetch { query, .. } | Self::Duplicate { query, .. } => {
                query
            }
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolution { query, reason } => {
                write!(f, "Could not find coordinates for '{}', skipping ({})", query, reason)
            }
            Self::Fetch { query, place, reason } => write!(
                f,
                "No forecast data for '{}' ({}) in the period, skipping ({})",
                query, place, reason
            ),
            Self::Duplicate { query, place } => {
                write!(f, "'{}' is {}, which is already listed, skipping", query, place)
            }
        }
    }
}

/// The output of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastRun {
    pub range: DateRange,
    pub features: Features,
    pub table: ForecastTable,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("No data to show. Try other towns or another period.")]
    EmptyResult { warnings: Vec<Warning> },
}

impl PipelineError {
    pub fn warnings(&self) -> &[Warning] {
        match self {
            Self::EmptyResult { warnings } => warnings,
        }
    }
}

/// One interactive session: a resolver and a fetcher whose memo tables
/// persist across runs, so re-running with unchanged inputs costs no
/// requests.
pub struct Session {
    resolver: LocationResolver,
    fetcher: ForecastFetcher,
    filter: CountryFilter,
    max_candidates: usize,
}

impl Session {
    pub fn new(
        resolver: LocationResolver,
        fetcher: ForecastFetcher,
        filter: CountryFilter,
        max_candidates: usize,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            filter,
            max_candidates,
        }
    }

    /// Build a session over `http` using the endpoints and policy in `settings`.
    pub fn with_http(settings: &Settings, http: Arc<dyn HttpGet>) -> Self {
        Self::new(
            LocationResolver::from_settings(settings, http.clone()),
            ForecastFetcher::from_settings(settings, http),
            CountryFilter::new(settings.country_filter.iter().cloned()),
            settings.max_candidates,
        )
    }

    /// Build a session that talks to the network through `ureq`.
    pub fn from_settings(settings: &Settings) -> Self {
        let http = Arc::new(UreqClient::new(settings.timeout(), &settings.user_agent));
        Self::with_http(settings, http)
    }

    pub fn filter(&self) -> &CountryFilter {
        &self.filter
    }

    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    pub fn fetcher(&self) -> &ForecastFetcher {
        &self.fetcher
    }

    /// Resolve a single name with the session's filter.
    pub fn resolve(&mut self, query: &str) -> Result<ResolvedPlace, LocationError> {
        self.resolver.resolve(query, &self.filter, self.max_candidates)
    }

    /// Run the whole pipeline for `queries`, in order.
    pub fn run<S: AsRef<str>>(
        &mut self,
        queries: &[S],
        range: &DateRange,
        features: Features,
    ) -> Result<ForecastRun, PipelineError> {
        let mut table = ForecastTable::new(features);
        let mut warnings = Vec::new();

        for query in queries {
            let query = query.as_ref();

            let place = match self.resolve(query) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(query, error = %e, "skipping town: resolution failed");
                    warnings.push(resolution_warning(query, &e));
                    continue;
                }
            };

            if table.rows_for(&place.name).next().is_some() {
                tracing::debug!(query, place = %place.name, "skipping town: already listed");
                warnings.push(Warning::Duplicate {
                    query: query.to_string(),
                    place: place.name.clone(),
                });
                continue;
            }

            match self.fetcher.fetch_daily(&place, range, features) {
                Ok(records) => table.extend(records),
                Err(e) => {
                    tracing::warn!(query, place = %place.name, error = %e, "skipping town: no forecast");
                    warnings.push(fetch_warning(query, &place, &e));
                }
            }
        }

        if table.is_empty() {
            tracing::warn!(queries = queries.len(), "run produced no data");
            return Err(PipelineError::EmptyResult { warnings });
        }

        tracing::info!(
            rows = table.len(),
            places = table.places().len(),
            warnings = warnings.len(),
            %range,
            "forecast run complete"
        );

        Ok(ForecastRun {
            range: *range,
            features,
            table,
            warnings,
        })
    }
}

fn resolution_warning(query: &str, error: &LocationError) -> Warning {
    Warning::Resolution {
        query: query.to_string(),
        reason: error.to_string(),
    }
}

fn fetch_warning(query: &str, place: &ResolvedPlace, error: &ForecastError) -> Warning {
    Warning::Fetch {
        query: query.to_string(),
        place: place.name.clone(),
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::{param, FakeHttp};
    use crate::http::HttpError;
    use chrono::{Days, NaiveDate};
    use serde_json::{json, Value};

    const GEO: &str = "http://geo.test/search";
    const WX: &str = "http://wx.test/forecast";

    fn settings() -> Settings {
        Settings {
            geocoding_url: GEO.into(),
            forecast_url: WX.into(),
            ..Settings::default()
        }
    }

    fn series(query: &crate::http::QueryParams<'_>) -> Value {
        let start: NaiveDate = param(query, "start_date").unwrap().parse().unwrap();
        let end: NaiveDate = param(query, "end_date").unwrap().parse().unwrap();
        let n = (end - start).num_days() as u64 + 1;
        let mut daily = serde_json::Map::new();
        daily.insert(
            "time".into(),
            json!((0..n).map(|i| (start + Days::new(i)).to_string()).collect::<Vec<_>>()),
        );
        for var in param(query, "daily").unwrap().split(',') {
            daily.insert(var.into(), json!(vec![12.5; n as usize]));
        }
        json!({ "daily": Value::Object(daily) })
    }

    /// Geocoder knows the towns in `known` (all in Norway) plus Mandalay.
    /// Forecast fails for latitude 0.
    fn world(known: &'static [&'static str]) -> Arc<FakeHttp> {
        Arc::new(FakeHttp::new(move |url, query| {
            if url == GEO {
                let name = param(query, "name").unwrap_or_default();
                if name == "Mandalay" {
                    return Ok(json!({ "results": [
                        { "name": "Mandalay", "latitude": 21.97, "longitude": 96.08, "country": "Myanmar" }
                    ]}));
                }
                if name == "Nullisland" {
                    return Ok(json!({ "results": [
                        { "name": "Nullisland", "latitude": 0.0, "longitude": 0.0, "country": "Norway" }
                    ]}));
                }
                if known.contains(&name) {
                    return Ok(json!({ "results": [
                        { "name": name, "latitude": 58.5, "longitude": 8.0, "country": "Norway" }
                    ]}));
                }
                return Ok(json!({ "generationtime_ms": 0.2 }));
            }
            if param(query, "latitude") == Some("0") {
                return Err(HttpError::Status(500));
            }
            Ok(series(query))
        }))
    }

    fn week() -> DateRange {
        DateRange::week_from(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap())
    }

    #[test]
    fn test_failed_queries_become_warnings() {
        let http = world(&["Arendal", "Skien", "Mandal"]);
        let mut session = Session::with_http(&settings(), http);
        let queries = ["Arendal", "Xyzzy", "Skien", "Mandalay", "Mandal"];

        let run = session.run(&queries, &week(), Features::default()).unwrap();

        assert_eq!(run.table.places(), vec!["Arendal", "Skien", "Mandal"]);
        assert_eq!(run.table.len(), 21);
        let warned: Vec<&str> = run.warnings.iter().map(Warning::query).collect();
        assert_eq!(warned, vec!["Xyzzy", "Mandalay"]);
        assert!(run.warnings.iter().all(|w| matches!(w, Warning::Resolution { .. })));
    }

    #[test]
    fn test_fetch_failure_is_warning() {
        let mut session = Session::with_http(&settings(), world(&["Grimstad"]));
        let run = session
            .run(&["Nullisland", "Grimstad"], &week(), Features::default())
            .unwrap();
        assert_eq!(run.table.places(), vec!["Grimstad"]);
        assert_eq!(run.warnings.len(), 1);
        assert!(matches!(&run.warnings[0], Warning::Fetch { query, .. } if query == "Nullisland"));
    }

    #[test]
    fn test_empty_result_is_terminal() {
        let mut session = Session::with_http(&settings(), world(&[]));
        let err = session
            .run(&["Mandalay", "Atlantis"], &week(), Features::default())
            .unwrap_err();
        assert_eq!(err.warnings().len(), 2);
        assert!(matches!(err, PipelineError::EmptyResult { .. }));
    }

    #[test]
    fn test_no_queries_is_empty_result() {
        let mut session = Session::with_http(&settings(), world(&[]));
        let queries: [&str; 0] = [];
        assert!(session.run(&queries, &week(), Features::default()).is_err());
    }

    #[test]
    fn test_rerun_uses_session_memo() {
        let http = world(&["Arendal", "Skien"]);
        let mut session = Session::with_http(&settings(), http.clone());
        let queries = ["Arendal", "Skien", "Mandalay"];

        let first = session.run(&queries, &week(), Features::default()).unwrap();
        let calls = http.call_count();
        assert_eq!(calls, 5);

        let second = session.run(&queries, &week(), Features::default()).unwrap();
        assert_eq!(http.call_count(), calls);
        assert_eq!(first.table, second.table);
        assert_eq!(first.warnings, second.warnings);
    }

    #[test]
    fn test_empty_filter_accepts_foreign_town() {
        let s = Settings { country_filter: vec![], ..settings() };
        let mut session = Session::with_http(&s, world(&[]));
        let run = session.run(&["Mandalay"], &week(), Features::default()).unwrap();
        assert_eq!(run.table.places(), vec!["Mandalay"]);
    }

    #[test]
    fn test_same_place_twice_is_listed_once() {
        let http = world(&["Mandal"]);
        let mut session = Session::with_http(&settings(), http.clone());

        let run = session
            .run(&["Mandal", " Mandal", "Mandal"], &week(), Features::default())
            .unwrap();

        assert_eq!(run.table.len(), 7);
        let dates: Vec<NaiveDate> = run.table.rows_for("Mandal").map(|r| r.date).collect();
        assert_eq!(dates, week().days().collect::<Vec<_>>());
        assert_eq!(run.warnings.len(), 2);
        assert!(run
            .warnings
            .iter()
            .all(|w| matches!(w, Warning::Duplicate { place, .. } if place == "Mandal")));
        // one geocoding call for the trimmed name, one forecast
        assert_eq!(http.call_count(), 2);
    }

    #[test]
    fn test_run_reports_features() {
        let mut session = Session::with_http(&settings(), world(&["Skien"]));
        let features = Features { precipitation: false, wind: true };
        let run = session.run(&["Skien"], &week(), features).unwrap();
        assert_eq!(run.features, features);
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["features"]["wind"], true);
    }

    #[test]
    fn test_warning_display_names_query() {
        let w = Warning::Resolution { query: "Xyzzy".into(), reason: "Location not found: 'Xyzzy'".into() };
        assert!(w.to_string().starts_with("Could not find coordinates for 'Xyzzy'"));
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["kind"], "resolution");
        assert_eq!(json["query"], "Xyzzy");
    }
}
