use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::forecast::{DateRange, Features};
use crate::insights::{self, PlaceInsight};
use crate::location::LocationError;
use crate::pipeline::{ForecastRun, PipelineError, Warning};
use crate::table::MapDay;

use super::state::AppState;

const MAX_DAYS: u32 = 16;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<Warning>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    warnings: Vec<Warning>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.message,
            code: self.status.as_u16(),
            warnings: self.warnings,
        };
        (self.status, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError {
        status,
        message: msg.into(),
        warnings: Vec::new(),
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message: err.to_string(),
            warnings: err.warnings().to_vec(),
        }
    }
}

// ─── Shared request parsing ──────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ForecastQuery {
    /// Comma-separated town names. Defaults to the configured selection.
    pub cities: Option<String>,
    pub precip: Option<bool>,
    pub wind: Option<bool>,
    /// First day, YYYY-MM-DD. Defaults to today in the reference zone.
    pub start: Option<String>,
    pub days: Option<u32>,
    /// Only used by /api/map.
    pub day: Option<String>,
}

struct ForecastRequest {
    towns: Vec<String>,
    range: DateRange,
    features: Features,
}

impl ForecastQuery {
    fn to_request(&self, state: &AppState) -> Result<ForecastRequest, ApiError> {
        let settings = &state.settings;

        let towns: Vec<String> = match &self.cities {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => settings.default_towns(),
        };
        if towns.is_empty() {
            return Err(api_error(StatusCode::BAD_REQUEST, "No towns given in 'cities'"));
        }

        let start = match &self.start {
            Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|e| {
                api_error(StatusCode::BAD_REQUEST, format!("Invalid date '{}': {}", d, e))
            })?,
            None => {
                let tz = settings
                    .tz()
                    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
                DateRange::today_in(tz)
            }
        };

        let days = self.days.unwrap_or(settings.days);
        if !(1..=MAX_DAYS).contains(&days) {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                format!("'days' must be 1-{}", MAX_DAYS),
            ));
        }
        let range = DateRange::with_days(start, days)
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

        let defaults = Features::default();
        let features = Features {
            precipitation: self.precip.unwrap_or(defaults.precipitation),
            wind: self.wind.unwrap_or(defaults.wind),
        };

        Ok(ForecastRequest { towns, range, features })
    }
}

/// Run the pipeline on the blocking pool; the session does synchronous I/O.
async fn run_forecast(state: Arc<AppState>, params: &ForecastQuery) -> Result<ForecastRun, ApiError> {
    let request = params.to_request(&state)?;
    let start = Instant::now();
    let towns = request.towns.len();

    let outcome = tokio::task::spawn_blocking(move || {
        state
            .session()
            .run(&request.towns, &request.range, request.features)
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    tracing::info!(
        towns,
        ok = outcome.is_ok(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "forecast request"
    );

    outcome.map_err(ApiError::from)
}

// ─── GET /api/cities ─────────────────────────────────────────────

#[derive(Serialize)]
pub struct CitiesResponse {
    pub cities: Vec<String>,
    pub selected: Vec<String>,
}

pub async fn city_list(State(state): State<Arc<AppState>>) -> Json<CitiesResponse> {
    Json(CitiesResponse {
        cities: state.settings.default_cities.clone(),
        selected: state.settings.default_towns(),
    })
}

// ─── GET /api/resolve ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResolveQuery {
    pub query: Option<String>,
}

#[derive(Serialize)]
pub struct ResolveResponse {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin1: Option<String>,
    pub formatted_coords: String,
}

pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResolveQuery>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let query = params.query.as_deref().unwrap_or("").trim().to_string();
    if query.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Missing 'query' parameter"));
    }

    let resolved = tokio::task::spawn_blocking(move || state.session().resolve(&query))
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let place = match resolved {
        Ok(p) => p,
        Err(e @ (LocationError::EmptyQuery | LocationError::InvalidCandidateCount(_))) => {
            return Err(api_error(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e) => return Err(api_error(StatusCode::NOT_FOUND, e.to_string())),
    };

    Ok(Json(ResolveResponse {
        formatted_coords: crate::location::format_coords(place.lat, place.lon),
        name: place.name,
        lat: place.lat,
        lon: place.lon,
        country: place.country,
        admin1: place.admin1,
    }))
}

// ─── GET /api/forecast ───────────────────────────────────────────

pub async fn forecast(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ForecastQuery>,
) -> Result<Json<ForecastRun>, ApiError> {
    run_forecast(state, &params).await.map(Json)
}

// ─── GET /api/forecast.csv ───────────────────────────────────────

pub async fn forecast_csv(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ForecastQuery>,
) -> Result<Response, ApiError> {
    let run = run_forecast(state, &params).await?;
    let csv = run
        .table
        .to_csv()
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"weekly_forecast_southern_norway.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

// ─── GET /api/insights ───────────────────────────────────────────

#[derive(Serialize)]
pub struct InsightsResponse {
    pub insights: Vec<PlaceInsight>,
    pub lines: Vec<String>,
    pub warnings: Vec<Warning>,
}

pub async fn insights(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ForecastQuery>,
) -> Result<Json<InsightsResponse>, ApiError> {
    let run = run_forecast(state, &params).await?;
    let insights = insights::summarize(&run.table);
    let lines = insights.iter().map(ToString::to_string).collect();
    Ok(Json(InsightsResponse {
        insights,
        lines,
        warnings: run.warnings,
    }))
}

// ─── GET /api/map ────────────────────────────────────────────────

#[derive(Serialize)]
pub struct MapPoint {
    pub city: String,
    pub lat: f64,
    pub lon: f64,
    pub tmax: f64,
    pub tmin: f64,
    pub precip_mm: Option<f64>,
    pub wind_max: Option<f64>,
}

#[derive(Serialize)]
pub struct MapResponse {
    pub date: Option<NaiveDate>,
    pub points: Vec<MapPoint>,
}

pub async fn map(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ForecastQuery>,
) -> Result<Json<MapResponse>, ApiError> {
    let day: MapDay = match &params.day {
        Some(d) => d
            .parse()
            .map_err(|e: String| api_error(StatusCode::BAD_REQUEST, e))?,
        None => MapDay::default(),
    };

    let run = run_forecast(state, &params).await?;
    let rows = run.table.snapshot(day);
    Ok(Json(MapResponse {
        date: rows.first().map(|r| r.date),
        points: rows
            .into_iter()
            .map(|r| MapPoint {
                city: r.place.clone(),
                lat: r.lat,
                lon: r.lon,
                tmax: r.tmax,
                tmin: r.tmin,
                precip_mm: r.precip_mm(),
                wind_max: r.wind_max(),
            })
            .collect(),
    }))
}
