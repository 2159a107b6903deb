//! Open-Meteo daily forecast provider.
//!
//! The `daily` block of the response is a set of parallel arrays, one per
//! requested variable plus `time`. They are zipped into [`DailyRecord`]s
//! under the table's column names.

use super::types::{DailyRecord, DateRange, Features, ForecastError, Precipitation, Wind};
use crate::http::{HttpError, HttpGet};
use crate::location::ResolvedPlace;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

/// A daily variable as named by the API, paired with its table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyVariable {
    TemperatureMax,
    TemperatureMin,
    PrecipitationSum,
    PrecipitationProbabilityMax,
    WindSpeedMax,
}

impl DailyVariable {
    pub fn api_name(self) -> &'static str {
        match self {
            Self::TemperatureMax => "temperature_2m_max",
            Self::TemperatureMin => "temperature_2m_min",
            Self::PrecipitationSum => "precipitation_sum",
            Self::PrecipitationProbabilityMax => "precipitation_probability_max",
            Self::WindSpeedMax => "wind_speed_10m_max",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::TemperatureMax => "tmax",
            Self::TemperatureMin => "tmin",
            Self::PrecipitationSum => "precip_mm",
            Self::PrecipitationProbabilityMax => "precip_prob",
            Self::WindSpeedMax => "wind_max",
        }
    }
}

/// Variables to request for a feature set. Temperatures always come first.
pub fn daily_variables(features: Features) -> Vec<DailyVariable> {
    let mut vars = vec![DailyVariable::TemperatureMax, DailyVariable::TemperatureMin];
    if features.precipitation {
        vars.push(DailyVariable::PrecipitationSum);
        vars.push(DailyVariable::PrecipitationProbabilityMax);
    }
    if features.wind {
        vars.push(DailyVariable::WindSpeedMax);
    }
    vars
}

// ─── Wire types ─────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct ForecastResponse {
    #[serde(default)]
    daily: Option<DailyBlock>,
}

type Series = Option<Vec<Option<f64>>>;

#[derive(Deserialize, Debug, Default)]
struct DailyBlock {
    #[serde(default)]
    time: Vec<NaiveDate>,
    #[serde(default)]
    temperature_2m_max: Series,
    #[serde(default)]
    temperature_2m_min: Series,
    #[serde(default)]
    precipitation_sum: Series,
    #[serde(default)]
    precipitation_probability_max: Series,
    #[serde(default)]
    wind_speed_10m_max: Series,
}

// ─── Provider ───────────────────────────────────────────────────

pub struct ForecastProvider {
    http: Arc<dyn HttpGet>,
    url: String,
    timezone: String,
}

impl ForecastProvider {
    pub fn new(http: Arc<dyn HttpGet>, url: impl Into<String>, timezone: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            timezone: timezone.into(),
        }
    }

    /// Request the daily series for `place` over `range` and normalize it.
    pub fn fetch(
        &self,
        place: &ResolvedPlace,
        range: &DateRange,
        features: Features,
    ) -> Result<Vec<DailyRecord>, ForecastError> {
        let daily: Vec<&str> = daily_variables(features)
            .into_iter()
            .map(DailyVariable::api_name)
            .collect();

        let params = [
            ("latitude", place.lat.to_string()),
            ("longitude", place.lon.to_string()),
            ("timezone", self.timezone.clone()),
            ("start_date", range.start().to_string()),
            ("end_date", range.end().to_string()),
            ("daily", daily.join(",")),
            ("wind_speed_unit", "ms".to_string()),
        ];

        let body = self.http.get_json(&self.url, &params).map_err(|e| match e {
            HttpError::Decode(msg) => ForecastError::InvalidResponse(msg),
            other => ForecastError::Network(other.to_string()),
        })?;

        parse_daily(body, place, range, features)
    }
}

/// Turn a forecast response body into records for `place`.
///
/// Fails as a whole if any requested array is missing or misaligned, a
/// temperature is null, or the dates are not exactly the requested range.
pub fn parse_daily(
    body: serde_json::Value,
    place: &ResolvedPlace,
    range: &DateRange,
    features: Features,
) -> Result<Vec<DailyRecord>, ForecastError> {
    let response: ForecastResponse =
        serde_json::from_value(body).map_err(|e| ForecastError::InvalidResponse(e.to_string()))?;

    let no_data = || ForecastError::NoData {
        place: place.name.clone(),
        start: range.start(),
        end: range.end(),
    };
    let malformed = |reason: String| ForecastError::Malformed {
        place: place.name.clone(),
        reason,
    };

    let daily = response.daily.ok_or_else(no_data)?;
    if daily.time.is_empty() {
        return Err(no_data());
    }

    let expected: Vec<NaiveDate> = range.days().collect();
    if daily.time != expected {
        return Err(malformed(format!(
            "dates {}..{} ({} days) do not match requested {}",
            daily.time[0],
            daily.time[daily.time.len() - 1],
            daily.time.len(),
            range
        )));
    }

    let n = daily.time.len();
    let column = |series: Series, var: DailyVariable| -> Result<Vec<Option<f64>>, ForecastError> {
        match series {
            Some(values) if values.len() == n => Ok(values),
            Some(values) => Err(malformed(format!(
                "{} has {} values for {} dates",
                var.api_name(),
                values.len(),
                n
            ))),
            None => Err(malformed(format!("{} missing from response", var.api_name()))),
        }
    };

    let tmax = column(daily.temperature_2m_max, DailyVariable::TemperatureMax)?;
    let tmin = column(daily.temperature_2m_min, DailyVariable::TemperatureMin)?;
    let (precip_sum, precip_prob) = if features.precipitation {
        (
            Some(column(daily.precipitation_sum, DailyVariable::PrecipitationSum)?),
            Some(column(
                daily.precipitation_probability_max,
                DailyVariable::PrecipitationProbabilityMax,
            )?),
        )
    } else {
        (None, None)
    };
    let wind_max = if features.wind {
        Some(column(daily.wind_speed_10m_max, DailyVariable::WindSpeedMax)?)
    } else {
        None
    };

    let mut records = Vec::with_capacity(n);
    for (i, date) in daily.time.into_iter().enumerate() {
        let (Some(hi), Some(lo)) = (tmax[i], tmin[i]) else {
            return Err(malformed(format!("temperature missing on {}", date)));
        };

        let precipitation = match (&precip_sum, &precip_prob) {
            (Some(sum), Some(prob)) => Some(Precipitation {
                sum_mm: sum[i],
                probability_pct: prob[i],
            }),
            _ => None,
        };
        let wind = wind_max.as_ref().map(|w| Wind { max_ms: w[i] });

        records.push(DailyRecord {
            date,
            tmax: hi,
            tmin: lo,
            precipitation,
            wind,
            place: place.name.clone(),
            lat: place.lat,
            lon: place.lon,
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::FakeHttp;
    use serde_json::json;

    fn kristiansand() -> ResolvedPlace {
        ResolvedPlace {
            name: "Kristiansand".into(),
            lat: 58.14671,
            lon: 7.9956,
            country: "Norway".into(),
            admin1: None,
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn three_days() -> DateRange {
        DateRange::new(d(1), d(3)).unwrap()
    }

    #[test]
    fn test_variables_per_feature() {
        let names = |f: Features| -> Vec<&'static str> {
            daily_variables(f).into_iter().map(DailyVariable::api_name).collect()
        };
        assert_eq!(
            names(Features { precipitation: false, wind: false }),
            vec!["temperature_2m_max", "temperature_2m_min"]
        );
        assert_eq!(
            names(Features { precipitation: true, wind: true }),
            vec![
                "temperature_2m_max",
                "temperature_2m_min",
                "precipitation_sum",
                "precipitation_probability_max",
                "wind_speed_10m_max"
            ]
        );
    }

    #[test]
    fn test_column_names() {
        assert_eq!(DailyVariable::TemperatureMax.column(), "tmax");
        assert_eq!(DailyVariable::PrecipitationProbabilityMax.column(), "precip_prob");
        assert_eq!(DailyVariable::WindSpeedMax.column(), "wind_max");
    }

    #[test]
    fn test_fetch_sends_expected_params() {
        let http = Arc::new(FakeHttp::new(|_, _| {
            Ok(json!({ "daily": {
                "time": ["2025-06-01", "2025-06-02", "2025-06-03"],
                "temperature_2m_max": [17.0, 18.5, 16.1],
                "temperature_2m_min": [10.0, 11.2, 9.8],
                "wind_speed_10m_max": [5.1, 7.4, 3.3]
            }}))
        }));
        let provider = ForecastProvider::new(http.clone(), "http://wx.test/v1/forecast", "Europe/Oslo");
        let records = provider
            .fetch(&kristiansand(), &three_days(), Features { precipitation: false, wind: true })
            .unwrap();
        assert_eq!(records.len(), 3);

        let call = &http.calls()[0];
        assert_eq!(call.param("latitude"), Some("58.14671"));
        assert_eq!(call.param("longitude"), Some("7.9956"));
        assert_eq!(call.param("timezone"), Some("Europe/Oslo"));
        assert_eq!(call.param("start_date"), Some("2025-06-01"));
        assert_eq!(call.param("end_date"), Some("2025-06-03"));
        assert_eq!(call.param("daily"), Some("temperature_2m_max,temperature_2m_min,wind_speed_10m_max"));
        assert_eq!(call.param("wind_speed_unit"), Some("ms"));
    }

    #[test]
    fn test_parse_tags_place_and_passes_values_through() {
        let body = json!({ "daily": {
            "time": ["2025-06-01", "2025-06-02", "2025-06-03"],
            "temperature_2m_max": [17.0, 18.5, 16.1],
            "temperature_2m_min": [10.0, 11.2, 9.8],
            "precipitation_sum": [0.0, 4.2, null],
            "precipitation_probability_max": [10.0, 80.0, null]
        }});
        let records = parse_daily(body, &kristiansand(), &three_days(), Features::default()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[1].tmax, 18.5);
        assert_eq!(records[1].tmin, 11.2);
        assert_eq!(records[1].precip_mm(), Some(4.2));
        assert_eq!(records[1].precip_prob(), Some(80.0));
        // Upstream null stays missing, not zero.
        assert!(records[2].precipitation.is_some());
        assert_eq!(records[2].precip_mm(), None);
        assert_eq!(records[0].precip_mm(), Some(0.0));
        assert!(records.iter().all(|r| r.wind.is_none()));
        assert!(records.iter().all(|r| r.place == "Kristiansand" && r.lat == 58.14671));
    }

    #[test]
    fn test_parse_ignores_unrequested_columns() {
        let body = json!({ "daily": {
            "time": ["2025-06-01", "2025-06-02", "2025-06-03"],
            "temperature_2m_max": [17.0, 18.5, 16.1],
            "temperature_2m_min": [10.0, 11.2, 9.8],
            "precipitation_sum": [1.0, 2.0, 3.0]
        }});
        let records = parse_daily(
            body,
            &kristiansand(),
            &three_days(),
            Features { precipitation: false, wind: false },
        )
        .unwrap();
        assert!(records.iter().all(|r| r.precipitation.is_none()));
    }

    #[test]
    fn test_parse_missing_daily_is_no_data() {
        let err = parse_daily(json!({ "latitude": 58.1 }), &kristiansand(), &three_days(), Features::default())
            .unwrap_err();
        assert!(matches!(err, ForecastError::NoData { .. }));
    }

    #[test]
    fn test_parse_empty_series_is_no_data() {
        let body = json!({ "daily": { "time": [], "temperature_2m_max": [], "temperature_2m_min": [] } });
        let err = parse_daily(body, &kristiansand(), &three_days(), Features::default()).unwrap_err();
        assert!(matches!(err, ForecastError::NoData { .. }));
    }

    #[test]
    fn test_parse_requested_column_missing() {
        let body = json!({ "daily": {
            "time": ["2025-06-01", "2025-06-02", "2025-06-03"],
            "temperature_2m_max": [17.0, 18.5, 16.1],
            "temperature_2m_min": [10.0, 11.2, 9.8]
        }});
        let err = parse_daily(body, &kristiansand(), &three_days(), Features::default()).unwrap_err();
        assert!(matches!(err, ForecastError::Malformed { .. }));
    }

    #[test]
    fn test_parse_misaligned_arrays() {
        let body = json!({ "daily": {
            "time": ["2025-06-01", "2025-06-02", "2025-06-03"],
            "temperature_2m_max": [17.0, 18.5],
            "temperature_2m_min": [10.0, 11.2, 9.8]
        }});
        let err = parse_daily(body, &kristiansand(), &three_days(), Features { precipitation: false, wind: false })
            .unwrap_err();
        assert!(err.to_string().contains("temperature_2m_max has 2 values"));
    }

    #[test]
    fn test_parse_null_temperature_fails_whole_call() {
        let body = json!({ "daily": {
            "time": ["2025-06-01", "2025-06-02", "2025-06-03"],
            "temperature_2m_max": [17.0, null, 16.1],
            "temperature_2m_min": [10.0, 11.2, 9.8]
        }});
        let err = parse_daily(body, &kristiansand(), &three_days(), Features { precipitation: false, wind: false })
            .unwrap_err();
        assert!(matches!(err, ForecastError::Malformed { .. }));
    }

    #[test]
    fn test_parse_dates_outside_range() {
        let body = json!({ "daily": {
            "time": ["2025-06-02", "2025-06-03", "2025-06-04"],
            "temperature_2m_max": [17.0, 18.5, 16.1],
            "temperature_2m_min": [10.0, 11.2, 9.8]
        }});
        let err = parse_daily(body, &kristiansand(), &three_days(), Features { precipitation: false, wind: false })
            .unwrap_err();
        assert!(matches!(err, ForecastError::Malformed { .. }));
    }

    #[test]
    fn test_fetch_http_error_is_network() {
        let http = Arc::new(FakeHttp::new(|_, _| Err(HttpError::Status(400))));
        let provider = ForecastProvider::new(http, "http://wx.test", "Europe/Oslo");
        let err = provider.fetch(&kristiansand(), &three_days(), Features::default()).unwrap_err();
        assert!(matches!(err, ForecastError::Network(_)));
        assert!(err.is_not_found());
    }
}
