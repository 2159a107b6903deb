//! Weekly weather forecast for towns in southern Norway.
//!
//! Town names are resolved to coordinates through the Open-Meteo geocoder,
//! daily series are fetched from the Open-Meteo forecast API, and the
//! results are merged into one [`table::ForecastTable`].

pub mod config;
pub mod forecast;
pub mod http;
pub mod insights;
pub mod location;
pub mod pipeline;
pub mod server;
pub mod table;

pub use config::Settings;
pub use forecast::{DailyRecord, DateRange, Features};
pub use pipeline::{ForecastRun, PipelineError, Session, Warning};
pub use table::{ForecastTable, MapDay};
