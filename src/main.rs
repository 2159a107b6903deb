use chrono::NaiveDate;
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vaerprognose::config::Settings;
use vaerprognose::forecast::{DateRange, Features};
use vaerprognose::insights;
use vaerprognose::pipeline::{PipelineError, Session};
use vaerprognose::table::{self, MapDay};

/// Værprognose: weekly forecast for towns in southern Norway.
///
/// Resolves each town through the Open-Meteo geocoder, fetches its daily
/// series and prints one merged table.
///
/// Examples:
///   vaer
///   vaer Kristiansand Arendal --wind
///   vaer Stavanger --start 2025-06-02 --days 3 --csv week.csv
///   vaer Mandalay --any-country
///   vaer --serve --port 3000
#[derive(Parser)]
#[command(name = "vaer", version, about, long_about = None)]
struct Cli {
    /// Town names. Defaults to the configured selection.
    towns: Vec<String>,

    /// Extra town, appended when not already listed. Repeatable.
    #[arg(long)]
    add: Vec<String>,

    /// First day (YYYY-MM-DD). Defaults to today in Europe/Oslo.
    #[arg(long, short = 's')]
    start: Option<String>,

    /// Number of days, first day included.
    #[arg(long, short = 'd')]
    days: Option<u32>,

    /// Leave out precipitation sum and probability.
    #[arg(long)]
    no_precip: bool,

    /// Include maximum wind speed.
    #[arg(long)]
    wind: bool,

    /// Accepted country name. Repeatable; replaces the configured filter.
    #[arg(long)]
    country: Vec<String>,

    /// Accept the first geocoder candidate regardless of country.
    #[arg(long, conflicts_with = "country")]
    any_country: bool,

    /// Geocoder candidates considered per town.
    #[arg(long)]
    count: Option<usize>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Config file. Defaults to ~/.vaerprognose/config.json.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write the table as CSV to this path.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Day shown in the per-day summary: first, last or YYYY-MM-DD.
    #[arg(long, default_value = "last", value_parser = parse_map_day)]
    map_day: MapDay,

    /// Run the HTTP API instead of a single forecast.
    #[arg(long)]
    serve: bool,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 3000)]
    port: u16,
}

/// Used when `RUST_LOG` is unset. `tower_http` carries the server's request spans.
const DEFAULT_LOG_FILTER: &str = "vaerprognose=info,tower_http=info";

fn parse_map_day(s: &str) -> Result<MapDay, String> {
    s.parse()
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    // ── Settings ────────────────────────────────────────────────

    let settings = load_settings(&cli).unwrap_or_else(|e| fail(&e));

    if cli.serve {
        let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| fail(&e));
        if let Err(e) = runtime.block_on(vaerprognose::server::start(&cli.host, cli.port, settings)) {
            fail(&format!("Cannot serve on {}:{}: {}", cli.host, cli.port, e));
        }
        return;
    }

    // ── Request ─────────────────────────────────────────────────

    let mut towns = if cli.towns.is_empty() {
        settings.default_towns()
    } else {
        cli.towns.clone()
    };
    for extra in &cli.add {
        if !towns.iter().any(|t| t == extra) {
            towns.push(extra.clone());
        }
    }

    let start = match &cli.start {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .unwrap_or_else(|e| fail(&format!("Invalid date '{}': {}", d, e))),
        None => DateRange::today_in(settings.tz().unwrap_or_else(|e| fail(&e))),
    };
    let range = DateRange::with_days(start, settings.days).unwrap_or_else(|e| fail(&e));
    let features = Features {
        precipitation: !cli.no_precip,
        wind: cli.wind,
    };

    eprintln!("  Forecast {} for {} town(s)", range, towns.len());

    // ── Run ─────────────────────────────────────────────────────

    let mut session = Session::from_settings(&settings);
    let run = match session.run(&towns, &range, features) {
        Ok(run) => run,
        Err(e @ PipelineError::EmptyResult { .. }) => {
            for w in e.warnings() {
                eprintln!("  \u{26A0}\u{FE0F}  {}", w);
            }
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    // ── Report ──────────────────────────────────────────────────

    for w in &run.warnings {
        eprintln!("  \u{26A0}\u{FE0F}  {}", w);
    }
    eprint!("{}", table::render_text(&run.table));

    let snapshot = run.table.snapshot(cli.map_day);
    if let Some(first) = snapshot.first() {
        eprintln!();
        eprintln!("  {}", first.date);
        for row in &snapshot {
            eprintln!("    {:<14} {:>5.1} / {:>5.1}", row.place, row.tmax, row.tmin);
        }
    }

    eprintln!();
    for insight in insights::summarize(&run.table) {
        eprintln!("  {}", insight);
    }

    if let Some(path) = &cli.csv {
        let file = File::create(path)
            .unwrap_or_else(|e| fail(&format!("Cannot create {}: {}", path.display(), e)));
        run.table.write_csv(file).unwrap_or_else(|e| fail(&e));
        eprintln!("  CSV written to {}", path.display());
    }

    match serde_json::to_string_pretty(&run) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(&e),
    }
}

fn load_settings(cli: &Cli) -> Result<Settings, vaerprognose::config::ConfigError> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    if let Some(days) = cli.days {
        settings.days = days;
    }
    if let Some(count) = cli.count {
        settings.max_candidates = count;
    }
    if let Some(timeout) = cli.timeout {
        settings.timeout_secs = timeout;
    }
    if cli.any_country {
        settings.country_filter.clear();
    } else if !cli.country.is_empty() {
        settings.country_filter = cli.country.clone();
    }

    settings.validate()?;
    Ok(settings)
}

fn fail(err: &dyn std::fmt::Display) -> ! {
    eprintln!("Error: {}", err);
    std::process::exit(1);
}
