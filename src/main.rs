//! CLI entry point for the flu vaccination heatmap.
//!
//! Loads the SurSaUD, IQVIA and forecast exports once, resolves the
//! selection from the subcommand, and reports the regional table, summary
//! figures, top regions and any forecast bounds or national series.
//! Optionally exports the table as CSV.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use flu_heatmap::config::RegionConfig;
use flu_heatmap::output::{default_export_name, export_csv, print_json, print_pretty};
use flu_heatmap::pipeline::aggregate::DoseScope;
use flu_heatmap::pipeline::types::RegionalView;
use flu_heatmap::pipeline::view::{Selection, SelectionOptions, build_view};
use flu_heatmap::regions::{GEO_FEATURE_ID_KEY, RegionNormalizer};
use flu_heatmap::sources::{DOSE_VARIABLE, Datasets, SURVEILLANCE_METRICS, loader};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "flu_heatmap")]
#[command(about = "Regional flu surveillance and vaccination heatmap data", long_about = None)]
struct Cli {
    /// Directory holding the cleaned/ and processed/ source exports
    #[arg(short, long, default_value = "data", global = true)]
    data_dir: PathBuf,

    /// JSON file overriding region weights and label aliases
    #[arg(long, global = true)]
    region_config: Option<PathBuf>,

    /// Export the regional table as CSV (default name when no path is given)
    #[arg(long, global = true)]
    export: Option<Option<String>>,

    /// Also log the full view as JSON
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Region whose rank and share to report
    #[arg(long, global = true)]
    region: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// National forecast apportioned by region
    Forecast {
        /// Forecast date (YYYY-MM-DD); defaults to the latest
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Forecast already split by region
    RegionalForecast {
        /// Forecast date (YYYY-MM-DD); defaults to the earliest
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Mean all-ages SurSaUD rate per region
    Surveillance {
        /// Week token as found in the data; defaults to the latest
        #[arg(short, long)]
        week: Option<String>,

        /// Rate column; defaults to taux_urgences_grippe
        #[arg(short, long)]
        metric: Option<String>,
    },
    /// National IQVIA dose total apportioned by region
    Doses {
        /// Campaign; defaults to the latest
        #[arg(short, long)]
        campaign: Option<String>,

        /// Age group
        #[arg(short, long)]
        age_group: String,

        /// IQVIA variable to sum
        #[arg(long, default_value = DOSE_VARIABLE)]
        variable: String,
    },
    /// Built-in demonstration figures
    Demo,
    /// List the dates, weeks, metrics, campaigns and age groups available
    Options,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/flu_heatmap.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("flu_heatmap.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .region_config
        .clone()
        .or_else(|| std::env::var("REGION_CONFIG_PATH").ok().map(PathBuf::from));
    let config = match &config_path {
        Some(path) => RegionConfig::load(path)?,
        None => RegionConfig::default(),
    };
    let weights = config.weights().context("region weight table is invalid")?;
    let normalizer = config.normalizer()?;

    let datasets = loader::load_all(&cli.data_dir);
    if !has_any_data(&datasets) {
        warn!(data_dir = %cli.data_dir.display(), "No source data found; only demo data is available");
    }
    let options = SelectionOptions::from_datasets(&datasets);

    let selection = match cli.command {
        Commands::Options => {
            list_options(&options);
            return Ok(());
        }
        Commands::Demo => Selection::Demo,
        Commands::Forecast { date } => Selection::Forecast {
            date: date
                .or_else(|| options.latest_forecast_date())
                .context("no forecast dates available")?,
        },
        Commands::RegionalForecast { date } => Selection::RegionalForecast {
            date: date
                .or_else(|| options.earliest_regional_forecast_date())
                .context("no regional forecast dates available")?,
        },
        Commands::Surveillance { week, metric } => Selection::Surveillance {
            week: week
                .or_else(|| options.latest_week().map(String::from))
                .context("no surveillance weeks available")?,
            metric: metric.unwrap_or_else(|| SURVEILLANCE_METRICS[0].to_string()),
        },
        Commands::Doses {
            campaign,
            age_group,
            variable,
        } => Selection::Doses(DoseScope {
            campaign: campaign
                .or_else(|| options.latest_campaign().map(String::from))
                .context("no dose campaigns available")?,
            age_group,
            variable,
        }),
    };

    let view = build_view(&selection, &datasets, &weights, &normalizer)?;
    report(&view);
    print_pretty(&view);

    if cli.json {
        print_json(&view)?;
    }

    if let Some(region) = &cli.region {
        report_rank(&view, region, &normalizer);
    }

    if let Some(path) = cli.export {
        let path = path.unwrap_or_else(|| default_export_name(Utc::now().date_naive()));
        export_csv(&path, &view.rows)?;
        info!(path = %path, rows = view.rows.len(), "CSV exported");
    }

    Ok(())
}

/// Logs the regional table, its summary figures and the top regions.
fn report(view: &RegionalView) {
    info!(title = %view.title, join_key = GEO_FEATURE_ID_KEY, "Regional view");

    for row in &view.rows {
        if row.region != row.region_mapped {
            info!(region = %row.region, region_mapped = %row.region_mapped, "Region label remapped");
        }
        info!(region = %row.region, value = row.value, "Region");
    }

    info!(
        total = view.summary.total,
        mean = view.summary.mean,
        max = view.summary.max,
        min = view.summary.min,
        "Summary"
    );

    for (idx, row) in view.top.iter().enumerate() {
        info!(rank = idx + 1, region = %row.region, value = row.value, "Top region");
    }

    let bar_order: Vec<&str> = view.bar_order.iter().map(|r| r.region.as_str()).collect();
    debug!(regions = %bar_order.join(", "), "Bar order");

    for bound in &view.bounds {
        info!(
            region = %bound.region,
            lower = bound.lower,
            upper = bound.upper,
            "Forecast interval"
        );
    }

    for point in &view.series {
        info!(
            date = %point.date,
            value = point.value,
            lower = ?point.lower,
            upper = ?point.upper,
            trend = ?point.trend,
            "National series"
        );
    }
}

fn report_rank(view: &RegionalView, region: &str, normalizer: &RegionNormalizer) {
    match view.rank_of(region, normalizer) {
        Ok(rank) => info!(
            region,
            rank = rank.rank,
            of = view.rows.len(),
            share_pct = rank.share_pct,
            "Region position"
        ),
        Err(e) => warn!(error = %e, "No position for region"),
    }
}

fn list_options(options: &SelectionOptions) {
    let dates: Vec<String> = options
        .forecast_dates
        .iter()
        .map(|d| d.to_string())
        .collect();
    info!(count = dates.len(), dates = %dates.join(", "), "Forecast dates");
    let regional_dates: Vec<String> = options
        .regional_forecast_dates
        .iter()
        .map(|d| d.to_string())
        .collect();
    info!(
        count = regional_dates.len(),
        dates = %regional_dates.join(", "),
        "Regional forecast dates"
    );
    info!(count = options.weeks.len(), weeks = %options.weeks.join(", "), "Surveillance weeks");
    info!(metrics = %options.metrics.join(", "), "Surveillance metrics");
    info!(campaigns = %options.campaigns.join(", "), "Dose campaigns");
    info!(age_groups = %options.age_groups.join(", "), "Dose age groups");
}

fn has_any_data(datasets: &Datasets) -> bool {
    datasets.surveillance.is_some()
        || datasets.doses.is_some()
        || datasets.forecast.is_some()
        || datasets.regional_forecast.is_some()
}
