#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the crime analytics engine.
//!
//! Loads incidents from a JSON or CSV file, applies the incident filters,
//! runs the requested analysis and prints the result as JSON.
//!
//! Uses `indicatif-log-bridge` (via [`crime_analytics_cli_utils::init_logger`])
//! so that log lines and the progress bar never fight for the terminal.

mod input;

use std::io::Write as _;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use crime_analytics::forecast::parse_model_type;
use crime_analytics::{AnalyticsConfig, AnalyticsEngine};
use crime_analytics_cli_utils::{IndicatifProgress, MultiProgress};
use crime_analytics_crime_models::{CrimeType, Motive, Precinct, Severity, Weather};
use crime_analytics_models::{ClusterParams, FeatureRecord, ForecastParameters, IncidentFilter};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "crime_analytics", about = "Crime incident clustering and forecasting")]
struct Cli {
    /// Incident file (`.json` array or `.csv` with camelCase headers)
    #[arg(long, short, global = true)]
    input: Option<PathBuf>,

    /// TOML file overriding the built-in analytics defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write the JSON result here instead of stdout
    #[arg(long, short, global = true)]
    output: Option<PathBuf>,

    #[command(flatten)]
    filter: FilterArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster incidents and print one assignment per incident
    Cluster {
        #[command(flatten)]
        cluster: ClusterArgs,
    },
    /// Cluster incidents and print the enriched cluster groups
    Groups {
        #[command(flatten)]
        cluster: ClusterArgs,
    },
    /// Cluster incidents, then forecast monthly counts per precinct and crime type
    Forecast {
        #[command(flatten)]
        cluster: ClusterArgs,
        #[command(flatten)]
        forecast: ForecastArgs,
    },
    /// Backtest the forecasting model on the last six months of history
    Validate {
        #[command(flatten)]
        cluster: ClusterArgs,
        #[command(flatten)]
        forecast: ForecastArgs,
    },
    /// Assess whether the clustered data is fit for forecasting
    Quality {
        #[command(flatten)]
        cluster: ClusterArgs,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args)]
struct FilterArgs {
    /// First day to include (YYYY-MM-DD); requires `--date-to`
    #[arg(long, global = true)]
    date_from: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD); requires `--date-from`
    #[arg(long, global = true)]
    date_to: Option<NaiveDate>,
    /// Comma-separated crime types to keep (e.g. `THEFT,ROBBERY`)
    #[arg(long, global = true, value_delimiter = ',')]
    crime_types: Vec<CrimeType>,
    /// Comma-separated motives to keep
    #[arg(long, global = true, value_delimiter = ',')]
    motives: Vec<Motive>,
    /// Comma-separated severities to keep
    #[arg(long, global = true, value_delimiter = ',')]
    severities: Vec<Severity>,
    /// Comma-separated weather conditions to keep
    #[arg(long, global = true, value_delimiter = ',')]
    weathers: Vec<Weather>,
    /// Comma-separated precincts to keep
    #[arg(long, global = true, value_delimiter = ',')]
    precincts: Vec<Precinct>,
}

impl FilterArgs {
    fn into_filter(self) -> IncidentFilter {
        IncidentFilter {
            date_from: self.date_from,
            date_to: self.date_to,
            crime_types: self.crime_types,
            motives: self.motives,
            severities: self.severities,
            weathers: self.weathers,
            precincts: self.precincts,
        }
    }
}

#[derive(Args)]
struct ClusterArgs {
    /// Comma-separated feature names (e.g. `CrimeType,Latitude,Longitude`)
    #[arg(long, value_delimiter = ',')]
    features: Vec<String>,
    /// Number of clusters
    #[arg(long, short)]
    k: Option<usize>,
    /// Number of K-means runs to choose the best from
    #[arg(long)]
    runs: Option<usize>,
    /// Base random seed
    #[arg(long)]
    seed: Option<u64>,
}

impl ClusterArgs {
    fn apply(self, mut params: ClusterParams) -> ClusterParams {
        if !self.features.is_empty() {
            params.features = Some(self.features);
        }
        if let Some(k) = self.k {
            params.number_of_clusters = k;
        }
        if let Some(runs) = self.runs {
            params.number_of_runs = runs;
        }
        if let Some(seed) = self.seed {
            params.seed = seed;
        }
        params
    }
}

#[derive(Args)]
struct ForecastArgs {
    /// Months to forecast (1-24)
    #[arg(long)]
    horizon: Option<u32>,
    /// Confidence level for the bounds, between 0 and 1
    #[arg(long)]
    confidence: Option<f64>,
    /// `SSA` or `Linear`
    #[arg(long)]
    model_type: Option<String>,
    /// Drop oscillatory SSA components
    #[arg(long)]
    no_seasonality: bool,
}

impl ForecastArgs {
    fn apply(
        self,
        mut params: ForecastParameters,
    ) -> Result<ForecastParameters, Box<dyn std::error::Error>> {
        if let Some(horizon) = self.horizon {
            params.horizon = horizon;
        }
        if let Some(confidence) = self.confidence {
            params.confidence_level = confidence;
        }
        if let Some(model_type) = self.model_type {
            params.model_type = parse_model_type(&model_type)?;
        }
        if self.no_seasonality {
            params.include_seasonality = false;
        }
        Ok(params)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = crime_analytics_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = AnalyticsConfig::load(cli.config.as_deref())?;
    let input_path = cli.input;
    let filter = cli.filter.into_filter();
    let load = move || -> Result<Vec<FeatureRecord>, Box<dyn std::error::Error>> {
        let Some(path) = input_path else {
            return Err("--input is required for analysis commands".into());
        };
        let records = filter.apply(input::load_records(&path)?);
        log::info!("{} incidents remain after filtering", records.len());
        Ok(records)
    };

    let engine = engine_for(&multi, "Clustering");
    let json = match cli.command {
        Commands::Config => toml::to_string_pretty(&config)?,
        Commands::Cluster { cluster } => {
            let params = cluster.apply(config.cluster_params());
            to_json(&engine.cluster(&load()?, &params)?)?
        }
        Commands::Groups { cluster } => {
            let params = cluster.apply(config.cluster_params());
            to_json(&engine.cluster_grouped(&load()?, &params)?)?
        }
        Commands::Forecast { cluster, forecast } => {
            let params = forecast.apply(config.forecast_parameters())?;
            let cluster_params = cluster.apply(config.cluster_params());
            let groups = engine.cluster_grouped(&load()?, &cluster_params)?;
            let engine = engine_for(&multi, "Forecasting");
            to_json(&engine.forecast(&groups, &params)?)?
        }
        Commands::Validate { cluster, forecast } => {
            let params = forecast.apply(config.forecast_parameters())?;
            let cluster_params = cluster.apply(config.cluster_params());
            let groups = engine.cluster_grouped(&load()?, &cluster_params)?;
            to_json(&engine.validate_forecast_model(&groups, &params)?)?
        }
        Commands::Quality { cluster } => {
            let cluster_params = cluster.apply(config.cluster_params());
            let groups = engine.cluster_grouped(&load()?, &cluster_params)?;
            to_json(&engine.assess_data_quality(&groups))?
        }
    };

    write_output(cli.output.as_deref(), json.as_bytes())
}

fn engine_for(multi: &MultiProgress, message: &str) -> AnalyticsEngine {
    AnalyticsEngine::new().with_progress(IndicatifProgress::analytics_bar(multi, message))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

fn write_output(
    path: Option<&std::path::Path>,
    bytes: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            std::fs::write(path, bytes)?;
            log::info!("Wrote result to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}
