//! Analytics configuration.
//!
//! Defaults are embedded at compile time from `config/default.toml`. A
//! user-supplied TOML file may override any subset of keys, and a couple of
//! environment variables override the clustering seed and run count:
//!
//! - `CRIME_ANALYTICS_SEED`
//! - `CRIME_ANALYTICS_RUNS`

use std::path::Path;

use crime_analytics_models::{ClusterParams, ForecastParameters, ModelType};
use serde::{Deserialize, Serialize};

use crate::AnalyticsError;
use crate::encoder::Feature;

const DEFAULT_TOML: &str = include_str!("../config/default.toml");

/// Environment variable overriding [`ClusteringConfig::seed`].
pub const SEED_ENV: &str = "CRIME_ANALYTICS_SEED";

/// Environment variable overriding [`ClusteringConfig::number_of_runs`].
pub const RUNS_ENV: &str = "CRIME_ANALYTICS_RUNS";

/// Top-level analytics configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Clustering defaults.
    pub clustering: ClusteringConfig,
    /// Forecasting defaults.
    pub forecast: ForecastConfig,
}

/// `[clustering]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Feature names to cluster on.
    pub features: Vec<String>,
    /// Number of clusters (K).
    pub number_of_clusters: usize,
    /// Number of K-means runs (R).
    pub number_of_runs: usize,
    /// Base random seed.
    pub seed: u64,
    /// Iteration cap for a single fit.
    pub max_iterations: u64,
    /// Convergence tolerance for a single fit.
    pub tolerance: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        let params = ClusterParams::default();
        Self {
            features: Feature::DEFAULT
                .iter()
                .map(|f| f.name().to_string())
                .collect(),
            number_of_clusters: params.number_of_clusters,
            number_of_runs: params.number_of_runs,
            seed: params.seed,
            max_iterations: params.max_iterations,
            tolerance: params.tolerance,
        }
    }
}

/// `[forecast]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Months to forecast.
    pub horizon: u32,
    /// Confidence level for forecast bounds.
    pub confidence_level: f64,
    /// Model family.
    pub model_type: ModelType,
    /// Keep oscillatory SSA components.
    pub include_seasonality: bool,
    /// Recency-weighting preference passed through to forecast metadata.
    pub weight_recent_data: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        let params = ForecastParameters::default();
        Self {
            horizon: params.horizon,
            confidence_level: params.confidence_level,
            model_type: params.model_type,
            include_seasonality: params.include_seasonality,
            weight_recent_data: params.weight_recent_data,
        }
    }
}

impl AnalyticsConfig {
    /// Parses the compile-time embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Config`] if the embedded TOML is malformed.
    pub fn embedded_default() -> Result<Self, AnalyticsError> {
        Self::from_toml_str(DEFAULT_TOML)
    }

    /// Parses a TOML document. Missing keys take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Config`] if the document is malformed.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, AnalyticsError> {
        toml::de::from_str(toml_str).map_err(|e| AnalyticsError::Config {
            message: e.to_string(),
        })
    }

    /// Loads the embedded defaults, then the file at `path` if given, then
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, either document fails to
    /// parse, or an override variable is not a valid integer.
    pub fn load(path: Option<&Path>) -> Result<Self, AnalyticsError> {
        let mut config = match path {
            Some(path) => {
                log::info!("Loading analytics config from {}", path.display());
                Self::from_toml_str(&std::fs::read_to_string(path)?)?
            }
            None => Self::embedded_default()?,
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies seed/run overrides from `lookup` (normally the process
    /// environment).
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Config`] if a set variable does not parse.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), AnalyticsError> {
        if let Some(seed) = lookup(SEED_ENV) {
            self.clustering.seed = parse_override(SEED_ENV, &seed)?;
            log::debug!("{SEED_ENV} overrides clustering seed: {seed}");
        }
        if let Some(runs) = lookup(RUNS_ENV) {
            self.clustering.number_of_runs = parse_override(RUNS_ENV, &runs)?;
            log::debug!("{RUNS_ENV} overrides clustering runs: {runs}");
        }
        Ok(())
    }

    /// Builds clustering request parameters from the `[clustering]` section.
    #[must_use]
    pub fn cluster_params(&self) -> ClusterParams {
        let c = &self.clustering;
        ClusterParams {
            features: (!c.features.is_empty()).then(|| c.features.clone()),
            number_of_clusters: c.number_of_clusters,
            number_of_runs: c.number_of_runs,
            seed: c.seed,
            max_iterations: c.max_iterations,
            tolerance: c.tolerance,
        }
    }

    /// Builds forecasting request parameters from the `[forecast]` section.
    #[must_use]
    pub const fn forecast_parameters(&self) -> ForecastParameters {
        let f = &self.forecast;
        ForecastParameters {
            horizon: f.horizon,
            confidence_level: f.confidence_level,
            model_type: f.model_type,
            include_seasonality: f.include_seasonality,
            weight_recent_data: f.weight_recent_data,
        }
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AnalyticsError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| AnalyticsError::Config {
        message: format!("{key}='{value}': {e}"),
    })
}
