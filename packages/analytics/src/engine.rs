//! Request-level analytics operations.
//!
//! [`AnalyticsEngine`] wires the pipeline stages together and carries the
//! per-request progress sink and cancellation flag. The free functions at
//! the bottom of this module run the same operations with a silent,
//! never-cancelled engine.

use std::sync::Arc;

use crime_analytics_models::{
    ClusterGroup, ClusterParams, ClusterResult, DataQualityAssessment, FeatureRecord,
    ForecastParameters, ForecastResponse, ForecastValidationResult,
};
use rayon::prelude::*;

use crate::AnalyticsError;
use crate::aggregate::monthly_series;
use crate::cancel::CancellationFlag;
use crate::clustering::cluster_vectors;
use crate::encoder::encode;
use crate::enrich::{assignments, enrich};
use crate::forecast::{self, MIN_HISTORY, forecast_series};
use crate::metrics::compute_metrics;
use crate::progress::{ProgressCallback, null_progress};
use crate::{quality, validation};

/// Entry point for clustering, forecasting and data-quality requests.
///
/// Holds no analytical state between calls.
#[derive(Clone)]
pub struct AnalyticsEngine {
    progress: Arc<dyn ProgressCallback>,
    cancel: CancellationFlag,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self {
            progress: null_progress(),
            cancel: CancellationFlag::new(),
        }
    }
}

impl AnalyticsEngine {
    /// Creates an engine that reports nothing and is never cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports clustering runs and forecast series to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Stops in-flight requests once `cancel` is raised.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Clusters `records` and returns one assignment per record, in input
    /// order.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::InsufficientData`] if `records` is empty or K
    ///   exceeds the number of distinct feature vectors
    /// * [`AnalyticsError::InvalidFeature`] for an unknown feature name
    /// * [`AnalyticsError::InvalidParameter`] if K or R is 0
    /// * [`AnalyticsError::Cancelled`] if the request is cancelled
    pub fn cluster(
        &self,
        records: &[FeatureRecord],
        params: &ClusterParams,
    ) -> Result<ClusterResult, AnalyticsError> {
        log::info!(
            "Clustering {} records (k={}, runs={}, seed={})",
            records.len(),
            params.number_of_clusters,
            params.number_of_runs,
            params.seed
        );

        let batch = encode(records, params.features.as_deref())?;
        self.progress.set_message("Clustering".to_string());
        let outcome = cluster_vectors(
            &batch.vectors,
            params,
            self.progress.as_ref(),
            &self.cancel,
        )?;

        Ok(ClusterResult {
            assignments: assignments(records, &outcome.labels),
            cluster_count: outcome.cluster_count,
            inertia: outcome.inertia,
        })
    }

    /// Clusters `records` and groups the enriched assignments by cluster id.
    ///
    /// # Errors
    ///
    /// Same as [`Self::cluster`].
    pub fn cluster_grouped(
        &self,
        records: &[FeatureRecord],
        params: &ClusterParams,
    ) -> Result<Vec<ClusterGroup>, AnalyticsError> {
        let result = self.cluster(records, params)?;
        let groups = enrich(&result.assignments, records);
        log::info!(
            "Grouped {} assignments into {} clusters",
            result.assignments.len(),
            groups.len()
        );
        Ok(groups)
    }

    /// Forecasts every `(precinct, crime type)` series with at least 12
    /// months of history.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::InvalidParameter`] for an out-of-range horizon
    ///   or confidence level
    /// * [`AnalyticsError::InsufficientData`] if `groups` holds no incidents
    ///   or no series has enough history
    /// * [`AnalyticsError::Cancelled`] if the request is cancelled
    pub fn forecast(
        &self,
        groups: &[ClusterGroup],
        params: &ForecastParameters,
    ) -> Result<ForecastResponse, AnalyticsError> {
        forecast::validate_parameters(params)?;
        require_items(groups, "forecasting")?;

        let (eligible, short): (Vec<_>, Vec<_>) = monthly_series(groups)
            .into_iter()
            .partition(|s| s.points.len() >= MIN_HISTORY);
        for s in &short {
            log::warn!(
                "Skipping forecast for {}: {} months of history, need {MIN_HISTORY}",
                s.key,
                s.points.len()
            );
        }
        if eligible.is_empty() {
            return Err(AnalyticsError::insufficient(format!(
                "no series has at least {MIN_HISTORY} months of history"
            )));
        }

        log::info!(
            "Forecasting {} series {} months ahead with {} ({} skipped)",
            eligible.len(),
            params.horizon,
            params.model_type,
            short.len()
        );
        self.progress.set_message("Forecasting".to_string());
        self.progress.set_total(eligible.len() as u64);

        let results = eligible
            .par_iter()
            .map(|s| {
                self.cancel.check()?;
                let result = forecast_series(s, params)?;
                self.progress.inc(1);
                Ok(result)
            })
            .collect::<Result<Vec<_>, AnalyticsError>>()?;

        let mut series = Vec::with_capacity(results.len());
        let mut pairs = Vec::new();
        for (forecast, fitted) in results {
            series.push(forecast);
            pairs.extend(fitted);
        }
        let metrics = compute_metrics(&pairs);
        self.progress.finish(format!("Forecast {} series", series.len()));

        Ok(ForecastResponse {
            series,
            metrics,
            skipped_series: short.len(),
            parameters: params.clone(),
        })
    }

    /// Backtests the forecasting engine on the last six months of every
    /// series with at least 24 months of history.
    ///
    /// # Errors
    ///
    /// * [`AnalyticsError::InvalidParameter`] for out-of-range parameters
    /// * [`AnalyticsError::InsufficientData`] if `groups` holds no incidents
    pub fn validate_forecast_model(
        &self,
        groups: &[ClusterGroup],
        params: &ForecastParameters,
    ) -> Result<ForecastValidationResult, AnalyticsError> {
        forecast::validate_parameters(params)?;
        require_items(groups, "validation")?;
        self.cancel.check()?;

        validation::validate_series(&monthly_series(groups), params)
    }

    /// Scores the dataset's fitness for forecasting.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn assess_data_quality(&self, groups: &[ClusterGroup]) -> DataQualityAssessment {
        quality::assess(groups)
    }
}

fn require_items(groups: &[ClusterGroup], purpose: &str) -> Result<(), AnalyticsError> {
    if groups.iter().all(|g| g.cluster_items.is_empty()) {
        return Err(AnalyticsError::insufficient(format!(
            "cluster data is required for {purpose}"
        )));
    }
    Ok(())
}

/// Runs [`AnalyticsEngine::cluster`] with a default engine.
///
/// # Errors
///
/// See [`AnalyticsEngine::cluster`].
pub fn cluster(
    records: &[FeatureRecord],
    params: &ClusterParams,
) -> Result<ClusterResult, AnalyticsError> {
    AnalyticsEngine::default().cluster(records, params)
}

/// Runs [`AnalyticsEngine::cluster_grouped`] with a default engine.
///
/// # Errors
///
/// See [`AnalyticsEngine::cluster`].
pub fn cluster_grouped(
    records: &[FeatureRecord],
    params: &ClusterParams,
) -> Result<Vec<ClusterGroup>, AnalyticsError> {
    AnalyticsEngine::default().cluster_grouped(records, params)
}

/// Runs [`AnalyticsEngine::forecast`] with a default engine.
///
/// # Errors
///
/// See [`AnalyticsEngine::forecast`].
pub fn forecast(
    groups: &[ClusterGroup],
    params: &ForecastParameters,
) -> Result<ForecastResponse, AnalyticsError> {
    AnalyticsEngine::default().forecast(groups, params)
}

/// Runs [`AnalyticsEngine::validate_forecast_model`] with a default engine.
///
/// # Errors
///
/// See [`AnalyticsEngine::validate_forecast_model`].
pub fn validate_forecast_model(
    groups: &[ClusterGroup],
    params: &ForecastParameters,
) -> Result<ForecastValidationResult, AnalyticsError> {
    AnalyticsEngine::default().validate_forecast_model(groups, params)
}

/// Runs [`AnalyticsEngine::assess_data_quality`] with a default engine.
#[must_use]
pub fn assess_data_quality(groups: &[ClusterGroup]) -> DataQualityAssessment {
    AnalyticsEngine::default().assess_data_quality(groups)
}
