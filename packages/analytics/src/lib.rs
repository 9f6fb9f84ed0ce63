#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Clustering, forecasting and data-quality engine for crime incidents.
//!
//! The pipeline runs leaves-first:
//!
//! 1. [`encoder`] turns [`FeatureRecord`]s into standardized numeric vectors.
//! 2. [`clustering`] partitions the vectors with multi-run K-means.
//! 3. [`enrich`] joins assignments back to their records and groups them.
//! 4. [`aggregate`] builds monthly `(precinct, crime type)` series.
//! 5. [`forecast`] projects each series forward with SSA, falling back to a
//!    linear trend.
//! 6. [`validation`] backtests the forecasting engine on held-out months.
//! 7. [`quality`] scores a dataset's fitness for forecasting.
//!
//! [`AnalyticsEngine`] exposes the five request-level operations. Every call
//! is a fresh, stateless computation.
//!
//! [`FeatureRecord`]: crime_analytics_models::FeatureRecord

pub mod aggregate;
pub mod cancel;
pub mod clustering;
pub mod config;
pub mod encoder;
pub mod engine;
pub mod enrich;
pub mod forecast;
pub mod metrics;
pub mod progress;
pub mod quality;
pub mod validation;

pub use cancel::CancellationFlag;
pub use config::AnalyticsConfig;
pub use engine::{
    AnalyticsEngine, assess_data_quality, cluster, cluster_grouped, forecast,
    validate_forecast_model,
};

use thiserror::Error;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Not enough records, distinct vectors or history to compute a result.
    #[error("Insufficient data: {message}")]
    InsufficientData {
        /// Description of what was missing.
        message: String,
    },

    /// A requested feature name is not in the feature registry.
    #[error("Invalid feature: '{name}'")]
    InvalidFeature {
        /// The unrecognized name.
        name: String,
    },

    /// A request parameter is outside its allowed range.
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// Description of the offending parameter.
        message: String,
    },

    /// The primary forecasting model could not be fit. Recovered internally
    /// by the linear-trend fallback.
    #[error("Model fit failed: {message}")]
    ModelFit {
        /// Why the fit failed.
        message: String,
    },

    /// The underlying K-means fit failed.
    #[error("Clustering failed: {message}")]
    Clustering {
        /// Error reported by the K-means implementation.
        message: String,
    },

    /// The request's cancellation flag was raised.
    #[error("Operation cancelled")]
    Cancelled,

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration could not be loaded or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// Reading a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyticsError {
    /// Returns `true` for conditions caused by the request itself, which a
    /// boundary layer should report as a bad request rather than an internal
    /// failure.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. }
                | Self::InvalidFeature { .. }
                | Self::InvalidParameter { .. }
                | Self::Cancelled
        )
    }

    pub(crate) fn insufficient(message: impl Into<String>) -> Self {
        Self::InsufficientData {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    pub(crate) fn model_fit(message: impl Into<String>) -> Self {
        Self::ModelFit {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_classified() {
        assert!(AnalyticsError::insufficient("empty batch").is_client_error());
        assert!(
            AnalyticsError::InvalidFeature {
                name: "Color".to_string()
            }
            .is_client_error()
        );
        assert!(AnalyticsError::invalid_parameter("horizon").is_client_error());
        assert!(!AnalyticsError::model_fit("verticality").is_client_error());
        assert!(
            !AnalyticsError::Clustering {
                message: "diverged".to_string()
            }
            .is_client_error()
        );
    }
}
