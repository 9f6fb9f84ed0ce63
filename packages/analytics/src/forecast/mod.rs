//! Monthly incident forecasting.
//!
//! The primary model is singular spectrum analysis ([`ssa`]). When it cannot
//! be fit, or when a linear model is requested explicitly, a least-squares
//! trend ([`linear`]) is used instead. Either way each projected month gets
//! a non-negative point forecast, ordered bounds and trend/risk labels
//! relative to the series' recent average.

pub mod linear;
pub mod ssa;

use std::collections::BTreeMap;
use std::str::FromStr as _;

use chrono::{DateTime, NaiveDate, Utc};
use crime_analytics_models::{
    ForecastParameters, ForecastPoint, ForecastSeries, ModelType, MonthlySeries, RiskLabel,
    TrendLabel,
};

use crate::AnalyticsError;
use crate::aggregate::next_month;

/// Largest accepted forecast horizon, in months.
pub const MAX_HORIZON: u32 = 24;

/// Fewest monthly points a series needs before it is forecast.
pub const MIN_HISTORY: usize = 12;

/// Observations averaged for trend and risk labelling.
const RECENT_WINDOW: usize = 6;

/// Reported confidence of the linear model relative to the requested level.
const LINEAR_CONFIDENCE_FACTOR: f64 = 0.8;

/// Checks horizon and confidence level.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameter`] if the horizon is outside
/// `1..=24` or the confidence level is not strictly between 0 and 1.
pub fn validate_parameters(params: &ForecastParameters) -> Result<(), AnalyticsError> {
    if !(1..=MAX_HORIZON).contains(&params.horizon) {
        return Err(AnalyticsError::invalid_parameter(format!(
            "forecast horizon must be between 1 and {MAX_HORIZON} months, got {}",
            params.horizon
        )));
    }
    if !(params.confidence_level > 0.0 && params.confidence_level < 1.0) {
        return Err(AnalyticsError::invalid_parameter(format!(
            "confidence level must be between 0 and 1, got {}",
            params.confidence_level
        )));
    }
    Ok(())
}

/// Parses a model type name such as `"SSA"` or `"Linear"`.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameter`] for any other name.
pub fn parse_model_type(name: &str) -> Result<ModelType, AnalyticsError> {
    ModelType::from_str(name.trim()).map_err(|_| {
        AnalyticsError::invalid_parameter(format!(
            "unknown model type '{name}', expected SSA or Linear"
        ))
    })
}

/// One projected month before timestamps and labels are attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedValue {
    /// Point forecast, floored at 0.
    pub forecast: f64,
    /// Lower bound, floored at 0.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
}

/// Output of [`project`].
#[derive(Debug, Clone)]
pub struct Projection {
    /// One value per horizon step.
    pub values: Vec<ProjectedValue>,
    /// Confidence level the bounds represent.
    pub confidence: f64,
    /// In-sample fitted values aligned with the tail of the input series.
    pub fitted: Vec<f64>,
    /// Model that produced the projection.
    pub model: ModelType,
    /// SSA window length, if SSA was used.
    pub window: Option<usize>,
    /// SSA rank, if SSA was used.
    pub rank: Option<usize>,
    /// Why SSA was abandoned, if it was.
    pub fallback_reason: Option<String>,
}

impl Projection {
    /// `(actual, fitted)` pairs over the fitted part of `values`.
    #[must_use]
    pub fn in_sample_pairs(&self, values: &[f64]) -> Vec<(f64, f64)> {
        let offset = values.len().saturating_sub(self.fitted.len());
        values[offset..]
            .iter()
            .copied()
            .zip(self.fitted.iter().copied())
            .collect()
    }
}

/// Projects `values` forward `horizon` months.
///
/// SSA failures are recovered by the linear model and logged at warn level.
///
/// # Errors
///
/// Returns [`AnalyticsError::InsufficientData`] if `values` is empty.
pub fn project(
    values: &[f64],
    horizon: usize,
    params: &ForecastParameters,
) -> Result<Projection, AnalyticsError> {
    if values.is_empty() {
        return Err(AnalyticsError::insufficient("cannot forecast an empty series"));
    }

    let fallback_reason = match params.model_type {
        ModelType::Linear => None,
        ModelType::Ssa => match ssa::fit(values, horizon, params.include_seasonality) {
            Ok(fit) => return Ok(ssa_projection(&fit, params.confidence_level)),
            Err(AnalyticsError::ModelFit { message }) => {
                log::warn!("SSA fit failed ({message}); falling back to linear trend");
                Some(message)
            }
            Err(e) => return Err(e),
        },
    };

    let fit = linear::fit(values, horizon)?;
    let margin = 0.2 * recent_average(values);
    let projected = fit
        .forecast
        .iter()
        .map(|&raw| bounded(raw, margin))
        .collect();

    Ok(Projection {
        values: projected,
        confidence: params.confidence_level * LINEAR_CONFIDENCE_FACTOR,
        fitted: fit.fitted,
        model: ModelType::Linear,
        window: None,
        rank: None,
        fallback_reason,
    })
}

#[allow(clippy::cast_precision_loss)]
fn ssa_projection(fit: &ssa::SsaFit, confidence: f64) -> Projection {
    let z = normal_quantile(0.5 * (1.0 + confidence));
    let values = fit
        .forecast
        .iter()
        .enumerate()
        .map(|(i, &raw)| {
            let step = (i + 1) as f64;
            bounded(raw, z * fit.residual_std * step.sqrt())
        })
        .collect();

    Projection {
        values,
        confidence,
        fitted: fit.fitted.clone(),
        model: ModelType::Ssa,
        window: Some(fit.window),
        rank: Some(fit.rank),
        fallback_reason: None,
    }
}

/// Floors the forecast and lower bound at 0 and keeps the bounds ordered
/// around the floored forecast.
fn bounded(raw: f64, half_width: f64) -> ProjectedValue {
    let forecast = raw.max(0.0);
    ProjectedValue {
        forecast,
        lower: (raw - half_width).max(0.0).min(forecast),
        upper: (raw + half_width).max(forecast),
    }
}

/// Forecasts one monthly series.
///
/// Returns the labelled series and the `(actual, fitted)` pairs used for
/// in-sample metrics.
///
/// # Errors
///
/// * [`AnalyticsError::InsufficientData`] if the series is empty
/// * [`AnalyticsError::Conversion`] if a forecast month is out of range
pub fn forecast_series(
    series: &MonthlySeries,
    params: &ForecastParameters,
) -> Result<(ForecastSeries, Vec<(f64, f64)>), AnalyticsError> {
    let values = series.values();
    let Some(last) = series.points.last() else {
        return Err(AnalyticsError::insufficient(format!(
            "series {} has no points",
            series.key
        )));
    };

    let projection = project(&values, params.horizon as usize, params)?;
    let recent = recent_average(&values);

    let mut month = (last.year, last.month);
    let mut points = Vec::with_capacity(projection.values.len());
    for value in &projection.values {
        month = next_month(month.0, month.1);
        points.push(ForecastPoint {
            timestamp: month_start(month.0, month.1)?,
            forecast: value.forecast,
            lower_bound: value.lower,
            upper_bound: value.upper,
            confidence: projection.confidence,
            trend: trend_label(value.forecast, recent),
            risk: risk_label(value.forecast, recent),
        });
    }

    let mut metadata = BTreeMap::new();
    metadata.insert("model".to_string(), projection.model.to_string());
    metadata.insert("historyLength".to_string(), values.len().to_string());
    metadata.insert("recentAverage".to_string(), format!("{recent:.4}"));
    metadata.insert(
        "recencyWeighting".to_string(),
        params.weight_recent_data.to_string(),
    );
    metadata.insert(
        "fallback".to_string(),
        projection.fallback_reason.is_some().to_string(),
    );
    if let Some(window) = projection.window {
        metadata.insert("windowSize".to_string(), window.to_string());
    }
    if let Some(rank) = projection.rank {
        metadata.insert("rank".to_string(), rank.to_string());
    }
    if let Some(reason) = &projection.fallback_reason {
        metadata.insert("fallbackReason".to_string(), reason.clone());
    }

    log::debug!(
        "Forecast {} with {} over {} months of history",
        series.key,
        projection.model,
        values.len()
    );

    let pairs = projection.in_sample_pairs(&values);
    Ok((
        ForecastSeries {
            precinct: series.key.precinct,
            crime_type: series.key.crime_type,
            points,
            metadata,
        },
        pairs,
    ))
}

/// Mean of the last six observations (or all of them if fewer).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn recent_average(values: &[f64]) -> f64 {
    let tail = &values[values.len().saturating_sub(RECENT_WINDOW)..];
    if tail.is_empty() {
        return 0.0;
    }
    tail.iter().sum::<f64>() / tail.len() as f64
}

/// Labels a forecast against the recent average.
#[must_use]
pub fn trend_label(forecast: f64, recent_average: f64) -> TrendLabel {
    if forecast > 1.1 * recent_average {
        TrendLabel::Increasing
    } else if forecast < 0.9 * recent_average {
        TrendLabel::Decreasing
    } else {
        TrendLabel::Stable
    }
}

/// Buckets a forecast's risk against the recent average.
#[must_use]
pub fn risk_label(forecast: f64, recent_average: f64) -> RiskLabel {
    if forecast > 1.5 * recent_average {
        RiskLabel::Critical
    } else if forecast > 1.2 * recent_average {
        RiskLabel::High
    } else if forecast > 0.8 * recent_average {
        RiskLabel::Medium
    } else {
        RiskLabel::Low
    }
}

/// Midnight UTC on the first day of `(year, month)`.
///
/// # Errors
///
/// Returns [`AnalyticsError::Conversion`] if the date is not representable.
pub fn month_start(year: i32, month: u32) -> Result<DateTime<Utc>, AnalyticsError> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AnalyticsError::Conversion {
            message: format!("invalid forecast month {year}-{month:02}"),
        })
}

/// Inverse of the standard normal CDF (Acklam's rational approximation,
/// relative error below 1.2e-9).
#[must_use]
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let tail = |q: f64| {
        let num = C[0]
            .mul_add(q, C[1])
            .mul_add(q, C[2])
            .mul_add(q, C[3])
            .mul_add(q, C[4])
            .mul_add(q, C[5]);
        let den = D[0]
            .mul_add(q, D[1])
            .mul_add(q, D[2])
            .mul_add(q, D[3])
            .mul_add(q, 1.0);
        num / den
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        let num = A[0]
            .mul_add(r, A[1])
            .mul_add(r, A[2])
            .mul_add(r, A[3])
            .mul_add(r, A[4])
            .mul_add(r, A[5]);
        let den = B[0]
            .mul_add(r, B[1])
            .mul_add(r, B[2])
            .mul_add(r, B[3])
            .mul_add(r, B[4])
            .mul_add(r, 1.0);
        num * q / den
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}
