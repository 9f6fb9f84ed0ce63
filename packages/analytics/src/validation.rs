//! Holdout backtesting of the forecasting engine.

use crime_analytics_models::{
    ForecastParameters, ForecastValidationResult, MonthlySeries, SeriesValidation,
};

use crate::AnalyticsError;
use crate::forecast;
use crate::metrics::compute_metrics;

/// Months held out from the end of each series.
pub const HOLDOUT_MONTHS: usize = 6;

/// Fewest points a series needs to be backtested.
pub const MIN_VALIDATION_HISTORY: usize = 24;

/// Pooled MAPE (percent) below which the model is considered reliable.
const RELIABLE_MAPE: f64 = 25.0;

/// Pooled MAPE (percent) above which a high-error warning is added.
const HIGH_ERROR_MAPE: f64 = 50.0;

/// Backtests every series: fit on all but the last six months, forecast six
/// and compare against the held-out actuals.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidParameter`] for out-of-range forecast
/// parameters.
pub fn validate_series(
    series: &[MonthlySeries],
    params: &ForecastParameters,
) -> Result<ForecastValidationResult, AnalyticsError> {
    forecast::validate_parameters(params)?;

    let mut warnings = Vec::new();
    let mut validated = Vec::new();
    let mut pooled = Vec::new();

    for s in series {
        let values = s.values();
        if values.len() < MIN_VALIDATION_HISTORY {
            log::warn!(
                "Skipping validation for {}: {} months of history, need {MIN_VALIDATION_HISTORY}",
                s.key,
                values.len()
            );
            warnings.push(format!(
                "Series {} skipped: {} months of history, at least {MIN_VALIDATION_HISTORY} required",
                s.key,
                values.len()
            ));
            continue;
        }

        let (train, holdout) = values.split_at(values.len() - HOLDOUT_MONTHS);
        let projection = forecast::project(train, HOLDOUT_MONTHS, params)?;
        let pairs: Vec<(f64, f64)> = holdout
            .iter()
            .copied()
            .zip(projection.values.iter().map(|v| v.forecast))
            .collect();

        let metrics = compute_metrics(&pairs);
        log::debug!(
            "Backtest {}: MAPE {:.2}%, MAE {:.3}",
            s.key,
            metrics.mean_absolute_percentage_error,
            metrics.mean_absolute_error
        );
        pooled.extend(pairs);
        validated.push(SeriesValidation {
            precinct: s.key.precinct,
            crime_type: s.key.crime_type,
            metrics,
        });
    }

    let metrics = compute_metrics(&pooled);
    let mape = metrics.mean_absolute_percentage_error;

    if validated.is_empty() {
        warnings.push(format!(
            "No series had enough history for validation (at least {MIN_VALIDATION_HISTORY} months required)"
        ));
    } else if mape > HIGH_ERROR_MAPE {
        warnings.push(format!(
            "High forecast error: MAPE {mape:.1}% exceeds {HIGH_ERROR_MAPE:.0}%"
        ));
    }

    let is_reliable = !validated.is_empty() && mape < RELIABLE_MAPE;
    log::info!(
        "Validated {} of {} series; pooled MAPE {mape:.2}%, reliable: {is_reliable}",
        validated.len(),
        series.len()
    );

    Ok(ForecastValidationResult {
        is_reliable,
        metrics,
        series: validated,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::next_month;
    use crime_analytics_crime_models::{CrimeType, Precinct};
    use crime_analytics_models::{MonthlyPoint, SeriesKey};

    fn series(precinct: Precinct, counts: &[u64]) -> MonthlySeries {
        let mut month = (2021, 1);
        MonthlySeries {
            key: SeriesKey {
                precinct,
                crime_type: CrimeType::Theft,
            },
            points: counts
                .iter()
                .map(|&count| {
                    let point = MonthlyPoint {
                        year: month.0,
                        month: month.1,
                        count,
                    };
                    month = next_month(month.0, month.1);
                    point
                })
                .collect(),
        }
    }

    #[test]
    fn zero_noise_series_is_reliable() {
        let result = validate_series(
            &[series(Precinct::Sucat, &[9; 30])],
            &ForecastParameters::default(),
        )
        .unwrap();

        assert!(result.is_reliable);
        assert!((result.metrics.accuracy - 1.0).abs() < 1e-6);
        assert_eq!(result.series.len(), 1);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn zero_noise_trend_and_season_are_reliable() {
        let trend: Vec<u64> = (10..40).collect();
        let cycle = [24, 22, 18, 16, 18, 22];
        let seasonal: Vec<u64> = (0..30).map(|t| cycle[t % 6]).collect();

        let result = validate_series(
            &[
                series(Precinct::Sucat, &trend),
                series(Precinct::Buli, &seasonal),
            ],
            &ForecastParameters::default(),
        )
        .unwrap();

        assert_eq!(result.series.len(), 2);
        for s in &result.series {
            assert!(
                s.metrics.mean_absolute_error < 1e-6,
                "{:?}: {:?}",
                s.precinct,
                s.metrics
            );
        }
        assert!(result.is_reliable);
        assert!((result.metrics.accuracy - 1.0).abs() < 1e-6);
    }

    #[test]
    fn short_series_skipped_with_warning() {
        let result = validate_series(
            &[
                series(Precinct::Sucat, &[9; 30]),
                series(Precinct::Buli, &[4; 12]),
            ],
            &ForecastParameters::default(),
        )
        .unwrap();

        assert_eq!(result.series.len(), 1);
        assert_eq!(result.series[0].precinct, Precinct::Sucat);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("skipped"));
    }

    #[test]
    fn nothing_validated_is_unreliable() {
        let result = validate_series(
            &[series(Precinct::Buli, &[4; 12])],
            &ForecastParameters::default(),
        )
        .unwrap();

        assert!(!result.is_reliable);
        assert!(result.series.is_empty());
        assert!(result.warnings.iter().any(|w| w.contains("No series")));
    }

    #[test]
    fn regime_change_flags_high_error() {
        let mut counts = vec![40; 24];
        counts.extend([2; 6]);
        let result = validate_series(
            &[series(Precinct::Sucat, &counts)],
            &ForecastParameters::default(),
        )
        .unwrap();

        assert!(!result.is_reliable);
        assert!(result.warnings.iter().any(|w| w.contains("High forecast error")));
    }

    #[test]
    fn parameters_checked_first() {
        let params = ForecastParameters {
            horizon: 0,
            ..ForecastParameters::default()
        };
        assert!(matches!(
            validate_series(&[], &params),
            Err(AnalyticsError::InvalidParameter { .. })
        ));
    }
}
