//! Forecast error metrics.

use crime_analytics_models::ForecastMetrics;

/// Computes MAE, RMSE, MAPE and accuracy over `(actual, forecast)` pairs.
///
/// A pair whose actual value is zero adds nothing to the MAPE sum but still
/// counts in its denominator. An empty slice yields all-zero metrics.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_metrics(pairs: &[(f64, f64)]) -> ForecastMetrics {
    if pairs.is_empty() {
        return ForecastMetrics::default();
    }

    let n = pairs.len() as f64;
    let mae = pairs.iter().map(|(a, f)| (a - f).abs()).sum::<f64>() / n;
    let rmse = (pairs.iter().map(|(a, f)| (a - f).powi(2)).sum::<f64>() / n).sqrt();
    let mape = pairs
        .iter()
        .map(|&(a, f)| if a.abs() < f64::EPSILON { 0.0 } else { ((a - f) / a).abs() })
        .sum::<f64>()
        / n
        * 100.0;

    ForecastMetrics {
        mean_absolute_error: mae,
        root_mean_squared_error: rmse,
        mean_absolute_percentage_error: mape,
        accuracy: (1.0 - mape / 100.0).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_forecast() {
        let m = compute_metrics(&[(3.0, 3.0), (5.0, 5.0)]);
        assert!(m.mean_absolute_error.abs() < 1e-12);
        assert!(m.root_mean_squared_error.abs() < 1e-12);
        assert!(m.mean_absolute_percentage_error.abs() < 1e-12);
        assert!((m.accuracy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn known_errors() {
        let m = compute_metrics(&[(10.0, 8.0), (20.0, 26.0)]);
        assert!((m.mean_absolute_error - 4.0).abs() < 1e-12);
        assert!((m.root_mean_squared_error - 20.0_f64.sqrt()).abs() < 1e-12);
        // (0.2 + 0.3) / 2 = 25%
        assert!((m.mean_absolute_percentage_error - 25.0).abs() < 1e-9);
        assert!((m.accuracy - 0.75).abs() < 1e-9);
    }

    #[test]
    fn zero_actuals_count_in_denominator() {
        let m = compute_metrics(&[(0.0, 4.0), (10.0, 5.0)]);
        assert!((m.mean_absolute_percentage_error - 25.0).abs() < 1e-9);
    }

    #[test]
    fn accuracy_never_negative() {
        let m = compute_metrics(&[(1.0, 10.0)]);
        assert!(m.mean_absolute_percentage_error > 100.0);
        assert!(m.accuracy.abs() < f64::EPSILON);
    }

    #[test]
    fn empty_is_default() {
        assert_eq!(compute_metrics(&[]), ForecastMetrics::default());
    }
}
