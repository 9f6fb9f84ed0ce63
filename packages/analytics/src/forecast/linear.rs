//! Least-squares linear trend over the most recent months.

use crate::AnalyticsError;

/// Most recent observations the trend is fit on.
pub const TREND_WINDOW: usize = 12;

/// A fitted trend line and its forecast.
#[derive(Debug, Clone)]
pub struct LinearFit {
    /// Raw forecast, one per horizon step.
    pub forecast: Vec<f64>,
    /// Trend values over the fitted window (the last `min(12, n)` points).
    pub fitted: Vec<f64>,
    /// Increase per month.
    pub slope: f64,
    /// Trend value at the first point of the window.
    pub intercept: f64,
}

/// Fits an ordinary least-squares trend to the last `min(12, n)` values
/// and extends it `horizon` steps.
///
/// # Errors
///
/// Returns [`AnalyticsError::InsufficientData`] if `values` is empty.
#[allow(clippy::cast_precision_loss)]
pub fn fit(values: &[f64], horizon: usize) -> Result<LinearFit, AnalyticsError> {
    let window = &values[values.len().saturating_sub(TREND_WINDOW)..];
    if window.is_empty() {
        return Err(AnalyticsError::insufficient("no values for a linear trend"));
    }

    let n = window.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = window.iter().sum::<f64>() / n;

    let (sxy, sxx) = window
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxy, sxx), (i, y)| {
            let dx = i as f64 - mean_x;
            (dx.mul_add(y - mean_y, sxy), dx.mul_add(dx, sxx))
        });

    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = slope.mul_add(-mean_x, mean_y);
    let at = |x: f64| slope.mul_add(x, intercept);

    let last = n - 1.0;
    Ok(LinearFit {
        forecast: (1..=horizon).map(|h| at(last + h as f64)).collect(),
        fitted: (0..window.len()).map(|i| at(i as f64)).collect(),
        slope,
        intercept,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_line_is_extended() {
        let values: Vec<f64> = (0..12).map(|i| 2.0f64.mul_add(f64::from(i), 5.0)).collect();
        let fit = fit(&values, 3).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-9);
        assert!((fit.forecast[0] - 29.0).abs() < 1e-9);
        assert!((fit.forecast[2] - 33.0).abs() < 1e-9);
    }

    #[test]
    fn only_last_twelve_points_are_used() {
        let mut values = vec![1000.0; 6];
        values.extend(std::iter::repeat_n(4.0, 12));
        let fit = fit(&values, 1).unwrap();

        assert_eq!(fit.fitted.len(), 12);
        assert!(fit.slope.abs() < 1e-12);
        assert!((fit.forecast[0] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn late_ramp_uses_unweighted_slope() {
        let values = [
            10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 12.0, 14.0, 16.0, 16.0, 16.0,
        ];
        let fit = fit(&values, 1).unwrap();

        // sxy = 94, sxx = 143 over x = 0..12
        assert!((fit.slope - 94.0 / 143.0).abs() < 1e-9, "slope {}", fit.slope);
        assert!((fit.forecast[0] - 16.272_727).abs() < 1e-5, "forecast {}", fit.forecast[0]);
    }

    #[test]
    fn single_point_is_flat() {
        let fit = fit(&[3.0], 2).unwrap();
        assert!(fit.slope.abs() < f64::EPSILON);
        assert!((fit.forecast[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_series_is_rejected() {
        assert!(matches!(
            fit(&[], 1),
            Err(AnalyticsError::InsufficientData { .. })
        ));
    }
}
