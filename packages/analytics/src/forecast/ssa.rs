//! Singular spectrum analysis.
//!
//! The series is embedded in an `L x K` trajectory matrix, the leading
//! eigenvectors of its lag-covariance matrix are kept, the series is
//! reconstructed by diagonal averaging and then continued with the linear
//! recurrence formula implied by those eigenvectors.

use ndarray::{Array1, Array2, s};

use crate::AnalyticsError;

/// Maximum embedding window.
pub const MAX_WINDOW: usize = 12;

/// Eigenvalues at or below this fraction of the leading one are treated as
/// numerical noise.
const NEGLIGIBLE_EIGENVALUE: f64 = 1e-9;

/// Components kept when oscillatory (seasonal) terms are excluded.
const TREND_ONLY_RANK: usize = 2;

const MAX_SWEEPS: usize = 100;

/// A fitted SSA model and its forecast.
#[derive(Debug, Clone)]
pub struct SsaFit {
    /// Raw (unfloored) forecast, one per horizon step.
    pub forecast: Vec<f64>,
    /// Reconstructed series, same length as the input.
    pub fitted: Vec<f64>,
    /// Root mean square of the reconstruction residuals.
    pub residual_std: f64,
    /// Window length L.
    pub window: usize,
    /// Number of components kept.
    pub rank: usize,
}

/// Fits SSA to `values` and forecasts `horizon` steps.
///
/// # Errors
///
/// Returns [`AnalyticsError::ModelFit`] if the window is shorter than 2,
/// the series has no energy, the eigen solver does not converge, the
/// verticality coefficient reaches 1 or the forecast is not finite.
#[allow(clippy::cast_precision_loss)]
pub fn fit(
    values: &[f64],
    horizon: usize,
    include_seasonality: bool,
) -> Result<SsaFit, AnalyticsError> {
    let n = values.len();
    let window = MAX_WINDOW.min(n / 2);
    if window < 2 {
        return Err(AnalyticsError::model_fit(format!(
            "window {window} too small for {n} points"
        )));
    }
    let k = n - window + 1;

    let trajectory = Array2::from_shape_fn((window, k), |(i, j)| values[i + j]);
    let covariance = trajectory.dot(&trajectory.t());
    let (eigenvalues, eigenvectors) = symmetric_eigen(&covariance)?;

    let rank = select_rank(&eigenvalues, window, include_seasonality)?;
    let basis = eigenvectors.slice(s![.., ..rank]).to_owned();

    let reconstructed = basis.dot(&basis.t().dot(&trajectory));
    let fitted = diagonal_average(&reconstructed);

    let coefficients = recurrence_coefficients(&basis)?;
    let mut extended = fitted.clone();
    for _ in 0..horizon {
        let tail = &extended[extended.len() - coefficients.len()..];
        let next = coefficients
            .iter()
            .zip(tail)
            .map(|(r, y)| r * y)
            .sum::<f64>();
        extended.push(next);
    }
    let forecast = extended.split_off(n);

    if forecast.iter().any(|v| !v.is_finite()) {
        return Err(AnalyticsError::model_fit("non-finite forecast"));
    }

    let residual_std = (values
        .iter()
        .zip(&fitted)
        .map(|(y, f)| (y - f).powi(2))
        .sum::<f64>()
        / n as f64)
        .sqrt();

    Ok(SsaFit {
        forecast,
        fitted,
        residual_std,
        window,
        rank,
    })
}

/// Number of components with a non-negligible eigenvalue, capped at
/// `L - 1` (or 2 without seasonality).
fn select_rank(
    eigenvalues: &Array1<f64>,
    window: usize,
    include_seasonality: bool,
) -> Result<usize, AnalyticsError> {
    let leading = eigenvalues.first().copied().unwrap_or_default();
    if leading <= 0.0 {
        return Err(AnalyticsError::model_fit("series has no variance"));
    }

    let rank = eigenvalues
        .iter()
        .take_while(|&&value| value > NEGLIGIBLE_EIGENVALUE * leading)
        .count();

    let cap = if include_seasonality {
        window - 1
    } else {
        TREND_ONLY_RANK
    };
    Ok(rank.min(cap).max(1))
}

/// Coefficients of the linear recurrence `y[t] = sum R[j] * y[t - L + 1 + j]`.
fn recurrence_coefficients(basis: &Array2<f64>) -> Result<Vec<f64>, AnalyticsError> {
    let window = basis.nrows();
    let last_row = basis.row(window - 1);
    let verticality: f64 = last_row.iter().map(|v| v * v).sum();
    if verticality >= 1.0 - 1e-9 {
        return Err(AnalyticsError::model_fit(format!(
            "verticality coefficient {verticality:.6} is not below 1"
        )));
    }

    let scale = 1.0 - verticality;
    Ok((0..window - 1)
        .map(|j| {
            last_row
                .iter()
                .zip(basis.row(j))
                .map(|(pi, u)| pi * u)
                .sum::<f64>()
                / scale
        })
        .collect())
}

/// Hankelizes an `L x K` matrix back into a series of length `L + K - 1`.
#[allow(clippy::cast_precision_loss)]
fn diagonal_average(matrix: &Array2<f64>) -> Vec<f64> {
    let (rows, cols) = matrix.dim();
    let len = rows + cols - 1;
    let mut sums = vec![0.0; len];
    let mut counts = vec![0_usize; len];

    for ((i, j), value) in matrix.indexed_iter() {
        sums[i + j] += value;
        counts[i + j] += 1;
    }

    sums.into_iter()
        .zip(counts)
        .map(|(sum, count)| sum / count as f64)
        .collect()
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns eigenvalues in descending order with the matching unit
/// eigenvectors as columns.
fn symmetric_eigen(matrix: &Array2<f64>) -> Result<(Array1<f64>, Array2<f64>), AnalyticsError> {
    let size = matrix.nrows();
    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(size);

    let norm = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let threshold = 1e-12 * norm;

    let mut converged = false;
    for _ in 0..MAX_SWEEPS {
        let off = off_diagonal_norm(&a);
        if off <= threshold {
            converged = true;
            break;
        }

        for p in 0..size {
            for q in (p + 1)..size {
                let apq = a[[p, q]];
                if apq.abs() < f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                let t = sign / (theta.abs() + theta.mul_add(theta, 1.0).sqrt());
                let c = 1.0 / t.mul_add(t, 1.0).sqrt();
                let s = t * c;

                rotate_columns(&mut a, p, q, c, s);
                rotate_rows(&mut a, p, q, c, s);
                rotate_columns(&mut v, p, q, c, s);
            }
        }
    }
    if !converged && off_diagonal_norm(&a) > threshold {
        return Err(AnalyticsError::model_fit(format!(
            "eigen decomposition did not converge in {MAX_SWEEPS} sweeps"
        )));
    }

    let mut order: Vec<usize> = (0..size).collect();
    order.sort_by(|&i, &j| a[[j, j]].total_cmp(&a[[i, i]]));

    let eigenvalues = order.iter().map(|&i| a[[i, i]]).collect::<Array1<f64>>();
    let mut eigenvectors = Array2::<f64>::zeros((size, size));
    for (dst, &src) in order.iter().enumerate() {
        eigenvectors.column_mut(dst).assign(&v.column(src));
    }

    Ok((eigenvalues, eigenvectors))
}

fn off_diagonal_norm(a: &Array2<f64>) -> f64 {
    a.indexed_iter()
        .filter(|((i, j), _)| i != j)
        .map(|(_, x)| x * x)
        .sum::<f64>()
        .sqrt()
}

fn rotate_columns(m: &mut Array2<f64>, p: usize, q: usize, c: f64, s: f64) {
    for k in 0..m.nrows() {
        let mkp = m[[k, p]];
        let mkq = m[[k, q]];
        m[[k, p]] = c * mkp - s * mkq;
        m[[k, q]] = s * mkp + c * mkq;
    }
}

fn rotate_rows(m: &mut Array2<f64>, p: usize, q: usize, c: f64, s: f64) {
    for k in 0..m.ncols() {
        let mpk = m[[p, k]];
        let mqk = m[[q, k]];
        m[[p, k]] = c * mpk - s * mqk;
        m[[q, k]] = s * mpk + c * mqk;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn eigen_of_diagonalizable_matrix() {
        let m = array![[2.0, 1.0], [1.0, 2.0]];
        let (values, vectors) = symmetric_eigen(&m).unwrap();

        assert!((values[0] - 3.0).abs() < 1e-10);
        assert!((values[1] - 1.0).abs() < 1e-10);

        let reconstructed = vectors.dot(&Array2::from_diag(&values)).dot(&vectors.t());
        for (a, b) in reconstructed.iter().zip(m.iter()) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn diagonal_average_of_trajectory_recovers_series() {
        let series = [1.0, 2.0, 3.0, 4.0, 5.0];
        let trajectory = Array2::from_shape_fn((2, 4), |(i, j)| series[i + j]);
        assert_eq!(diagonal_average(&trajectory), series.to_vec());
    }

    #[test]
    fn rank_respects_caps() {
        let spread = array![4.0, 3.0, 2.0, 1.0];
        assert_eq!(select_rank(&spread, 4, true).unwrap(), 3);
        assert_eq!(select_rank(&spread, 4, false).unwrap(), 2);

        let dominant = array![100.0, 1e-10, 0.0, 0.0];
        assert_eq!(select_rank(&dominant, 4, true).unwrap(), 1);

        let small_but_real = array![100.0, 0.07, 1e-12, -1e-12];
        assert_eq!(select_rank(&small_but_real, 4, true).unwrap(), 2);
    }

    #[test]
    fn geometric_series_continues_exactly() {
        let values: Vec<f64> = (0..12).map(|i| f64::from(1 << i)).collect();
        let fit = fit(&values, 2, true).unwrap();

        assert_eq!(fit.window, 6);
        assert_eq!(fit.rank, 1);
        assert!((fit.forecast[0] - 4096.0).abs() < 1e-3);
        assert!((fit.forecast[1] - 8192.0).abs() < 1e-3);
        assert!(fit.residual_std < 1e-6);
    }

    #[test]
    fn linear_trend_continues_exactly() {
        let values: Vec<f64> = (1..=24).map(f64::from).collect();
        let fit = fit(&values, 3, true).unwrap();

        assert_eq!(fit.window, 12);
        assert_eq!(fit.rank, 2);
        for (value, expected) in fit.forecast.iter().zip([25.0, 26.0, 27.0]) {
            assert!((value - expected).abs() < 1e-6, "{value} vs {expected}");
        }
    }

    #[test]
    fn seasonal_pattern_repeats() {
        // period 6: mean plus one sine/cosine pair
        let cycle = [24.0, 22.0, 18.0, 16.0, 18.0, 22.0];
        let values: Vec<f64> = (0..24).map(|t| cycle[t % 6]).collect();
        let fit = fit(&values, 6, true).unwrap();

        assert_eq!(fit.rank, 3);
        for (step, value) in fit.forecast.iter().enumerate() {
            assert!((value - cycle[step]).abs() < 1e-6, "step {step}: {value}");
        }
    }

    #[test]
    fn trend_with_season_is_continued() {
        let cycle = [2.0, 1.0, -1.0, -2.0, -1.0, 1.0];
        let values: Vec<f64> = (0..24_u32)
            .map(|t| 10.0 + f64::from(t) + cycle[t as usize % 6])
            .collect();
        let fit = fit(&values, 6, true).unwrap();

        let expected = [36.0, 36.0, 35.0, 35.0, 37.0, 40.0];
        for (value, expected) in fit.forecast.iter().zip(expected) {
            assert!((value - expected).abs() < 1e-6, "{value} vs {expected}");
        }
    }

    #[test]
    fn seasonality_off_keeps_two_components() {
        let cycle = [24.0, 22.0, 18.0, 16.0, 18.0, 22.0];
        let values: Vec<f64> = (0..24).map(|t| cycle[t % 6]).collect();
        assert_eq!(fit(&values, 1, false).unwrap().rank, 2);
    }

    #[test]
    fn short_or_empty_series_fail() {
        assert!(matches!(
            fit(&[1.0, 2.0, 3.0], 1, true),
            Err(AnalyticsError::ModelFit { .. })
        ));
        assert!(matches!(
            fit(&[0.0; 12], 1, true),
            Err(AnalyticsError::ModelFit { .. })
        ));
    }
}
