//! Multi-run K-means clustering.
//!
//! Each of the R runs is an independent fit with its own seeded RNG, so the
//! runs are fanned out on the `rayon` pool. Every run yields an immutable
//! [`RunFit`] scored by inertia (mean Euclidean distance from each vector to
//! its centroid), and the final model is the first run with the lowest
//! inertia.

use std::collections::BTreeSet;

use crime_analytics_models::ClusterParams;
use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2, ArrayView1};
use rand::SeedableRng as _;
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;

use crate::AnalyticsError;
use crate::cancel::CancellationFlag;
use crate::progress::ProgressCallback;

/// Result of a single seeded K-means fit.
#[derive(Debug, Clone)]
pub struct RunFit {
    /// Zero-based run index.
    pub run: usize,
    /// Cluster id per input vector.
    pub labels: Array1<usize>,
    /// `K x columns` centroid matrix.
    pub centroids: Array2<f64>,
    /// Mean distance of vectors to their assigned centroid.
    pub inertia: f64,
}

/// Final clustering selected from all runs.
#[derive(Debug, Clone)]
pub struct ClusteringOutcome {
    /// Cluster id per input vector, each in `0..K`.
    pub labels: Vec<usize>,
    /// Number of clusters with at least one member.
    pub cluster_count: usize,
    /// Inertia of the selected run.
    pub inertia: f64,
    /// Index of the selected run.
    pub selected_run: usize,
}

/// Counts distinct rows using exact bitwise comparison.
fn distinct_rows(vectors: &Array2<f64>) -> usize {
    vectors
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|v| v.to_bits()).collect::<Vec<u64>>())
        .collect::<BTreeSet<_>>()
        .len()
}

fn validate(vectors: &Array2<f64>, params: &ClusterParams) -> Result<(), AnalyticsError> {
    let k = params.number_of_clusters;
    if k == 0 {
        return Err(AnalyticsError::invalid_parameter(
            "number of clusters must be at least 1",
        ));
    }
    if params.number_of_runs == 0 {
        return Err(AnalyticsError::invalid_parameter(
            "number of runs must be at least 1",
        ));
    }
    if params.max_iterations == 0 {
        return Err(AnalyticsError::invalid_parameter(
            "max iterations must be at least 1",
        ));
    }
    if !(params.tolerance > 0.0 && params.tolerance.is_finite()) {
        return Err(AnalyticsError::invalid_parameter(format!(
            "tolerance must be a positive number, got {}",
            params.tolerance
        )));
    }
    if vectors.nrows() == 0 {
        return Err(AnalyticsError::insufficient("no vectors to cluster"));
    }

    let distinct = distinct_rows(vectors);
    if k > distinct {
        return Err(AnalyticsError::insufficient(format!(
            "insufficient records: {k} clusters requested but only {distinct} distinct feature vectors"
        )));
    }

    Ok(())
}

/// Partitions `vectors` into `params.number_of_clusters` groups, keeping the
/// lowest-inertia run out of `params.number_of_runs`.
///
/// Run `i` is seeded with `params.seed + i`, so identical inputs and
/// parameters always produce identical labels.
///
/// # Errors
///
/// * [`AnalyticsError::InvalidParameter`] if K, R or the iteration settings
///   are out of range
/// * [`AnalyticsError::InsufficientData`] if K exceeds the number of distinct
///   vectors
/// * [`AnalyticsError::Cancelled`] if `cancel` is raised before a run starts
/// * [`AnalyticsError::Clustering`] if a K-means fit fails
pub fn cluster_vectors(
    vectors: &Array2<f64>,
    params: &ClusterParams,
    progress: &dyn ProgressCallback,
    cancel: &CancellationFlag,
) -> Result<ClusteringOutcome, AnalyticsError> {
    validate(vectors, params)?;

    let runs = params.number_of_runs;
    log::info!(
        "Clustering {} vectors ({} columns) into {} clusters over {runs} runs",
        vectors.nrows(),
        vectors.ncols(),
        params.number_of_clusters
    );
    progress.set_total(runs as u64);

    let fits = (0..runs)
        .into_par_iter()
        .map(|run| {
            cancel.check()?;
            let fit = fit_run(vectors, params, run)?;
            log::debug!("Run {run}: inertia {:.6}", fit.inertia);
            progress.inc(1);
            Ok(fit)
        })
        .collect::<Result<Vec<RunFit>, AnalyticsError>>()?;

    let best = select_best(fits).ok_or_else(|| {
        AnalyticsError::insufficient("no clustering runs completed")
    })?;

    let labels = best.labels.to_vec();
    let cluster_count = labels.iter().collect::<BTreeSet<_>>().len();
    progress.finish(format!(
        "Selected run {} (inertia {:.4}, {cluster_count} non-empty clusters)",
        best.run, best.inertia
    ));
    log::info!(
        "Selected run {} with inertia {:.6}; {cluster_count} of {} clusters populated",
        best.run,
        best.inertia,
        params.number_of_clusters
    );

    Ok(ClusteringOutcome {
        labels,
        cluster_count,
        inertia: best.inertia,
        selected_run: best.run,
    })
}

/// Picks the lowest-inertia fit. Fits must be in run order; on ties the
/// earliest run wins.
#[must_use]
pub fn select_best(fits: Vec<RunFit>) -> Option<RunFit> {
    fits.into_iter()
        .reduce(|best, fit| if fit.inertia < best.inertia { fit } else { best })
}

/// Performs one seeded K-means fit.
fn fit_run(
    vectors: &Array2<f64>,
    params: &ClusterParams,
    run: usize,
) -> Result<RunFit, AnalyticsError> {
    let rng = Xoshiro256Plus::seed_from_u64(params.seed.wrapping_add(run as u64));
    let dataset = DatasetBase::from(vectors.clone());

    let model = KMeans::<f64, L2Dist>::params_with(params.number_of_clusters, rng, L2Dist)
        .n_runs(1)
        .max_n_iterations(params.max_iterations)
        .tolerance(params.tolerance)
        .fit(&dataset)
        .map_err(|e| AnalyticsError::Clustering {
            message: format!("run {run}: {e}"),
        })?;

    let labels: Array1<usize> = model.predict(vectors);
    let centroids = model.centroids().clone();
    let inertia = mean_distance(vectors, &labels, &centroids);

    Ok(RunFit {
        run,
        labels,
        centroids,
        inertia,
    })
}

/// Mean Euclidean distance from each row to its assigned centroid.
#[allow(clippy::cast_precision_loss)]
fn mean_distance(vectors: &Array2<f64>, labels: &Array1<usize>, centroids: &Array2<f64>) -> f64 {
    if vectors.nrows() == 0 {
        return 0.0;
    }

    let total: f64 = vectors
        .rows()
        .into_iter()
        .zip(labels.iter())
        .map(|(row, &label)| euclidean_distance(&row, &centroids.row(label)))
        .sum();

    total / vectors.nrows() as f64
}

fn euclidean_distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullProgress;
    use ndarray::array;

    fn three_blobs() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [10.0, 10.0],
            [10.1, 10.0],
            [10.0, 10.1],
            [-10.0, 10.0],
            [-10.1, 10.0],
            [-10.0, 10.1],
        ]
    }

    fn params(k: usize, runs: usize, seed: u64) -> ClusterParams {
        ClusterParams {
            number_of_clusters: k,
            number_of_runs: runs,
            seed,
            ..ClusterParams::default()
        }
    }

    fn fit(run: usize, inertia: f64) -> RunFit {
        RunFit {
            run,
            labels: Array1::zeros(1),
            centroids: Array2::zeros((1, 1)),
            inertia,
        }
    }

    #[test]
    fn one_label_per_vector_within_range() {
        let vectors = three_blobs();
        let outcome = cluster_vectors(
            &vectors,
            &params(3, 4, 7),
            &NullProgress,
            &CancellationFlag::new(),
        )
        .unwrap();

        assert_eq!(outcome.labels.len(), vectors.nrows());
        assert!(outcome.labels.iter().all(|&l| l < 3));
        assert!(outcome.cluster_count <= 3);
    }

    #[test]
    fn separated_blobs_are_recovered() {
        let outcome = cluster_vectors(
            &three_blobs(),
            &params(3, 10, 1),
            &NullProgress,
            &CancellationFlag::new(),
        )
        .unwrap();

        assert_eq!(outcome.cluster_count, 3);
        for blob in outcome.labels.chunks(3) {
            assert!(
                blob.iter().all(|&l| l == blob[0]),
                "blob split across clusters: {blob:?}"
            );
        }
    }

    #[test]
    fn same_seed_is_deterministic() {
        let vectors = three_blobs();
        let run = || {
            cluster_vectors(
                &vectors,
                &params(3, 1, 99),
                &NullProgress,
                &CancellationFlag::new(),
            )
            .unwrap()
            .labels
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn too_many_clusters_for_distinct_vectors() {
        let vectors = array![[0.0], [0.0], [1.0], [1.0], [2.0]];
        let err = cluster_vectors(
            &vectors,
            &params(5, 1, 0),
            &NullProgress,
            &CancellationFlag::new(),
        )
        .unwrap_err();
        assert!(matches!(err, AnalyticsError::InsufficientData { .. }));
    }

    #[test]
    fn zero_clusters_or_runs_rejected() {
        let vectors = three_blobs();
        for p in [params(0, 1, 0), params(2, 0, 0)] {
            let err = cluster_vectors(&vectors, &p, &NullProgress, &CancellationFlag::new())
                .unwrap_err();
            assert!(matches!(err, AnalyticsError::InvalidParameter { .. }));
        }
    }

    #[test]
    fn cancelled_before_runs() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let err =
            cluster_vectors(&three_blobs(), &params(3, 5, 0), &NullProgress, &cancel).unwrap_err();
        assert!(matches!(err, AnalyticsError::Cancelled));
    }

    #[test]
    fn selection_prefers_first_minimum() {
        let best = select_best(vec![fit(0, 2.0), fit(1, 1.0), fit(2, 1.0), fit(3, 3.0)]).unwrap();
        assert_eq!(best.run, 1);
        assert!(select_best(Vec::new()).is_none());
    }

    #[test]
    fn mean_distance_of_exact_centroids_is_zero() {
        let vectors = array![[1.0, 1.0], [3.0, 3.0]];
        let labels = Array1::from(vec![0, 1]);
        assert!(mean_distance(&vectors, &labels, &vectors).abs() < 1e-12);

        let centroid = array![[2.0, 2.0]];
        let labels = Array1::from(vec![0, 0]);
        let expected = 2.0_f64.sqrt();
        assert!((mean_distance(&vectors, &labels, &centroid) - expected).abs() < 1e-12);
    }
}
