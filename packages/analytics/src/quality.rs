//! Fitness of clustered data for forecasting.

use crime_analytics_models::{ClusterGroup, DataQualityAssessment, MonthlyPoint};

use crate::aggregate::monthly_totals;

/// Fewest incidents a dataset needs to be considered valid.
pub const MIN_DATA_POINTS: usize = 100;

/// Fewest months of coverage a dataset needs to be considered valid.
pub const MIN_COVERAGE_MONTHS: u32 = 24;

/// Outlier share of monthly buckets (percent) above which an issue is raised.
const MAX_OUTLIER_PERCENTAGE: f64 = 10.0;

/// Monthly buckets needed before outliers are searched for.
const MIN_OUTLIER_BUCKETS: usize = 4;

/// Assesses incident volume, temporal coverage and monthly outliers.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn assess(groups: &[ClusterGroup]) -> DataQualityAssessment {
    let data_points: usize = groups.iter().map(|g| g.cluster_items.len()).sum();
    if data_points == 0 {
        log::warn!("Data quality requested without cluster data");
        return DataQualityAssessment {
            is_valid: false,
            data_points: 0,
            coverage_months: 0,
            outlier_count: 0,
            outlier_percentage: 0.0,
            issues: vec!["No cluster data provided for quality assessment".to_string()],
            recommendations: vec![
                "Run clustering analysis first to generate data for quality assessment"
                    .to_string(),
            ],
        };
    }

    let totals = monthly_totals(groups);
    let coverage_months = coverage(&totals);
    let counts: Vec<u64> = totals.iter().map(|p| p.count).collect();
    let outlier_count = count_outliers(&counts);
    let outlier_percentage = if counts.is_empty() {
        0.0
    } else {
        outlier_count as f64 / counts.len() as f64 * 100.0
    };

    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    if data_points < MIN_DATA_POINTS {
        issues.push(format!(
            "Low data volume: {data_points} incidents (minimum {MIN_DATA_POINTS} recommended)"
        ));
        recommendations.push(
            "Widen the date range or relax filters to include more incidents".to_string(),
        );
    }
    if coverage_months < MIN_COVERAGE_MONTHS {
        issues.push(format!(
            "Short time coverage: {coverage_months} months (minimum {MIN_COVERAGE_MONTHS} recommended)"
        ));
        recommendations.push(format!(
            "Collect at least {MIN_COVERAGE_MONTHS} months of history for seasonal forecasting"
        ));
    }
    if outlier_percentage > MAX_OUTLIER_PERCENTAGE {
        issues.push(format!(
            "High outlier rate: {outlier_count} of {} months ({outlier_percentage:.1}%) are outliers",
            counts.len()
        ));
        recommendations.push(
            "Review outlier months for reporting gaps or data entry errors".to_string(),
        );
    }

    let is_valid = issues.is_empty()
        && data_points >= MIN_DATA_POINTS
        && coverage_months >= MIN_COVERAGE_MONTHS;

    log::info!(
        "Data quality: {data_points} incidents over {coverage_months} months, \
         {outlier_count} outlier months, valid: {is_valid}"
    );

    DataQualityAssessment {
        is_valid,
        data_points,
        coverage_months,
        outlier_count,
        outlier_percentage,
        issues,
        recommendations,
    }
}

/// Inclusive number of months between the first and last observed month.
fn coverage(totals: &[MonthlyPoint]) -> u32 {
    let (Some(first), Some(last)) = (totals.first(), totals.last()) else {
        return 0;
    };
    u32::try_from(last.month_index() - first.month_index() + 1).unwrap_or(u32::MAX)
}

/// Counts values outside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`.
///
/// Quartiles are taken at indices `len / 4` and `3 * len / 4` of the sorted
/// counts, without interpolation. Fewer than four values have no outliers.
#[allow(clippy::cast_precision_loss)]
fn count_outliers(counts: &[u64]) -> usize {
    if counts.len() < MIN_OUTLIER_BUCKETS {
        return 0;
    }

    let mut sorted = counts.to_vec();
    sorted.sort_unstable();
    let q1 = sorted[sorted.len() / 4] as f64;
    let q3 = sorted[3 * sorted.len() / 4] as f64;
    let iqr = q3 - q1;
    let low = 1.5f64.mul_add(-iqr, q1);
    let high = 1.5f64.mul_add(iqr, q3);

    counts
        .iter()
        .filter(|&&c| (c as f64) < low || (c as f64) > high)
        .count()
}
