#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request, result and intermediate types for the crime analytics engine.
//!
//! Everything here is created fresh for a single analytics request and
//! discarded once the response is produced. Serialization uses `camelCase`
//! field names so results can be handed straight to a dashboard.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike as _, NaiveDate, Timelike as _, Utc};
use crime_analytics_crime_models::{CrimeType, Motive, Precinct, Severity, Weather};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// One incident projected onto the fields the analytics engine uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRecord {
    /// Unique case identifier (e.g. `"CASE-0042"`).
    pub case_id: String,
    /// Offense classification.
    pub crime_type: CrimeType,
    /// Assessed seriousness.
    pub severity: Severity,
    /// Police district the incident was reported in.
    pub precinct: Precinct,
    /// Weather at the time of the incident.
    pub weather: Weather,
    /// Recorded motive.
    pub motive: Motive,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
}

impl FeatureRecord {
    /// Returns the timestamp as a UTC datetime, or `None` if it is out of
    /// chrono's representable range.
    #[must_use]
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Filters applied to incidents before they reach the engine.
///
/// Empty lists place no restriction on that attribute. The date range is
/// only applied when both ends are set, and both ends are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IncidentFilter {
    /// First day to include (UTC).
    pub date_from: Option<NaiveDate>,
    /// Last day to include (UTC).
    pub date_to: Option<NaiveDate>,
    /// Allowed crime types.
    pub crime_types: Vec<CrimeType>,
    /// Allowed motives.
    pub motives: Vec<Motive>,
    /// Allowed severities.
    pub severities: Vec<Severity>,
    /// Allowed weather conditions.
    pub weathers: Vec<Weather>,
    /// Allowed precincts.
    pub precincts: Vec<Precinct>,
}

impl IncidentFilter {
    /// Returns `true` if the record passes every active filter.
    #[must_use]
    pub fn matches(&self, record: &FeatureRecord) -> bool {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            let Some(day) = record.occurred_at().map(|dt| dt.date_naive()) else {
                return false;
            };
            if day < from || day > to {
                return false;
            }
        }

        allows(&self.crime_types, record.crime_type)
            && allows(&self.motives, record.motive)
            && allows(&self.severities, record.severity)
            && allows(&self.weathers, record.weather)
            && allows(&self.precincts, record.precinct)
    }

    /// Keeps only the records that pass the filter, preserving order.
    #[must_use]
    pub fn apply(&self, records: Vec<FeatureRecord>) -> Vec<FeatureRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

fn allows<T: PartialEq>(allowed: &[T], value: T) -> bool {
    allowed.is_empty() || allowed.contains(&value)
}

/// Parameters for a clustering request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterParams {
    /// Feature names to cluster on. `None` or empty selects the default
    /// categorical set.
    pub features: Option<Vec<String>>,
    /// Number of clusters (K).
    pub number_of_clusters: usize,
    /// Number of independently initialized fits to choose from (R).
    pub number_of_runs: usize,
    /// Base seed; run `i` is initialized from `seed + i`.
    pub seed: u64,
    /// Iteration cap for a single K-means fit.
    pub max_iterations: u64,
    /// Convergence tolerance for a single K-means fit.
    pub tolerance: f64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            features: None,
            number_of_clusters: 3,
            number_of_runs: 10,
            seed: 42,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }
}

/// Cluster membership of a single incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAssignment {
    /// Case identifier of the clustered incident.
    pub case_id: String,
    /// Assigned cluster, in `0..K`.
    pub cluster_id: usize,
    /// Incident latitude.
    pub latitude: f64,
    /// Incident longitude.
    pub longitude: f64,
}

/// Output of a flat clustering request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResult {
    /// One assignment per input record, in input order.
    pub assignments: Vec<ClusterAssignment>,
    /// Number of clusters that received at least one member.
    pub cluster_count: usize,
    /// Inertia of the selected run.
    pub inertia: f64,
}

/// Coarse time-of-day bucket derived from the incident hour.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum TimeOfDay {
    /// 00:00 - 05:59
    Night,
    /// 06:00 - 11:59
    Morning,
    /// 12:00 - 17:59
    Afternoon,
    /// 18:00 - 23:59
    Evening,
}

impl TimeOfDay {
    /// Buckets an hour of day (0-23).
    #[must_use]
    pub const fn from_hour(hour: u32) -> Self {
        if hour < 6 {
            Self::Night
        } else if hour < 12 {
            Self::Morning
        } else if hour < 18 {
            Self::Afternoon
        } else {
            Self::Evening
        }
    }
}

/// A cluster assignment enriched with temporal and categorical metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterItem {
    /// Case identifier.
    pub case_id: String,
    /// Assigned cluster.
    pub cluster_id: usize,
    /// Incident latitude.
    pub latitude: f64,
    /// Incident longitude.
    pub longitude: f64,
    /// Calendar month (1-12, UTC).
    pub month: u32,
    /// Calendar year (UTC).
    pub year: i32,
    /// Time-of-day bucket (UTC).
    pub time_of_day: TimeOfDay,
    /// Reporting precinct.
    pub precinct: Precinct,
    /// Offense classification.
    pub crime_type: CrimeType,
}

impl ClusterItem {
    /// Builds an item from an assignment and the record it was computed
    /// from. Returns `None` if the record's timestamp is unrepresentable.
    #[must_use]
    pub fn from_parts(assignment: &ClusterAssignment, record: &FeatureRecord) -> Option<Self> {
        let at = record.occurred_at()?;
        Some(Self {
            case_id: assignment.case_id.clone(),
            cluster_id: assignment.cluster_id,
            latitude: assignment.latitude,
            longitude: assignment.longitude,
            month: at.month(),
            year: at.year(),
            time_of_day: TimeOfDay::from_hour(at.hour()),
            precinct: record.precinct,
            crime_type: record.crime_type,
        })
    }
}

/// Mean position of a cluster's members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Centroid {
    /// Mean latitude.
    pub latitude: f64,
    /// Mean longitude.
    pub longitude: f64,
}

/// All enriched items sharing a cluster id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterGroup {
    /// Cluster id.
    pub cluster_id: usize,
    /// Members in assignment order.
    pub cluster_items: Vec<ClusterItem>,
    /// Mean latitude/longitude of the members, `(0, 0)` when empty.
    pub centroid: Centroid,
    /// Number of members.
    pub item_count: usize,
}

impl ClusterGroup {
    /// Creates a group and derives its centroid and count from `items`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(cluster_id: usize, items: Vec<ClusterItem>) -> Self {
        let centroid = if items.is_empty() {
            Centroid::default()
        } else {
            let n = items.len() as f64;
            Centroid {
                latitude: items.iter().map(|i| i.latitude).sum::<f64>() / n,
                longitude: items.iter().map(|i| i.longitude).sum::<f64>() / n,
            }
        };

        Self {
            cluster_id,
            item_count: items.len(),
            cluster_items: items,
            centroid,
        }
    }
}

/// Key identifying one forecastable monthly series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesKey {
    /// Reporting precinct.
    pub precinct: Precinct,
    /// Offense classification.
    pub crime_type: CrimeType,
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.precinct, self.crime_type)
    }
}

/// Incident count for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPoint {
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
    /// Number of incidents.
    pub count: u64,
}

impl MonthlyPoint {
    /// Months since year 0, used for ordering and span arithmetic.
    #[must_use]
    pub const fn month_index(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }
}

/// A chronological monthly series for one `(precinct, crime type)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySeries {
    /// Series key.
    pub key: SeriesKey,
    /// Points in ascending month order, one per month.
    pub points: Vec<MonthlyPoint>,
}

impl MonthlySeries {
    /// Counts as floating-point values, in order.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.count as f64).collect()
    }
}

/// Forecasting model family.
///
/// Serialized as `SSA` / `Linear`; any casing is accepted when parsing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Display, EnumString, AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum ModelType {
    /// Singular spectrum analysis with linear-trend fallback.
    #[default]
    #[serde(rename = "SSA")]
    #[strum(serialize = "SSA")]
    Ssa,
    /// Linear trend only.
    #[serde(rename = "Linear")]
    #[strum(serialize = "Linear")]
    Linear,
}

impl<'de> Deserialize<'de> for ModelType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.trim()
            .parse()
            .map_err(|_| serde::de::Error::unknown_variant(&name, &["SSA", "Linear"]))
    }
}

/// Parameters shared by forecasting and model validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForecastParameters {
    /// Months to forecast (1-24).
    pub horizon: u32,
    /// Confidence level for the bounds, strictly between 0 and 1.
    pub confidence_level: f64,
    /// Model family.
    pub model_type: ModelType,
    /// Whether oscillatory components are kept in the SSA model.
    pub include_seasonality: bool,
    /// Recency-weighting preference of the caller. Echoed in each series'
    /// metadata; the fallback trend is always ordinary least squares.
    pub weight_recent_data: bool,
}

impl Default for ForecastParameters {
    fn default() -> Self {
        Self {
            horizon: 6,
            confidence_level: 0.95,
            model_type: ModelType::Ssa,
            include_seasonality: true,
            weight_recent_data: true,
        }
    }
}

/// Direction of a forecast relative to the recent average.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrendLabel {
    /// More than 10% above the recent average.
    Increasing,
    /// More than 10% below the recent average.
    Decreasing,
    /// Within 10% of the recent average.
    Stable,
}

/// Risk bucket of a forecast relative to the recent average.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RiskLabel {
    /// At most 0.8x the recent average.
    Low,
    /// Above 0.8x the recent average.
    Medium,
    /// Above 1.2x the recent average.
    High,
    /// Above 1.5x the recent average.
    Critical,
}

/// One forecast month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    /// First instant of the forecast month (UTC).
    pub timestamp: DateTime<Utc>,
    /// Point forecast, never negative.
    pub forecast: f64,
    /// Lower bound, `<= forecast`.
    pub lower_bound: f64,
    /// Upper bound, `>= forecast`.
    pub upper_bound: f64,
    /// Confidence level the bounds were computed at.
    pub confidence: f64,
    /// Direction label.
    pub trend: TrendLabel,
    /// Risk label.
    pub risk: RiskLabel,
}

/// Forecast for one `(precinct, crime type)` series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastSeries {
    /// Reporting precinct.
    pub precinct: Precinct,
    /// Offense classification.
    pub crime_type: CrimeType,
    /// Forecast months in chronological order.
    pub points: Vec<ForecastPoint>,
    /// Model diagnostics (model used, window, rank, fallback flag, ...).
    pub metadata: BTreeMap<String, String>,
}

/// Forecast error metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastMetrics {
    /// Mean absolute error.
    pub mean_absolute_error: f64,
    /// Root mean squared error.
    pub root_mean_squared_error: f64,
    /// Mean absolute percentage error, in percent.
    pub mean_absolute_percentage_error: f64,
    /// `max(0, 1 - MAPE / 100)`.
    pub accuracy: f64,
}

/// Result of a forecasting request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResponse {
    /// One entry per series with enough history, ordered by series key.
    pub series: Vec<ForecastSeries>,
    /// In-sample fit metrics pooled across all forecast series.
    pub metrics: ForecastMetrics,
    /// Series skipped for having fewer than 12 monthly points.
    pub skipped_series: usize,
    /// Parameters the forecast was produced with.
    pub parameters: ForecastParameters,
}

/// Backtest metrics for a single series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesValidation {
    /// Reporting precinct.
    pub precinct: Precinct,
    /// Offense classification.
    pub crime_type: CrimeType,
    /// Metrics over the held-out months.
    pub metrics: ForecastMetrics,
}

/// Result of backtesting the forecasting engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastValidationResult {
    /// `true` when at least one series was validated and pooled MAPE < 25%.
    pub is_reliable: bool,
    /// Metrics pooled over every held-out point.
    pub metrics: ForecastMetrics,
    /// Per-series metrics, ordered by series key.
    pub series: Vec<SeriesValidation>,
    /// Skipped series and high-error notices.
    pub warnings: Vec<String>,
}

/// Fitness of a dataset for forecasting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityAssessment {
    /// `true` when no issues were found and volume/coverage thresholds hold.
    pub is_valid: bool,
    /// Total number of incidents assessed.
    pub data_points: usize,
    /// Inclusive month span between the earliest and latest incident.
    pub coverage_months: u32,
    /// Months whose incident count is an IQR outlier.
    pub outlier_count: usize,
    /// Outlier months as a percentage of all monthly buckets.
    pub outlier_percentage: f64,
    /// Problems found.
    pub issues: Vec<String>,
    /// Suggested remedies, one per issue.
    pub recommendations: Vec<String>,
}
