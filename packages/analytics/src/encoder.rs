//! Feature encoding for clustering.
//!
//! Features come from a static registry ([`Feature`]). Each is either
//! categorical (one-hot over its fixed enum domain) or continuous (min-max
//! normalized across the batch). The selected columns are concatenated and
//! then standardized column-wise, so every record in a batch ends up with a
//! vector of identical width and column order.

use crime_analytics_crime_models::{Categorical, CrimeType, Motive, Precinct, Severity, Weather};
use crime_analytics_models::FeatureRecord;
use ndarray::{Array2, Axis};

use crate::AnalyticsError;

/// How a feature is turned into columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// One column per domain value.
    Categorical {
        /// Size of the enum domain.
        cardinality: usize,
    },
    /// A single min-max normalized column.
    Continuous,
}

/// A feature the encoder knows how to extract from a [`FeatureRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    CrimeType,
    Severity,
    PoliceDistrict,
    Weather,
    CrimeMotive,
    Latitude,
    Longitude,
}

impl Feature {
    /// Features used when a request does not name any.
    pub const DEFAULT: &[Self] = &[
        Self::CrimeType,
        Self::Severity,
        Self::PoliceDistrict,
        Self::Weather,
        Self::CrimeMotive,
    ];

    /// Every registered feature.
    pub const ALL: &[Self] = &[
        Self::CrimeType,
        Self::Severity,
        Self::PoliceDistrict,
        Self::Weather,
        Self::CrimeMotive,
        Self::Latitude,
        Self::Longitude,
    ];

    /// Canonical request name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CrimeType => "CrimeType",
            Self::Severity => "Severity",
            Self::PoliceDistrict => "PoliceDistrict",
            Self::Weather => "Weather",
            Self::CrimeMotive => "CrimeMotive",
            Self::Latitude => "Latitude",
            Self::Longitude => "Longitude",
        }
    }

    /// Resolves a request name, case-insensitively. `Precinct` and `Motive`
    /// are accepted as aliases.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InvalidFeature`] for unknown names.
    pub fn parse(name: &str) -> Result<Self, AnalyticsError> {
        let trimmed = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(trimmed))
            .or_else(|| {
                if trimmed.eq_ignore_ascii_case("Precinct") {
                    Some(Self::PoliceDistrict)
                } else if trimmed.eq_ignore_ascii_case("Motive") {
                    Some(Self::CrimeMotive)
                } else {
                    None
                }
            })
            .ok_or_else(|| AnalyticsError::InvalidFeature {
                name: name.to_string(),
            })
    }

    /// Column layout of this feature.
    #[must_use]
    pub fn kind(self) -> FeatureKind {
        match self {
            Self::CrimeType => categorical::<CrimeType>(),
            Self::Severity => categorical::<Severity>(),
            Self::PoliceDistrict => categorical::<Precinct>(),
            Self::Weather => categorical::<Weather>(),
            Self::CrimeMotive => categorical::<Motive>(),
            Self::Latitude | Self::Longitude => FeatureKind::Continuous,
        }
    }

    /// One-hot position of the record's value. `None` for continuous
    /// features.
    fn category_index(self, record: &FeatureRecord) -> Option<usize> {
        match self {
            Self::CrimeType => Some(record.crime_type.ordinal()),
            Self::Severity => Some(record.severity.ordinal()),
            Self::PoliceDistrict => Some(record.precinct.ordinal()),
            Self::Weather => Some(record.weather.ordinal()),
            Self::CrimeMotive => Some(record.motive.ordinal()),
            Self::Latitude | Self::Longitude => None,
        }
    }

    /// Raw value of a continuous feature. Zero for categorical features.
    const fn continuous_value(self, record: &FeatureRecord) -> f64 {
        match self {
            Self::Latitude => record.latitude,
            Self::Longitude => record.longitude,
            _ => 0.0,
        }
    }

    /// Output column names, e.g. `CrimeType=ASSAULT` or `Latitude`.
    #[must_use]
    pub fn column_names(self) -> Vec<String> {
        fn names<T: Categorical + std::fmt::Display>(feature: Feature) -> Vec<String> {
            T::domain()
                .iter()
                .map(|v| format!("{}={v}", feature.name()))
                .collect()
        }

        match self {
            Self::CrimeType => names::<CrimeType>(self),
            Self::Severity => names::<Severity>(self),
            Self::PoliceDistrict => names::<Precinct>(self),
            Self::Weather => names::<Weather>(self),
            Self::CrimeMotive => names::<Motive>(self),
            Self::Latitude | Self::Longitude => vec![self.name().to_string()],
        }
    }

    /// Number of output columns.
    #[must_use]
    pub fn width(self) -> usize {
        match self.kind() {
            FeatureKind::Categorical { cardinality } => cardinality,
            FeatureKind::Continuous => 1,
        }
    }
}

fn categorical<T: Categorical>() -> FeatureKind {
    FeatureKind::Categorical {
        cardinality: T::domain().len(),
    }
}

/// Column layout shared by every vector in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingScheme {
    /// Selected features, in column order.
    pub features: Vec<Feature>,
    /// Output column names.
    pub columns: Vec<String>,
}

/// Encoded vectors for a batch, one row per input record.
#[derive(Debug, Clone)]
pub struct EncodedBatch {
    /// Column layout.
    pub scheme: EncodingScheme,
    /// `records x columns` matrix, standardized per column.
    pub vectors: Array2<f64>,
}

/// Resolves a requested feature list. `None` or an empty list selects
/// [`Feature::DEFAULT`]; duplicates are dropped, first occurrence wins.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidFeature`] for unknown names.
pub fn resolve_features(names: Option<&[String]>) -> Result<Vec<Feature>, AnalyticsError> {
    let Some(names) = names.filter(|n| !n.is_empty()) else {
        return Ok(Feature::DEFAULT.to_vec());
    };

    let mut features = Vec::with_capacity(names.len());
    for name in names {
        let feature = Feature::parse(name)?;
        if !features.contains(&feature) {
            features.push(feature);
        }
    }
    Ok(features)
}

/// Encodes a batch of records.
///
/// # Errors
///
/// * [`AnalyticsError::InsufficientData`] if `records` is empty
/// * [`AnalyticsError::InvalidFeature`] if a feature name is unknown
pub fn encode(
    records: &[FeatureRecord],
    feature_names: Option<&[String]>,
) -> Result<EncodedBatch, AnalyticsError> {
    if records.is_empty() {
        return Err(AnalyticsError::insufficient(
            "cannot encode an empty batch of records",
        ));
    }

    let features = resolve_features(feature_names)?;
    let width: usize = features.iter().map(|f| f.width()).sum();
    let mut vectors = Array2::<f64>::zeros((records.len(), width));

    let mut offset = 0;
    for feature in &features {
        match feature.kind() {
            FeatureKind::Categorical { cardinality } => {
                for (row, record) in records.iter().enumerate() {
                    if let Some(idx) = feature.category_index(record) {
                        vectors[[row, offset + idx]] = 1.0;
                    }
                }
                offset += cardinality;
            }
            FeatureKind::Continuous => {
                let raw: Vec<f64> = records
                    .iter()
                    .map(|r| feature.continuous_value(r))
                    .collect();
                for (row, value) in min_max(&raw).into_iter().enumerate() {
                    vectors[[row, offset]] = value;
                }
                offset += 1;
            }
        }
    }

    standardize(&mut vectors);

    let columns = features.iter().flat_map(|f| f.column_names()).collect();
    log::debug!(
        "Encoded {} records into {width} columns using {:?}",
        records.len(),
        features
    );

    Ok(EncodedBatch {
        scheme: EncodingScheme { features, columns },
        vectors,
    })
}

/// Scales values into `[0, 1]`. A constant column maps to all zeros.
fn min_max(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if range > 0.0 && range.is_finite() {
        values.iter().map(|v| (v - min) / range).collect()
    } else {
        vec![0.0; values.len()]
    }
}

/// Centers each column to zero mean and scales it to unit (population)
/// variance. Zero-variance columns become all zeros.
#[allow(clippy::cast_precision_loss)]
fn standardize(vectors: &mut Array2<f64>) {
    let n = vectors.nrows() as f64;
    for mut column in vectors.axis_iter_mut(Axis(1)) {
        let mean = column.sum() / n;
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        if std_dev > f64::EPSILON {
            column.mapv_inplace(|v| (v - mean) / std_dev);
        } else {
            column.fill(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(case_id: &str, crime_type: CrimeType, lat: f64, lng: f64) -> FeatureRecord {
        FeatureRecord {
            case_id: case_id.to_string(),
            crime_type,
            severity: Severity::Medium,
            precinct: Precinct::Putatan,
            weather: Weather::Rain,
            motive: Motive::Unknown,
            latitude: lat,
            longitude: lng,
            timestamp: 1_700_000_000,
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn empty_batch_is_insufficient() {
        let err = encode(&[], None).unwrap_err();
        assert!(matches!(err, AnalyticsError::InsufficientData { .. }));
    }

    #[test]
    fn unknown_feature_is_rejected() {
        let records = vec![record("A", CrimeType::Theft, 14.4, 121.0)];
        let requested = names(&["CrimeType", "ShoeSize"]);
        let err = encode(&records, Some(requested.as_slice())).unwrap_err();
        match err {
            AnalyticsError::InvalidFeature { name } => assert_eq!(name, "ShoeSize"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn default_features_span_full_enum_domains() {
        let records = vec![
            record("A", CrimeType::Theft, 14.4, 121.0),
            record("B", CrimeType::Arson, 14.5, 121.1),
        ];
        let batch = encode(&records, None).unwrap();
        let expected = CrimeType::all().len()
            + Severity::all().len()
            + Precinct::all().len()
            + Weather::all().len()
            + Motive::all().len();
        assert_eq!(batch.vectors.ncols(), expected);
        assert_eq!(batch.scheme.columns.len(), expected);
        assert_eq!(batch.scheme.columns[0], "CrimeType=ARSON");
    }

    #[test]
    fn columns_are_standardized() {
        let records = vec![
            record("A", CrimeType::Theft, 14.40, 121.00),
            record("B", CrimeType::Arson, 14.45, 121.02),
            record("C", CrimeType::Theft, 14.50, 121.09),
            record("D", CrimeType::Robbery, 14.41, 121.05),
        ];
        let requested = names(&["CrimeType", "Latitude", "Longitude"]);
        let batch = encode(&records, Some(requested.as_slice())).unwrap();

        for column in batch.vectors.axis_iter(Axis(1)) {
            let mean = column.sum() / 4.0;
            assert!(mean.abs() < 1e-9, "column mean {mean} is not zero");
            let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 4.0;
            assert!(
                var.abs() < 1e-9 || (var - 1.0).abs() < 1e-9,
                "column variance {var} is neither 0 nor 1"
            );
        }
    }

    #[test]
    fn constant_continuous_column_encodes_to_zero() {
        let records = vec![
            record("A", CrimeType::Theft, 14.4, 121.0),
            record("B", CrimeType::Theft, 14.4, 121.0),
        ];
        let batch = encode(&records, Some(names(&["Latitude"]).as_slice())).unwrap();
        assert!(batch.vectors.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn aliases_and_duplicates_resolve_once() {
        let requested = names(&["precinct", "PoliceDistrict", "motive"]);
        let features = resolve_features(Some(requested.as_slice())).unwrap();
        assert_eq!(features, vec![Feature::PoliceDistrict, Feature::CrimeMotive]);
    }

    #[test]
    fn empty_feature_list_uses_defaults() {
        assert_eq!(
            resolve_features(Some(&[])).unwrap(),
            Feature::DEFAULT.to_vec()
        );
    }
}
