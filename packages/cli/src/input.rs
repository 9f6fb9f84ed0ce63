//! Incident file loading.
//!
//! Incidents are read from a JSON array or a CSV file whose headers match
//! the `camelCase` field names of [`FeatureRecord`] (`caseId`, `crimeType`,
//! `severity`, `precinct`, `weather`, `motive`, `latitude`, `longitude`,
//! `timestamp`).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crime_analytics_models::FeatureRecord;
use thiserror::Error;

/// Errors that can occur while loading incidents.
#[derive(Debug, Error)]
pub enum InputError {
    /// The file could not be opened or read.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File being read.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The JSON document is malformed or does not match the record schema.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A CSV row is malformed or does not match the record schema.
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    /// The file extension is neither `.json` nor `.csv`.
    #[error("Unsupported input format '{extension}' (expected .json or .csv)")]
    UnsupportedFormat {
        /// Extension found on the input path.
        extension: String,
    },
}

/// Loads every incident in `path`, choosing the parser by file extension.
///
/// # Errors
///
/// Returns an [`InputError`] if the file cannot be read or parsed.
pub fn load_records(path: &Path) -> Result<Vec<FeatureRecord>, InputError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let file = File::open(path).map_err(|source| InputError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let reader = BufReader::new(file);

    let records = match extension.as_str() {
        "json" => serde_json::from_reader(reader)?,
        "csv" => read_csv(reader)?,
        _ => return Err(InputError::UnsupportedFormat { extension }),
    };

    log::info!("Loaded {} incidents from {}", records.len(), path.display());
    Ok(records)
}

fn read_csv(reader: impl std::io::Read) -> Result<Vec<FeatureRecord>, InputError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crime_analytics_crime_models::{CrimeType, Precinct};

    #[test]
    fn csv_rows_deserialize() {
        let data = "caseId,crimeType,severity,precinct,weather,motive,latitude,longitude,timestamp\n\
                    CASE-1,THEFT,LOW,ALABANG,CLEAR,GREED,14.42,121.04,1672531200\n\
                    CASE-2, ROBBERY ,HIGH,SUCAT,RAIN,UNKNOWN,14.47,121.05,1672617600\n";
        let records = read_csv(data.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].crime_type, CrimeType::Theft);
        assert_eq!(records[1].crime_type, CrimeType::Robbery);
        assert_eq!(records[1].precinct, Precinct::Sucat);
    }

    #[test]
    fn unknown_category_is_an_error() {
        let data = "caseId,crimeType,severity,precinct,weather,motive,latitude,longitude,timestamp\n\
                    CASE-1,JAYWALKING,LOW,ALABANG,CLEAR,GREED,14.42,121.04,1672531200\n";
        assert!(matches!(read_csv(data.as_bytes()), Err(InputError::Csv(_))));
    }
}
