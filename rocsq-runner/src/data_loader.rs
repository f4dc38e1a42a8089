//! Price loading for the runner.
//!
//! Real data comes from a directory of per-instrument CSV files named
//! `{SYMBOL}.csv` with `date,close` columns (`Date`/`Close` headers are also
//! accepted; extra columns are ignored). Synthetic data is a developer-only
//! mode: results produced on it are tagged.
//!
//! A requested symbol without a file is an error. A file whose rows do not
//! form a valid series (unparseable rows, unordered dates) is rejected on its
//! own, logged, and the remaining instruments still load.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use rocsq_core::data::synthetic_universe;
use rocsq_core::{DatasetHash, InvalidInputError, PricePoint, PriceSeries, Universe};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no price file for '{symbol}' (expected {path})")]
    MissingFile { symbol: String, path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid price series for '{symbol}': {source}")]
    InvalidSeries {
        symbol: String,
        #[source]
        source: InvalidInputError,
    },

    #[error("no instruments could be loaded from {0}")]
    Empty(PathBuf),
}

/// Loaded universe plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedUniverse {
    pub universe: Universe,
    /// BLAKE3 over all loaded prices.
    pub dataset_hash: DatasetHash,
    pub has_synthetic: bool,
    /// Instruments dropped during loading, with the reason.
    pub rejected: Vec<(String, String)>,
}

impl LoadedUniverse {
    fn new(universe: Universe, has_synthetic: bool, rejected: Vec<(String, String)>) -> Self {
        let dataset_hash = DatasetHash::of(&universe);
        Self {
            universe,
            dataset_hash,
            has_synthetic,
            rejected,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "Close")]
    close: f64,
}

/// Parse one CSV file into a series for `symbol`.
pub fn load_csv_series(symbol: &str, path: &Path) -> Result<PriceSeries, LoadError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    })?;

    let mut points = Vec::new();
    for row in reader.deserialize::<PriceRow>() {
        let row = row.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        points.push(PricePoint::new(row.date, row.close));
    }

    PriceSeries::new(symbol, points).map_err(|source| LoadError::InvalidSeries {
        symbol: symbol.to_string(),
        source,
    })
}

/// Symbols with a `.csv` file in `dir`, sorted.
pub fn discover_symbols(dir: &Path) -> Result<Vec<String>, LoadError> {
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut symbols = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            symbols.push(stem.to_string());
        }
    }
    symbols.sort();
    Ok(symbols)
}

/// Load `symbols` from `dir`. An empty list loads every CSV in the directory.
pub fn load_universe(dir: &Path, symbols: &[String]) -> Result<LoadedUniverse, LoadError> {
    let symbols = if symbols.is_empty() {
        discover_symbols(dir)?
    } else {
        symbols.to_vec()
    };

    let mut universe = Universe::new();
    let mut rejected = Vec::new();

    for symbol in &symbols {
        let path = dir.join(format!("{symbol}.csv"));
        if !path.is_file() {
            return Err(LoadError::MissingFile {
                symbol: symbol.clone(),
                path,
            });
        }
        match load_csv_series(symbol, &path) {
            Ok(series) => {
                universe.insert(series);
            }
            Err(err) => {
                warn!(symbol = %symbol, error = %err, "instrument rejected");
                rejected.push((symbol.clone(), err.to_string()));
            }
        }
    }

    if universe.is_empty() {
        return Err(LoadError::Empty(dir.to_path_buf()));
    }

    info!(
        instruments = universe.len(),
        rejected = rejected.len(),
        points = universe.point_count(),
        "price data loaded"
    );
    Ok(LoadedUniverse::new(universe, false, rejected))
}

/// Deterministic synthetic universe, tagged as synthetic.
pub fn load_synthetic(symbols: &[String], start: NaiveDate, end: NaiveDate) -> LoadedUniverse {
    warn!(
        instruments = symbols.len(),
        "generating synthetic data; results will be tagged as synthetic"
    );
    LoadedUniverse::new(synthetic_universe(symbols, start, end), true, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn loads_lowercase_and_titlecase_headers() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "AAA.csv", "date,close\n2024-01-02,10.5\n2024-01-03,11.0\n");
        write(
            tmp.path(),
            "BBB.csv",
            "Date,Open,Close,Volume\n2024-01-02,1,20.0,100\n2024-01-03,1,21.0,100\n",
        );
        let loaded = load_universe(tmp.path(), &[]).unwrap();
        assert_eq!(loaded.universe.symbols(), vec!["AAA", "BBB"]);
        assert_eq!(loaded.universe.get("BBB").unwrap().closes(), vec![20.0, 21.0]);
        assert!(!loaded.has_synthetic);
        assert!(loaded.rejected.is_empty());
    }

    #[test]
    fn missing_requested_symbol_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "AAA.csv", "date,close\n2024-01-02,10.5\n");
        let err = load_universe(tmp.path(), &["AAA".into(), "ZZZ".into()]).unwrap_err();
        assert!(matches!(err, LoadError::MissingFile { ref symbol, .. } if symbol == "ZZZ"));
    }

    #[test]
    fn unordered_file_is_rejected_alone() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "GOOD.csv", "date,close\n2024-01-02,10\n2024-01-03,11\n");
        write(tmp.path(), "BAD.csv", "date,close\n2024-01-03,10\n2024-01-02,11\n");
        let loaded = load_universe(tmp.path(), &[]).unwrap();
        assert_eq!(loaded.universe.symbols(), vec!["GOOD"]);
        assert_eq!(loaded.rejected.len(), 1);
        assert_eq!(loaded.rejected[0].0, "BAD");
    }

    #[test]
    fn unparseable_row_is_csv_error() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "X.csv", "date,close\n2024-01-02,abc\n");
        let err = load_csv_series("X", &tmp.path().join("X.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Csv { .. }));
    }

    #[test]
    fn empty_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "notes.txt", "not prices");
        let err = load_universe(tmp.path(), &[]).unwrap_err();
        assert!(matches!(err, LoadError::Empty(_)));
    }

    #[test]
    fn synthetic_is_tagged_and_hashed() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let symbols = vec!["SPY".to_string()];
        let a = load_synthetic(&symbols, start, end);
        let b = load_synthetic(&symbols, start, end);
        assert!(a.has_synthetic);
        assert_eq!(a.dataset_hash, b.dataset_hash);
    }
}
