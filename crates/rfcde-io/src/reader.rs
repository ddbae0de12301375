//! CSV matrix reader with full input validation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{Matrix, RowId};

/// Reads a numeric matrix from a CSV file.
///
/// Expected CSV format:
/// - Header row required: `id,col1,col2,...,colN`
/// - First column is a non-empty, unique row id
/// - Remaining cells are finite floats; every row has the header's width
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NoDataColumns`] | Only the id column, no value columns |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::EmptyRowId`] | Id cell is empty |
/// | [`IoError::DuplicateRowId`] | Same id appears twice |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
pub struct MatrixReader {
    path: PathBuf,
}

impl MatrixReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`Matrix`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Matrix, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so short rows surface as InconsistentRowLength
        // instead of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.parse_error(e))?;
        let expected_cols = header.len();
        debug!(expected_cols, "read CSV header");
        if expected_cols < 2 {
            return Err(IoError::NoDataColumns {
                path: self.path.clone(),
            });
        }
        let column_names: Vec<String> = header.iter().skip(1).map(String::from).collect();

        let mut ids = Vec::new();
        let mut rows = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.parse_error(e))?;
            let id = record.get(0).unwrap_or("").to_string();

            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    row_id: id,
                    expected: expected_cols,
                    got: record.len(),
                });
            }
            if id.is_empty() {
                return Err(IoError::EmptyRowId {
                    path: self.path.clone(),
                    row_index,
                });
            }
            if let Some(&first_row) = seen.get(&id) {
                return Err(IoError::DuplicateRowId {
                    path: self.path.clone(),
                    row_id: id,
                    first_row,
                    second_row: row_index,
                });
            }
            seen.insert(id.clone(), row_index);

            let row = record
                .iter()
                .skip(1)
                .enumerate()
                .map(|(col_index, raw)| self.parse_value(raw, row_index, col_index))
                .collect::<Result<Vec<f64>, IoError>>()?;

            ids.push(RowId::new(id));
            rows.push(row);
        }

        if ids.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(
            n_rows = ids.len(),
            n_columns = column_names.len(),
            "matrix loaded"
        );
        Ok(Matrix::new(ids, column_names, rows))
    }

    fn parse_value(&self, raw: &str, row_index: usize, col_index: usize) -> Result<f64, IoError> {
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(IoError::NonFiniteValue {
                path: self.path.clone(),
                row_index,
                col_index,
                raw: raw.to_string(),
            }),
        }
    }

    fn parse_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}
