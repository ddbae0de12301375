//! Domain types for rfcde-io.

use crate::IoError;

/// An observation identifier from the first column of an input CSV.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(String);

impl RowId {
    /// Wrap a non-empty id string.
    pub(crate) fn new(id: String) -> Self {
        debug_assert!(!id.is_empty(), "row id must not be empty");
        Self(id)
    }

    /// Return the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A numeric matrix with one id per row and one name per column.
///
/// Produced by [`MatrixReader`](crate::MatrixReader). `ids[i]` labels
/// `rows[i]`; every row has `column_names.len()` finite values.
#[derive(Debug, Clone)]
pub struct Matrix {
    ids: Vec<RowId>,
    column_names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl Matrix {
    pub(crate) fn new(ids: Vec<RowId>, column_names: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        debug_assert_eq!(ids.len(), rows.len());
        Self {
            ids,
            column_names,
            rows,
        }
    }

    /// Return the row ids.
    #[must_use]
    pub fn ids(&self) -> &[RowId] {
        &self.ids
    }

    /// Return the column names from the CSV header (id column excluded).
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Return the values (row-major).
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Copy out one column.
    ///
    /// # Panics
    ///
    /// Panics if `index >= n_columns()`.
    #[must_use]
    pub fn column(&self, index: usize) -> Vec<f64> {
        assert!(index < self.n_columns(), "column {index} out of range");
        self.rows.iter().map(|row| row[index]).collect()
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.ids.len()
    }

    /// Return the number of value columns.
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.column_names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Matrix {
        Matrix::new(
            vec![RowId::new("a".into()), RowId::new("b".into())],
            vec!["x".into(), "y".into()],
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        )
    }

    #[test]
    fn row_id_as_str_returns_inner() {
        let id = RowId::new("obs_0017".to_string());
        assert_eq!(id.as_str(), "obs_0017");
        assert_eq!(id.to_string(), "obs_0017");
    }

    #[test]
    fn matrix_accessors() {
        let m = small();
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.n_columns(), 2);
        assert_eq!(m.column(1), vec![2.0, 4.0]);
        assert_eq!(m.ids()[1].as_str(), "b");
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn column_out_of_range_panics() {
        let _ = small().column(2);
    }

    #[test]
    fn experiment_name_valid() {
        let name = ExperimentName::new("cde-run_01".to_string());
        assert_eq!(name.unwrap().as_str(), "cde-run_01");
    }

    #[test]
    fn experiment_name_rejects_empty() {
        let name = ExperimentName::new(String::new());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
    }

    #[test]
    fn experiment_name_rejects_special_chars() {
        let name = ExperimentName::new("my run!".to_string());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
    }
}
