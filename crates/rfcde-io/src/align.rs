//! Alignment of a covariate matrix with a response matrix by row id.

use std::collections::HashMap;

use tracing::{info, instrument, warn};

use crate::IoError;
use crate::domain::{Matrix, RowId};

/// Covariates and responses matched row for row.
///
/// `ids[i]` labels `covariates[i]` and `responses[i]`. Row order follows the
/// covariate matrix.
#[derive(Debug)]
pub struct AlignedData {
    ids: Vec<RowId>,
    covariates: Vec<Vec<f64>>,
    responses: Vec<Vec<f64>>,
    covariate_names: Vec<String>,
    response_names: Vec<String>,
}

impl AlignedData {
    /// Return the row ids.
    #[must_use]
    pub fn ids(&self) -> &[RowId] {
        &self.ids
    }

    /// Return the covariate matrix (row-major).
    #[must_use]
    pub fn covariates(&self) -> &[Vec<f64>] {
        &self.covariates
    }

    /// Return the response matrix (row-major).
    #[must_use]
    pub fn responses(&self) -> &[Vec<f64>] {
        &self.responses
    }

    /// Return the covariate column names.
    #[must_use]
    pub fn covariate_names(&self) -> &[String] {
        &self.covariate_names
    }

    /// Return the response column names.
    #[must_use]
    pub fn response_names(&self) -> &[String] {
        &self.response_names
    }

    /// Return the number of matched rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.ids.len()
    }
}

/// Match every covariate row with the response row of the same id.
///
/// Response rows without covariates are dropped with a warning. A covariate
/// row without a response is a hard error.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::MissingResponse`] | A covariate id is absent from the responses |
#[instrument(skip_all, fields(n_covariates = covariates.n_rows(), n_responses = responses.n_rows()))]
pub fn align(covariates: &Matrix, responses: &Matrix) -> Result<AlignedData, IoError> {
    let lookup: HashMap<&str, usize> = responses
        .ids()
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut matched = Vec::with_capacity(covariates.n_rows());
    for id in covariates.ids() {
        let index = lookup
            .get(id.as_str())
            .ok_or_else(|| IoError::MissingResponse {
                row_id: id.as_str().to_string(),
            })?;
        matched.push(responses.rows()[*index].clone());
    }

    let n_dropped = responses.n_rows() - matched.len();
    if n_dropped > 0 {
        warn!(n_dropped, "dropped response rows without covariates");
    }
    info!(n_aligned = matched.len(), "alignment complete");

    Ok(AlignedData {
        ids: covariates.ids().to_vec(),
        covariates: covariates.rows().to_vec(),
        responses: matched,
        covariate_names: covariates.column_names().to_vec(),
        response_names: responses.column_names().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(ids: &[&str], names: &[&str], rows: Vec<Vec<f64>>) -> Matrix {
        Matrix::new(
            ids.iter().map(|s| RowId::new((*s).to_string())).collect(),
            names.iter().map(|s| (*s).to_string()).collect(),
            rows,
        )
    }

    #[test]
    fn responses_follow_covariate_order() {
        let x = matrix(&["b", "a"], &["x0"], vec![vec![2.0], vec![1.0]]);
        let z = matrix(&["a", "b"], &["z"], vec![vec![10.0], vec![20.0]]);
        let aligned = align(&x, &z).unwrap();
        assert_eq!(aligned.n_samples(), 2);
        assert_eq!(aligned.ids()[0].as_str(), "b");
        assert_eq!(aligned.responses(), &[vec![20.0], vec![10.0]]);
        assert_eq!(aligned.covariates(), &[vec![2.0], vec![1.0]]);
        assert_eq!(aligned.response_names(), &["z"]);
    }

    #[test]
    fn extra_responses_dropped() {
        let x = matrix(&["a"], &["x0"], vec![vec![1.0]]);
        let z = matrix(&["a", "b", "c"], &["z"], vec![vec![1.0], vec![2.0], vec![3.0]]);
        let aligned = align(&x, &z).unwrap();
        assert_eq!(aligned.n_samples(), 1);
        assert_eq!(aligned.responses(), &[vec![1.0]]);
    }

    #[test]
    fn missing_response_error() {
        let x = matrix(&["a", "q"], &["x0"], vec![vec![1.0], vec![2.0]]);
        let z = matrix(&["a"], &["z"], vec![vec![1.0]]);
        let err = align(&x, &z).unwrap_err();
        assert!(matches!(err, IoError::MissingResponse { ref row_id } if row_id == "q"));
    }
}
