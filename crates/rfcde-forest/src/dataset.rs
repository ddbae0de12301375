//! Validated training matrices and covariate group layout.

use std::ops::Range;

use crate::error::ForestError;

/// Partition of the covariate columns into contiguous groups.
///
/// A group of length 1 is an ordinary scalar covariate. A longer group is a
/// functional covariate whose columns are split on jointly through a
/// random projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLayout {
    groups: Vec<Range<usize>>,
    n_columns: usize,
}

impl FeatureLayout {
    /// One scalar group per column.
    #[must_use]
    pub fn scalar(n_columns: usize) -> Self {
        Self {
            groups: (0..n_columns).map(|c| c..c + 1).collect(),
            n_columns,
        }
    }

    /// Build a layout from group lengths.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidLens`] if any length is zero or the
    /// lengths do not sum to `n_columns`.
    pub fn from_lens(lens: &[usize], n_columns: usize) -> Result<Self, ForestError> {
        if lens.is_empty() {
            return Err(ForestError::InvalidLens {
                reason: "lens is empty".to_string(),
            });
        }
        if let Some(group) = lens.iter().position(|&l| l == 0) {
            return Err(ForestError::InvalidLens {
                reason: format!("group {group} has length 0"),
            });
        }
        let total: usize = lens.iter().sum();
        if total != n_columns {
            return Err(ForestError::InvalidLens {
                reason: format!("lens sum to {total}, but covariates have {n_columns} columns"),
            });
        }

        let mut groups = Vec::with_capacity(lens.len());
        let mut start = 0;
        for &len in lens {
            groups.push(start..start + len);
            start += len;
        }
        Ok(Self { groups, n_columns })
    }

    /// Number of covariate groups.
    #[must_use]
    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    /// Number of covariate columns.
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.n_columns
    }

    /// Column range of group `g`.
    #[must_use]
    pub fn group(&self, g: usize) -> Range<usize> {
        self.groups[g].clone()
    }

    /// Return `true` if every group has length 1.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.groups.iter().all(|r| r.len() == 1)
    }

    /// Group containing covariate column `column`.
    #[must_use]
    pub fn group_of(&self, column: usize) -> Option<usize> {
        self.groups.iter().position(|r| r.contains(&column))
    }
}

/// Covariates and basis coefficients shared read-only by every tree.
///
/// Covariates are kept column-major for sorting during split search and
/// row-major for leaf lookup of training points.
#[derive(Debug, Clone)]
pub(crate) struct TrainingSet {
    pub(crate) columns: Vec<Vec<f64>>,
    pub(crate) rows: Vec<Vec<f64>>,
    pub(crate) basis: Vec<Vec<f64>>,
}

impl TrainingSet {
    /// Validate row-major covariates and basis coefficients.
    pub(crate) fn new(covariates: &[Vec<f64>], basis: &[Vec<f64>]) -> Result<Self, ForestError> {
        if covariates.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        if covariates.len() != basis.len() {
            return Err(ForestError::SampleCountMismatch {
                covariates: covariates.len(),
                basis: basis.len(),
            });
        }

        let n_features = covariates[0].len();
        if n_features == 0 {
            return Err(ForestError::ZeroFeatures);
        }
        for (sample_index, row) in covariates.iter().enumerate() {
            if row.len() != n_features {
                return Err(ForestError::FeatureCountMismatch {
                    expected: n_features,
                    got: row.len(),
                    sample_index,
                });
            }
            if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
                return Err(ForestError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
        }

        let n_basis = basis[0].len();
        if n_basis == 0 {
            return Err(ForestError::ZeroBasis);
        }
        for (sample_index, row) in basis.iter().enumerate() {
            if row.len() != n_basis {
                return Err(ForestError::BasisCountMismatch {
                    expected: n_basis,
                    got: row.len(),
                    sample_index,
                });
            }
            if let Some(basis_index) = row.iter().position(|v| !v.is_finite()) {
                return Err(ForestError::NonFiniteBasis {
                    sample_index,
                    basis_index,
                });
            }
        }

        let columns: Vec<Vec<f64>> = (0..n_features)
            .map(|f| covariates.iter().map(|row| row[f]).collect())
            .collect();

        Ok(Self {
            columns,
            rows: covariates.to_vec(),
            basis: basis.to_vec(),
        })
    }

    pub(crate) fn n_samples(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn n_features(&self) -> usize {
        self.columns.len()
    }

    pub(crate) fn n_basis(&self) -> usize {
        self.basis[0].len()
    }
}

#[cfg(test)]
mod tests {
    use super::{FeatureLayout, TrainingSet};
    use crate::error::ForestError;

    #[test]
    fn scalar_layout_has_one_group_per_column() {
        let layout = FeatureLayout::scalar(3);
        assert_eq!(layout.n_groups(), 3);
        assert_eq!(layout.group(2), 2..3);
        assert!(layout.is_scalar());
    }

    #[test]
    fn lens_build_contiguous_groups() {
        let layout = FeatureLayout::from_lens(&[1, 3, 2], 6).unwrap();
        assert_eq!(layout.n_groups(), 3);
        assert_eq!(layout.group(1), 1..4);
        assert_eq!(layout.group(2), 4..6);
        assert_eq!(layout.group_of(3), Some(1));
        assert!(!layout.is_scalar());
    }

    #[test]
    fn lens_must_cover_all_columns() {
        let err = FeatureLayout::from_lens(&[1, 2], 4).unwrap_err();
        assert!(matches!(err, ForestError::InvalidLens { .. }));
    }

    #[test]
    fn zero_length_group_rejected() {
        let err = FeatureLayout::from_lens(&[2, 0, 1], 3).unwrap_err();
        assert!(matches!(err, ForestError::InvalidLens { .. }));
    }

    #[test]
    fn training_set_transposes_covariates() {
        let x = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let z = vec![vec![1.0], vec![1.0], vec![1.0]];
        let set = TrainingSet::new(&x, &z).unwrap();
        assert_eq!(set.n_samples(), 3);
        assert_eq!(set.n_features(), 2);
        assert_eq!(set.n_basis(), 1);
        assert_eq!(set.columns[1], vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn row_count_mismatch_rejected() {
        let x = vec![vec![1.0], vec![2.0]];
        let z = vec![vec![1.0]];
        let err = TrainingSet::new(&x, &z).unwrap_err();
        assert!(matches!(
            err,
            ForestError::SampleCountMismatch { covariates: 2, basis: 1 }
        ));
    }

    #[test]
    fn non_finite_basis_rejected() {
        let x = vec![vec![1.0], vec![2.0]];
        let z = vec![vec![1.0, 0.5], vec![1.0, f64::INFINITY]];
        let err = TrainingSet::new(&x, &z).unwrap_err();
        assert!(matches!(
            err,
            ForestError::NonFiniteBasis { sample_index: 1, basis_index: 1 }
        ));
    }

    #[test]
    fn ragged_covariates_rejected() {
        let x = vec![vec![1.0, 2.0], vec![3.0]];
        let z = vec![vec![1.0], vec![1.0]];
        let err = TrainingSet::new(&x, &z).unwrap_err();
        assert!(matches!(err, ForestError::FeatureCountMismatch { .. }));
    }
}
