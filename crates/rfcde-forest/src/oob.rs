//! Out-of-bag (OOB) weights for the CDE forest.

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, instrument};

use crate::config::OobMode;
use crate::error::ForestError;
use crate::forest::CdeForest;

/// Out-of-bag weight matrix.
///
/// Row `i` weights the training observations using only the trees whose
/// bootstrap sample excluded observation `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct OobWeights {
    rows: Vec<Vec<f64>>,
    n_oob_trees: Vec<usize>,
}

impl OobWeights {
    /// Borrow every row; `rows()[i][j]` is the weight of `j` for `i`.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Borrow row `i`.
    #[must_use]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    /// Number of trees for which each observation was out of bag.
    #[must_use]
    pub fn n_oob_trees(&self) -> &[usize] {
        &self.n_oob_trees
    }

    /// Observations that were in bag for every tree; their rows are all zero.
    #[must_use]
    pub fn uncovered(&self) -> Vec<usize> {
        self.n_oob_trees
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n == 0)
            .map(|(i, _)| i)
            .collect()
    }

    /// Return `true` if observation `i` has at least one OOB tree.
    #[must_use]
    pub fn is_covered(&self, i: usize) -> bool {
        self.n_oob_trees[i] > 0
    }

    /// Number of observations with at least one OOB tree.
    #[must_use]
    pub fn n_covered(&self) -> usize {
        self.n_oob_trees.iter().filter(|&&n| n > 0).count()
    }

    /// Consume and return the row-major matrix.
    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.rows
    }
}

impl CdeForest {
    /// Compute out-of-bag weights for every training observation.
    ///
    /// Rows are computed in parallel; within a row, trees are summed in
    /// training order.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::OobNotFitted`] if the forest was not fitted
    /// with [`OobMode::Enabled`].
    #[instrument(skip_all, fields(n_trees = self.trees.len(), n_samples = self.n_samples()))]
    pub fn oob_weights(&self) -> Result<OobWeights, ForestError> {
        if self.oob_mode != OobMode::Enabled {
            return Err(ForestError::OobNotFitted);
        }

        let n_samples = self.n_samples();
        let per_row: Vec<(Vec<f64>, usize)> = (0..n_samples)
            .into_par_iter()
            .map(|i| {
                let x = &self.data.rows[i];
                let oob_trees: Vec<_> = self.trees.iter().filter(|t| t.bootstrap().is_oob(i)).collect();
                let mut row = vec![0.0f64; n_samples];
                if !oob_trees.is_empty() {
                    let scale = 1.0 / oob_trees.len() as f64;
                    for tree in &oob_trees {
                        tree.add_leaf_weights(tree.leaf_of(x), scale, &mut row);
                    }
                }
                (row, oob_trees.len())
            })
            .collect();

        let (rows, n_oob_trees): (Vec<Vec<f64>>, Vec<usize>) = per_row.into_iter().unzip();
        let weights = OobWeights { rows, n_oob_trees };

        debug!(
            n_covered = weights.n_covered(),
            n_uncovered = n_samples - weights.n_covered(),
            "OOB weights computed"
        );
        Ok(weights)
    }
}

#[cfg(test)]
mod tests {
    use crate::bootstrap::Bootstrap;
    use crate::config::{ForestConfig, OobMode};
    use crate::error::{ErrorKind, ForestError};

    fn make_data() -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let covariates: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64 / 60.0, ((i * 7) % 11) as f64]).collect();
        let basis = covariates
            .iter()
            .map(|x| {
                let z = x[0] * x[0];
                vec![1.0, (std::f64::consts::PI * z).cos() * 2f64.sqrt()]
            })
            .collect();
        (covariates, basis)
    }

    #[test]
    fn oob_requires_enabled_mode() {
        let (x, z) = make_data();
        let result = ForestConfig::new(5).unwrap().fit(&x, &z).unwrap();
        let err = result.forest().oob_weights().unwrap_err();
        assert!(matches!(err, ForestError::OobNotFitted));
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn oob_rows_are_normalized_and_exclude_self() {
        let (x, z) = make_data();
        let result = ForestConfig::new(30)
            .unwrap()
            .with_oob_mode(OobMode::Enabled)
            .with_seed(11)
            .fit(&x, &z)
            .unwrap();
        let oob = result.forest().oob_weights().unwrap();

        assert_eq!(oob.rows().len(), 60);
        for (i, row) in oob.rows().iter().enumerate() {
            assert_eq!(row.len(), 60);
            assert!(row.iter().all(|&v| v >= 0.0));
            assert_eq!(row[i], 0.0, "row {i} weights itself");
            let total: f64 = row.iter().sum();
            if oob.is_covered(i) {
                assert!((total - 1.0).abs() < 1e-9, "row {i} sums to {total}");
            } else {
                assert_eq!(total, 0.0);
            }
        }
        // With 30 trees, P(uncovered) per row is about 1e-6.
        assert_eq!(oob.n_covered(), 60);
        assert!(oob.uncovered().is_empty());
    }

    #[test]
    fn oob_tree_counts_match_bootstraps() {
        let (x, z) = make_data();
        let result = ForestConfig::new(10)
            .unwrap()
            .with_oob_mode(OobMode::Enabled)
            .with_bootstrap(Bootstrap::Poisson)
            .fit(&x, &z)
            .unwrap();
        let forest = result.forest();
        let oob = forest.oob_weights().unwrap();
        for i in 0..60 {
            let expected = forest.trees().iter().filter(|t| t.bootstrap().is_oob(i)).count();
            assert_eq!(oob.n_oob_trees()[i], expected);
        }
    }

    #[test]
    fn disabled_bootstrap_leaves_every_row_uncovered() {
        let (x, z) = make_data();
        let result = ForestConfig::new(3)
            .unwrap()
            .with_oob_mode(OobMode::Enabled)
            .with_bootstrap(Bootstrap::Disabled)
            .fit(&x, &z)
            .unwrap();
        let oob = result.forest().oob_weights().unwrap();
        assert_eq!(oob.uncovered().len(), 60);
        assert!(oob.into_rows().iter().flatten().all(|&v| v == 0.0));
    }
}
