//! Prediction-time observation weights for the CDE forest.

use rayon::iter::{IntoParallelIterator, IntoParallelRefIterator, ParallelIterator};

use crate::error::ForestError;
use crate::forest::CdeForest;
use crate::tree::LeafRef;

impl CdeForest {
    /// Return the weight of every training observation for query `x`.
    ///
    /// Each tree contributes `count_j / leaf_weight` for the members `j` of
    /// the leaf `x` falls into; contributions are averaged over trees, so the
    /// result is non-negative and sums to 1. Leaves are located in parallel
    /// and summed in tree order, making the output independent of thread
    /// scheduling.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::DimensionMismatch`] when `x.len() != n_features`.
    pub fn weights(&self, x: &[f64]) -> Result<Vec<f64>, ForestError> {
        self.check_dimension(x)?;

        let leaves: Vec<LeafRef<'_>> = self.trees.par_iter().map(|tree| tree.leaf_of(x)).collect();

        let scale = 1.0 / self.trees.len() as f64;
        let mut out = vec![0.0f64; self.n_samples()];
        for (tree, leaf) in self.trees.iter().zip(leaves) {
            tree.add_leaf_weights(leaf, scale, &mut out);
        }
        Ok(out)
    }

    /// Return weight vectors for a batch of queries in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::DimensionMismatch`] if any query has the wrong
    /// covariate count.
    pub fn weights_batch(&self, queries: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ForestError> {
        queries
            .into_par_iter()
            .map(|x| self.weights(x))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::bootstrap::Bootstrap;
    use crate::config::{ForestConfig, Mtry};
    use crate::error::ForestError;

    fn grid_data() -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let covariates: Vec<Vec<f64>> = (0..50).map(|i| vec![(i % 10) as f64, (i / 10) as f64]).collect();
        let basis = covariates
            .iter()
            .map(|x| vec![1.0, if x[0] < 5.0 { 0.8 } else { -0.8 }])
            .collect();
        (covariates, basis)
    }

    #[test]
    fn batch_matches_individual() {
        let (x, z) = grid_data();
        let result = ForestConfig::new(8).unwrap().with_node_size(2).fit(&x, &z).unwrap();
        let forest = result.forest();

        let batch = forest.weights_batch(&x).unwrap();
        for (row, expected) in x.iter().zip(&batch) {
            assert_eq!(&forest.weights(row).unwrap(), expected);
        }
    }

    #[test]
    fn batch_reports_bad_query() {
        let (x, z) = grid_data();
        let result = ForestConfig::new(2).unwrap().fit(&x, &z).unwrap();
        let queries = vec![vec![1.0, 2.0], vec![1.0, 2.0, 3.0]];
        let err = result.forest().weights_batch(&queries).unwrap_err();
        assert!(matches!(err, ForestError::DimensionMismatch { expected: 2, got: 3 }));
    }

    #[test]
    fn weights_stay_on_matching_side() {
        let (x, z) = grid_data();
        let result = ForestConfig::new(10)
            .unwrap()
            .with_mtry(Mtry::All)
            .with_node_size(3)
            .with_bootstrap(Bootstrap::Disabled)
            .fit(&x, &z)
            .unwrap();
        let w = result.forest().weights(&[1.0, 2.0]).unwrap();
        let wrong_side: f64 = x
            .iter()
            .zip(&w)
            .filter(|(row, _)| row[0] >= 5.0)
            .map(|(_, &v)| v)
            .sum();
        assert_eq!(wrong_side, 0.0);
    }

    #[test]
    fn multiplicities_scale_weights() {
        let (x, z) = grid_data();
        let result = ForestConfig::new(1)
            .unwrap()
            .with_node_size(50)
            .with_mtry(Mtry::All)
            .fit(&x, &z)
            .unwrap();
        let forest = result.forest();
        let tree = &forest.trees()[0];
        let w = forest.weights(&[0.0, 0.0]).unwrap();
        // One leaf holding every in-bag draw: weight is count / 50.
        for (j, &v) in w.iter().enumerate() {
            let expected = f64::from(tree.bootstrap().count(j)) / 50.0;
            assert!((v - expected).abs() < 1e-15);
        }
    }
}
