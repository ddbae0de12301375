//! CDE forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::bootstrap::{Bootstrap, BootstrapSample};
use crate::config::{ForestConfig, OobMode};
use crate::dataset::{FeatureLayout, TrainingSet};
use crate::error::ForestError;
use crate::result::{ForestFitResult, TrainingMetadata};
use crate::tree::{CdeTree, GrowParams, grow};

/// A fitted CDE forest.
///
/// Holds the trees together with the training data their leaves index
/// into. Only obtainable from [`ForestConfig::fit`].
#[derive(Debug, Clone)]
pub struct CdeForest {
    pub(crate) trees: Vec<CdeTree>,
    pub(crate) data: TrainingSet,
    pub(crate) layout: FeatureLayout,
    pub(crate) params: GrowParams,
    pub(crate) bootstrap: Bootstrap,
    pub(crate) oob_mode: OobMode,
    pub(crate) seed: u64,
}

impl CdeForest {
    /// Borrow the trees in training order.
    #[must_use]
    pub fn trees(&self) -> &[CdeTree] {
        &self.trees
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the number of covariate columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.data.n_features()
    }

    /// Return the number of covariate groups.
    #[must_use]
    pub fn n_groups(&self) -> usize {
        self.layout.n_groups()
    }

    /// Return the number of training observations.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.data.n_samples()
    }

    /// Return the number of basis coefficients per observation.
    #[must_use]
    pub fn n_basis(&self) -> usize {
        self.data.n_basis()
    }

    /// Borrow the covariate group layout.
    #[must_use]
    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    /// Return the resolved number of groups sampled per split.
    #[must_use]
    pub fn mtry(&self) -> usize {
        self.params.mtry
    }

    /// Return the minimum in-bag weight per side used during growth.
    #[must_use]
    pub fn node_size(&self) -> usize {
        self.params.node_size
    }

    /// Return the resampling scheme the trees were grown with.
    #[must_use]
    pub fn bootstrap(&self) -> Bootstrap {
        self.bootstrap
    }

    /// Return the OOB mode the forest was fitted with.
    #[must_use]
    pub fn oob_mode(&self) -> OobMode {
        self.oob_mode
    }

    /// Return the seed the forest was fitted with.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub(crate) fn check_dimension(&self, x: &[f64]) -> Result<(), ForestError> {
        if x.len() != self.n_features() {
            return Err(ForestError::DimensionMismatch {
                expected: self.n_features(),
                got: x.len(),
            });
        }
        Ok(())
    }
}

/// Train the CDE forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = covariates.len()))]
pub(crate) fn train(
    config: &ForestConfig,
    covariates: &[Vec<f64>],
    basis: &[Vec<f64>],
) -> Result<ForestFitResult, ForestError> {
    // --- Validate inputs ---
    let data = TrainingSet::new(covariates, basis)?;
    let layout = match &config.lens {
        Some(lens) => FeatureLayout::from_lens(lens, data.n_features())?,
        None => FeatureLayout::scalar(data.n_features()),
    };

    // --- Validate config ---
    let mtry = config.mtry.resolve(layout.n_groups())?;
    let params = GrowParams::validated(
        mtry,
        layout.n_groups(),
        config.node_size,
        config.min_loss_delta,
        config.flambda,
        config.max_depth,
    )?;

    let n_samples = data.n_samples();
    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features = data.n_features(),
        n_groups = layout.n_groups(),
        n_basis = data.n_basis(),
        mtry,
        node_size = params.node_size,
        bootstrap = ?config.bootstrap,
        "training CDE forest"
    );

    // Generate per-tree seeds from master RNG.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let bootstrap = config.bootstrap;
    let resampler = bootstrap.resampler()?;

    // Parallel tree training; `collect` preserves seed order.
    let trees: Vec<CdeTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let sample = BootstrapSample::draw(n_samples, &resampler, &mut rng);
            grow(&data, &layout, &params, sample, &mut rng)
        })
        .collect();

    debug!(n_trees_trained = trees.len(), "tree training complete");

    let metadata = TrainingMetadata::from_trees(&trees, &data, &layout, mtry);

    info!(
        mean_leaves = metadata.mean_leaves,
        mean_depth = metadata.mean_depth,
        "CDE forest training complete"
    );

    let forest = CdeForest {
        trees,
        data,
        layout,
        params,
        bootstrap,
        oob_mode: config.oob_mode,
        seed: config.seed,
    };
    Ok(ForestFitResult::new(forest, metadata))
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use crate::bootstrap::Bootstrap;
    use crate::config::{ForestConfig, Mtry};
    use crate::error::{ErrorKind, ForestError};

    /// Noisy sine response with one informative and one noise covariate.
    fn make_data(n: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut covariates = Vec::with_capacity(n);
        let mut basis = Vec::with_capacity(n);
        for _ in 0..n {
            let x0: f64 = rng.gen_range(0.0..1.0);
            let x1: f64 = rng.gen_range(0.0..1.0);
            let z = (x0 * 6.0).sin() * 0.4 + 0.5 + rng.gen_range(-0.05..0.05);
            covariates.push(vec![x0, x1]);
            basis.push(vec![1.0, (std::f64::consts::PI * z).cos(), (2.0 * std::f64::consts::PI * z).cos()]);
        }
        (covariates, basis)
    }

    #[test]
    fn weights_sum_to_one() {
        let (x, z) = make_data(80, 1);
        let result = ForestConfig::new(20).unwrap().with_seed(3).fit(&x, &z).unwrap();
        let forest = result.forest();

        for query in [[0.1, 0.5], [0.9, 0.2], [0.5, 0.5]] {
            let w = forest.weights(&query).unwrap();
            assert_eq!(w.len(), 80);
            assert!(w.iter().all(|&v| v >= 0.0));
            let total: f64 = w.iter().sum();
            assert!((total - 1.0).abs() < 1e-9, "total = {total}");
        }
    }

    #[test]
    fn single_leaf_tree_gives_uniform_weights() {
        let (x, z) = make_data(30, 2);
        let result = ForestConfig::new(1)
            .unwrap()
            .with_mtry(Mtry::Fixed(1))
            .with_node_size(30)
            .with_bootstrap(Bootstrap::Disabled)
            .fit(&x, &z)
            .unwrap();
        let w = result.forest().weights(&[0.3, 0.3]).unwrap();
        for v in w {
            assert!((v - 1.0 / 30.0).abs() < 1e-15);
        }
    }

    #[test]
    fn max_node_size_grows_single_leaf() {
        let (x, z) = make_data(10, 3);
        let result = ForestConfig::new(1)
            .unwrap()
            .with_mtry(Mtry::All)
            .with_node_size(usize::MAX)
            .fit(&x, &z)
            .unwrap();
        let tree = &result.forest().trees()[0];
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.n_leaves(), 1);
    }

    #[test]
    fn two_point_forest_puts_all_weight_on_self() {
        let x = vec![vec![0.0], vec![1.0]];
        let z = vec![vec![1.0, -1.0], vec![1.0, 1.0]];
        let result = ForestConfig::new(1)
            .unwrap()
            .with_mtry(Mtry::Fixed(1))
            .with_node_size(1)
            .with_bootstrap(Bootstrap::Disabled)
            .fit(&x, &z)
            .unwrap();
        let forest = result.forest();
        assert_eq!(forest.trees()[0].n_leaves(), 2);
        assert_eq!(forest.weights(&[0.0]).unwrap(), vec![1.0, 0.0]);
        assert_eq!(forest.weights(&[1.0]).unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (x, z) = make_data(60, 4);
        let fit = || {
            ForestConfig::new(12)
                .unwrap()
                .with_seed(99)
                .with_bootstrap(Bootstrap::Poisson)
                .fit(&x, &z)
                .unwrap()
        };
        let a = fit();
        let b = fit();
        for (ta, tb) in a.forest().trees().iter().zip(b.forest().trees()) {
            assert_eq!(ta, tb);
        }
        let wa = a.forest().weights_batch(&x).unwrap();
        let wb = b.forest().weights_batch(&x).unwrap();
        assert_eq!(wa, wb);
    }

    #[test]
    fn different_seeds_grow_different_trees() {
        let (x, z) = make_data(60, 4);
        let a = ForestConfig::new(1).unwrap().with_seed(1).fit(&x, &z).unwrap();
        let b = ForestConfig::new(1).unwrap().with_seed(2).fit(&x, &z).unwrap();
        assert_ne!(a.forest().trees()[0].bootstrap(), b.forest().trees()[0].bootstrap());
    }

    #[test]
    fn informative_covariate_drives_weights() {
        let (x, z) = make_data(200, 5);
        let result = ForestConfig::new(50)
            .unwrap()
            .with_mtry(Mtry::All)
            .fit(&x, &z)
            .unwrap();
        let w = result.forest().weights(&[0.25, 0.5]).unwrap();
        // Mass should concentrate on training points with nearby x0.
        let near: f64 = x
            .iter()
            .zip(&w)
            .filter(|(row, _)| (row[0] - 0.25).abs() < 0.2)
            .map(|(_, &v)| v)
            .sum();
        assert!(near > 0.6, "near mass = {near}");
    }

    #[test]
    fn accessors_report_shapes() {
        let (x, z) = make_data(40, 6);
        let result = ForestConfig::new(3).unwrap().with_lens(vec![2]).fit(&x, &z).unwrap();
        let forest = result.forest();
        assert_eq!(forest.n_trees(), 3);
        assert_eq!(forest.n_samples(), 40);
        assert_eq!(forest.n_features(), 2);
        assert_eq!(forest.n_groups(), 1);
        assert_eq!(forest.n_basis(), 3);
        assert_eq!(forest.mtry(), 1);
    }

    // --- Errors ---

    #[test]
    fn empty_dataset_error() {
        let config = ForestConfig::new(10).unwrap();
        let err = config.fit(&[], &[]).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn mtry_above_groups_is_configuration_error() {
        let (x, z) = make_data(10, 7);
        let err = ForestConfig::new(2)
            .unwrap()
            .with_mtry(Mtry::Fixed(3))
            .fit(&x, &z)
            .unwrap_err();
        assert!(matches!(err, ForestError::InvalidMtry { mtry: 3, n_groups: 2 }));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn bad_lens_rejected() {
        let (x, z) = make_data(10, 8);
        let err = ForestConfig::new(2)
            .unwrap()
            .with_lens(vec![3])
            .fit(&x, &z)
            .unwrap_err();
        assert!(matches!(err, ForestError::InvalidLens { .. }));
    }

    #[test]
    fn negative_flambda_rejected() {
        let (x, z) = make_data(10, 9);
        let err = ForestConfig::new(2)
            .unwrap()
            .with_flambda(-1.0)
            .fit(&x, &z)
            .unwrap_err();
        assert!(matches!(err, ForestError::InvalidFlambda { .. }));
    }

    #[test]
    fn query_dimension_mismatch() {
        let (x, z) = make_data(20, 10);
        let result = ForestConfig::new(2).unwrap().fit(&x, &z).unwrap();
        let err = result.forest().weights(&[0.5]).unwrap_err();
        assert!(matches!(err, ForestError::DimensionMismatch { expected: 2, got: 1 }));
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
    }
}
