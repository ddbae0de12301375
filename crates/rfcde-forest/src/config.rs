//! Configuration builder for CDE forest training.

use crate::bootstrap::Bootstrap;
use crate::error::ForestError;
use crate::result::ForestFitResult;

/// Strategy for the number of covariate groups sampled at each split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mtry {
    /// Square root of the group count, rounded up.
    Sqrt,
    /// Log base 2 of the group count, rounded up (at least 1).
    Log2,
    /// A fraction of the group count, rounded up.
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// Every group (no subsampling).
    All,
}

impl Mtry {
    /// Resolve to a concrete count over `n_groups` covariate groups.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidMtry`] if the resolved count is 0 or
    /// exceeds `n_groups`.
    pub fn resolve(self, n_groups: usize) -> Result<usize, ForestError> {
        let resolved = match self {
            Mtry::Sqrt => (n_groups as f64).sqrt().ceil() as usize,
            Mtry::Log2 => (n_groups as f64).log2().ceil().max(1.0) as usize,
            Mtry::Fraction(f) if f.is_finite() && f > 0.0 => (n_groups as f64 * f).ceil() as usize,
            Mtry::Fraction(_) => 0,
            Mtry::Fixed(n) => n,
            Mtry::All => n_groups,
        };
        if resolved == 0 || resolved > n_groups {
            return Err(ForestError::InvalidMtry {
                mtry: resolved,
                n_groups,
            });
        }
        Ok(resolved)
    }
}

/// Whether to keep the bookkeeping needed for out-of-bag weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OobMode {
    /// Allow [`CdeForest::oob_weights`](crate::CdeForest::oob_weights).
    Enabled,
    /// Reject out-of-bag queries.
    Disabled,
}

/// Configuration for CDE forest training.
///
/// Construct via [`ForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter        | Default        |
/// |------------------|----------------|
/// | `mtry`           | `Sqrt`         |
/// | `node_size`      | 5              |
/// | `min_loss_delta` | 0.0            |
/// | `flambda`        | 1.0            |
/// | `lens`           | `None` (all 1) |
/// | `max_depth`      | `None`         |
/// | `bootstrap`      | `Multinomial`  |
/// | `oob_mode`       | `Disabled`     |
/// | `seed`           | 42             |
#[derive(Debug, Clone)]
pub struct ForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) mtry: Mtry,
    pub(crate) node_size: usize,
    pub(crate) min_loss_delta: f64,
    pub(crate) flambda: f64,
    pub(crate) lens: Option<Vec<usize>>,
    pub(crate) max_depth: Option<usize>,
    pub(crate) bootstrap: Bootstrap,
    pub(crate) oob_mode: OobMode,
    pub(crate) seed: u64,
}

impl ForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, ForestError> {
        if n_trees == 0 {
            return Err(ForestError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            mtry: Mtry::Sqrt,
            node_size: 5,
            min_loss_delta: 0.0,
            flambda: 1.0,
            lens: None,
            max_depth: None,
            bootstrap: Bootstrap::Multinomial,
            oob_mode: OobMode::Disabled,
            seed: 42,
        })
    }

    // --- Setters ---

    /// Set the number of covariate groups sampled per split.
    #[must_use]
    pub fn with_mtry(mut self, mtry: Mtry) -> Self {
        self.mtry = mtry;
        self
    }

    /// Set the minimum in-bag weight on each side of a split.
    #[must_use]
    pub fn with_node_size(mut self, node_size: usize) -> Self {
        self.node_size = node_size;
        self
    }

    /// Set the loss decrease a split must strictly exceed.
    #[must_use]
    pub fn with_min_loss_delta(mut self, min_loss_delta: f64) -> Self {
        self.min_loss_delta = min_loss_delta;
        self
    }

    /// Set the functional splitting weight.
    ///
    /// `0.0` splits functional groups on a single column; large values give
    /// near-random projections.
    #[must_use]
    pub fn with_flambda(mut self, flambda: f64) -> Self {
        self.flambda = flambda;
        self
    }

    /// Set the covariate group lengths; they must sum to the column count.
    #[must_use]
    pub fn with_lens(mut self, lens: Vec<usize>) -> Self {
        self.lens = Some(lens);
        self
    }

    /// Set the maximum tree depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the per-tree resampling scheme.
    #[must_use]
    pub fn with_bootstrap(mut self, bootstrap: Bootstrap) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set the OOB mode.
    #[must_use]
    pub fn with_oob_mode(mut self, oob_mode: OobMode) -> Self {
        self.oob_mode = oob_mode;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the mtry strategy.
    #[must_use]
    pub fn mtry(&self) -> Mtry {
        self.mtry
    }

    /// Return the minimum in-bag weight per side.
    #[must_use]
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    /// Return the minimum loss decrease.
    #[must_use]
    pub fn min_loss_delta(&self) -> f64 {
        self.min_loss_delta
    }

    /// Return the functional splitting weight.
    #[must_use]
    pub fn flambda(&self) -> f64 {
        self.flambda
    }

    /// Return the covariate group lengths, if set.
    #[must_use]
    pub fn lens(&self) -> Option<&[usize]> {
        self.lens.as_deref()
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the resampling scheme.
    #[must_use]
    pub fn bootstrap(&self) -> Bootstrap {
        self.bootstrap
    }

    /// Return the OOB mode.
    #[must_use]
    pub fn oob_mode(&self) -> OobMode {
        self.oob_mode
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a CDE forest.
    ///
    /// `covariates[sample_idx][feature_idx]` and
    /// `basis[sample_idx][coefficient_idx]`, both row-major. The basis rows
    /// are the responses evaluated in an orthonormal function system.
    ///
    /// # Errors
    ///
    /// | Variant                               | When                                       |
    /// |---------------------------------------|--------------------------------------------|
    /// | [`ForestError::EmptyDataset`]         | `covariates` is empty                      |
    /// | [`ForestError::SampleCountMismatch`]  | `covariates` and `basis` differ in length  |
    /// | [`ForestError::ZeroFeatures`]         | rows have zero covariate columns           |
    /// | [`ForestError::ZeroBasis`]            | rows have zero basis coefficients          |
    /// | [`ForestError::FeatureCountMismatch`] | covariate rows have inconsistent lengths   |
    /// | [`ForestError::BasisCountMismatch`]   | basis rows have inconsistent lengths       |
    /// | [`ForestError::NonFiniteValue`]       | a covariate is NaN or infinite             |
    /// | [`ForestError::NonFiniteBasis`]       | a coefficient is NaN or infinite           |
    /// | [`ForestError::InvalidLens`]          | `lens` does not partition the columns      |
    /// | [`ForestError::InvalidMtry`]          | resolved mtry is outside [1, n_groups]     |
    /// | [`ForestError::InvalidNodeSize`]      | `node_size` is zero                        |
    /// | [`ForestError::InvalidMinLossDelta`]  | `min_loss_delta` is negative or not finite |
    /// | [`ForestError::InvalidFlambda`]       | `flambda` is negative or not finite        |
    /// | [`ForestError::InvalidMaxDepth`]      | `max_depth` is `Some(0)`                   |
    pub fn fit(&self, covariates: &[Vec<f64>], basis: &[Vec<f64>]) -> Result<ForestFitResult, ForestError> {
        crate::forest::train(self, covariates, basis)
    }
}

#[cfg(test)]
mod tests {
    use super::{ForestConfig, Mtry, OobMode};
    use crate::bootstrap::Bootstrap;
    use crate::error::ForestError;

    #[test]
    fn zero_trees_rejected() {
        let err = ForestConfig::new(0).unwrap_err();
        assert!(matches!(err, ForestError::InvalidTreeCount { n_trees: 0 }));
    }

    #[test]
    fn defaults() {
        let config = ForestConfig::new(10).unwrap();
        assert_eq!(config.n_trees(), 10);
        assert_eq!(config.mtry(), Mtry::Sqrt);
        assert_eq!(config.node_size(), 5);
        assert_eq!(config.bootstrap(), Bootstrap::Multinomial);
        assert_eq!(config.oob_mode(), OobMode::Disabled);
        assert!(config.lens().is_none());
        assert_eq!(config.seed(), 42);
    }

    #[test]
    fn setters_chain() {
        let config = ForestConfig::new(3)
            .unwrap()
            .with_mtry(Mtry::Fixed(2))
            .with_node_size(1)
            .with_min_loss_delta(0.5)
            .with_flambda(2.0)
            .with_lens(vec![1, 2])
            .with_max_depth(Some(4))
            .with_bootstrap(Bootstrap::Poisson)
            .with_oob_mode(OobMode::Enabled)
            .with_seed(7);
        assert_eq!(config.mtry(), Mtry::Fixed(2));
        assert_eq!(config.node_size(), 1);
        assert!((config.min_loss_delta() - 0.5).abs() < f64::EPSILON);
        assert!((config.flambda() - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.lens(), Some(&[1, 2][..]));
        assert_eq!(config.max_depth(), Some(4));
        assert_eq!(config.bootstrap(), Bootstrap::Poisson);
        assert_eq!(config.oob_mode(), OobMode::Enabled);
        assert_eq!(config.seed(), 7);
    }

    // --- Mtry resolution ---

    #[test]
    fn mtry_resolves_over_groups() {
        assert_eq!(Mtry::Sqrt.resolve(10).unwrap(), 4);
        assert_eq!(Mtry::Log2.resolve(8).unwrap(), 3);
        assert_eq!(Mtry::Log2.resolve(1).unwrap(), 1);
        assert_eq!(Mtry::Fraction(0.5).resolve(5).unwrap(), 3);
        assert_eq!(Mtry::Fixed(2).resolve(3).unwrap(), 2);
        assert_eq!(Mtry::All.resolve(6).unwrap(), 6);
    }

    #[test]
    fn mtry_out_of_range_is_not_clamped() {
        let err = Mtry::Fixed(5).resolve(3).unwrap_err();
        assert!(matches!(err, ForestError::InvalidMtry { mtry: 5, n_groups: 3 }));
        assert!(Mtry::Fixed(0).resolve(3).is_err());
        assert!(Mtry::Fraction(0.0).resolve(3).is_err());
        assert!(Mtry::Fraction(f64::NAN).resolve(3).is_err());
    }
}
