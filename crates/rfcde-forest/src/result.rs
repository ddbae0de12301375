//! Training result types for the CDE forest.

use crate::dataset::{FeatureLayout, TrainingSet};
use crate::forest::CdeForest;
use crate::importance::RankedFeature;
use crate::tree::CdeTree;

/// Metadata about the training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingMetadata {
    /// Number of trees trained.
    pub n_trees: usize,
    /// Number of training observations.
    pub n_samples: usize,
    /// Number of covariate columns.
    pub n_features: usize,
    /// Number of covariate groups.
    pub n_groups: usize,
    /// Number of basis coefficients per observation.
    pub n_basis: usize,
    /// Resolved number of groups sampled per split.
    pub mtry_resolved: usize,
    /// Mean number of leaves per tree.
    pub mean_leaves: f64,
    /// Mean tree depth.
    pub mean_depth: f64,
    /// Mean fraction of observations left out of each tree's sample.
    pub mean_oob_fraction: f64,
}

impl TrainingMetadata {
    pub(crate) fn from_trees(
        trees: &[CdeTree],
        data: &TrainingSet,
        layout: &FeatureLayout,
        mtry_resolved: usize,
    ) -> Self {
        let n = trees.len().max(1) as f64;
        let n_samples = data.n_samples();
        let mean_leaves = trees.iter().map(|t| t.n_leaves() as f64).sum::<f64>() / n;
        let mean_depth = trees.iter().map(|t| t.depth() as f64).sum::<f64>() / n;
        let mean_oob_fraction = trees
            .iter()
            .map(|t| t.bootstrap().oob_indices().len() as f64 / n_samples as f64)
            .sum::<f64>()
            / n;
        Self {
            n_trees: trees.len(),
            n_samples,
            n_features: data.n_features(),
            n_groups: layout.n_groups(),
            n_basis: data.n_basis(),
            mtry_resolved,
            mean_leaves,
            mean_depth,
            mean_oob_fraction,
        }
    }
}

/// Result of CDE forest training.
///
/// Contains the fitted forest and training metadata.
#[derive(Debug)]
pub struct ForestFitResult {
    forest: CdeForest,
    metadata: TrainingMetadata,
}

impl ForestFitResult {
    /// Create a new training result.
    pub(crate) fn new(forest: CdeForest, metadata: TrainingMetadata) -> Self {
        Self { forest, metadata }
    }

    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &CdeForest {
        &self.forest
    }

    /// Consume the result and return the fitted forest.
    #[must_use]
    pub fn into_forest(self) -> CdeForest {
        self.forest
    }

    /// Return training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }

    /// Return the ranked covariate group importances.
    #[must_use]
    pub fn importances(&self) -> Vec<RankedFeature> {
        self.forest.feature_importances()
    }
}
