//! Loss-decrease importance of covariate groups.

use std::ops::Range;

use crate::dataset::FeatureLayout;
use crate::forest::CdeForest;

/// A ranked covariate group with its importance score.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFeature {
    /// Covariate group index.
    pub group: usize,
    /// Covariate columns spanned by the group.
    pub columns: Range<usize>,
    /// Normalized importance score (sums to 1.0 across groups when any
    /// tree split at all).
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

impl CdeForest {
    /// Rank covariate groups by their share of the total CDE loss decrease.
    ///
    /// Each tree's per-group decreases are normalized to sum to 1, then
    /// averaged over trees. Trees that never split contribute nothing.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<RankedFeature> {
        let per_tree: Vec<Vec<f64>> = self.trees.iter().map(|t| t.loss_decreases()).collect();
        aggregate_importances(&per_tree, &self.layout)
    }
}

/// Aggregate per-tree loss decreases into ranked groups.
///
/// Normalizes each tree, sums across trees, normalizes the totals to 1.0,
/// sorts descending (ties by group index) and assigns 1-based ranks.
pub(crate) fn aggregate_importances(per_tree: &[Vec<f64>], layout: &FeatureLayout) -> Vec<RankedFeature> {
    let n_groups = layout.n_groups();
    if per_tree.is_empty() || n_groups == 0 {
        return vec![];
    }

    let mut totals = vec![0.0f64; n_groups];
    for tree_dec in per_tree {
        let tree_sum: f64 = tree_dec.iter().sum();
        if tree_sum <= 0.0 {
            continue;
        }
        for (total, &val) in totals.iter_mut().zip(tree_dec) {
            *total += val / tree_sum;
        }
    }

    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }

    let mut ranked: Vec<RankedFeature> = totals
        .iter()
        .enumerate()
        .map(|(group, &importance)| RankedFeature {
            group,
            columns: layout.group(group),
            importance,
            rank: 0,
        })
        .collect();

    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance).then(a.group.cmp(&b.group)));
    for (i, feat) in ranked.iter_mut().enumerate() {
        feat.rank = i + 1;
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::aggregate_importances;
    use crate::config::{ForestConfig, Mtry};
    use crate::dataset::FeatureLayout;

    #[test]
    fn per_tree_normalization_then_ranking() {
        let layout = FeatureLayout::scalar(3);
        // Tree 1: all on group 2. Tree 2: split evenly between 0 and 2.
        let per_tree = vec![vec![0.0, 0.0, 10.0], vec![1.0, 0.0, 1.0]];
        let ranked = aggregate_importances(&per_tree, &layout);
        assert_eq!(ranked[0].group, 2);
        assert!((ranked[0].importance - 0.75).abs() < 1e-12);
        assert_eq!(ranked[1].group, 0);
        assert!((ranked[1].importance - 0.25).abs() < 1e-12);
        assert_eq!(ranked[2].group, 1);
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn no_splits_gives_zero_importances() {
        let layout = FeatureLayout::from_lens(&[2, 1], 3).unwrap();
        let ranked = aggregate_importances(&[vec![0.0, 0.0]], &layout);
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|f| f.importance == 0.0));
        assert_eq!(ranked[0].columns, 0..2);
    }

    #[test]
    fn informative_group_ranks_first() {
        let covariates: Vec<Vec<f64>> = (0..60).map(|i| vec![((i * 13) % 17) as f64, i as f64]).collect();
        let basis: Vec<Vec<f64>> = (0..60)
            .map(|i| vec![1.0, if i < 30 { 1.0 } else { -1.0 }])
            .collect();
        let result = ForestConfig::new(20)
            .unwrap()
            .with_mtry(Mtry::All)
            .fit(&covariates, &basis)
            .unwrap();
        let ranked = result.forest().feature_importances();
        assert_eq!(ranked[0].group, 1);
        assert_eq!(ranked[0].rank, 1);
        let total: f64 = ranked.iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-10, "total = {total}");
    }
}
