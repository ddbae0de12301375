use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    ForestError,
    bootstrap::{BootstrapSample, Resampler},
    dataset::{FeatureLayout, TrainingSet},
    node::{Loss, Node, NodeIndex, SplitRule},
    split::{SortKey, SplitContext, cde_loss, find_best_split},
};

/// Configuration for a single CDE tree grown on all observations.
///
/// Construct via [`CdeTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter        | Default                 |
/// |------------------|-------------------------|
/// | `node_size`      | 5                       |
/// | `mtry`           | `None` (all groups)     |
/// | `min_loss_delta` | 0.0                     |
/// | `flambda`        | 1.0                     |
/// | `max_depth`      | `None` (unlimited)      |
/// | `lens`           | `None` (all scalar)     |
/// | `seed`           | 42                      |
#[derive(Debug, Clone)]
pub struct CdeTreeConfig {
    pub(crate) node_size: usize,
    pub(crate) mtry: Option<usize>,
    pub(crate) min_loss_delta: f64,
    pub(crate) flambda: f64,
    pub(crate) max_depth: Option<usize>,
    pub(crate) lens: Option<Vec<usize>>,
    pub(crate) seed: u64,
}

impl CdeTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            node_size: 5,
            mtry: None,
            min_loss_delta: 0.0,
            flambda: 1.0,
            max_depth: None,
            lens: None,
            seed: 42,
        }
    }

    /// Set the minimum in-bag weight on each side of a split.
    #[must_use]
    pub fn with_node_size(mut self, node_size: usize) -> Self {
        self.node_size = node_size;
        self
    }

    /// Set the number of covariate groups sampled per split.
    ///
    /// `None` means evaluate every group.
    #[must_use]
    pub fn with_mtry(mut self, mtry: Option<usize>) -> Self {
        self.mtry = mtry;
        self
    }

    /// Set the loss decrease a split must exceed to be accepted.
    #[must_use]
    pub fn with_min_loss_delta(mut self, min_loss_delta: f64) -> Self {
        self.min_loss_delta = min_loss_delta;
        self
    }

    /// Set the functional splitting weight.
    #[must_use]
    pub fn with_flambda(mut self, flambda: f64) -> Self {
        self.flambda = flambda;
        self
    }

    /// Set the maximum tree depth (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the covariate group lengths.
    #[must_use]
    pub fn with_lens(mut self, lens: Vec<usize>) -> Self {
        self.lens = Some(lens);
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the minimum in-bag weight per side.
    #[must_use]
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    /// Return the number of groups sampled per split, if set.
    #[must_use]
    pub fn mtry(&self) -> Option<usize> {
        self.mtry
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

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Grow a tree on every observation, each with weight 1.
    ///
    /// `covariates[sample_idx][feature_idx]` and
    /// `basis[sample_idx][coefficient_idx]`, both row-major.
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
    /// | [`ForestError::InvalidMtry`]          | `mtry` is outside [1, n_groups]            |
    /// | [`ForestError::InvalidNodeSize`]      | `node_size` is zero                        |
    /// | [`ForestError::InvalidMinLossDelta`]  | `min_loss_delta` is negative or not finite |
    /// | [`ForestError::InvalidFlambda`]       | `flambda` is negative or not finite        |
    /// | [`ForestError::InvalidMaxDepth`]      | `max_depth` is `Some(0)`                   |
    #[instrument(skip(self, covariates, basis), fields(n_samples = covariates.len()))]
    pub fn fit(&self, covariates: &[Vec<f64>], basis: &[Vec<f64>]) -> Result<CdeTree, ForestError> {
        let data = TrainingSet::new(covariates, basis)?;
        let layout = match &self.lens {
            Some(lens) => FeatureLayout::from_lens(lens, data.n_features())?,
            None => FeatureLayout::scalar(data.n_features()),
        };
        let mtry = self.mtry.unwrap_or(layout.n_groups());
        let params = GrowParams::validated(
            mtry,
            layout.n_groups(),
            self.node_size,
            self.min_loss_delta,
            self.flambda,
            self.max_depth,
        )?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let bootstrap = BootstrapSample::draw(data.n_samples(), &Resampler::Disabled, &mut rng);
        Ok(grow(&data, &layout, &params, bootstrap, &mut rng))
    }
}

impl Default for CdeTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated growth parameters shared by every tree of a forest.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GrowParams {
    pub(crate) mtry: usize,
    pub(crate) node_size: usize,
    pub(crate) min_loss_delta: f64,
    pub(crate) flambda: f64,
    pub(crate) max_depth: Option<usize>,
}

impl GrowParams {
    pub(crate) fn validated(
        mtry: usize,
        n_groups: usize,
        node_size: usize,
        min_loss_delta: f64,
        flambda: f64,
        max_depth: Option<usize>,
    ) -> Result<Self, ForestError> {
        if node_size == 0 {
            return Err(ForestError::InvalidNodeSize { node_size });
        }
        if mtry == 0 || mtry > n_groups {
            return Err(ForestError::InvalidMtry { mtry, n_groups });
        }
        if !min_loss_delta.is_finite() || min_loss_delta < 0.0 {
            return Err(ForestError::InvalidMinLossDelta { min_loss_delta });
        }
        if !flambda.is_finite() || flambda < 0.0 {
            return Err(ForestError::InvalidFlambda { flambda });
        }
        if max_depth == Some(0) {
            return Err(ForestError::InvalidMaxDepth { max_depth: 0 });
        }
        Ok(Self {
            mtry,
            node_size,
            min_loss_delta,
            flambda,
            max_depth,
        })
    }
}

/// Grow one tree from a bootstrap sample.
pub(crate) fn grow(
    data: &TrainingSet,
    layout: &FeatureLayout,
    params: &GrowParams,
    bootstrap: BootstrapSample,
    rng: &mut ChaCha8Rng,
) -> CdeTree {
    let ctx = SplitContext {
        data,
        layout,
        counts: bootstrap.counts(),
        mtry: params.mtry,
        node_size: params.node_size,
        min_loss_delta: params.min_loss_delta,
        flambda: params.flambda,
    };

    let mut samples = bootstrap.in_bag_indices();
    let mut arena: Vec<Node> = Vec::new();
    build_tree(
        &ctx,
        &mut samples,
        SortKey::Unsorted,
        0,
        params.max_depth,
        rng,
        &mut arena,
    );

    debug!(
        n_in_bag = samples.len(),
        n_oob = bootstrap.oob_indices().len(),
        n_nodes = arena.len(),
        "CDE tree grown"
    );

    CdeTree {
        nodes: arena,
        n_features: data.n_features(),
        layout: layout.clone(),
        bootstrap,
    }
}

/// Recursively build the arena-based tree.
///
/// `samples` is exclusively owned by this subtree; children receive the
/// two disjoint halves of it.
fn build_tree(
    ctx: &SplitContext<'_>,
    samples: &mut [usize],
    mut sorted_by: SortKey,
    depth: usize,
    max_depth: Option<usize>,
    rng: &mut ChaCha8Rng,
    arena: &mut Vec<Node>,
) -> NodeIndex {
    let (weight, sum) = ctx.node_totals(samples);
    let loss = Loss::new(cde_loss(&sum, weight));

    let depth_exceeded = max_depth.is_some_and(|max_d| depth >= max_d);
    let split = if depth_exceeded {
        None
    } else {
        find_best_split(ctx, samples, &mut sorted_by, weight, &sum, rng)
    };

    let Some(split) = split else {
        let mut leaf_samples = samples.to_vec();
        leaf_samples.sort_unstable();
        let idx = arena.len();
        arena.push(Node::Leaf {
            samples: leaf_samples,
            weight,
            loss,
        });
        return NodeIndex::new(idx);
    };

    // Arena pattern: reserve index, recurse, then overwrite with the split.
    let node_idx = arena.len();
    arena.push(Node::Leaf {
        samples: Vec::new(),
        weight,
        loss,
    });

    let (left_samples, right_samples) = samples.split_at_mut(split.n_left);
    let left = build_tree(ctx, left_samples, sorted_by, depth + 1, max_depth, rng, arena);
    let right = build_tree(ctx, right_samples, sorted_by, depth + 1, max_depth, rng, arena);

    arena[node_idx] = Node::Split {
        rule: split.rule,
        left,
        right,
        weight,
        loss,
        loss_decrease: split.loss_decrease,
    };

    NodeIndex::new(node_idx)
}

/// Leaf reached by a query.
#[derive(Debug, Clone, Copy)]
pub struct LeafRef<'a> {
    /// Arena index of the leaf.
    pub index: NodeIndex,
    /// Distinct in-bag training indices in the leaf, ascending.
    pub samples: &'a [usize],
    /// Sum of in-bag multiplicities of `samples`.
    pub weight: usize,
}

/// A fitted CDE tree.
///
/// Stored as an arena-based `Vec<Node>` with index references; the root is
/// at index 0.
#[derive(Debug, Clone, PartialEq)]
pub struct CdeTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) layout: FeatureLayout,
    pub(crate) bootstrap: BootstrapSample,
}

impl CdeTree {
    /// Locate the leaf a covariate vector falls into.
    ///
    /// Traverses from the root: at each split, goes left when the rule's
    /// key is `<= threshold`, right otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::DimensionMismatch`] when `x.len() != n_features`.
    pub fn locate_leaf(&self, x: &[f64]) -> Result<LeafRef<'_>, ForestError> {
        self.check_dimension(x)?;
        Ok(self.leaf_of(x))
    }

    /// Add this tree's normalized leaf memberships for `x` into `out`.
    ///
    /// Each member `j` of the leaf receives `scale * count_j / leaf_weight`,
    /// so the tree adds exactly `scale` in total.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::DimensionMismatch`] | `x.len() != n_features` |
    /// | [`ForestError::WeightBufferTooShort`] | `out` is shorter than the training set |
    pub fn accumulate_weights(&self, x: &[f64], scale: f64, out: &mut [f64]) -> Result<(), ForestError> {
        self.check_dimension(x)?;
        let n_samples = self.bootstrap.counts().len();
        if out.len() < n_samples {
            return Err(ForestError::WeightBufferTooShort {
                expected: n_samples,
                got: out.len(),
            });
        }
        self.add_leaf_weights(self.leaf_of(x), scale, out);
        Ok(())
    }

    pub(crate) fn add_leaf_weights(&self, leaf: LeafRef<'_>, scale: f64, out: &mut [f64]) {
        let total = leaf.weight as f64;
        for &j in leaf.samples {
            out[j] += scale * f64::from(self.bootstrap.count(j)) / total;
        }
    }

    /// Leaf lookup without the dimension check.
    pub(crate) fn leaf_of(&self, x: &[f64]) -> LeafRef<'_> {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf {
                    samples, weight, ..
                } => {
                    return LeafRef {
                        index: NodeIndex::new(idx),
                        samples,
                        weight: *weight,
                    };
                }
                Node::Split {
                    rule, left, right, ..
                } => {
                    idx = if rule.goes_left(x) {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }

    fn check_dimension(&self, x: &[f64]) -> Result<(), ForestError> {
        if x.len() != self.n_features {
            return Err(ForestError::DimensionMismatch {
                expected: self.n_features,
                got: x.len(),
            });
        }
        Ok(())
    }

    /// Borrow the node arena (root at index 0).
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Borrow this tree's bootstrap sample.
    #[must_use]
    pub fn bootstrap(&self) -> &BootstrapSample {
        &self.bootstrap
    }

    /// Return the number of covariate columns the tree was grown on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of covariate groups the tree splits on.
    #[must_use]
    pub fn n_groups(&self) -> usize {
        self.layout.n_groups()
    }

    /// Total loss decrease achieved by splits on each covariate group.
    ///
    /// Length `n_groups`; groups never split on are `0.0`.
    #[must_use]
    pub fn loss_decreases(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.layout.n_groups()];
        for node in &self.nodes {
            if let Node::Split {
                rule,
                loss_decrease,
                ..
            } = node
            {
                let group = match rule {
                    SplitRule::Axis { feature, .. } => self.layout.group_of(feature.index()),
                    SplitRule::Projection { group, .. } => Some(*group),
                };
                if let Some(g) = group {
                    totals[g] += loss_decrease;
                }
            }
        }
        totals
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut max_depth = 0usize;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((node_idx, d)) = stack.pop() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((left.index(), d + 1));
                    stack.push((right.index(), d + 1));
                }
            }
        }
        max_depth
    }

    /// Collect the training indices of every leaf below `node`, ascending.
    #[must_use]
    pub fn samples_under(&self, node: NodeIndex) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![node.index()];
        while let Some(idx) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { samples, .. } => out.extend_from_slice(samples),
                Node::Split { left, right, .. } => {
                    stack.push(left.index());
                    stack.push(right.index());
                }
            }
        }
        out.sort_unstable();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    /// Basis with a constant and the raw response.
    fn basis_for(responses: &[f64]) -> Vec<Vec<f64>> {
        responses.iter().map(|&z| vec![1.0, z]).collect()
    }

    /// 40 points on a line; response jumps at x = 2.
    fn step_data() -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let covariates: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64 * 0.1, (i % 7) as f64]).collect();
        let responses: Vec<f64> = covariates
            .iter()
            .map(|x| if x[0] < 2.0 { -1.0 } else { 1.0 })
            .collect();
        (covariates, basis_for(&responses))
    }

    #[test]
    fn empty_dataset_error() {
        let err = CdeTreeConfig::new().fit(&[], &[]).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
    }

    #[test]
    fn zero_node_size_error() {
        let (x, z) = step_data();
        let err = CdeTreeConfig::new().with_node_size(0).fit(&x, &z).unwrap_err();
        assert!(matches!(err, ForestError::InvalidNodeSize { node_size: 0 }));
    }

    #[test]
    fn mtry_above_group_count_error() {
        let (x, z) = step_data();
        let err = CdeTreeConfig::new().with_mtry(Some(3)).fit(&x, &z).unwrap_err();
        assert!(matches!(err, ForestError::InvalidMtry { mtry: 3, n_groups: 2 }));
    }

    #[test]
    fn zero_max_depth_error() {
        let (x, z) = step_data();
        let err = CdeTreeConfig::new().with_max_depth(Some(0)).fit(&x, &z).unwrap_err();
        assert!(matches!(err, ForestError::InvalidMaxDepth { .. }));
    }

    #[test]
    fn step_is_found_at_root() {
        let (x, z) = step_data();
        let tree = CdeTreeConfig::new().with_node_size(2).fit(&x, &z).unwrap();
        match &tree.nodes()[0] {
            Node::Split {
                rule: SplitRule::Axis { feature, threshold },
                ..
            } => {
                assert_eq!(feature.index(), 0);
                assert!(*threshold >= 1.9 - 1e-9 && *threshold < 2.0);
            }
            other => panic!("expected axis split at root, got {other:?}"),
        }
    }

    #[test]
    fn children_partition_parent() {
        let (x, z) = step_data();
        let tree = CdeTreeConfig::new().with_node_size(1).fit(&x, &z).unwrap();

        let all = tree.samples_under(NodeIndex::new(0));
        assert_eq!(all, (0..40).collect::<Vec<_>>());

        for (idx, node) in tree.nodes().iter().enumerate() {
            if let Node::Split { left, right, .. } = node {
                let parent = tree.samples_under(NodeIndex::new(idx));
                let l = tree.samples_under(*left);
                let r = tree.samples_under(*right);
                assert!(!l.is_empty() && !r.is_empty());
                assert!(l.iter().all(|i| r.binary_search(i).is_err()));
                let mut union = [l, r].concat();
                union.sort_unstable();
                assert_eq!(union, parent);
            }
        }
    }

    #[test]
    fn leaves_respect_node_size() {
        let (x, z) = step_data();
        for node_size in [1, 3, 8] {
            let tree = CdeTreeConfig::new().with_node_size(node_size).fit(&x, &z).unwrap();
            for node in tree.nodes() {
                if let Node::Leaf { weight, .. } = node {
                    assert!(*weight >= node_size, "leaf weight {weight} < {node_size}");
                }
            }
        }
    }

    #[test]
    fn large_node_size_forces_single_leaf() {
        let (x, z) = step_data();
        // 40 < 2 * 21, so the root cannot split.
        let tree = CdeTreeConfig::new().with_node_size(21).fit(&x, &z).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn two_points_split_once() {
        let x = vec![vec![0.0], vec![10.0]];
        let z = basis_for(&[-1.0, 1.0]);
        let tree = CdeTreeConfig::new()
            .with_node_size(1)
            .with_mtry(Some(1))
            .fit(&x, &z)
            .unwrap();
        assert_eq!(tree.n_nodes(), 3);
        assert_eq!(tree.n_leaves(), 2);

        let left = tree.locate_leaf(&[0.0]).unwrap();
        assert_eq!(left.samples, &[0]);
        let right = tree.locate_leaf(&[10.0]).unwrap();
        assert_eq!(right.samples, &[1]);
    }

    #[test]
    fn accumulate_weights_sums_to_scale() {
        let (x, z) = step_data();
        let tree = CdeTreeConfig::new().with_node_size(4).fit(&x, &z).unwrap();
        let mut out = vec![0.0; x.len()];
        tree.accumulate_weights(&[0.35, 2.0], 0.5, &mut out).unwrap();
        let total: f64 = out.iter().sum();
        assert!((total - 0.5).abs() < 1e-12);
        assert!(out.iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn accumulate_weights_short_buffer_error() {
        let (x, z) = step_data();
        let tree = CdeTreeConfig::new().with_node_size(4).fit(&x, &z).unwrap();
        let mut out = vec![0.0; x.len() - 1];
        let err = tree.accumulate_weights(&[0.35, 2.0], 1.0, &mut out).unwrap_err();
        assert!(matches!(
            err,
            ForestError::WeightBufferTooShort { expected: 40, got: 39 }
        ));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(out.iter().all(|&w| w == 0.0));
    }

    #[test]
    fn max_node_size_forces_single_leaf() {
        let (x, z) = step_data();
        let tree = CdeTreeConfig::new().with_node_size(usize::MAX).fit(&x, &z).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.n_leaves(), 1);
    }

    #[test]
    fn loss_decreases_credit_split_group() {
        let (x, z) = step_data();
        let tree = CdeTreeConfig::new()
            .with_node_size(2)
            .with_max_depth(Some(1))
            .fit(&x, &z)
            .unwrap();
        let decreases = tree.loss_decreases();
        assert_eq!(decreases.len(), 2);
        // Perfect split: parent loss -40, children -80.
        assert!((decreases[0] - 40.0).abs() < 1e-9);
        assert_eq!(decreases[1], 0.0);
    }

    #[test]
    fn max_depth_limits_tree() {
        let (x, z) = step_data();
        let tree = CdeTreeConfig::new()
            .with_node_size(1)
            .with_max_depth(Some(1))
            .fit(&x, &z)
            .unwrap();
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (x, z) = step_data();
        let config = CdeTreeConfig::new().with_node_size(2).with_mtry(Some(1)).with_seed(123);
        let tree1 = config.fit(&x, &z).unwrap();
        let tree2 = config.fit(&x, &z).unwrap();
        assert_eq!(tree1, tree2);
    }

    #[test]
    fn query_dimension_mismatch() {
        let (x, z) = step_data();
        let tree = CdeTreeConfig::new().fit(&x, &z).unwrap();
        let err = tree.locate_leaf(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            ForestError::DimensionMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn scalar_lens_match_default_layout() {
        let (x, z) = step_data();
        let base = CdeTreeConfig::new().with_node_size(2).with_mtry(Some(1)).with_seed(5);
        let plain = base.clone().fit(&x, &z).unwrap();
        let with_lens = base.with_lens(vec![1, 1]).fit(&x, &z).unwrap();
        assert_eq!(plain, with_lens);
    }

    #[test]
    fn functional_group_tree_routes_training_points_to_own_leaf() {
        let (x, z) = step_data();
        let tree = CdeTreeConfig::new()
            .with_node_size(2)
            .with_lens(vec![2])
            .with_flambda(0.5)
            .fit(&x, &z)
            .unwrap();
        for (i, row) in x.iter().enumerate() {
            let leaf = tree.locate_leaf(row).unwrap();
            assert!(leaf.samples.contains(&i), "sample {i} not in its own leaf");
        }
    }
}
