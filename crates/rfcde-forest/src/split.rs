//! Best-split search by incremental CDE-loss evaluation.
//!
//! For an orthonormal basis `φ`, the integrated squared error of a node's
//! density estimate is, up to a constant, `−‖Σ_i w_i φ(z_i)‖² / Σ_i w_i`.
//! Sorting a node's observations by a candidate key and sweeping prefix
//! sums of the weighted basis rows evaluates every cut in one pass.

use std::ops::Range;

use rand::Rng;
use rand_distr::StandardNormal;

use crate::dataset::{FeatureLayout, TrainingSet};
use crate::node::{FeatureIndex, SplitRule, project};

/// CDE loss of a set of observations from its weighted basis sum.
///
/// Returns `0.0` for an empty set.
#[must_use]
pub(crate) fn cde_loss(sum: &[f64], weight: usize) -> f64 {
    if weight == 0 {
        return 0.0;
    }
    -squared_norm(sum) / weight as f64
}

fn squared_norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}

/// Ordering currently held by a node's sample slice.
///
/// Children inherit the ordering of the winning split, so a child that
/// samples the same column again can sweep without sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SortKey {
    Unsorted,
    Column(usize),
}

/// Everything a split search reads but never writes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SplitContext<'a> {
    pub(crate) data: &'a TrainingSet,
    pub(crate) layout: &'a FeatureLayout,
    pub(crate) counts: &'a [u32],
    pub(crate) mtry: usize,
    pub(crate) node_size: usize,
    pub(crate) min_loss_delta: f64,
    pub(crate) flambda: f64,
}

impl SplitContext<'_> {
    /// In-bag weight and weighted basis sum of `samples`.
    pub(crate) fn node_totals(&self, samples: &[usize]) -> (usize, Vec<f64>) {
        let mut weight = 0usize;
        let mut sum = vec![0.0f64; self.data.n_basis()];
        for &i in samples {
            let c = self.counts[i];
            weight += c as usize;
            let c = f64::from(c);
            for (acc, &z) in sum.iter_mut().zip(&self.data.basis[i]) {
                *acc += c * z;
            }
        }
        (weight, sum)
    }
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Rule to install in the node.
    pub(crate) rule: SplitRule,
    /// Number of distinct samples at the front of the slice that go left.
    pub(crate) n_left: usize,
    /// In-bag weight of the left child.
    pub(crate) left_weight: usize,
    /// In-bag weight of the right child.
    pub(crate) right_weight: usize,
    /// Parent loss minus the loss of the split.
    pub(crate) loss_decrease: f64,
}

/// Best cut of one ordering.
#[derive(Debug, Clone, Copy)]
struct Cut {
    /// Position of the last left sample in the sorted slice.
    offset: usize,
    loss: f64,
    left_weight: usize,
    right_weight: usize,
}

/// Best cut across the sampled groups.
#[derive(Debug, Clone)]
struct Candidate {
    group: usize,
    direction: Option<Vec<f64>>,
    threshold: f64,
    cut: Cut,
}

/// Find the best split among `mtry` randomly chosen covariate groups.
///
/// `samples` holds the node's distinct in-bag indices. On success it is
/// left sorted by the winning key, so the first `n_left` entries form the
/// left child. On `None` the node should become a leaf.
///
/// Returns `None` when the node weight is below `2 * node_size`, when no
/// sampled group has a valid cut, or when the best loss decrease does not
/// exceed `min_loss_delta`.
pub(crate) fn find_best_split(
    ctx: &SplitContext<'_>,
    samples: &mut [usize],
    sorted_by: &mut SortKey,
    weight: usize,
    sum: &[f64],
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_groups = ctx.layout.n_groups();
    if samples.len() < 2 || n_groups == 0 || weight < ctx.node_size.saturating_mul(2) {
        return None;
    }
    let parent_loss = cde_loss(sum, weight);

    // Partial Fisher-Yates: shuffle only the first `mtry` positions.
    let mut group_order: Vec<usize> = (0..n_groups).collect();
    let take = ctx.mtry.min(n_groups);
    for i in 0..take {
        let j = rng.gen_range(i..n_groups);
        group_order.swap(i, j);
    }

    let mut keys = Vec::with_capacity(samples.len());
    let mut best: Option<Candidate> = None;

    for &group in &group_order[..take] {
        let columns = ctx.layout.group(group);
        let direction = (columns.len() > 1).then(|| draw_direction(columns.len(), ctx.flambda, rng));

        order_by(ctx, samples, sorted_by, &columns, direction.as_deref(), &mut keys);

        let Some(cut) = sweep(ctx, samples, &keys, weight, sum) else {
            continue;
        };
        if best.as_ref().is_none_or(|b| cut.loss < b.cut.loss) {
            best = Some(Candidate {
                group,
                direction,
                threshold: keys[cut.offset],
                cut,
            });
        }
    }

    let best = best?;
    let loss_decrease = parent_loss - best.cut.loss;
    if loss_decrease <= ctx.min_loss_delta {
        return None;
    }

    // Restore the winning order so the children are contiguous.
    let columns = ctx.layout.group(best.group);
    order_by(ctx, samples, sorted_by, &columns, best.direction.as_deref(), &mut keys);

    let rule = match best.direction {
        None => SplitRule::Axis {
            feature: FeatureIndex::new(columns.start),
            threshold: best.threshold,
        },
        Some(direction) => SplitRule::Projection {
            group: best.group,
            columns,
            direction,
            threshold: best.threshold,
        },
    };

    Some(SplitResult {
        rule,
        n_left: best.cut.offset + 1,
        left_weight: best.cut.left_weight,
        right_weight: best.cut.right_weight,
        loss_decrease,
    })
}

/// Draw a unit direction for a functional group of `len` columns.
///
/// The direction is `normalize(e_k + flambda · g)` with `e_k` a uniformly
/// chosen axis and `g` a unit-normalized standard-normal vector.
pub(crate) fn draw_direction(len: usize, flambda: f64, rng: &mut impl Rng) -> Vec<f64> {
    let axis = rng.gen_range(0..len);
    let noise: Vec<f64> = (0..len).map(|_| rng.sample::<f64, _>(StandardNormal)).collect();
    let noise_norm = squared_norm(&noise).sqrt();

    let mut direction = vec![0.0; len];
    direction[axis] = 1.0;
    if noise_norm > 0.0 {
        for (d, g) in direction.iter_mut().zip(&noise) {
            *d += flambda * g / noise_norm;
        }
    }

    let norm = squared_norm(&direction).sqrt();
    if norm > 0.0 {
        direction.iter_mut().for_each(|d| *d /= norm);
    } else {
        direction.iter_mut().for_each(|d| *d = 0.0);
        direction[axis] = 1.0;
    }
    direction
}

/// Sort `samples` by (key, index) and write the sorted keys into `keys`.
fn order_by(
    ctx: &SplitContext<'_>,
    samples: &mut [usize],
    sorted_by: &mut SortKey,
    columns: &Range<usize>,
    direction: Option<&[f64]>,
    keys: &mut Vec<f64>,
) {
    keys.clear();
    match direction {
        None => {
            let col = columns.start;
            let column = &ctx.data.columns[col];
            if *sorted_by != SortKey::Column(col) {
                samples.sort_unstable_by(|&a, &b| column[a].total_cmp(&column[b]).then(a.cmp(&b)));
                *sorted_by = SortKey::Column(col);
            }
            keys.extend(samples.iter().map(|&i| column[i]));
        }
        Some(direction) => {
            let group_columns = &ctx.data.columns[columns.clone()];
            let mut sorted: Vec<(f64, usize)> = samples
                .iter()
                .map(|&i| (project(direction, |j| group_columns[j][i]), i))
                .collect();
            sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            for (slot, &(key, i)) in samples.iter_mut().zip(&sorted) {
                *slot = i;
                keys.push(key);
            }
            *sorted_by = SortKey::Unsorted;
        }
    }
}

/// Sweep one ordering and return its lowest-loss valid cut.
///
/// A cut after position `i` is valid when the keys on either side differ
/// and both sides carry at least `node_size` in-bag weight.
fn sweep(
    ctx: &SplitContext<'_>,
    samples: &[usize],
    keys: &[f64],
    total_weight: usize,
    total_sum: &[f64],
) -> Option<Cut> {
    let mut left_sum = vec![0.0f64; total_sum.len()];
    let mut left_weight = 0usize;
    let mut best: Option<Cut> = None;

    for pos in 0..samples.len() - 1 {
        let i = samples[pos];
        let c = ctx.counts[i];
        left_weight += c as usize;
        let c = f64::from(c);
        for (acc, &z) in left_sum.iter_mut().zip(&ctx.data.basis[i]) {
            *acc += c * z;
        }

        let right_weight = total_weight - left_weight;
        if right_weight < ctx.node_size {
            break;
        }
        if left_weight < ctx.node_size || keys[pos] == keys[pos + 1] {
            continue;
        }

        let mut left_sq = 0.0;
        let mut right_sq = 0.0;
        for (&l, &t) in left_sum.iter().zip(total_sum) {
            let r = t - l;
            left_sq += l * l;
            right_sq += r * r;
        }
        let loss = -(left_sq / left_weight as f64 + right_sq / right_weight as f64);

        if best.is_none_or(|b| loss < b.loss) {
            best = Some(Cut {
                offset: pos,
                loss,
                left_weight,
                right_weight,
            });
        }
    }

    best
}
