use std::fmt;
use std::ops::Range;

/// Zero-based covariate column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based column position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a `Vec<Node>` arena, identifying a specific node in a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a new node index from a zero-based arena position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// CDE loss of a node or candidate split.
///
/// Always `<= 0`; lower is better.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Loss(f64);

impl Loss {
    /// Create a new loss value.
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw loss value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// Rule routing an observation to the left or right child.
///
/// Observations whose key is `<= threshold` go left.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitRule {
    /// Compare a single covariate column.
    Axis {
        /// Covariate column compared against the threshold.
        feature: FeatureIndex,
        /// Largest key routed left.
        threshold: f64,
    },
    /// Compare the projection of a functional covariate group.
    Projection {
        /// Covariate group index.
        group: usize,
        /// Columns spanned by the group.
        columns: Range<usize>,
        /// Unit direction, one entry per column in `columns`.
        direction: Vec<f64>,
        /// Largest key routed left.
        threshold: f64,
    },
}

impl SplitRule {
    /// Return the threshold of this rule.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        match self {
            SplitRule::Axis { threshold, .. } | SplitRule::Projection { threshold, .. } => {
                *threshold
            }
        }
    }

    /// Return the split key of a full covariate vector.
    #[must_use]
    pub fn key(&self, x: &[f64]) -> f64 {
        match self {
            SplitRule::Axis { feature, .. } => x[feature.index()],
            SplitRule::Projection {
                columns, direction, ..
            } => project(direction, |j| x[columns.start + j]),
        }
    }

    /// Return `true` if `x` is routed to the left child.
    #[must_use]
    pub fn goes_left(&self, x: &[f64]) -> bool {
        self.key(x) <= self.threshold()
    }
}

/// Signed projection `Σ_j direction[j] · value(j)`.
///
/// Shared by training and lookup so both sum in the same order and produce
/// bit-identical keys.
pub(crate) fn project(direction: &[f64], value: impl Fn(usize) -> f64) -> f64 {
    direction
        .iter()
        .enumerate()
        .fold(0.0, |acc, (j, &w)| acc + w * value(j))
}

/// A node in a tree arena.
///
/// Trees are stored as `Vec<Node>` where children are referenced by
/// [`NodeIndex`] rather than pointers.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// An interior split node.
    Split {
        /// Rule routing observations to the children.
        rule: SplitRule,
        /// Index of the left child node.
        left: NodeIndex,
        /// Index of the right child node.
        right: NodeIndex,
        /// In-bag weight that reached this node.
        weight: usize,
        /// Loss at this node before splitting.
        loss: Loss,
        /// Loss reduction achieved by the split.
        loss_decrease: f64,
    },
    /// A terminal leaf node.
    Leaf {
        /// Distinct in-bag training indices, ascending.
        samples: Vec<usize>,
        /// Sum of in-bag multiplicities of `samples`.
        weight: usize,
        /// Loss of the leaf.
        loss: Loss,
    },
}

impl Node {
    /// Return the loss at this node.
    #[must_use]
    pub fn loss(&self) -> Loss {
        match self {
            Node::Split { loss, .. } | Node::Leaf { loss, .. } => *loss,
        }
    }

    /// Return the in-bag weight that reached this node.
    #[must_use]
    pub fn weight(&self) -> usize {
        match self {
            Node::Split { weight, .. } | Node::Leaf { weight, .. } => *weight,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::{FeatureIndex, Loss, Node, NodeIndex, SplitRule, project};

    #[test]
    fn feature_index_roundtrip() {
        let fi = FeatureIndex::new(7);
        assert_eq!(fi.index(), 7);
        assert_eq!(format!("{fi}"), "7");
    }

    #[test]
    fn node_index_ordering() {
        let a = NodeIndex::new(10);
        let b = NodeIndex::new(20);
        assert!(a < b);
        assert_eq!(format!("{a}"), "10");
    }

    #[test]
    fn loss_display() {
        assert_eq!(format!("{}", Loss::new(-1.5)), "-1.500000");
    }

    #[test]
    fn axis_rule_ties_go_left() {
        let rule = SplitRule::Axis {
            feature: FeatureIndex::new(1),
            threshold: 2.0,
        };
        assert!(rule.goes_left(&[9.0, 2.0]));
        assert!(!rule.goes_left(&[9.0, 2.5]));
    }

    #[test]
    fn projection_rule_uses_group_columns() {
        let rule = SplitRule::Projection {
            group: 1,
            columns: 1..3,
            direction: vec![0.6, 0.8],
            threshold: 1.0,
        };
        // key = 0.6 * 1.0 + 0.8 * 0.5 = 1.0
        assert!((rule.key(&[100.0, 1.0, 0.5]) - 1.0).abs() < 1e-12);
        assert!(!rule.goes_left(&[0.0, 1.0, 1.0]));
        assert!(rule.goes_left(&[0.0, 0.0, 0.0]));
    }

    #[test]
    fn project_matches_dot_product() {
        let value = project(&[1.0, -2.0, 0.5], |j| [3.0, 1.0, 4.0][j]);
        assert!((value - 3.0).abs() < 1e-12);
    }

    #[test]
    fn node_accessors() {
        let leaf = Node::Leaf {
            samples: vec![0, 3],
            weight: 3,
            loss: Loss::new(-0.25),
        };
        assert!(leaf.is_leaf());
        assert_eq!(leaf.weight(), 3);

        let split = Node::Split {
            rule: SplitRule::Axis {
                feature: FeatureIndex::new(0),
                threshold: 0.5,
            },
            left: NodeIndex::new(1),
            right: NodeIndex::new(2),
            weight: 10,
            loss: Loss::new(-1.0),
            loss_decrease: 0.2,
        };
        assert!(!split.is_leaf());
        assert_eq!(split.weight(), 10);
        assert!((split.loss().value() + 1.0).abs() < f64::EPSILON);
    }
}
