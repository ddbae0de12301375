//! Random forests for conditional density estimation.
//!
//! Trees are grown with a CDE loss computed on orthonormal basis
//! coefficients of the response, so splits are chosen to sharpen the whole
//! conditional density rather than its mean. A fitted [`CdeForest`] turns
//! leaf co-membership into observation weights for a query, from which a
//! density estimate (for example a weighted KDE) can be formed. Covariates
//! may be grouped into functional covariates that are split on through
//! random projections.

mod bootstrap;
mod config;
mod dataset;
mod error;
mod forest;
mod importance;
mod node;
mod oob;
mod result;
mod split;
mod tree;
mod weights;

pub use bootstrap::{Bootstrap, BootstrapSample};
pub use config::{ForestConfig, Mtry, OobMode};
pub use dataset::FeatureLayout;
pub use error::{ErrorKind, ForestError};
pub use forest::CdeForest;
pub use importance::RankedFeature;
pub use node::{FeatureIndex, Loss, Node, NodeIndex, SplitRule};
pub use oob::OobWeights;
pub use result::{ForestFitResult, TrainingMetadata};
pub use tree::{CdeTree, CdeTreeConfig, LeafRef};
