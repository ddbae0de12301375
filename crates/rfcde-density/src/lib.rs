//! Response-side tools for forest-based conditional density estimation.
//!
//! Pure math library, zero I/O. Maps responses into the unit box and
//! evaluates orthonormal (cosine and tensor cosine) bases on them, turns
//! forest observation weights into conditional densities via weighted
//! Gaussian KDE (univariate, or product kernels on a tensor grid for joint
//! responses), and summarizes weighted responses with means and
//! quantiles. [`cde_loss`] scores density estimates against held-out
//! responses.

mod basis;
mod error;
mod grid;
mod kde;
mod loss;
mod quantile;

pub use basis::{BasisSystem, ResponseBox};
pub use error::DensityError;
pub use grid::tensor_grid;
pub use kde::{Bandwidth, joint_bandwidths, kde, kde_joint};
pub use loss::{cde_loss, cde_loss_joint};
pub use quantile::{weighted_mean, weighted_quantile};
