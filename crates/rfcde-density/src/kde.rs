//! Weighted Gaussian kernel density estimation for univariate and joint responses.

use std::f64::consts::PI;

use tracing::trace;

use crate::basis::validate_rows;
use crate::error::DensityError;
use crate::quantile::{check_finite, check_weights, weighted_quantile};

/// Kernel bandwidth selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bandwidth {
    /// A fixed bandwidth in response units.
    Fixed(f64),
    /// Scott's rule: `1.059 · A · n_eff^(-1/5)`; the exponent is
    /// `-1/(d+4)` for `d`-dimensional joint estimates.
    Scott,
    /// Silverman's rule: `0.9 · A · n_eff^(-1/5)`, likewise `-1/(d+4)` jointly.
    Silverman,
}

impl Bandwidth {
    /// Resolve to a concrete bandwidth for the given weighted sample.
    ///
    /// `A = min(σ, IQR / 1.349)` from the weighted standard deviation and
    /// weighted interquartile range (falling back to `σ` when the IQR is
    /// zero); `n_eff = (Σw)² / Σw²` is Kish's effective sample size.
    ///
    /// # Errors
    ///
    /// Returns [`DensityError::InvalidBandwidth`] for a fixed bandwidth that
    /// is not finite and positive, [`DensityError::DegenerateBandwidth`]
    /// when a rule finds zero spread, and the validation errors of
    /// [`kde`] for bad responses or weights.
    pub fn resolve(self, responses: &[f64], weights: &[f64]) -> Result<f64, DensityError> {
        self.resolve_in(responses, weights, 1)
    }

    /// Resolve for one coordinate of a `n_dims`-dimensional response.
    fn resolve_in(self, responses: &[f64], weights: &[f64], n_dims: usize) -> Result<f64, DensityError> {
        let factor = match self {
            Bandwidth::Fixed(h) => {
                if !h.is_finite() || h <= 0.0 {
                    return Err(DensityError::InvalidBandwidth { bandwidth: h });
                }
                return Ok(h);
            }
            Bandwidth::Scott => 1.059,
            Bandwidth::Silverman => 0.9,
        };

        if responses.is_empty() {
            return Err(DensityError::EmptyResponses);
        }
        check_finite(responses)?;
        let total = check_weights(responses.len(), weights)?;

        let mean = responses.iter().zip(weights).map(|(z, w)| z * w).sum::<f64>() / total;
        let variance = responses
            .iter()
            .zip(weights)
            .map(|(z, w)| w * (z - mean).powi(2))
            .sum::<f64>()
            / total;
        let std = variance.sqrt();
        let iqr = weighted_quantile(responses, weights, 0.75)? - weighted_quantile(responses, weights, 0.25)?;
        let spread = if iqr > 0.0 { std.min(iqr / 1.349) } else { std };
        if spread <= 0.0 {
            return Err(DensityError::DegenerateBandwidth);
        }

        let sum_sq: f64 = weights.iter().map(|w| w * w).sum();
        let n_eff = total * total / sum_sq;
        Ok(factor * spread * n_eff.powf(-1.0 / (n_dims as f64 + 4.0)))
    }
}

/// Weighted Gaussian KDE of `responses` evaluated at `grid`.
///
/// `f(g) = Σ_i w_i K_h(g − z_i) / Σ_i w_i` with a standard normal kernel.
/// Observations with zero weight do not contribute. The result integrates
/// to 1 over the real line.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DensityError::EmptyResponses`] | `responses` is empty |
/// | [`DensityError::NonFiniteValue`] | a response or grid point is NaN or infinite |
/// | [`DensityError::WeightCountMismatch`] | `weights.len() != responses.len()` |
/// | [`DensityError::InvalidWeight`] | a weight is negative or not finite |
/// | [`DensityError::ZeroTotalWeight`] | all weights are zero |
/// | [`DensityError::InvalidBandwidth`] | fixed bandwidth not finite and positive |
/// | [`DensityError::DegenerateBandwidth`] | a bandwidth rule found zero spread |
pub fn kde(responses: &[f64], grid: &[f64], weights: &[f64], bandwidth: Bandwidth) -> Result<Vec<f64>, DensityError> {
    if responses.is_empty() {
        return Err(DensityError::EmptyResponses);
    }
    check_finite(responses)?;
    check_finite(grid)?;
    let total = check_weights(responses.len(), weights)?;
    let h = bandwidth.resolve(responses, weights)?;
    trace!(bandwidth = h, n_grid = grid.len(), "evaluating weighted KDE");

    let active: Vec<(f64, f64)> = responses
        .iter()
        .zip(weights)
        .filter(|&(_, &w)| w > 0.0)
        .map(|(&z, &w)| (z, w / total))
        .collect();

    let norm = 1.0 / (h * (2.0 * PI).sqrt());
    Ok(grid
        .iter()
        .map(|&g| {
            active
                .iter()
                .map(|&(z, w)| {
                    let u = (g - z) / h;
                    w * (-0.5 * u * u).exp()
                })
                .sum::<f64>()
                * norm
        })
        .collect())
}

/// Resolve one bandwidth per response dimension.
///
/// `bandwidths` holds either a single rule applied to every dimension or
/// one rule per dimension. Rules are evaluated on each coordinate's
/// weighted marginal with the `-1/(d+4)` normal-reference exponent.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DensityError::BandwidthCountMismatch`] | `bandwidths.len()` is neither 1 nor the dimension |
/// | [`DensityError::InvalidBandwidth`] | a fixed bandwidth is not finite and positive |
/// | [`DensityError::DegenerateBandwidth`] | a rule found zero spread in some dimension |
///
/// plus the response and weight validation errors of [`kde_joint`].
pub fn joint_bandwidths(
    responses: &[Vec<f64>],
    weights: &[f64],
    bandwidths: &[Bandwidth],
) -> Result<Vec<f64>, DensityError> {
    let n_dims = validate_rows(responses)?;
    check_weights(responses.len(), weights)?;
    let rule_for = |d: usize| match bandwidths.len() {
        1 => Ok(bandwidths[0]),
        n if n == n_dims => Ok(bandwidths[d]),
        got => Err(DensityError::BandwidthCountMismatch { expected: n_dims, got }),
    };

    (0..n_dims)
        .map(|d| {
            let column: Vec<f64> = responses.iter().map(|row| row[d]).collect();
            rule_for(d)?.resolve_in(&column, weights, n_dims)
        })
        .collect()
}

/// Weighted product-Gaussian KDE of `d`-dimensional `responses` at `grid`.
///
/// `f(g) = Σ_i w_i Π_d K_{h_d}(g_d − z_{id}) / Σ_i w_i` with bandwidths from
/// [`joint_bandwidths`]. Observations with zero weight do not contribute.
/// For `d = 1` this agrees with [`kde`].
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DensityError::EmptyResponses`] | `responses` is empty |
/// | [`DensityError::ZeroDimensions`] | response rows are empty |
/// | [`DensityError::DimensionMismatch`] | a response or grid row has the wrong dimension |
/// | [`DensityError::NonFiniteValue`] | a response or grid point is NaN or infinite |
/// | [`DensityError::WeightCountMismatch`] | `weights.len() != responses.len()` |
/// | [`DensityError::InvalidWeight`] | a weight is negative or not finite |
/// | [`DensityError::ZeroTotalWeight`] | all weights are zero |
/// | [`DensityError::BandwidthCountMismatch`] | `bandwidths.len()` is neither 1 nor the dimension |
/// | [`DensityError::InvalidBandwidth`] | fixed bandwidth not finite and positive |
/// | [`DensityError::DegenerateBandwidth`] | a bandwidth rule found zero spread |
pub fn kde_joint(
    responses: &[Vec<f64>],
    grid: &[Vec<f64>],
    weights: &[f64],
    bandwidths: &[Bandwidth],
) -> Result<Vec<f64>, DensityError> {
    let n_dims = validate_rows(responses)?;
    for (index, point) in grid.iter().enumerate() {
        if point.len() != n_dims {
            return Err(DensityError::DimensionMismatch {
                expected: n_dims,
                got: point.len(),
                index,
            });
        }
        if !point.iter().all(|g| g.is_finite()) {
            return Err(DensityError::NonFiniteValue { index });
        }
    }
    let total = check_weights(responses.len(), weights)?;
    let h = joint_bandwidths(responses, weights, bandwidths)?;
    trace!(bandwidths = ?h, n_grid = grid.len(), "evaluating joint weighted KDE");

    let active: Vec<(&[f64], f64)> = responses
        .iter()
        .zip(weights)
        .filter(|&(_, &w)| w > 0.0)
        .map(|(z, &w)| (z.as_slice(), w / total))
        .collect();

    let norm: f64 = h.iter().map(|h| 1.0 / (h * (2.0 * PI).sqrt())).product();
    Ok(grid
        .iter()
        .map(|g| {
            active
                .iter()
                .map(|&(z, w)| {
                    let q: f64 = g
                        .iter()
                        .zip(z)
                        .zip(&h)
                        .map(|((g, z), h)| {
                            let u = (g - z) / h;
                            u * u
                        })
                        .sum();
                    w * (-0.5 * q).exp()
                })
                .sum::<f64>()
                * norm
        })
        .collect())
}
