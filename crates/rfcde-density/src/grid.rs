//! Evaluation grids for univariate and joint densities.

use crate::error::DensityError;
use crate::quantile::check_finite;

/// Check that an axis has at least two finite, strictly increasing points.
pub(crate) fn check_axis(axis: &[f64]) -> Result<(), DensityError> {
    if axis.len() < 2 {
        return Err(DensityError::GridTooShort {
            len: axis.len(),
            min: 2,
        });
    }
    check_finite(axis)?;
    if let Some(index) = axis.windows(2).position(|w| w[1] <= w[0]) {
        return Err(DensityError::GridNotIncreasing { index: index + 1 });
    }
    Ok(())
}

/// Cartesian product of per-dimension axes.
///
/// Point `c` takes coordinate `(c / p_d) mod axes[d].len()` in dimension
/// `d`, where `p_0 = 1` and `p_{d+1} = p_d · axes[d].len()`, so the first
/// dimension varies fastest. This matches the column order of
/// [`BasisSystem::evaluate_tensor`](crate::BasisSystem::evaluate_tensor).
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DensityError::ZeroDimensions`] | `axes` is empty |
/// | [`DensityError::GridTooShort`] | an axis has fewer than 2 points |
/// | [`DensityError::NonFiniteValue`] | an axis point is NaN or infinite |
/// | [`DensityError::GridNotIncreasing`] | an axis is not strictly increasing |
pub fn tensor_grid(axes: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, DensityError> {
    if axes.is_empty() {
        return Err(DensityError::ZeroDimensions);
    }
    for axis in axes {
        check_axis(axis)?;
    }

    let n_points: usize = axes.iter().map(Vec::len).product();
    Ok((0..n_points)
        .map(|c| {
            let mut period = 1;
            axes.iter()
                .map(|axis| {
                    let value = axis[(c / period) % axis.len()];
                    period *= axis.len();
                    value
                })
                .collect()
        })
        .collect())
}

/// Trapezoid quadrature weights on a tensor grid, in [`tensor_grid`] order.
///
/// Axes are assumed already validated.
pub(crate) fn tensor_trapezoid_weights(axes: &[Vec<f64>]) -> Vec<f64> {
    let per_axis: Vec<Vec<f64>> = axes.iter().map(|axis| trapezoid_weights(axis)).collect();
    let n_points: usize = axes.iter().map(Vec::len).product();
    (0..n_points)
        .map(|c| {
            let mut period = 1;
            let mut weight = 1.0;
            for w in &per_axis {
                weight *= w[(c / period) % w.len()];
                period *= w.len();
            }
            weight
        })
        .collect()
}

/// Trapezoid weights for one increasing axis of at least two points.
fn trapezoid_weights(axis: &[f64]) -> Vec<f64> {
    let last = axis.len() - 1;
    (0..axis.len())
        .map(|i| {
            let lo = axis[i.saturating_sub(1)];
            let hi = axis[(i + 1).min(last)];
            (hi - lo) / 2.0
        })
        .collect()
}
