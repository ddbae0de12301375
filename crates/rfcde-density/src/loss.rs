//! CDE loss of conditional density estimates on a grid.

use crate::error::DensityError;
use crate::grid::{check_axis, tensor_trapezoid_weights};
use crate::quantile::check_finite;

/// Estimated CDE loss: `mean_i ∫ f_i(z)² dz − 2 · mean_i f_i(z_i)`.
///
/// `densities[i]` is the estimate for test observation `i` evaluated on
/// `grid`; `truth[i]` is its observed response. The integral uses the
/// trapezoid rule and `f_i(z_i)` the value at the nearest grid point
/// (lower point on ties). Lower is better.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DensityError::GridTooShort`] | fewer than 2 grid points |
/// | [`DensityError::GridNotIncreasing`] | grid not strictly increasing |
/// | [`DensityError::EmptyResponses`] | no density rows |
/// | [`DensityError::TruthCountMismatch`] | `truth.len() != densities.len()` |
/// | [`DensityError::DensityLengthMismatch`] | a row length differs from the grid |
/// | [`DensityError::NonFiniteValue`] | a grid point, truth or density is not finite |
pub fn cde_loss(densities: &[Vec<f64>], grid: &[f64], truth: &[f64]) -> Result<f64, DensityError> {
    check_axis(grid)?;
    if densities.is_empty() {
        return Err(DensityError::EmptyResponses);
    }
    if truth.len() != densities.len() {
        return Err(DensityError::TruthCountMismatch {
            densities: densities.len(),
            truth: truth.len(),
        });
    }
    check_finite(truth)?;

    let mut integral_sum = 0.0;
    let mut point_sum = 0.0;
    for (row, (density, &z)) in densities.iter().zip(truth).enumerate() {
        if density.len() != grid.len() {
            return Err(DensityError::DensityLengthMismatch {
                row,
                expected: grid.len(),
                got: density.len(),
            });
        }
        check_finite(density)?;

        integral_sum += grid
            .windows(2)
            .zip(density.windows(2))
            .map(|(g, f)| (g[1] - g[0]) * (f[0] * f[0] + f[1] * f[1]) / 2.0)
            .sum::<f64>();
        point_sum += density[nearest(grid, z)];
    }

    let n = densities.len() as f64;
    Ok(integral_sum / n - 2.0 * point_sum / n)
}

/// CDE loss of joint density estimates on a tensor grid.
///
/// `densities[i]` is evaluated on [`tensor_grid`](crate::tensor_grid)`(axes)`
/// and `truth[i]` has one coordinate per axis. The integral uses the product
/// trapezoid rule; `f_i(z_i)` is read at the grid point nearest to `z_i` in
/// every coordinate. With a single axis this equals [`cde_loss`].
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DensityError::ZeroDimensions`] | `axes` is empty |
/// | [`DensityError::GridTooShort`] | an axis has fewer than 2 points |
/// | [`DensityError::GridNotIncreasing`] | an axis is not strictly increasing |
/// | [`DensityError::EmptyResponses`] | no density rows |
/// | [`DensityError::TruthCountMismatch`] | `truth.len() != densities.len()` |
/// | [`DensityError::DimensionMismatch`] | a truth row does not have one value per axis |
/// | [`DensityError::DensityLengthMismatch`] | a row length differs from the grid size |
/// | [`DensityError::NonFiniteValue`] | a grid point, truth or density is not finite |
pub fn cde_loss_joint(densities: &[Vec<f64>], axes: &[Vec<f64>], truth: &[Vec<f64>]) -> Result<f64, DensityError> {
    if axes.is_empty() {
        return Err(DensityError::ZeroDimensions);
    }
    for axis in axes {
        check_axis(axis)?;
    }
    if densities.is_empty() {
        return Err(DensityError::EmptyResponses);
    }
    if truth.len() != densities.len() {
        return Err(DensityError::TruthCountMismatch {
            densities: densities.len(),
            truth: truth.len(),
        });
    }

    let quadrature = tensor_trapezoid_weights(axes);
    let mut integral_sum = 0.0;
    let mut point_sum = 0.0;
    for (row, (density, z)) in densities.iter().zip(truth).enumerate() {
        if density.len() != quadrature.len() {
            return Err(DensityError::DensityLengthMismatch {
                row,
                expected: quadrature.len(),
                got: density.len(),
            });
        }
        if z.len() != axes.len() {
            return Err(DensityError::DimensionMismatch {
                expected: axes.len(),
                got: z.len(),
                index: row,
            });
        }
        check_finite(density)?;
        check_finite(z)?;

        integral_sum += density
            .iter()
            .zip(&quadrature)
            .map(|(f, w)| w * f * f)
            .sum::<f64>();

        let mut period = 1;
        let mut flat = 0;
        for (axis, &coordinate) in axes.iter().zip(z) {
            flat += nearest(axis, coordinate) * period;
            period *= axis.len();
        }
        point_sum += density[flat];
    }

    let n = densities.len() as f64;
    Ok(integral_sum / n - 2.0 * point_sum / n)
}

/// Index of the grid point closest to `z` in an increasing grid.
fn nearest(grid: &[f64], z: f64) -> usize {
    let upper = grid.partition_point(|&g| g < z);
    if upper == 0 {
        return 0;
    }
    if upper == grid.len() {
        return grid.len() - 1;
    }
    if z - grid[upper - 1] <= grid[upper] - z {
        upper - 1
    } else {
        upper
    }
}

#[cfg(test)]
mod tests {
    use super::{cde_loss, cde_loss_joint, nearest};
    use crate::error::DensityError;
    use crate::grid::tensor_grid;

    fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64).collect()
    }

    #[test]
    fn uniform_density_loss() {
        // f = 1 on [0, 1]: ∫ f² = 1, f(z) = 1, loss = 1 - 2 = -1.
        let grid = linspace(0.0, 1.0, 101);
        let densities = vec![vec![1.0; 101]; 3];
        let loss = cde_loss(&densities, &grid, &[0.2, 0.5, 0.9]).unwrap();
        assert!((loss + 1.0).abs() < 1e-12);
    }

    #[test]
    fn sharper_correct_density_scores_lower() {
        let grid = linspace(0.0, 1.0, 201);
        let flat = vec![vec![1.0; 201]];
        let peaked = vec![grid
            .iter()
            .map(|&g| if (g - 0.5).abs() <= 0.25 { 2.0 } else { 0.0 })
            .collect::<Vec<f64>>()];
        let truth = [0.5];
        let flat_loss = cde_loss(&flat, &grid, &truth).unwrap();
        let peaked_loss = cde_loss(&peaked, &grid, &truth).unwrap();
        assert!(peaked_loss < flat_loss);
    }

    #[test]
    fn nearest_grid_point() {
        let grid = [0.0, 1.0, 2.0];
        assert_eq!(nearest(&grid, -5.0), 0);
        assert_eq!(nearest(&grid, 0.4), 0);
        assert_eq!(nearest(&grid, 0.5), 0);
        assert_eq!(nearest(&grid, 0.6), 1);
        assert_eq!(nearest(&grid, 1.0), 1);
        assert_eq!(nearest(&grid, 9.0), 2);
    }

    #[test]
    fn grid_must_increase() {
        let err = cde_loss(&[vec![1.0; 3]], &[0.0, 0.5, 0.5], &[0.1]).unwrap_err();
        assert!(matches!(err, DensityError::GridNotIncreasing { index: 2 }));
    }

    #[test]
    fn shapes_validated() {
        let grid = [0.0, 1.0];
        let err = cde_loss(&[vec![1.0, 1.0]], &grid, &[0.1, 0.2]).unwrap_err();
        assert!(matches!(err, DensityError::TruthCountMismatch { .. }));
        let err = cde_loss(&[vec![1.0]], &grid, &[0.1]).unwrap_err();
        assert!(matches!(err, DensityError::DensityLengthMismatch { row: 0, .. }));
    }

    #[test]
    fn joint_loss_with_one_axis_matches_univariate() {
        let grid = linspace(0.0, 2.0, 41);
        let densities: Vec<Vec<f64>> = [0.3, 1.1]
            .iter()
            .map(|&c| grid.iter().map(|&g| (-(g - c) * (g - c)).exp()).collect())
            .collect();
        let univariate = cde_loss(&densities, &grid, &[0.4, 1.0]).unwrap();
        let joint = cde_loss_joint(&densities, &[grid], &[vec![0.4], vec![1.0]]).unwrap();
        assert!((univariate - joint).abs() < 1e-12);
    }

    #[test]
    fn uniform_density_on_unit_square() {
        let axes = vec![linspace(0.0, 1.0, 21), linspace(0.0, 1.0, 11)];
        let n_points = tensor_grid(&axes).unwrap().len();
        let densities = vec![vec![1.0; n_points]; 2];
        let truth = vec![vec![0.2, 0.7], vec![0.9, 0.1]];
        let loss = cde_loss_joint(&densities, &axes, &truth).unwrap();
        assert!((loss + 1.0).abs() < 1e-12);
    }

    #[test]
    fn joint_truth_is_read_at_nearest_point() {
        let axes = vec![vec![0.0, 1.0], vec![0.0, 1.0]];
        // Only grid point (1, 0) carries mass; it is index 1.
        let densities = vec![vec![0.0, 4.0, 0.0, 0.0]];
        let hit = cde_loss_joint(&densities, &axes, &[vec![0.9, 0.2]]).unwrap();
        let miss = cde_loss_joint(&densities, &axes, &[vec![0.1, 0.8]]).unwrap();
        assert!((miss - hit - 8.0).abs() < 1e-12);
    }

    #[test]
    fn joint_shapes_validated() {
        let axes = vec![vec![0.0, 1.0], vec![0.0, 1.0]];
        let err = cde_loss_joint(&[vec![1.0; 4]], &axes, &[vec![0.5]]).unwrap_err();
        assert!(matches!(err, DensityError::DimensionMismatch { expected: 2, got: 1, index: 0 }));
        let err = cde_loss_joint(&[vec![1.0; 3]], &axes, &[vec![0.5, 0.5]]).unwrap_err();
        assert!(matches!(err, DensityError::DensityLengthMismatch { expected: 4, got: 3, .. }));
        let err = cde_loss_joint(&[vec![1.0; 4]], &[], &[vec![0.5]]).unwrap_err();
        assert!(matches!(err, DensityError::ZeroDimensions));
    }
}
