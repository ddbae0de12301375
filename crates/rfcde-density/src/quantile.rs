//! Weighted means and quantiles of univariate responses.

use crate::error::DensityError;

/// Validate weights against `n_values` and return their total.
pub(crate) fn check_weights(n_values: usize, weights: &[f64]) -> Result<f64, DensityError> {
    if weights.len() != n_values {
        return Err(DensityError::WeightCountMismatch {
            expected: n_values,
            got: weights.len(),
        });
    }
    if let Some((index, &weight)) = weights
        .iter()
        .enumerate()
        .find(|&(_, w)| !w.is_finite() || *w < 0.0)
    {
        return Err(DensityError::InvalidWeight { index, weight });
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(DensityError::ZeroTotalWeight);
    }
    Ok(total)
}

pub(crate) fn check_finite(values: &[f64]) -> Result<(), DensityError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(DensityError::NonFiniteValue { index }),
        None => Ok(()),
    }
}

/// Weighted arithmetic mean `Σ w_i v_i / Σ w_i`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DensityError::EmptyResponses`] | `values` is empty |
/// | [`DensityError::NonFiniteValue`] | a value is NaN or infinite |
/// | [`DensityError::WeightCountMismatch`] | lengths differ |
/// | [`DensityError::InvalidWeight`] | a weight is negative or not finite |
/// | [`DensityError::ZeroTotalWeight`] | all weights are zero |
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> Result<f64, DensityError> {
    if values.is_empty() {
        return Err(DensityError::EmptyResponses);
    }
    check_finite(values)?;
    let total = check_weights(values.len(), weights)?;
    let sum: f64 = values.iter().zip(weights).map(|(v, w)| v * w).sum();
    Ok(sum / total)
}

/// Weighted quantile by linear interpolation of the weighted ECDF.
///
/// Values are sorted and paired with their normalized cumulative weights
/// `F_k`; the result interpolates linearly between the `(F_k, v_k)`
/// points and is clamped to the smallest value below `F_0` and the largest
/// above `F_last`. Zero-weight values are ignored.
///
/// # Errors
///
/// Same as [`weighted_mean`], plus [`DensityError::InvalidQuantile`] when
/// `quantile` is outside `[0, 1]`.
pub fn weighted_quantile(values: &[f64], weights: &[f64], quantile: f64) -> Result<f64, DensityError> {
    if values.is_empty() {
        return Err(DensityError::EmptyResponses);
    }
    if !(0.0..=1.0).contains(&quantile) {
        return Err(DensityError::InvalidQuantile { quantile });
    }
    check_finite(values)?;
    let total = check_weights(values.len(), weights)?;

    let mut pairs: Vec<(f64, f64)> = values
        .iter()
        .zip(weights)
        .filter(|&(_, &w)| w > 0.0)
        .map(|(&v, &w)| (v, w))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut cumulative = 0.0;
    let ecdf: Vec<f64> = pairs
        .iter()
        .map(|&(_, w)| {
            cumulative += w;
            cumulative / total
        })
        .collect();

    let Some(upper) = ecdf.iter().position(|&f| f >= quantile) else {
        return Ok(pairs[pairs.len() - 1].0);
    };
    if upper == 0 || ecdf[upper] == quantile {
        return Ok(pairs[upper].0);
    }

    let (f0, f1) = (ecdf[upper - 1], ecdf[upper]);
    let (v0, v1) = (pairs[upper - 1].0, pairs[upper].0);
    Ok(v0 + (quantile - f0) / (f1 - f0) * (v1 - v0))
}
