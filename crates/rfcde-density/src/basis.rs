//! Orthonormal basis evaluation of responses on the unit box.

use std::f64::consts::{PI, SQRT_2};

use crate::error::DensityError;

/// Per-dimension min/max box used to map responses into `[0, 1]^d`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseBox {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl ResponseBox {
    /// Fit the box to the training responses (`responses[obs][dim]`).
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DensityError::EmptyResponses`] | `responses` is empty |
    /// | [`DensityError::ZeroDimensions`] | rows have zero entries |
    /// | [`DensityError::DimensionMismatch`] | rows have inconsistent lengths |
    /// | [`DensityError::NonFiniteValue`] | a response is NaN or infinite |
    pub fn fit(responses: &[Vec<f64>]) -> Result<Self, DensityError> {
        let n_dims = validate_rows(responses)?;
        let mut min = vec![f64::INFINITY; n_dims];
        let mut max = vec![f64::NEG_INFINITY; n_dims];
        for row in responses {
            for (d, &z) in row.iter().enumerate() {
                min[d] = min[d].min(z);
                max[d] = max[d].max(z);
            }
        }
        Ok(Self { min, max })
    }

    /// Number of response dimensions.
    #[must_use]
    pub fn n_dims(&self) -> usize {
        self.min.len()
    }

    /// Per-dimension lower bounds.
    #[must_use]
    pub fn min(&self) -> &[f64] {
        &self.min
    }

    /// Per-dimension upper bounds.
    #[must_use]
    pub fn max(&self) -> &[f64] {
        &self.max
    }

    /// Map one value of dimension `dim` into the box.
    ///
    /// A dimension with zero width maps every value to `0.5`.
    #[must_use]
    pub fn scale_value(&self, dim: usize, value: f64) -> f64 {
        let width = self.max[dim] - self.min[dim];
        if width > 0.0 {
            (value - self.min[dim]) / width
        } else {
            0.5
        }
    }

    /// Map every response into the box. Values outside the fitted range
    /// land outside `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`DensityError::DimensionMismatch`] when a row's dimension
    /// differs from the fitted box, or [`DensityError::NonFiniteValue`] for
    /// NaN or infinite values.
    pub fn scale(&self, responses: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, DensityError> {
        responses
            .iter()
            .enumerate()
            .map(|(index, row)| {
                if row.len() != self.n_dims() {
                    return Err(DensityError::DimensionMismatch {
                        expected: self.n_dims(),
                        got: row.len(),
                        index,
                    });
                }
                if !row.iter().all(|z| z.is_finite()) {
                    return Err(DensityError::NonFiniteValue { index });
                }
                Ok(row.iter().enumerate().map(|(d, &z)| self.scale_value(d, z)).collect())
            })
            .collect()
    }
}

/// Orthonormal function system on `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasisSystem {
    /// `φ_0 = 1`, `φ_k(z) = √2 cos(π k z)`.
    Cosine,
}

impl BasisSystem {
    /// Evaluate the first `n_basis` functions at a single point.
    #[must_use]
    pub fn evaluate_point(self, z: f64, n_basis: usize) -> Vec<f64> {
        match self {
            BasisSystem::Cosine => (0..n_basis)
                .map(|k| if k == 0 { 1.0 } else { SQRT_2 * (PI * k as f64 * z).cos() })
                .collect(),
        }
    }

    /// Evaluate the basis at box-scaled responses.
    ///
    /// One-dimensional responses give `n_basis` columns. For `d > 1`
    /// dimensions this is the tensor basis with `n_basis` functions per
    /// dimension, `n_basis^d` columns in total.
    ///
    /// # Errors
    ///
    /// Same as [`BasisSystem::evaluate_tensor`].
    pub fn evaluate(self, responses: &[Vec<f64>], n_basis: usize) -> Result<Vec<Vec<f64>>, DensityError> {
        let n_dims = responses.first().map_or(1, Vec::len).max(1);
        self.evaluate_tensor(responses, &vec![n_basis; n_dims])
    }

    /// Evaluate the tensor basis `Π_d φ_{k_d}(z_d)` with `n_basis[d]`
    /// functions in dimension `d`.
    ///
    /// Column `c` combines index `k_d = (c / p_d) mod n_basis[d]` from every
    /// dimension, where `p_0 = 1` and `p_{d+1} = p_d · n_basis[d]`; the
    /// first dimension varies fastest.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DensityError::EmptyResponses`] | `responses` is empty |
    /// | [`DensityError::ZeroDimensions`] | rows have zero entries |
    /// | [`DensityError::DimensionMismatch`] | a row's length differs from `n_basis.len()` |
    /// | [`DensityError::NonFiniteValue`] | a response is NaN or infinite |
    /// | [`DensityError::ZeroBasis`] | any `n_basis[d]` is zero |
    pub fn evaluate_tensor(
        self,
        responses: &[Vec<f64>],
        n_basis: &[usize],
    ) -> Result<Vec<Vec<f64>>, DensityError> {
        let n_dims = validate_rows(responses)?;
        if n_basis.len() != n_dims {
            return Err(DensityError::DimensionMismatch {
                expected: n_basis.len(),
                got: n_dims,
                index: 0,
            });
        }
        if n_basis.contains(&0) {
            return Err(DensityError::ZeroBasis);
        }

        let n_cols: usize = n_basis.iter().product();
        let rows = responses
            .iter()
            .map(|row| {
                let per_dim: Vec<Vec<f64>> = row
                    .iter()
                    .zip(n_basis)
                    .map(|(&z, &n)| self.evaluate_point(z, n))
                    .collect();
                (0..n_cols)
                    .map(|c| {
                        let mut period = 1;
                        let mut value = 1.0;
                        for (d, phi) in per_dim.iter().enumerate() {
                            value *= phi[(c / period) % n_basis[d]];
                            period *= n_basis[d];
                        }
                        value
                    })
                    .collect()
            })
            .collect();
        Ok(rows)
    }
}

/// Check rows are non-empty, rectangular and finite; return the dimension.
pub(crate) fn validate_rows(responses: &[Vec<f64>]) -> Result<usize, DensityError> {
    let first = responses.first().ok_or(DensityError::EmptyResponses)?;
    let n_dims = first.len();
    if n_dims == 0 {
        return Err(DensityError::ZeroDimensions);
    }
    for (index, row) in responses.iter().enumerate() {
        if row.len() != n_dims {
            return Err(DensityError::DimensionMismatch {
                expected: n_dims,
                got: row.len(),
                index,
            });
        }
        if !row.iter().all(|z| z.is_finite()) {
            return Err(DensityError::NonFiniteValue { index });
        }
    }
    Ok(n_dims)
}
