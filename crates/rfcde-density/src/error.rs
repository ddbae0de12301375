//! Error types for basis evaluation and weighted density summaries.

/// Errors from response scaling, basis evaluation, KDE, quantiles and loss.
#[derive(Debug, thiserror::Error)]
pub enum DensityError {
    /// Returned when no responses are provided.
    #[error("responses must be non-empty")]
    EmptyResponses,

    /// Returned when a response row has zero dimensions.
    #[error("responses must have at least one dimension")]
    ZeroDimensions,

    /// Returned when a response row has a different dimension than the first.
    #[error("response {index} has {got} dimensions, expected {expected}")]
    DimensionMismatch {
        /// Dimension of the first response.
        expected: usize,
        /// Dimension of the offending response.
        got: usize,
        /// Zero-based index of the offending response.
        index: usize,
    },

    /// Returned when a response, grid point or density value is NaN or infinite.
    #[error("non-finite value at index {index}")]
    NonFiniteValue {
        /// Zero-based index of the offending value.
        index: usize,
    },

    /// Returned when zero basis functions are requested for a dimension.
    #[error("n_basis must be at least 1 for every dimension")]
    ZeroBasis,

    /// Returned when the number of weights differs from the number of values.
    #[error("got {got} weights for {expected} values")]
    WeightCountMismatch {
        /// Number of values.
        expected: usize,
        /// Number of weights.
        got: usize,
    },

    /// Returned when a weight is negative or not finite.
    #[error("weight at index {index} is {weight}; weights must be finite and >= 0")]
    InvalidWeight {
        /// Zero-based index of the offending weight.
        index: usize,
        /// The offending weight.
        weight: f64,
    },

    /// Returned when every weight is zero.
    #[error("weights sum to zero")]
    ZeroTotalWeight,

    /// Returned when a fixed bandwidth is not finite and positive.
    #[error("bandwidth must be finite and > 0, got {bandwidth}")]
    InvalidBandwidth {
        /// The offending bandwidth.
        bandwidth: f64,
    },

    /// Returned when a bandwidth rule finds no spread in the weighted responses.
    #[error("weighted responses have zero spread; use a fixed bandwidth")]
    DegenerateBandwidth,

    /// Returned when the number of bandwidths is neither 1 nor the response dimension.
    #[error("got {got} bandwidths for {expected}-dimensional responses")]
    BandwidthCountMismatch {
        /// Response dimension.
        expected: usize,
        /// Number of bandwidths provided.
        got: usize,
    },

    /// Returned when a quantile level lies outside [0, 1].
    #[error("quantile must be in [0, 1], got {quantile}")]
    InvalidQuantile {
        /// The offending quantile level.
        quantile: f64,
    },

    /// Returned when an evaluation grid has too few points.
    #[error("grid has {len} points, need at least {min}")]
    GridTooShort {
        /// Number of grid points provided.
        len: usize,
        /// Minimum number of points required.
        min: usize,
    },

    /// Returned when grid points are not strictly increasing.
    #[error("grid is not strictly increasing at index {index}")]
    GridNotIncreasing {
        /// Index of the first point not greater than its predecessor.
        index: usize,
    },

    /// Returned when a density row does not match the grid length.
    #[error("density row {row} has {got} values, expected {expected}")]
    DensityLengthMismatch {
        /// Zero-based index of the offending row.
        row: usize,
        /// Grid length.
        expected: usize,
        /// Row length.
        got: usize,
    },

    /// Returned when the number of true responses differs from the number of densities.
    #[error("got {truth} true responses for {densities} densities")]
    TruthCountMismatch {
        /// Number of density rows.
        densities: usize,
        /// Number of true responses.
        truth: usize,
    },
}
