/// Broad category of a [`ForestError`].
///
/// Callers that only care whether a failure came from bad configuration,
/// bad data, or misuse of a fitted forest can match on this instead of the
/// individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A hyperparameter is out of range. Raised before any work begins.
    Configuration,
    /// The training data is malformed.
    InvalidInput,
    /// The forest was asked for something it was not fitted to provide.
    InvalidState,
    /// A query covariate vector has the wrong length.
    DimensionMismatch,
}

/// Errors from CDE forest training and weighting.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when node_size is zero.
    #[error("node_size must be at least 1, got {node_size}")]
    InvalidNodeSize {
        /// The invalid node_size value provided.
        node_size: usize,
    },

    /// Returned when mtry resolves to 0 or exceeds the number of covariate groups.
    #[error("mtry resolved to {mtry}, but must be in [1, {n_groups}]")]
    InvalidMtry {
        /// The resolved mtry value.
        mtry: usize,
        /// The number of covariate groups in the dataset.
        n_groups: usize,
    },

    /// Returned when min_loss_delta is negative or not finite.
    #[error("min_loss_delta must be finite and >= 0, got {min_loss_delta}")]
    InvalidMinLossDelta {
        /// The invalid value provided.
        min_loss_delta: f64,
    },

    /// Returned when flambda is negative or not finite.
    #[error("flambda must be finite and >= 0, got {flambda}")]
    InvalidFlambda {
        /// The invalid value provided.
        flambda: f64,
    },

    /// Returned when max_depth is `Some(0)`.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when `lens` does not partition the covariate columns.
    #[error("invalid lens: {reason}")]
    InvalidLens {
        /// Human-readable description of the problem.
        reason: String,
    },

    /// Returned when the bootstrap distribution cannot be constructed.
    #[error("invalid bootstrap: {reason}")]
    InvalidBootstrap {
        /// Human-readable description of the problem.
        reason: String,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training covariates have zero columns.
    #[error("training dataset has zero covariate columns")]
    ZeroFeatures,

    /// Returned when the basis matrix has zero columns.
    #[error("basis matrix has zero columns")]
    ZeroBasis,

    /// Returned when a covariate row has a different length than the first row.
    #[error("sample {sample_index} has {got} covariates, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of covariates.
        expected: usize,
        /// The actual number of covariates in the row.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a basis row has a different length than the first row.
    #[error("sample {sample_index} has {got} basis coefficients, expected {expected}")]
    BasisCountMismatch {
        /// The expected number of basis coefficients.
        expected: usize,
        /// The actual number of coefficients in the row.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when X and Z disagree on the number of observations.
    #[error("covariates have {covariates} rows but basis has {basis} rows")]
    SampleCountMismatch {
        /// Number of covariate rows.
        covariates: usize,
        /// Number of basis rows.
        basis: usize,
    },

    /// Returned when a covariate value is NaN or infinite.
    #[error("non-finite covariate at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending covariate column.
        feature_index: usize,
    },

    /// Returned when a basis coefficient is NaN or infinite.
    #[error("non-finite basis coefficient at sample {sample_index}, coefficient {basis_index}")]
    NonFiniteBasis {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending coefficient.
        basis_index: usize,
    },

    /// Returned when a query has a different number of covariates than the training data.
    #[error("query has {got} covariates, expected {expected}")]
    DimensionMismatch {
        /// The number of covariates seen at training time.
        expected: usize,
        /// The number of covariates in the query.
        got: usize,
    },

    /// Returned when a weight accumulation buffer cannot hold every training observation.
    #[error("weight buffer has length {got}, expected at least {expected}")]
    WeightBufferTooShort {
        /// The number of training observations.
        expected: usize,
        /// The length of the buffer provided.
        got: usize,
    },

    /// Returned when out-of-bag weights are requested from a forest fitted without them.
    #[error("forest was not fitted with out-of-bag tracking; enable OobMode::Enabled")]
    OobNotFitted,
}

impl ForestError {
    /// Return the broad category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForestError::InvalidTreeCount { .. }
            | ForestError::InvalidNodeSize { .. }
            | ForestError::InvalidMtry { .. }
            | ForestError::InvalidMinLossDelta { .. }
            | ForestError::InvalidFlambda { .. }
            | ForestError::InvalidMaxDepth { .. }
            | ForestError::InvalidLens { .. }
            | ForestError::InvalidBootstrap { .. } => ErrorKind::Configuration,
            ForestError::EmptyDataset
            | ForestError::ZeroFeatures
            | ForestError::ZeroBasis
            | ForestError::FeatureCountMismatch { .. }
            | ForestError::BasisCountMismatch { .. }
            | ForestError::SampleCountMismatch { .. }
            | ForestError::NonFiniteValue { .. }
            | ForestError::NonFiniteBasis { .. }
            | ForestError::WeightBufferTooShort { .. } => ErrorKind::InvalidInput,
            ForestError::OobNotFitted => ErrorKind::InvalidState,
            ForestError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ForestError};

    #[test]
    fn configuration_kind() {
        let err = ForestError::InvalidMtry { mtry: 5, n_groups: 2 };
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.to_string(), "mtry resolved to 5, but must be in [1, 2]");
    }

    #[test]
    fn state_and_dimension_kinds() {
        assert_eq!(ForestError::OobNotFitted.kind(), ErrorKind::InvalidState);
        let err = ForestError::DimensionMismatch { expected: 3, got: 1 };
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
    }

    #[test]
    fn input_kind() {
        let err = ForestError::SampleCountMismatch { covariates: 4, basis: 3 };
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
