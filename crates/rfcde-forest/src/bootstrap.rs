//! Per-tree bootstrap multiplicities and out-of-bag sets.

use rand::Rng;
use rand_distr::{Distribution, Poisson};

use crate::error::ForestError;

/// How each tree resamples the training observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootstrap {
    /// `n_samples` draws with replacement.
    Multinomial,
    /// Independent Poisson(1) multiplicity per observation.
    Poisson,
    /// Every observation in-bag exactly once; no out-of-bag set.
    Disabled,
}

impl Bootstrap {
    /// Build the sampling distribution once, before any tree is grown.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidBootstrap`] if the distribution cannot
    /// be constructed.
    pub(crate) fn resampler(self) -> Result<Resampler, ForestError> {
        match self {
            Bootstrap::Multinomial => Ok(Resampler::Multinomial),
            Bootstrap::Poisson => Poisson::new(1.0)
                .map(Resampler::Poisson)
                .map_err(|e| ForestError::InvalidBootstrap {
                    reason: e.to_string(),
                }),
            Bootstrap::Disabled => Ok(Resampler::Disabled),
        }
    }
}

/// A [`Bootstrap`] mode with its distribution ready to sample.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Resampler {
    Multinomial,
    Poisson(Poisson<f64>),
    Disabled,
}

/// In-bag multiplicities for one tree and the complementary out-of-bag set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSample {
    counts: Vec<u32>,
    oob: Vec<usize>,
}

impl BootstrapSample {
    /// Draw a bootstrap sample over `n_samples` observations.
    pub(crate) fn draw(n_samples: usize, resampler: &Resampler, rng: &mut impl Rng) -> Self {
        let counts = match resampler {
            Resampler::Multinomial => {
                let mut counts = vec![0u32; n_samples];
                for _ in 0..n_samples {
                    counts[rng.gen_range(0..n_samples)] += 1;
                }
                counts
            }
            Resampler::Poisson(poisson) => {
                // An all-zero draw has nothing to grow from.
                loop {
                    let counts: Vec<u32> = (0..n_samples)
                        .map(|_| {
                            let draw: f64 = poisson.sample(rng);
                            draw as u32
                        })
                        .collect();
                    if counts.iter().any(|&c| c > 0) {
                        break counts;
                    }
                }
            }
            Resampler::Disabled => vec![1; n_samples],
        };
        Self::from_counts(counts)
    }

    /// Build a sample from explicit multiplicities.
    pub(crate) fn from_counts(counts: Vec<u32>) -> Self {
        let oob = counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c == 0)
            .map(|(i, _)| i)
            .collect();
        Self { counts, oob }
    }

    /// In-bag multiplicity of every training observation.
    #[must_use]
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Multiplicity of observation `i`.
    #[must_use]
    pub fn count(&self, i: usize) -> u32 {
        self.counts[i]
    }

    /// Indices excluded from this tree's sample, ascending.
    #[must_use]
    pub fn oob_indices(&self) -> &[usize] {
        &self.oob
    }

    /// Return `true` if observation `i` was not drawn.
    #[must_use]
    pub fn is_oob(&self, i: usize) -> bool {
        self.counts[i] == 0
    }

    /// Distinct in-bag indices, ascending.
    #[must_use]
    pub fn in_bag_indices(&self) -> Vec<usize> {
        self.counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(|(i, _)| i)
            .collect()
    }

    /// Total in-bag weight (sum of multiplicities).
    #[must_use]
    pub fn total_weight(&self) -> usize {
        self.counts.iter().map(|&c| c as usize).sum()
    }
}
