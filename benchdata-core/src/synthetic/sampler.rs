//! Distribution samplers backed by `rand_distr`.

use rand::Rng;
use rand_distr::{Distribution as _, LogNormal, Normal, NormalError, Uniform};

use super::Distribution;
use crate::error::{DatasetError, Result};

#[derive(Clone, Copy, Debug)]
pub(super) enum Sampler {
    Uniform(Uniform<f64>),
    Gaussian(Normal<f64>),
    Lognormal(LogNormal<f64>),
}

impl Sampler {
    /// Builds the sampler for `distribution` with the given scale.
    ///
    /// Uniform draws from the closed interval between `0` and `scale`, which
    /// may be negative or zero. Gaussian draws from `N(0, scale^2)` and
    /// lognormal from `LogNormal(0, scale)`; both need a non-negative spread.
    pub(super) fn new(distribution: Distribution, scale: f64) -> Result<Self> {
        validate_scale(distribution, scale)?;
        let invalid = |_: NormalError| DatasetError::InvalidScale {
            distribution: distribution.name(),
            scale,
        };
        match distribution {
            Distribution::Uniform => {
                let (low, high) = if scale < 0.0 { (scale, 0.0) } else { (0.0, scale) };
                Ok(Self::Uniform(Uniform::new_inclusive(low, high)))
            }
            Distribution::Gaussian => Normal::new(0.0, scale)
                .map(Self::Gaussian)
                .map_err(invalid),
            Distribution::Lognormal => LogNormal::new(0.0, scale)
                .map(Self::Lognormal)
                .map_err(invalid),
        }
    }

    pub(super) fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Self::Uniform(inner) => inner.sample(rng),
            Self::Gaussian(inner) => inner.sample(rng),
            Self::Lognormal(inner) => inner.sample(rng),
        }
    }
}

// `Uniform::new_inclusive` panics on non-finite bounds. The normal families
// reject a negative spread.
fn validate_scale(distribution: Distribution, scale: f64) -> Result<()> {
    let is_valid = match distribution {
        Distribution::Uniform => scale.is_finite(),
        Distribution::Gaussian | Distribution::Lognormal => scale.is_finite() && scale >= 0.0,
    };
    if is_valid {
        Ok(())
    } else {
        Err(DatasetError::InvalidScale {
            distribution: distribution.name(),
            scale,
        })
    }
}
