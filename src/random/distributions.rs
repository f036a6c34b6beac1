//! The distributions used by the simulation beyond the ones provided by `rand_distr`.

use rand_distr::{Distribution, LogNormal, Normal, StandardNormal};

use crate::error::GasTownError;
use crate::rand::Rng;
use crate::random::{RandomSource, RngId};

/// Speeds are drawn from `[0, MAX_SPEED)`.
pub const MAX_SPEED: f64 = 100.0;

/// Shape (standard deviation of the logarithm) of the illness-to-death delay.
pub const DEATH_DELAY_SHAPE: f64 = 0.2;
/// Median of the illness-to-death delay.
pub const DEATH_DELAY_MEDIAN: f64 = 11.0;
/// Illness-to-death delays are drawn from `[DEATH_DELAY_MIN, DEATH_DELAY_MAX)`.
pub const DEATH_DELAY_MIN: f64 = 5.0;
pub const DEATH_DELAY_MAX: f64 = 25.0;

/// The speed distribution of particles in a 2D ideal gas at `temperature` (in units where the
/// particle mass and Boltzmann's constant are one).
///
/// The density is proportional to `v * exp(-v^2 / (2 * temperature))`, restricted to
/// `[0, MAX_SPEED)`. Samples are drawn by inverting the truncated CDF, so no draw is ever
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxwellBoltzmann2D {
    temperature: f64,
    /// Probability mass of the untruncated distribution below `MAX_SPEED`.
    truncated_mass: f64,
}

impl MaxwellBoltzmann2D {
    /// # Errors
    ///
    /// Returns `GasTownError::InvalidParameter` if `temperature` is not a positive finite number.
    pub fn new(temperature: f64) -> Result<Self, GasTownError> {
        if temperature <= 0.0 || !temperature.is_finite() {
            return Err(GasTownError::InvalidParameter(format!(
                "temperature must be positive and finite, got {temperature}"
            )));
        }
        let truncated_mass = -(-MAX_SPEED * MAX_SPEED / (2.0 * temperature)).exp_m1();
        Ok(MaxwellBoltzmann2D {
            temperature,
            truncated_mass,
        })
    }

    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }
}

impl Distribution<f64> for MaxwellBoltzmann2D {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let u: f64 = rng.random();
        let speed = (-2.0 * self.temperature * (-u * self.truncated_mass).ln_1p()).sqrt();
        // Rounding can land exactly on the upper bound when nearly all the mass is below it.
        speed.min(MAX_SPEED * (1.0 - f64::EPSILON))
    }
}

/// The delay between the onset of a lethal illness and death: a log-normal law with shape
/// `DEATH_DELAY_SHAPE` and median `DEATH_DELAY_MEDIAN`, restricted to
/// `[DEATH_DELAY_MIN, DEATH_DELAY_MAX)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeathDelay {
    mu: f64,
    sigma: f64,
}

impl DeathDelay {
    #[must_use]
    pub fn new() -> Self {
        DeathDelay {
            mu: DEATH_DELAY_MEDIAN.ln(),
            sigma: DEATH_DELAY_SHAPE,
        }
    }
}

impl Default for DeathDelay {
    fn default() -> Self {
        DeathDelay::new()
    }
}

impl Distribution<f64> for DeathDelay {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        // Over 99.99% of the mass lies inside the window.
        loop {
            let z: f64 = StandardNormal.sample(rng);
            let delay = (self.mu + self.sigma * z).exp();
            if (DEATH_DELAY_MIN..DEATH_DELAY_MAX).contains(&delay) {
                return delay;
            }
        }
    }
}

impl RandomSource {
    /// A Gaussian sample with the given mean and standard deviation.
    ///
    /// # Errors
    ///
    /// Returns `GasTownError::NormalError` if `std_dev` is negative or not finite.
    pub fn sample_gaussian<R: RngId + 'static>(
        &self,
        rng_id: R,
        mean: f64,
        std_dev: f64,
    ) -> Result<f64, GasTownError> {
        let normal = Normal::new(mean, std_dev)?;
        Ok(self.sample_distr(rng_id, normal))
    }

    /// A nonnegative speed from the 2D Maxwell-Boltzmann distribution at `temperature`.
    ///
    /// # Errors
    ///
    /// Returns `GasTownError::InvalidParameter` if `temperature` is not positive and finite.
    pub fn sample_speed<R: RngId + 'static>(
        &self,
        rng_id: R,
        temperature: f64,
    ) -> Result<f64, GasTownError> {
        let maxwell = MaxwellBoltzmann2D::new(temperature)?;
        Ok(self.sample_distr(rng_id, maxwell))
    }

    /// A log-normal sample with the given shape (standard deviation of the logarithm) and scale
    /// (median).
    ///
    /// # Errors
    ///
    /// Returns `GasTownError::InvalidParameter` if `scale` is not positive, or
    /// `GasTownError::NormalError` if `shape` is negative or not finite.
    pub fn sample_log_normal<R: RngId + 'static>(
        &self,
        rng_id: R,
        shape: f64,
        scale: f64,
    ) -> Result<f64, GasTownError> {
        if scale <= 0.0 || !scale.is_finite() {
            return Err(GasTownError::InvalidParameter(format!(
                "log-normal scale must be positive, got {scale}"
            )));
        }
        let log_normal = LogNormal::new(scale.ln(), shape)?;
        Ok(self.sample_distr(rng_id, log_normal))
    }

    /// A time-to-death for an illness flagged as lethal at onset.
    pub fn sample_death_time<R: RngId + 'static>(&self, rng_id: R) -> f64 {
        self.sample_distr(rng_id, DeathDelay::new())
    }
}
