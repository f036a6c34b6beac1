//! The random sampling provider.
//!
//! All randomness in the simulation flows through a [`RandomSource`]. A source is created from a
//! base seed and hands out any number of independent, lazily created random number generator
//! streams. Each stream is identified by a type implementing [`RngId`], usually declared with
//! [`define_rng!`]:
//!
//! ```rust
//! use gastown::define_rng;
//! use gastown::random::RandomSource;
//!
//! define_rng!(MovementRng);
//!
//! let random = RandomSource::new(42);
//! let u = random.sample_uniform(MovementRng);
//! assert!((0.0..1.0).contains(&u));
//! ```
//!
//! Two sources built from the same seed produce the same samples on every stream, regardless of
//! how draws on the different streams are interleaved.
mod distributions;
mod macros;
mod source;

use std::any::Any;

pub use distributions::{
    DeathDelay, MaxwellBoltzmann2D, DEATH_DELAY_MAX, DEATH_DELAY_MEDIAN, DEATH_DELAY_MIN,
    DEATH_DELAY_SHAPE, MAX_SPEED,
};
pub use macros::define_rng;
pub use source::RandomSource;

use crate::rand::{Rng, SeedableRng};

pub trait RngId: Copy + Clone {
    type RngType: SeedableRng + Rng + 'static;
    fn get_name() -> &'static str;
}

// This is a wrapper that allows for future support for different types of
// random number generators (anything that implements SeedableRng is valid).
struct RngHolder {
    rng: Box<dyn Any>,
}
