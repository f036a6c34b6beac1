use std::any::TypeId;
use std::cell::{RefCell, RefMut};
use std::fmt;

use log::trace;

use crate::hashing::{hash_str, HashMap};
use crate::rand::distr::Distribution;
use crate::rand::{Rng, SeedableRng};
use crate::random::{RngHolder, RngId};

/// A seedable provider of independent random number streams.
///
/// Streams are created the first time they are used, seeded from the base seed offset by a hash
/// of the stream's name. They live in a `RefCell` so that sampling only needs `&self`; a
/// `RandomSource` is therefore not `Sync` and belongs to a single simulation.
pub struct RandomSource {
    base_seed: u64,
    rng_holders: RefCell<HashMap<TypeId, RngHolder>>,
}

impl RandomSource {
    #[must_use]
    pub fn new(base_seed: u64) -> Self {
        trace!("initializing random source (seed={base_seed})");
        RandomSource {
            base_seed,
            rng_holders: RefCell::new(HashMap::default()),
        }
    }

    #[must_use]
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Changes the base seed. Existing streams are dropped so that they get re-seeded the next
    /// time they are used.
    pub fn reseed(&mut self, base_seed: u64) {
        trace!("reseeding random source (seed={base_seed})");
        self.base_seed = base_seed;
        self.rng_holders.get_mut().clear();
    }

    /// Gets a mutable reference to the random number generator associated with the given
    /// [`RngId`], creating it if it has not been used before.
    fn get_rng<R: RngId + 'static>(&self) -> RefMut<'_, R::RngType> {
        let base_seed = self.base_seed;
        let rng_holders = self.rng_holders.borrow_mut();
        RefMut::map(rng_holders, |holders| {
            holders
                .entry(TypeId::of::<R>())
                .or_insert_with(|| {
                    trace!(
                        "creating new RNG (seed={}) for stream {}",
                        base_seed,
                        R::get_name()
                    );
                    let seed_offset = hash_str(R::get_name());
                    RngHolder {
                        rng: Box::new(R::RngType::seed_from_u64(
                            base_seed.wrapping_add(seed_offset),
                        )),
                    }
                })
                .rng
                .downcast_mut::<R::RngType>()
                .expect("rng streams are keyed by the TypeId of their RngId")
        })
    }

    /// Gets a random sample from the stream associated with the given [`RngId`] by applying the
    /// specified sampler function.
    pub fn sample<R: RngId + 'static, T>(
        &self,
        _rng_type: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T {
        let mut rng = self.get_rng::<R>();
        sampler(&mut rng)
    }

    /// Gets a random sample from the specified distribution using the stream associated with the
    /// given [`RngId`].
    pub fn sample_distr<R: RngId + 'static, T>(
        &self,
        _rng_type: R,
        distribution: impl Distribution<T>,
    ) -> T {
        let mut rng = self.get_rng::<R>();
        distribution.sample::<R::RngType>(&mut rng)
    }

    /// Gets a random boolean value which is true with probability `p`.
    pub fn sample_bool<R: RngId + 'static>(&self, rng_id: R, p: f64) -> bool {
        self.sample(rng_id, |rng| rng.random_bool(p))
    }

    /// A uniform real in `[0, 1)`.
    pub fn sample_uniform<R: RngId + 'static>(&self, rng_id: R) -> f64 {
        self.sample(rng_id, |rng| rng.random::<f64>())
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        RandomSource::new(0)
    }
}

impl fmt::Debug for RandomSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomSource")
            .field("base_seed", &self.base_seed)
            .field("streams", &self.rng_holders.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::RandomSource;
    use crate::define_rng;
    use crate::rand::distr::weighted::WeightedIndex;
    use crate::rand::RngCore;

    define_rng!(SourceFooRng);
    define_rng!(SourceBarRng);

    #[test]
    fn get_rng_basic() {
        let random = RandomSource::new(42);

        assert_ne!(
            random.sample(SourceFooRng, RngCore::next_u64),
            random.sample(SourceFooRng, RngCore::next_u64)
        );
    }

    #[test]
    fn multiple_rng_types() {
        let random = RandomSource::new(42);

        assert_ne!(
            random.sample(SourceFooRng, RngCore::next_u64),
            random.sample(SourceBarRng, RngCore::next_u64)
        );
    }

    #[test]
    fn reset_seed() {
        let mut random = RandomSource::new(42);

        let run_0 = random.sample(SourceFooRng, RngCore::next_u64);
        let run_1 = random.sample(SourceFooRng, RngCore::next_u64);

        // Reset with same seed, ensure we get the same values
        random.reseed(42);
        assert_eq!(run_0, random.sample(SourceFooRng, RngCore::next_u64));
        assert_eq!(run_1, random.sample(SourceFooRng, RngCore::next_u64));

        // Reset with different seed, ensure we get different values
        random.reseed(88);
        assert_eq!(random.base_seed(), 88);
        assert_ne!(run_0, random.sample(SourceFooRng, RngCore::next_u64));
        assert_ne!(run_1, random.sample(SourceFooRng, RngCore::next_u64));
    }

    #[test]
    fn streams_are_independent_of_interleaving() {
        let a = RandomSource::new(7);
        let b = RandomSource::new(7);

        let a_foo: Vec<u64> = (0..5)
            .map(|_| {
                a.sample(SourceBarRng, RngCore::next_u64);
                a.sample(SourceFooRng, RngCore::next_u64)
            })
            .collect();
        let b_foo: Vec<u64> = (0..5)
            .map(|_| b.sample(SourceFooRng, RngCore::next_u64))
            .collect();
        assert_eq!(a_foo, b_foo);
    }

    #[test]
    fn sample_distribution() {
        let random = RandomSource::new(42);

        // Zero is selected with probability 1/3, one with a probability of 2/3.
        let weights = WeightedIndex::new(vec![1.0, 2.0]).unwrap();

        let n_samples = 3000;
        let mut zero_counter = 0;
        for _ in 0..n_samples {
            let sample = random.sample_distr(SourceFooRng, &weights);
            if sample == 0 {
                zero_counter += 1;
            }
        }
        // The expected value of `zero_counter` is 1000.
        assert!((zero_counter - 1000_i32).abs() < 100);
    }

    #[test]
    fn sample_bool() {
        let random = RandomSource::new(42);
        assert!(random.sample_bool(SourceFooRng, 1.0));
        assert!(!random.sample_bool(SourceFooRng, 0.0));
    }

    #[test]
    fn sample_uniform() {
        let random = RandomSource::new(42);
        for _ in 0..1000 {
            let u = random.sample_uniform(SourceBarRng);
            assert!((0.0..1.0).contains(&u));
        }
    }
}
