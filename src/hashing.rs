//! This module provides a deterministic hasher and `HashMap` and `HashSet` variants that use
//! it. The hashing data structures in the standard library are not deterministic:
//!
//! > By default, HashMap uses a hashing algorithm selected to provide
//! > resistance against HashDoS attacks. The algorithm is randomly seeded, and a
//! > reasonable best-effort is made to generate this seed from a high quality,
//! > secure source of randomness provided by the host without blocking the program.
//!
//! Use `HashMap::default()` to create a new hashmap with the deterministic hasher.
//!
//! The `hash_str` free function derives the per-stream seed offsets in
//! `crate::random::RandomSource`.

use xxhash_rust::xxh3::xxh3_64;

pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

/// A convenience method to compute the hash of a `&str`. The result is stable
/// across runs, platforms and builds.
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}
