//! An agent-based epidemic simulator in which a town is modeled as a 2D ideal gas.
//!
//! Every person is a particle with a position and a velocity drawn from a
//! Maxwell-Boltzmann speed distribution. People move in straight lines, reflect
//! off the walls of the town, and collide elastically with whoever occupies an
//! adjacent cell of the town's grid. A collision with an ill person may transmit
//! the disease. Ill people either recover, becoming permanently immune, or die
//! after a sampled delay.
//!
//! The central object is the [`Town`](town::Town), which owns:
//! * the population of live [`Person`](person::Person)s,
//! * a fixed-size [`Grid`](grid::Grid) used for proximity queries,
//! * a seedable [`RandomSource`](random::RandomSource) through which all
//!   randomness in the simulation flows.
//!
//! A driver repeatedly calls [`Town::step`](town::Town::step) and reads the
//! aggregate statistics exposed in [`statistics`]:
//!
//! ```rust
//! use gastown::prelude::*;
//!
//! let parameters = TownParameters {
//!     population_size: 50,
//!     grid_size: 20,
//!     ..TownParameters::default()
//! };
//! let mut town = Town::from_parameters(&parameters, RandomSource::new(42)).unwrap();
//! for _ in 0..10 {
//!     town.step(0.5).unwrap();
//! }
//! assert!(town.n_ill() + town.n_recovered() + town.n_susceptible() <= 50);
//! ```
//!
//! The [`runner`] module provides a command line driver that records the
//! statistics as a CSV time series.
pub mod error;
pub mod execution_stats;
pub mod grid;
pub mod hashing;
pub mod log;
pub mod parameters;
pub mod person;
pub mod random;
pub mod report;
pub mod runner;
pub mod statistics;
pub mod town;

pub mod prelude;

// Re-export for macros
pub use paste;
pub use rand;

pub use error::GasTownError;
pub use grid::{Cell, Grid};
pub use parameters::{PersonParameters, SimulationParameters, TownParameters};
pub use person::{DiseaseStatus, Person, PersonId};
pub use random::{RandomSource, RngId};
pub use statistics::TownStatistics;
pub use town::{Town, TownId};
