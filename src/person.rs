//! A person is a particle of the town's gas that also carries an illness.
//!
//! This module holds the per-person part of the simulation: construction with sampled kinematics
//! and illness parameters, the illness state machine (`set_as_ill`, `set_as_healthy`,
//! `try_to_recover`), wall reflection and the elastic collision with another person. Moving a
//! person on the grid and scanning its neighborhood needs the whole town and lives in
//! [`Town::step_person`](crate::town::Town::step_person).
use std::f64::consts::TAU;
use std::fmt;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::define_rng;
use crate::error::GasTownError;
use crate::parameters::{PersonParameters, Validate};
use crate::random::RandomSource;
use crate::town::TownId;

define_rng!(KinematicsRng);
define_rng!(InfectionRng);
define_rng!(ProgressionRng);

/// Identifies a person within the town hosting it. Identities are never reused.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct PersonId(pub(crate) usize);

impl PersonId {
    #[must_use]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Person {}", self.0)
    }
}

/// A single label for a person's illness state, for display and logging. Ill takes precedence,
/// so an ill person with zero infection probability reads as `Infected`. The town's counts do
/// not go through this label.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum DiseaseStatus {
    Susceptible,
    Infected,
    Recovered,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    /// Unit-square coordinates until the person joins a town, grid coordinates afterwards.
    position: [f64; 2],
    velocity: [f64; 2],
    town: Option<TownId>,
    ill: bool,
    ill_time: f64,
    recovery_time: f64,
    infection_probability: f64,
    death_probability: f64,
    /// Zero when the current illness (if any) is not lethal.
    death_time: f64,
    meet_count: u64,
    infected_count: u64,
}

impl Person {
    /// Creates a person with a uniform position in the unit square, a velocity drawn from the
    /// gas at `parameters.temperature`, possibly already ill part way through its illness.
    ///
    /// # Errors
    ///
    /// Returns `GasTownError::InvalidParameter` if `parameters` do not validate.
    pub fn new(parameters: &PersonParameters, random: &RandomSource) -> Result<Self, GasTownError> {
        parameters.validate()?;

        let position = [
            random.sample_uniform(KinematicsRng),
            random.sample_uniform(KinematicsRng),
        ];
        let theta = random.sample_uniform(KinematicsRng) * TAU;
        let speed = random.sample_speed(KinematicsRng, parameters.temperature)?;

        let mut person = Person {
            position,
            velocity: [speed * theta.cos(), speed * theta.sin()],
            town: None,
            ill: false,
            ill_time: 0.0,
            recovery_time: 0.0,
            infection_probability: parameters.initial_ill_probability,
            death_probability: parameters.death_probability,
            death_time: 0.0,
            meet_count: 0,
            infected_count: 0,
        };
        // The initial illness probability is only used for this first draw.
        person.set_as_ill(random);
        person.infection_probability = parameters.infection_probability;

        let recovery_time = random.sample_gaussian(
            ProgressionRng,
            parameters.mean_recovery_time,
            0.5 * parameters.mean_recovery_time,
        )?;
        person.recovery_time = recovery_time.max(0.0);
        if person.ill {
            // Initial cases are spread uniformly over the course of their illness.
            person.ill_time = random.sample_uniform(ProgressionRng) * person.recovery_time;
        }
        Ok(person)
    }

    /// Creates a healthy, motionless person at the origin with a fixed illness duration. Useful
    /// for placing people by hand with [`Town::add_person_at`](crate::town::Town::add_person_at).
    ///
    /// # Errors
    ///
    /// Returns `GasTownError::InvalidParameter` for probabilities outside `[0, 1]` or a negative
    /// or non-finite `recovery_time`.
    pub fn at_rest(
        infection_probability: f64,
        death_probability: f64,
        recovery_time: f64,
    ) -> Result<Self, GasTownError> {
        let parameters = PersonParameters {
            infection_probability,
            initial_ill_probability: 0.0,
            death_probability,
            mean_recovery_time: recovery_time,
            ..PersonParameters::default()
        };
        parameters.validate()?;
        Ok(Person {
            position: [0.0, 0.0],
            velocity: [0.0, 0.0],
            town: None,
            ill: false,
            ill_time: 0.0,
            recovery_time,
            infection_probability,
            death_probability,
            death_time: 0.0,
            meet_count: 0,
            infected_count: 0,
        })
    }

    /// Makes the person ill with probability `infection_probability`. Whether the illness is
    /// lethal is decided here, once per onset. Returns whether the person became ill.
    pub fn set_as_ill(&mut self, random: &RandomSource) -> bool {
        if self.ill || !random.sample_bool(InfectionRng, self.infection_probability) {
            return false;
        }
        self.ill = true;
        self.ill_time = 0.0;
        if random.sample_bool(InfectionRng, self.death_probability) {
            self.death_time = random.sample_death_time(InfectionRng);
        } else {
            self.death_time = 0.0;
            self.death_probability = 0.0;
        }
        true
    }

    /// Recovery is permanent: the person can never become ill again.
    pub fn set_as_healthy(&mut self) {
        self.ill = false;
        self.ill_time = 0.0;
        self.infection_probability = 0.0;
    }

    /// Advances the illness clock and recovers the person once it exceeds the recovery time,
    /// unless the illness is lethal. Returns whether the person recovered.
    pub fn try_to_recover(&mut self, dt: f64) -> bool {
        if !self.ill {
            return false;
        }
        self.ill_time += dt;
        if self.death_time == 0.0 && self.ill_time > self.recovery_time {
            self.set_as_healthy();
            return true;
        }
        false
    }

    /// Specular reflection off the walls of a grid of side `size`, axis by axis.
    pub fn bounce(&mut self, size: usize) {
        let upper = upper_bound(size);
        for axis in 0..2 {
            if self.position[axis] >= upper {
                self.position[axis] = upper;
                self.velocity[axis] = -self.velocity[axis];
            }
            if self.position[axis] < 0.0 {
                self.position[axis] = 0.0;
                self.velocity[axis] = -self.velocity[axis];
            }
        }
    }

    /// Free flight for `dt` followed by wall reflection.
    pub fn integrate(&mut self, dt: f64, size: usize) {
        for axis in 0..2 {
            self.position[axis] += dt * self.velocity[axis];
        }
        self.bounce(size);
    }

    /// Elastic collision of two equal-mass persons followed by a transmission attempt from
    /// `self` to `other`. Returns whether `other` was infected by this meeting.
    ///
    /// Each velocity is reflected about the pair's center-of-mass velocity, which exchanges the
    /// two velocities. The meeting always happens regardless of distance or relative speed.
    pub fn meet(&mut self, other: &mut Person, random: &RandomSource) -> bool {
        trace!(
            "meeting at distance {:.3} with relative speed {:.3}",
            self.distance_to(other),
            self.relative_speed(other)
        );
        for axis in 0..2 {
            let center_of_mass = 0.5 * (self.velocity[axis] + other.velocity[axis]);
            self.velocity[axis] = 2.0 * center_of_mass - self.velocity[axis];
            other.velocity[axis] = 2.0 * center_of_mass - other.velocity[axis];
        }
        self.meet_count += 1;

        if self.ill && other.set_as_ill(random) {
            self.infected_count += 1;
            return true;
        }
        false
    }

    /// Whether the person is on a lethal trajectory that has run its course.
    #[must_use]
    pub fn is_dying(&self) -> bool {
        self.ill && self.death_time > 0.0 && self.ill_time > self.death_time
    }

    #[must_use]
    pub fn distance_to(&self, other: &Person) -> f64 {
        (self.position[0] - other.position[0]).hypot(self.position[1] - other.position[1])
    }

    #[must_use]
    pub fn relative_speed(&self, other: &Person) -> f64 {
        (self.velocity[0] - other.velocity[0]).hypot(self.velocity[1] - other.velocity[1])
    }

    #[must_use]
    pub fn status(&self) -> DiseaseStatus {
        if self.ill {
            DiseaseStatus::Infected
        } else if self.infection_probability == 0.0 {
            DiseaseStatus::Recovered
        } else {
            DiseaseStatus::Susceptible
        }
    }

    #[must_use]
    pub fn position(&self) -> [f64; 2] {
        self.position
    }

    #[must_use]
    pub fn velocity(&self) -> [f64; 2] {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: [f64; 2]) {
        self.velocity = velocity;
    }

    /// The town currently hosting this person, if any.
    #[must_use]
    pub fn town(&self) -> Option<TownId> {
        self.town
    }

    #[must_use]
    pub fn is_ill(&self) -> bool {
        self.ill
    }

    #[must_use]
    pub fn ill_time(&self) -> f64 {
        self.ill_time
    }

    #[must_use]
    pub fn recovery_time(&self) -> f64 {
        self.recovery_time
    }

    #[must_use]
    pub fn infection_probability(&self) -> f64 {
        self.infection_probability
    }

    #[must_use]
    pub fn death_probability(&self) -> f64 {
        self.death_probability
    }

    #[must_use]
    pub fn death_time(&self) -> f64 {
        self.death_time
    }

    #[must_use]
    pub fn meet_count(&self) -> u64 {
        self.meet_count
    }

    #[must_use]
    pub fn infected_count(&self) -> u64 {
        self.infected_count
    }

    pub(crate) fn set_position(&mut self, position: [f64; 2]) {
        self.position = position;
    }

    /// Associates the person with `town`, scaling its unit-square position to grid coordinates.
    pub(crate) fn join_town(&mut self, town: TownId, size: usize) {
        let upper = upper_bound(size);
        self.position = [self.position[0] * upper, self.position[1] * upper];
        self.town = Some(town);
    }

    /// Associates the person with `town` at grid coordinates `position`.
    pub(crate) fn join_town_at(&mut self, town: TownId, position: [f64; 2]) {
        self.position = position;
        self.town = Some(town);
    }

    /// Clears the town association, mapping the position back to the unit square.
    pub(crate) fn leave_town(&mut self, size: usize) {
        let upper = upper_bound(size);
        if upper > 0.0 {
            self.position = [self.position[0] / upper, self.position[1] / upper];
        } else {
            self.position = [0.0, 0.0];
        }
        self.town = None;
    }
}

/// Largest coordinate reachable on a grid of side `size`.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn upper_bound(size: usize) -> f64 {
    size.saturating_sub(1) as f64
}
