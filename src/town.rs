//! The town: a square grid of side `size` holding a population of people.
//!
//! The town owns its people and its [`RandomSource`]. People are kept in a `BTreeMap` keyed by
//! [`PersonId`], so every whole-population pass (stepping, statistics, grid reconciliation) runs
//! in ascending id order and a run is reproducible from its seed.
//!
//! Within a tick each person is stepped in turn: it leaves its cell, flies for `dt` and reflects
//! off the walls, registers in its new cell, then meets every occupant of the eight surrounding
//! cells. Once everyone has moved the grid is rebuilt from the people's positions. Where two
//! people share a cell the one with the larger id holds it.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, trace};

use crate::error::GasTownError;
use crate::grid::{Cell, Grid};
use crate::parameters::{TownParameters, Validate};
use crate::person::{upper_bound, Person, PersonId};
use crate::random::RandomSource;

static NEXT_TOWN_ID: AtomicU64 = AtomicU64::new(0);

/// Identifies a town for the lifetime of the process.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct TownId(pub(crate) u64);

impl fmt::Display for TownId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Town {}", self.0)
    }
}

#[derive(Debug)]
pub struct Town {
    id: TownId,
    name: String,
    size: usize,
    grid: Grid,
    population: BTreeMap<PersonId, Person>,
    next_person_id: usize,
    random: RandomSource,
    n_dead: usize,
    elapsed_time: f64,
    n_ticks: usize,
}

impl Town {
    /// Creates an empty town with a grid of side `size`.
    ///
    /// # Errors
    ///
    /// Returns `GasTownError::InvalidParameter` if `size` is zero or too large.
    pub fn new(
        name: impl Into<String>,
        size: usize,
        random: RandomSource,
    ) -> Result<Self, GasTownError> {
        let grid = Grid::new(size)?;
        Ok(Town {
            id: TownId(NEXT_TOWN_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            size,
            grid,
            population: BTreeMap::new(),
            next_person_id: 0,
            random,
            n_dead: 0,
            elapsed_time: 0.0,
            n_ticks: 0,
        })
    }

    /// Creates a town and synthesizes `parameters.population_size` people sharing the
    /// parameters, drawing all their randomness from `random`.
    ///
    /// # Errors
    ///
    /// Returns `GasTownError::InvalidParameter` if `parameters` do not validate.
    pub fn from_parameters(
        parameters: &TownParameters,
        random: RandomSource,
    ) -> Result<Self, GasTownError> {
        parameters.validate()?;
        let mut town = Town::new(parameters.name.clone(), parameters.grid_size, random)?;
        let person_parameters = parameters.person_parameters();
        for _ in 0..parameters.population_size {
            let person = Person::new(&person_parameters, &town.random)?;
            town.add_person(person)?;
        }
        debug!(
            "{} ({}) populated with {} people on a {}x{} grid, {} initially ill",
            town.name,
            town.id,
            town.population_size(),
            town.size,
            town.size,
            town.population.values().filter(|p| p.is_ill()).count()
        );
        Ok(town)
    }

    /// Adds a person created with a unit-square position, scaling the position to this town's
    /// grid and placing the person on it.
    ///
    /// # Errors
    ///
    /// Returns `GasTownError::GasTownError` if the person still belongs to a town. Use
    /// [`Town::take_person`] to move a person between towns.
    pub fn add_person(&mut self, mut person: Person) -> Result<PersonId, GasTownError> {
        check_unassigned(&person)?;
        person.join_town(self.id, self.size);
        Ok(self.insert(person))
    }

    /// Adds a person at explicit grid coordinates, leaving its velocity and illness untouched.
    ///
    /// # Errors
    ///
    /// Returns `GasTownError::InvalidParameter` if `position` lies outside `[0, size - 1]` on
    /// either axis, or `GasTownError::GasTownError` if the person still belongs to a town.
    pub fn add_person_at(
        &mut self,
        mut person: Person,
        position: [f64; 2],
    ) -> Result<PersonId, GasTownError> {
        check_unassigned(&person)?;
        let upper = upper_bound(self.size);
        if !position.iter().all(|c| (0.0..=upper).contains(c)) {
            return Err(GasTownError::InvalidParameter(format!(
                "position {position:?} is outside the grid of {}",
                self.name
            )));
        }
        person.join_town_at(self.id, position);
        Ok(self.insert(person))
    }

    fn insert(&mut self, person: Person) -> PersonId {
        let person_id = PersonId(self.next_person_id);
        self.next_person_id += 1;
        let cell = self.grid.cell_of(person.position());
        self.population.insert(person_id, person);
        self.grid.put(cell, person_id);
        trace!("added {person_id} to {} at {cell:?}", self.name);
        person_id
    }

    /// Removes a person who died, clearing its cell. The identity is never reused.
    pub fn delete_person(&mut self, person_id: PersonId) -> Option<Person> {
        let mut person = self.detach(person_id)?;
        person.leave_town(self.size);
        self.n_dead += 1;
        trace!("{person_id} died in {}", self.name);
        Some(person)
    }

    /// Detaches a living person so that it can be added to another town. The returned person
    /// has no town and its position is mapped back to the unit square.
    pub fn take_person(&mut self, person_id: PersonId) -> Option<Person> {
        let mut person = self.detach(person_id)?;
        person.leave_town(self.size);
        trace!("{person_id} left {}", self.name);
        Some(person)
    }

    fn detach(&mut self, person_id: PersonId) -> Option<Person> {
        let person = self.population.remove(&person_id)?;
        let cell = self.grid.cell_of(person.position());
        self.grid.clear_if(cell, person_id);
        Some(person)
    }

    /// Registers a person in the cell of its current position, replacing any occupant.
    /// Returns `false` if the person is not in this town.
    pub fn put_person(&mut self, person_id: PersonId) -> bool {
        match self.population.get(&person_id) {
            Some(person) => {
                let cell = self.grid.cell_of(person.position());
                self.grid.put(cell, person_id);
                true
            }
            None => false,
        }
    }

    /// Clears the cell of a person's current position if the person holds it.
    /// Returns whether the cell was cleared.
    pub fn remove_person(&mut self, person_id: PersonId) -> bool {
        match self.population.get(&person_id) {
            Some(person) => {
                let cell = self.grid.cell_of(person.position());
                self.grid.clear_if(cell, person_id)
            }
            None => false,
        }
    }

    /// Advances every person alive at the start of the tick by `dt`.
    ///
    /// # Errors
    ///
    /// Returns `GasTownError::InvalidTimeStep` if `dt` is negative or not finite. The town is
    /// left untouched in that case.
    pub fn step(&mut self, dt: f64) -> Result<(), GasTownError> {
        if dt < 0.0 || !dt.is_finite() {
            return Err(GasTownError::InvalidTimeStep(dt));
        }
        let live: Vec<PersonId> = self.population.keys().copied().collect();
        for person_id in live {
            self.step_person(person_id, dt);
        }
        self.grid.rebuild(
            self.population
                .iter()
                .map(|(person_id, person)| (*person_id, person.position())),
        );
        self.elapsed_time += dt;
        self.n_ticks += 1;
        trace!(
            "{} tick {} at t={:.3}: {} alive, {} dead",
            self.name,
            self.n_ticks,
            self.elapsed_time,
            self.population.len(),
            self.n_dead
        );
        Ok(())
    }

    /// Moves one person by `dt`, lets it meet its neighbors and advances its illness.
    /// Returns `false` if the person is not in this town or died during the step.
    pub fn step_person(&mut self, person_id: PersonId, dt: f64) -> bool {
        let Some(mut person) = self.population.remove(&person_id) else {
            return false;
        };
        let old_cell = self.grid.cell_of(person.position());
        self.grid.clear_if(old_cell, person_id);

        person.integrate(dt, self.size);
        let cell = self.grid.cell_of(person.position());
        self.grid.put(cell, person_id);

        self.meet_neighbors(&mut person, cell);

        person.try_to_recover(dt);
        if person.is_dying() {
            self.grid.clear_if(cell, person_id);
            person.leave_town(self.size);
            self.n_dead += 1;
            trace!(
                "{person_id} died in {} after {:.3} of illness",
                self.name,
                person.ill_time()
            );
            return false;
        }
        self.population.insert(person_id, person);
        true
    }

    fn meet_neighbors(&mut self, person: &mut Person, cell: Cell) {
        for neighbor_cell in self.grid.neighbors(cell) {
            let Some(other_id) = self.grid.get(neighbor_cell) else {
                continue;
            };
            if let Some(other) = self.population.get_mut(&other_id) {
                if person.meet(other, &self.random) {
                    trace!("transmission to {other_id} in {}", self.name);
                }
            }
        }
    }

    #[must_use]
    pub fn id(&self) -> TownId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn person(&self, person_id: PersonId) -> Option<&Person> {
        self.population.get(&person_id)
    }

    /// Mutable access to a person. Positions can only change by stepping, so the grid stays
    /// consistent.
    pub fn person_mut(&mut self, person_id: PersonId) -> Option<&mut Person> {
        self.population.get_mut(&person_id)
    }

    /// The live population in ascending id order.
    pub fn people(&self) -> impl Iterator<Item = (PersonId, &Person)> {
        self.population
            .iter()
            .map(|(person_id, person)| (*person_id, person))
    }

    #[must_use]
    pub fn population_size(&self) -> usize {
        self.population.len()
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn random(&self) -> &RandomSource {
        &self.random
    }

    pub fn random_mut(&mut self) -> &mut RandomSource {
        &mut self.random
    }

    /// Number of people who died in this town so far.
    #[must_use]
    pub fn n_dead(&self) -> usize {
        self.n_dead
    }

    /// Simulated time accumulated over all ticks.
    #[must_use]
    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    #[must_use]
    pub fn n_ticks(&self) -> usize {
        self.n_ticks
    }
}

fn check_unassigned(person: &Person) -> Result<(), GasTownError> {
    match person.town() {
        Some(town_id) => Err(GasTownError::GasTownError(format!(
            "person already belongs to {town_id}"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::PersonParameters;
    use crate::person::DiseaseStatus;

    fn small_town(seed: u64) -> Town {
        let parameters = TownParameters {
            population_size: 200,
            grid_size: 30,
            initial_infected_fraction: 0.2,
            temperature: 4.0,
            mean_recovery_time: 10.0,
            death_probability: 0.2,
            ..TownParameters::default()
        };
        Town::from_parameters(&parameters, RandomSource::new(seed)).unwrap()
    }

    fn assert_grid_consistent(town: &Town) {
        for (person_id, person) in town.people() {
            let cell = town.grid().cell_of(person.position());
            let occupant = town.grid().get(cell).unwrap();
            let winner = town
                .people()
                .filter(|(_, other)| town.grid().cell_of(other.position()) == cell)
                .map(|(id, _)| id)
                .max()
                .unwrap();
            assert_eq!(occupant, winner, "{person_id} in {cell:?}");
        }
        for (cell, occupant) in town.grid().occupied() {
            let person = town.person(occupant).unwrap();
            assert_eq!(town.grid().cell_of(person.position()), cell);
        }
    }

    #[test]
    fn from_parameters_places_everyone() {
        let town = small_town(1);
        assert_eq!(town.population_size(), 200);
        assert_eq!(town.name(), "COVIDVille");
        assert_eq!(town.size(), 30);
        for (_, person) in town.people() {
            assert_eq!(person.town(), Some(town.id()));
            assert!(person.position().iter().all(|c| (0.0..=29.0).contains(c)));
        }
        assert_grid_consistent(&town);
    }

    #[test]
    fn from_parameters_rejects_invalid() {
        let parameters = TownParameters {
            grid_size: 0,
            ..TownParameters::default()
        };
        assert!(matches!(
            Town::from_parameters(&parameters, RandomSource::new(0)),
            Err(GasTownError::InvalidParameter(_))
        ));
    }

    #[test]
    fn towns_have_distinct_ids() {
        let a = Town::new("A", 5, RandomSource::new(0)).unwrap();
        let b = Town::new("B", 5, RandomSource::new(0)).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn people_stay_inside_and_grid_stays_consistent() {
        let mut town = small_town(2);
        for _ in 0..50 {
            town.step(0.5).unwrap();
            for (_, person) in town.people() {
                assert!(person.position().iter().all(|c| (0.0..=29.0).contains(c)));
            }
            assert_grid_consistent(&town);
        }
        assert_eq!(town.n_ticks(), 50);
        assert!((town.elapsed_time() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn counters_never_decrease() {
        let mut town = small_town(3);
        let mut previous: BTreeMap<PersonId, (u64, u64)> = BTreeMap::new();
        for _ in 0..30 {
            town.step(1.0).unwrap();
            for (person_id, person) in town.people() {
                let counts = (person.meet_count(), person.infected_count());
                if let Some(before) = previous.get(&person_id) {
                    assert!(counts.0 >= before.0 && counts.1 >= before.1);
                }
                previous.insert(person_id, counts);
            }
        }
    }

    #[test]
    fn lethal_illness_removes_person() {
        let mut town = Town::new("Deadwood", 10, RandomSource::new(4)).unwrap();
        let mut person = Person::at_rest(1.0, 1.0, 1000.0).unwrap();
        person.set_as_ill(town.random());
        let person_id = town.add_person_at(person, [2.0, 2.0]).unwrap();

        for _ in 0..30 {
            town.step(1.0).unwrap();
        }
        assert!(town.person(person_id).is_none());
        assert_eq!(town.population_size(), 0);
        assert_eq!(town.n_dead(), 1);
        assert_eq!(town.grid().n_occupied(), 0);
    }

    #[test]
    fn zero_dt_is_allowed_and_invalid_dt_is_rejected() {
        let parameters = TownParameters {
            population_size: 100,
            grid_size: 30,
            death_probability: 0.0,
            ..TownParameters::default()
        };
        let mut town = Town::from_parameters(&parameters, RandomSource::new(5)).unwrap();
        let before: Vec<[f64; 2]> = town.people().map(|(_, p)| p.position()).collect();
        town.step(0.0).unwrap();
        let after: Vec<[f64; 2]> = town.people().map(|(_, p)| p.position()).collect();
        assert_eq!(before, after);

        for dt in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                town.step(dt),
                Err(GasTownError::InvalidTimeStep(_))
            ));
        }
        assert_eq!(town.n_ticks(), 1);
    }

    #[test]
    fn take_person_moves_between_towns() {
        let mut from = Town::new("From", 11, RandomSource::new(6)).unwrap();
        let mut to = Town::new("To", 21, RandomSource::new(7)).unwrap();
        let person_id = from
            .add_person_at(Person::at_rest(0.5, 0.0, 1.0).unwrap(), [5.0, 10.0])
            .unwrap();

        let person = from.take_person(person_id).unwrap();
        assert_eq!(person.town(), None);
        assert_eq!(person.position(), [0.5, 1.0]);
        assert_eq!(from.population_size(), 0);
        assert_eq!(from.grid().n_occupied(), 0);
        assert_eq!(from.n_dead(), 0);

        let new_id = to.add_person(person).unwrap();
        let person = to.person(new_id).unwrap();
        assert_eq!(person.town(), Some(to.id()));
        assert_eq!(person.position(), [10.0, 20.0]);
        assert_eq!(to.grid().get(Cell::new(10, 20)), Some(new_id));
    }

    #[test]
    fn hosted_person_cannot_be_added_twice() {
        let mut town = Town::new("Twice", 5, RandomSource::new(8)).unwrap();
        let person_id = town
            .add_person_at(Person::at_rest(0.5, 0.0, 1.0).unwrap(), [1.0, 1.0])
            .unwrap();
        let copy = town.person(person_id).unwrap().clone();
        assert!(matches!(
            town.add_person(copy),
            Err(GasTownError::GasTownError(_))
        ));
    }

    #[test]
    fn add_person_at_checks_bounds() {
        let mut town = Town::new("Bounds", 5, RandomSource::new(8)).unwrap();
        for position in [[4.5, 1.0], [-0.1, 1.0], [1.0, f64::NAN]] {
            assert!(matches!(
                town.add_person_at(Person::at_rest(0.5, 0.0, 1.0).unwrap(), position),
                Err(GasTownError::InvalidParameter(_))
            ));
        }
        assert!(town
            .add_person_at(Person::at_rest(0.5, 0.0, 1.0).unwrap(), [4.0, 0.0])
            .is_ok());
    }

    #[test]
    fn put_and_remove_person() {
        let mut town = Town::new("Cells", 5, RandomSource::new(9)).unwrap();
        let first = town
            .add_person_at(Person::at_rest(0.5, 0.0, 1.0).unwrap(), [1.2, 1.8])
            .unwrap();
        let second = town
            .add_person_at(Person::at_rest(0.5, 0.0, 1.0).unwrap(), [1.7, 1.1])
            .unwrap();
        let cell = Cell::new(1, 1);
        assert_eq!(town.grid().get(cell), Some(second));

        // The replaced person does not own the cell.
        assert!(!town.remove_person(first));
        assert!(town.put_person(first));
        assert_eq!(town.grid().get(cell), Some(first));
        assert!(town.remove_person(first));
        assert_eq!(town.grid().get(cell), None);

        assert!(!town.put_person(PersonId(99)));
        assert!(!town.remove_person(PersonId(99)));
    }

    #[test]
    fn delete_person_counts_a_death() {
        let mut town = Town::new("Gone", 5, RandomSource::new(10)).unwrap();
        let person_id = town
            .add_person_at(Person::at_rest(0.5, 0.0, 1.0).unwrap(), [3.0, 3.0])
            .unwrap();
        assert!(town.delete_person(person_id).is_some());
        assert!(town.delete_person(person_id).is_none());
        assert_eq!(town.n_dead(), 1);
        assert_eq!(town.grid().get(Cell::new(3, 3)), None);
        assert!(!town.step_person(person_id, 1.0));
    }

    #[test]
    fn adjacent_contact_transmits() {
        let mut town = Town::new("Contact", 10, RandomSource::new(11)).unwrap();
        let mut ill = Person::at_rest(1.0, 0.0, 1000.0).unwrap();
        ill.set_as_ill(town.random());
        let ill_id = town.add_person_at(ill, [5.0, 5.0]).unwrap();
        let healthy_id = town
            .add_person_at(Person::at_rest(1.0, 0.0, 1000.0).unwrap(), [5.0, 6.0])
            .unwrap();

        town.step(1.0).unwrap();

        assert!(town.person(healthy_id).unwrap().is_ill());
        assert_eq!(town.person(ill_id).unwrap().infected_count(), 1);
        assert_eq!(
            town.person(healthy_id).unwrap().status(),
            DiseaseStatus::Infected
        );
    }

    #[test]
    fn same_seed_same_history() {
        let mut a = small_town(12);
        let mut b = small_town(12);
        for _ in 0..20 {
            a.step(1.0).unwrap();
            b.step(1.0).unwrap();
        }
        let a_people: Vec<&Person> = a.people().map(|(_, p)| p).collect();
        let b_people: Vec<&Person> = b.people().map(|(_, p)| p).collect();
        assert_eq!(a_people.len(), b_people.len());
        for (p, q) in a_people.iter().zip(b_people.iter()) {
            assert_eq!(p.position(), q.position());
            assert_eq!(p.status(), q.status());
        }
        assert_eq!(a.n_dead(), b.n_dead());
    }

    #[test]
    fn town_synthesized_people_use_town_parameters() {
        let parameters = TownParameters {
            population_size: 20,
            initial_infected_fraction: 1.0,
            death_probability: 0.0,
            ..TownParameters::default()
        };
        let town = Town::from_parameters(&parameters, RandomSource::new(13)).unwrap();
        let expected = PersonParameters::default().infection_probability;
        for (_, person) in town.people() {
            assert!(person.is_ill());
            assert_eq!(person.infection_probability(), expected);
        }
    }
}
