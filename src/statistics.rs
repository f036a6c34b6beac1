//! Aggregate queries over a town's live population.
//!
//! Every query walks the population on each call; nothing is cached. The dead are not part of
//! the population, so only [`Town::n_dead`] remembers them.
//!
//! The ill, recovered and susceptible counts are independent predicates, not a partition. An
//! ill person with zero infection probability is counted as both ill and recovered.
use serde::{Deserialize, Serialize};

use crate::town::Town;

/// Ill people less than this far through their illness are left out of
/// [`Town::n_transmission_per_infected`].
pub const MIN_ILLNESS_PROGRESS: f64 = 0.1;

/// A snapshot of the town's statistics, one row of the runner's time series.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TownStatistics {
    pub time: f64,
    pub ill: usize,
    pub recovered: usize,
    pub susceptible: usize,
    pub dead: usize,
    pub meetings: u64,
    pub transmission_per_infected: f64,
}

crate::create_report_trait!(TownStatistics);

impl Town {
    #[must_use]
    pub fn n_ill(&self) -> usize {
        self.people().filter(|(_, person)| person.is_ill()).count()
    }

    /// People who can no longer be infected, whether or not they are still ill.
    #[must_use]
    pub fn n_recovered(&self) -> usize {
        self.people()
            .filter(|(_, person)| person.infection_probability() == 0.0)
            .count()
    }

    #[must_use]
    pub fn n_susceptible(&self) -> usize {
        self.people()
            .filter(|(_, person)| !person.is_ill() && person.infection_probability() > 0.0)
            .count()
    }

    /// Total meetings initiated by the living.
    #[must_use]
    pub fn n_meet(&self) -> u64 {
        self.people().map(|(_, person)| person.meet_count()).sum()
    }

    /// The average, over ill people past the first tenth of their illness, of the number of
    /// people they infected divided by the fraction of the illness elapsed. This extrapolates
    /// each case to the number of transmissions over a full illness. Zero when nobody
    /// qualifies.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn n_transmission_per_infected(&self) -> f64 {
        let (total, count) = self
            .people()
            .filter_map(|(_, person)| {
                if !person.is_ill() || person.ill_time() <= 0.0 || person.recovery_time() <= 0.0
                {
                    return None;
                }
                let progress = person.ill_time() / person.recovery_time();
                (progress > MIN_ILLNESS_PROGRESS)
                    .then(|| person.infected_count() as f64 / progress)
            })
            .fold((0.0, 0_usize), |(total, count), rate| (total + rate, count + 1));
        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }

    #[must_use]
    pub fn n_alive(&self) -> usize {
        self.population_size()
    }

    #[must_use]
    pub fn statistics(&self) -> TownStatistics {
        TownStatistics {
            time: self.elapsed_time(),
            ill: self.n_ill(),
            recovered: self.n_recovered(),
            susceptible: self.n_susceptible(),
            dead: self.n_dead(),
            meetings: self.n_meet(),
            transmission_per_infected: self.n_transmission_per_infected(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::TownParameters;
    use crate::person::{DiseaseStatus, Person};
    use crate::random::RandomSource;
    use approx::assert_abs_diff_eq;

    #[test]
    fn empty_town_reports_zero() {
        let parameters = TownParameters {
            population_size: 0,
            ..TownParameters::default()
        };
        let town = Town::from_parameters(&parameters, RandomSource::new(0)).unwrap();
        assert_eq!(town.n_ill(), 0);
        assert_eq!(town.n_recovered(), 0);
        assert_eq!(town.n_susceptible(), 0);
        assert_eq!(town.n_meet(), 0);
        assert_eq!(town.n_transmission_per_infected(), 0.0);
        assert_eq!(town.n_alive(), 0);
        assert_eq!(
            town.statistics(),
            TownStatistics {
                time: 0.0,
                ill: 0,
                recovered: 0,
                susceptible: 0,
                dead: 0,
                meetings: 0,
                transmission_per_infected: 0.0,
            }
        );
    }

    #[test]
    fn status_counts_stay_within_the_population() {
        let parameters = TownParameters {
            population_size: 300,
            grid_size: 40,
            initial_infected_fraction: 0.3,
            mean_recovery_time: 5.0,
            death_probability: 0.1,
            ..TownParameters::default()
        };
        let mut town = Town::from_parameters(&parameters, RandomSource::new(1)).unwrap();
        for _ in 0..20 {
            town.step(1.0).unwrap();
            let alive = town.n_alive();
            assert!(town.n_ill() + town.n_susceptible() <= alive);
            assert!(town.n_recovered() + town.n_susceptible() <= alive);
            assert!(town.n_ill() + town.n_recovered() + town.n_susceptible() >= alive);
            assert_eq!(town.n_alive() + town.n_dead(), 300);
        }
    }

    #[test]
    fn immune_initial_cases_count_as_ill_and_recovered() {
        let parameters = TownParameters {
            population_size: 10,
            initial_infected_fraction: 1.0,
            infection_probability: 0.0,
            death_probability: 0.0,
            ..TownParameters::default()
        };
        let town = Town::from_parameters(&parameters, RandomSource::new(1)).unwrap();
        assert_eq!(town.n_ill(), 10);
        assert_eq!(town.n_recovered(), 10);
        assert_eq!(town.n_susceptible(), 0);
        assert!(town
            .people()
            .all(|(_, person)| person.status() == DiseaseStatus::Infected));
    }

    #[test]
    fn transmission_rate_skips_early_cases() {
        let mut town = Town::new("Rates", 10, RandomSource::new(2)).unwrap();
        let mut spreader = Person::at_rest(1.0, 0.0, 10.0).unwrap();
        spreader.set_as_ill(town.random());
        let spreader_id = town.add_person_at(spreader, [1.0, 1.0]).unwrap();
        let victim_id = town
            .add_person_at(Person::at_rest(1.0, 0.0, 10.0).unwrap(), [1.0, 2.0])
            .unwrap();

        // After one tick the spreader is a tenth through its illness, which does not count.
        // The victim is also a tenth through.
        town.step(1.0).unwrap();
        assert_eq!(town.person(spreader_id).unwrap().infected_count(), 1);
        assert!(town.person(victim_id).unwrap().is_ill());
        assert_eq!(town.n_transmission_per_infected(), 0.0);

        // At 2/10 the spreader counts 1 / 0.2; the victim, ill since the same tick, counts 0.
        town.step(1.0).unwrap();
        assert_abs_diff_eq!(town.n_transmission_per_infected(), 2.5, epsilon = 1e-9);
        assert_eq!(town.n_meet(), 4);
    }

    #[test]
    fn snapshot_tracks_time() {
        let parameters = TownParameters {
            population_size: 50,
            grid_size: 20,
            ..TownParameters::default()
        };
        let mut town = Town::from_parameters(&parameters, RandomSource::new(3)).unwrap();
        town.step(0.25).unwrap();
        town.step(0.25).unwrap();
        let statistics = town.statistics();
        assert_abs_diff_eq!(statistics.time, 0.5);
        assert_eq!(statistics.ill, town.n_ill());
        assert_eq!(statistics.meetings, town.n_meet());
    }
}
