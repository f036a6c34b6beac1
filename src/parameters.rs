//! Configuration of a town and of the simulation run driving it.
//!
//! Parameters are plain `serde` structs. They can be built in code (every struct implements
//! `Default`) or loaded from a JSON file with [`load_parameters_from_json`]:
//!
//! ```json
//! {
//!   "town": { "name": "Springfield", "population_size": 1000, "grid_size": 200 },
//!   "seed": 7,
//!   "n_ticks": 500,
//!   "dt": 0.5
//! }
//! ```
//!
//! Missing fields take their default values; unknown fields are rejected.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::GasTownError;

/// Parameters that can be checked after deserialization.
pub trait Validate {
    /// # Errors
    ///
    /// Returns `GasTownError::InvalidParameter` naming the first value out of range.
    fn validate(&self) -> Result<(), GasTownError>;
}

/// Parameters shared by every person synthesized for a town.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PersonParameters {
    /// Probability of becoming ill on each contact with an ill person.
    pub infection_probability: f64,
    /// Probability of being ill at construction.
    pub initial_ill_probability: f64,
    /// Probability that an illness, at onset, is flagged as lethal.
    pub death_probability: f64,
    /// Mean of the (Gaussian) illness duration.
    pub mean_recovery_time: f64,
    /// Temperature of the gas, setting the speed distribution.
    pub temperature: f64,
}

impl Default for PersonParameters {
    fn default() -> Self {
        PersonParameters {
            infection_probability: 0.3,
            initial_ill_probability: 0.03,
            death_probability: 0.03,
            mean_recovery_time: 100.0,
            temperature: 1.0,
        }
    }
}

impl Validate for PersonParameters {
    fn validate(&self) -> Result<(), GasTownError> {
        validate_probability("infection_probability", self.infection_probability)?;
        validate_probability("initial_ill_probability", self.initial_ill_probability)?;
        validate_probability("death_probability", self.death_probability)?;
        if self.mean_recovery_time < 0.0 || !self.mean_recovery_time.is_finite() {
            return Err(GasTownError::InvalidParameter(format!(
                "mean_recovery_time must be a nonnegative finite number, got {}",
                self.mean_recovery_time
            )));
        }
        if self.temperature <= 0.0 || !self.temperature.is_finite() {
            return Err(GasTownError::InvalidParameter(format!(
                "temperature must be a positive finite number, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Everything needed to synthesize a populated town.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TownParameters {
    pub name: String,
    pub population_size: usize,
    /// Probability that each synthesized person starts out ill.
    pub initial_infected_fraction: f64,
    pub temperature: f64,
    /// Side length of the square grid, in cells.
    pub grid_size: usize,
    pub mean_recovery_time: f64,
    pub infection_probability: f64,
    pub death_probability: f64,
}

impl Default for TownParameters {
    fn default() -> Self {
        TownParameters {
            name: "COVIDVille".to_string(),
            population_size: 500,
            initial_infected_fraction: 0.05,
            temperature: 1.0,
            grid_size: 100,
            mean_recovery_time: 100.0,
            infection_probability: 0.3,
            death_probability: 0.03,
        }
    }
}

impl TownParameters {
    #[must_use]
    pub fn person_parameters(&self) -> PersonParameters {
        PersonParameters {
            infection_probability: self.infection_probability,
            initial_ill_probability: self.initial_infected_fraction,
            death_probability: self.death_probability,
            mean_recovery_time: self.mean_recovery_time,
            temperature: self.temperature,
        }
    }
}

impl Validate for TownParameters {
    fn validate(&self) -> Result<(), GasTownError> {
        validate_grid_size(self.grid_size)?;
        self.person_parameters().validate()
    }
}

/// Parameters of a complete run: the town plus the tick loop driving it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationParameters {
    pub town: TownParameters,
    pub seed: u64,
    pub n_ticks: usize,
    pub dt: f64,
    /// Base name of the CSV time series written by the runner.
    pub report_name: String,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        SimulationParameters {
            town: TownParameters::default(),
            seed: 0,
            n_ticks: 1000,
            dt: 1.0,
            report_name: "statistics".to_string(),
        }
    }
}

impl Validate for SimulationParameters {
    fn validate(&self) -> Result<(), GasTownError> {
        self.town.validate()?;
        if self.dt < 0.0 || !self.dt.is_finite() {
            return Err(GasTownError::InvalidParameter(format!(
                "dt must be a nonnegative finite number, got {}",
                self.dt
            )));
        }
        Ok(())
    }
}

/// A grid must have at least one cell and its cell count must be addressable.
pub(crate) fn validate_grid_size(grid_size: usize) -> Result<(), GasTownError> {
    if grid_size == 0 {
        return Err(GasTownError::InvalidParameter(
            "grid_size must be positive".to_string(),
        ));
    }
    if grid_size.checked_mul(grid_size).is_none() {
        return Err(GasTownError::InvalidParameter(format!(
            "grid_size {grid_size} is too large"
        )));
    }
    Ok(())
}

fn validate_probability(name: &str, value: f64) -> Result<(), GasTownError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(GasTownError::InvalidParameter(format!(
            "{name} must be a probability in [0, 1], got {value}"
        )))
    }
}

/// Reads parameters of type `T` from a JSON file and validates them.
///
/// # Errors
///
/// Returns `GasTownError::IoError` if the file cannot be opened, `GasTownError::JsonError` if it
/// does not deserialize to `T`, and `GasTownError::InvalidParameter` if validation fails.
pub fn load_parameters_from_json<T: DeserializeOwned + Validate>(
    file_path: &Path,
) -> Result<T, GasTownError> {
    let file = File::open(file_path)?;
    let parameters: T = serde_json::from_reader(BufReader::new(file))?;
    parameters.validate()?;
    Ok(parameters)
}
