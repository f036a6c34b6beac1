use std::fmt::{self, Debug, Display};
use std::io;

use rand_distr::NormalError;

/// Provides `GasTownError` and maps to other errors to
/// convert to a `GasTownError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum GasTownError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CSVError(csv::Error),
    NormalError(NormalError),
    /// A town or person was configured with a value outside its valid range.
    InvalidParameter(String),
    /// `Town::step` was called with a negative or non-finite time increment.
    InvalidTimeStep(f64),
    ReportError(String),
    GasTownError(String),
}

impl From<io::Error> for GasTownError {
    fn from(error: io::Error) -> Self {
        GasTownError::IoError(error)
    }
}

impl From<serde_json::Error> for GasTownError {
    fn from(error: serde_json::Error) -> Self {
        GasTownError::JsonError(error)
    }
}

impl From<csv::Error> for GasTownError {
    fn from(error: csv::Error) -> Self {
        GasTownError::CSVError(error)
    }
}

impl From<NormalError> for GasTownError {
    fn from(error: NormalError) -> Self {
        GasTownError::NormalError(error)
    }
}

impl From<String> for GasTownError {
    fn from(error: String) -> Self {
        GasTownError::GasTownError(error)
    }
}

impl From<&str> for GasTownError {
    fn from(error: &str) -> Self {
        GasTownError::GasTownError(error.to_string())
    }
}

impl std::error::Error for GasTownError {}

impl Display for GasTownError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error: {self:?}")?;
        Ok(())
    }
}
