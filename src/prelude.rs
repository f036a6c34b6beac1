pub use crate::define_rng;
pub use crate::error::GasTownError;
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::parameters::{
    load_parameters_from_json, PersonParameters, SimulationParameters, TownParameters, Validate,
};
pub use crate::person::{DiseaseStatus, Person, PersonId};
pub use crate::random::{RandomSource, RngId};
pub use crate::report::{Report, ReportOptions, ReportWriter};
pub use crate::statistics::TownStatistics;
pub use crate::town::{Town, TownId};
