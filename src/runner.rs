use std::path::{Path, PathBuf};

use clap::{Args, Command, FromArgMatches as _};
use log::{debug, info};

use crate::error::GasTownError;
use crate::execution_stats::{log_execution_statistics, ExecutionProfilingCollector};
use crate::log::{set_log_level, LevelFilter};
use crate::parameters::{load_parameters_from_json, SimulationParameters, Validate};
use crate::random::RandomSource;
use crate::report::{ReportOptions, ReportWriter};
use crate::statistics::TownStatistics;
use crate::town::Town;

/// Default cli arguments for the gastown runner
#[derive(Args, Debug, Clone, Default)]
pub struct BaseArgs {
    /// Random seed, overriding the one in the config file
    #[arg(short, long)]
    pub random_seed: Option<u64>,

    /// Optional path for a JSON simulation parameters file
    #[arg(short, long, default_value = "")]
    pub config: String,

    /// Optional path for report output
    #[arg(short, long, default_value = "")]
    pub output_dir: String,

    /// One of off, error, warn, info, debug or trace
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Number of ticks, overriding the config file
    #[arg(short, long)]
    pub ticks: Option<usize>,

    /// Time increment per tick, overriding the config file
    #[arg(long)]
    pub dt: Option<f64>,

    /// Replace existing report files
    #[arg(long)]
    pub overwrite: bool,
}

fn create_gastown_cli() -> Command {
    let cli = Command::new("gastown").about("Runs an ideal-gas epidemic in a single town");
    BaseArgs::augment_args(cli)
}

/// Runs a simulation configured from the command line.
///
/// # Errors
/// Returns an error if argument parsing or the run fails
#[allow(clippy::missing_errors_doc)]
pub fn run() -> Result<Town, Box<dyn std::error::Error>> {
    let matches = create_gastown_cli().get_matches();
    let args = BaseArgs::from_arg_matches(&matches)?;
    Ok(run_with_args(&args)?)
}

/// Applies the command line overrides to the parameters from `args.config`, or to the defaults
/// when no config file is given.
///
/// # Errors
/// Returns an error if the config file cannot be loaded or the result does not validate
pub fn simulation_parameters(args: &BaseArgs) -> Result<SimulationParameters, GasTownError> {
    let mut parameters = if args.config.is_empty() {
        SimulationParameters::default()
    } else {
        info!("Loading parameters from: {}", args.config);
        load_parameters_from_json(Path::new(&args.config))?
    };
    if let Some(seed) = args.random_seed {
        parameters.seed = seed;
    }
    if let Some(n_ticks) = args.ticks {
        parameters.n_ticks = n_ticks;
    }
    if let Some(dt) = args.dt {
        parameters.dt = dt;
    }
    parameters.validate()?;
    Ok(parameters)
}

/// Builds the town, steps it `n_ticks` times and records its statistics before the first tick
/// and after every tick. Returns the town in its final state.
///
/// # Errors
/// Returns an error if the parameters are invalid or the report cannot be written
pub fn run_with_args(args: &BaseArgs) -> Result<Town, GasTownError> {
    if let Some(level) = &args.log_level {
        let level: LevelFilter = level
            .parse()
            .map_err(|_| GasTownError::InvalidParameter(format!("unknown log level {level}")))?;
        set_log_level(level);
    }

    let parameters = simulation_parameters(args)?;

    let mut report_options = ReportOptions::new();
    if !args.output_dir.is_empty() {
        report_options.directory(PathBuf::from(&args.output_dir));
    }
    report_options.overwrite(args.overwrite);
    let mut writer =
        ReportWriter::create::<TownStatistics>(&parameters.report_name, &report_options)?;

    let mut collector = ExecutionProfilingCollector::new();
    let mut town = Town::from_parameters(&parameters.town, RandomSource::new(parameters.seed))?;
    let population = town.population_size();
    info!(
        "Running {} for {} ticks of {} with seed {}",
        town.name(),
        parameters.n_ticks,
        parameters.dt,
        parameters.seed
    );

    writer.send(&town.statistics())?;
    for _ in 0..parameters.n_ticks {
        town.step(parameters.dt)?;
        let statistics = town.statistics();
        debug!(
            "t={:.2} ill={} recovered={} dead={}",
            statistics.time, statistics.ill, statistics.recovered, statistics.dead
        );
        writer.send(&statistics)?;
        collector.refresh();
    }

    let final_statistics = town.statistics();
    info!(
        "{} after {} ticks: {} ill, {} recovered, {} susceptible, {} dead",
        town.name(),
        town.n_ticks(),
        final_statistics.ill,
        final_statistics.recovered,
        final_statistics.susceptible,
        final_statistics.dead
    );
    info!(
        "{} rows written to {}",
        writer.rows_written(),
        writer.path().display()
    );
    log_execution_statistics(&collector.compute_final_statistics(population, town.n_ticks()));
    Ok(town)
}
