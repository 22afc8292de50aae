//! Command-line interface for the beaker library
//!
//! # Usage
//!
//! ```bash
//! # Compile a model and list species, parameters and derivative terms
//! beaker check --model mm.txt
//!
//! # Simulate from given starting concentrations
//! beaker simulate --model mm.txt --initial E=1 --initial S=10 --t-end 20 --points 41
//!
//! # Fit rate constants to a time course
//! beaker fit --model mm.txt --data course.csv --map P=product --initial E=1 --initial S=10 --autocomplete
//! ```

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use beaker::prelude::*;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use peroxide::fuga::RK4;
use tabled::{builder::Builder, settings::Style, Table};

type CliResult<T> = Result<T, Box<dyn Error>>;

/// Main CLI configuration struct
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Compile a model and print its species, parameters and derivative terms
    Check {
        /// Path to the reaction definition
        #[arg(short, long)]
        model: PathBuf,
    },
    /// Simulate a model
    Simulate {
        /// Path to the reaction definition
        #[arg(short, long)]
        model: PathBuf,

        /// Starting concentration as SPECIES=VALUE, unset species start at 0
        #[arg(short, long, value_parser = parse_value)]
        initial: Vec<(String, f64)>,

        /// Parameter values in parameter order, all ones when omitted
        #[arg(short, long, value_delimiter = ',')]
        params: Option<Vec<f64>>,

        /// Explicit time points
        #[arg(long, value_delimiter = ',', conflicts_with = "t_end")]
        times: Option<Vec<f64>>,

        /// End of an evenly spaced time grid starting at 0
        #[arg(long, default_value_t = 10.0)]
        t_end: f64,

        /// Number of points of the evenly spaced grid
        #[arg(long, default_value_t = 101)]
        points: usize,

        /// Largest internal integration step
        #[arg(long, default_value_t = 0.01)]
        dt: f64,

        /// Write the trajectory to a CSV file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fit the model parameters to experimental data
    Fit(FitArgs),
}

#[derive(clap::Args)]
struct FitArgs {
    /// Path to the reaction definition
    #[arg(short, long)]
    model: PathBuf,

    /// Time course table (CSV, TSV or spreadsheet)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Time column of the time course table
    #[arg(long, default_value = "time")]
    time_column: String,

    /// Concentration column of a species as SPECIES=COLUMN
    #[arg(long, value_parser = parse_mapping)]
    map: Vec<(String, String)>,

    /// Initial rate table, one experiment per row
    #[arg(long)]
    rate_data: Option<PathBuf>,

    /// Time at which all rates of the rate table were measured
    #[arg(long, default_value_t = 0.0)]
    rate_time: f64,

    /// Rate column of a species as SPECIES=COLUMN
    #[arg(long, value_parser = parse_mapping)]
    rate_map: Vec<(String, String)>,

    /// Per-row starting concentration column of a species as SPECIES=COLUMN
    #[arg(long, value_parser = parse_mapping)]
    conc_map: Vec<(String, String)>,

    /// Starting concentration as SPECIES=VALUE
    #[arg(short, long, value_parser = parse_value)]
    initial: Vec<(String, f64)>,

    /// Start species without a known concentration at 0
    #[arg(long)]
    autocomplete: bool,

    #[arg(long, value_enum, default_value_t = Method::Simplex)]
    method: Method,

    /// Initial guess: 'ones', 'random', 'random:SEED' or comma separated values
    #[arg(long, default_value = "ones")]
    guess: InitialGuess,

    #[arg(long)]
    max_iters: Option<u64>,

    #[arg(long)]
    max_evals: Option<u64>,

    /// Number of randomly started fits run in parallel
    #[arg(long, default_value_t = 1)]
    starts: usize,

    /// Seed for random starting points
    #[arg(long)]
    seed: Option<u64>,

    /// Largest internal integration step
    #[arg(long, default_value_t = 0.01)]
    dt: f64,

    /// Session file the solutions are appended to
    #[arg(long)]
    session: Option<PathBuf>,
}

/// Main entry point for the CLI application
pub fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Check { model } => check(&model),
        Commands::Simulate {
            model,
            initial,
            params,
            times,
            t_end,
            points,
            dt,
            output,
        } => {
            let times = times.unwrap_or_else(|| grid(t_end, points));
            run_simulation(&model, &initial, params, &times, dt, output)
        }
        Commands::Fit(args) => fit(args),
    };

    if let Err(err) = result {
        eprintln!("{} {}", "error:".red().bold(), err);
        std::process::exit(1);
    }
}

fn check(path: &Path) -> CliResult<()> {
    let model = load_model(path)?;

    println!("{}", "Model compiled".green().bold());

    let mut species = Builder::default();
    species.push_record(vec!["#", "Species", "dy/dt"]);
    for (i, (name, terms)) in model.mapping().into_iter().enumerate() {
        species.push_record(vec![i.to_string(), name, terms]);
    }
    println!("{}", species.build().with(Style::rounded()));

    let mut parameters = Builder::default();
    parameters.push_record(vec!["#", "Parameter"]);
    for (i, name) in model.parameter_names().into_iter().enumerate() {
        parameters.push_record(vec![i.to_string(), name]);
    }
    println!("{}", parameters.build().with(Style::rounded()));

    Ok(())
}

fn run_simulation(
    path: &Path,
    initial: &[(String, f64)],
    params: Option<Vec<f64>>,
    times: &[f64],
    dt: f64,
    output: Option<PathBuf>,
) -> CliResult<()> {
    let model = load_model(path)?;

    let mut y0 = vec![0.0; model.n_species()];
    for (species, value) in initial {
        let position = model
            .species_position(species)
            .ok_or_else(|| ExperimentError::UnknownSpecies(species.clone()))?;
        y0[position] = *value;
    }

    let params = params.unwrap_or_else(|| model.default_parameters());
    let setup = SimulationSetupBuilder::default().dt(dt).build()?;
    let result = simulate(&model, &y0, times, &params, &setup, RK4)?;

    match output {
        Some(output) => {
            write_result(&output, &result)?;
            println!("{} {}", "Wrote".green(), output.display());
        }
        None => {
            let mut table = Builder::default();
            let mut header = vec!["time".to_string()];
            header.extend(result.species.iter().cloned());
            table.push_record(header);

            for (time, row) in result.times.iter().zip(&result.concentrations) {
                let mut record = vec![format!("{:.4}", time)];
                record.extend(row.iter().map(|v| format!("{:.6}", v)));
                table.push_record(record);
            }
            println!("{}", table.build().with(Style::rounded()));
        }
    }

    Ok(())
}

fn fit(args: FitArgs) -> CliResult<()> {
    let definition = std::fs::read_to_string(&args.model)?;

    let mut session = match &args.session {
        Some(path) if path.exists() => load_session(path)?,
        _ => Session::new(session_name(&args.model)),
    };
    session.import_definition(&definition)?;

    let experiments = {
        let model = session.model().ok_or(SessionError::NoModel)?;
        read_experiments(model, &args)?
    };
    if experiments.is_empty() {
        return Err("no data given, use --data or --rate-data".into());
    }
    session.experiments_mut().add_many(experiments.into_iter().map(Ok))?;

    let setup = SimulationSetupBuilder::default().dt(args.dt).build()?;
    let problem = session.problem(RK4, setup)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Fitting {} parameters", problem.n_parameters()));

    let solutions = if args.starts > 1 {
        let optimizer = optimizer(&args);
        multi_start(&problem, optimizer.as_ref(), args.starts, args.seed)?
    } else {
        let progress = spinner.clone();
        let observer = CallbackObserver::new(move |p: Progress| {
            progress.set_message(format!("iteration {} best {:.6e}", p.iteration, p.best_cost));
        });
        let handle = spawn_solve(problem, optimizer(&args), args.guess.clone(), Some(observer));
        vec![handle.wait()?]
    };
    spinner.finish_and_clear();

    for solution in solutions {
        let status = if solution.status.is_converged() {
            solution.status.to_string().green()
        } else {
            solution.status.to_string().yellow()
        };
        println!(
            "{} objective {:.6e} after {} iterations ({} evaluations), {}",
            solution.method.to_string().bold(),
            solution.objective,
            solution.iterations,
            solution.evaluations,
            status
        );
        println!("{}", Table::new(solution.rows()).with(Style::rounded()));
        session.record_solution(solution);
    }

    if let Some(path) = &args.session {
        save_session(path, &session)?;
        println!("{} {}", "Saved session to".green(), path.display());
    }

    Ok(())
}

fn read_experiments(model: &Model, args: &FitArgs) -> CliResult<Vec<Experiment>> {
    let mut experiments = Vec::new();

    if let Some(path) = &args.data {
        let table = read_file(path)?;
        let mut importer = ConcentrationImporter::new(model, &table);
        importer.set_time_column(&args.time_column)?;
        for (species, column) in &args.map {
            importer.assign(species, column)?;
        }
        for (species, value) in &args.initial {
            importer.set_starting_concentration(species, *value)?;
        }
        report_unset(&importer.unset_species(), args.autocomplete);
        experiments.push(importer.build(args.autocomplete)?);
    }

    if let Some(path) = &args.rate_data {
        let table = read_file(path)?;
        let mut importer = RateImporter::new(model, &table, args.rate_time);
        for (species, column) in &args.rate_map {
            importer.assign_rates(species, column)?;
        }
        for (species, column) in &args.conc_map {
            importer.assign_concentrations(species, column)?;
        }
        for (species, value) in &args.initial {
            importer.set_starting_concentration(species, *value)?;
        }
        report_unset(&importer.unset_species(), args.autocomplete);
        experiments.extend(importer.build(args.autocomplete)?);
    }

    Ok(experiments)
}

fn optimizer(args: &FitArgs) -> Box<dyn Optimizer<RK4> + Send + Sync> {
    match args.method {
        Method::Simplex => {
            let mut builder = NelderMeadBuilder::default();
            if let Some(n) = args.max_iters {
                builder = builder.max_iters(n);
            }
            if let Some(n) = args.max_evals {
                builder = builder.max_evals(n);
            }
            Box::new(builder.build())
        }
        Method::Anneal => {
            let mut builder = AnnealingBuilder::default();
            if let Some(n) = args.max_iters {
                builder = builder.max_iters(n);
            }
            if let Some(n) = args.max_evals {
                builder = builder.max_evals(n);
            }
            if let Some(seed) = args.seed {
                builder = builder.seed(seed);
            }
            Box::new(builder.build())
        }
    }
}

fn report_unset(species: &[String], autocomplete: bool) {
    if !species.is_empty() && autocomplete {
        warn!("No starting concentration for {}", species.join(", "));
    }
}

fn load_model(path: &Path) -> CliResult<Model> {
    let text = std::fs::read_to_string(path)?;
    Ok(Model::from_definition(&text)?)
}

fn session_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "session".to_string())
}

fn grid(t_end: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![0.0],
        n => (0..n).map(|i| t_end * i as f64 / (n - 1) as f64).collect(),
    }
}

fn parse_mapping(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

fn parse_value(s: &str) -> Result<(String, f64), String> {
    let (key, value) = parse_mapping(s)?;
    let value = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    Ok((key, value))
}
