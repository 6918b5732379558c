//! isofrac - Command Line Interface
//!
//! # Commands
//!
//! 1. **Run** (`isofrac run <LIGHT> <HEAVY> [--linear] [-o OUTPUT] [--full] [--json FILE]`):
//!    compares two Gaussian frequency logs of the same molecule and writes
//!    the RPFR report.
//!
//! 2. **Settings Template** (`isofrac init-config [PATH]`): writes a
//!    commented `isofrac_config.cfg`.
//!
//! # Examples
//!
//! ```bash
//! # Non-linear molecule, basic report
//! isofrac run zncl4_64.log zncl4_66.log
//!
//! # Linear molecule, full report in a sub-directory plus JSON
//! isofrac run co2_12.log co2_13.log --linear -o results/co2.txt --full --json results/co2.json
//!
//! # Configuration template
//! isofrac init-config
//! ```
//!
//! Logging goes to stdout; the level comes from `[logging] level` in the
//! configuration and can be raised with `-v` or lowered with `-q`.

use clap::{Args, Parser, Subcommand};
use isofrac::analysis::{analyze_pair, AnalysisOptions};
use isofrac::parser::LogFile;
use isofrac::partition::PartitionFunctionEngine;
use isofrac::report::{self, Detail, DEFAULT_REPORT_PATH};
use isofrac::settings::{SettingsManager, CONFIG_FILE_NAME};
use isofrac::validation::MoleculeShape;
use log::{info, warn, LevelFilter};
use std::error::Error;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(
    name = "isofrac",
    about = "Reduced partition function ratios from Gaussian frequency logs",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Warnings and errors only
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compare a light and a heavy isotopologue
    Run(RunArgs),

    /// Write a configuration template
    InitConfig(InitConfigArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Gaussian log of the light isotopologue
    #[arg(value_name = "LIGHT")]
    light: PathBuf,

    /// Gaussian log of the heavy isotopologue
    #[arg(value_name = "HEAVY")]
    heavy: PathBuf,

    /// Molecule is linear (3N-5 vibrational modes)
    #[arg(long)]
    linear: bool,

    /// Text report path; missing directories are created
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_REPORT_PATH)]
    output: PathBuf,

    /// Include RPFR components, displacements, convergence tables and low frequencies
    #[arg(long)]
    full: bool,

    /// Also write the report as JSON
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,
}

#[derive(Args)]
struct InitConfigArgs {
    /// Output path
    #[arg(value_name = "PATH", default_value = CONFIG_FILE_NAME)]
    path: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let settings = match SettingsManager::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Warn
    } else {
        settings.logging().level_filter()
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .target(env_logger::Target::Stdout)
        .format_timestamp_millis()
        .init();
    for warning in settings.load_warnings() {
        warn!("{}", warning);
    }
    info!("Configuration loaded from: {}", settings.config_source());

    let result = match &cli.command {
        Command::Run(args) => run(args, &settings),
        Command::InitConfig(args) => init_config(args),
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: &RunArgs, settings: &SettingsManager) -> Result<(), Box<dyn Error>> {
    let light = LogFile::read(&args.light).map_err(|e| {
        format!("cannot read light isotope file {}: {}", args.light.display(), e)
    })?;
    let heavy = LogFile::read(&args.heavy).map_err(|e| {
        format!("cannot read heavy isotope file {}: {}", args.heavy.display(), e)
    })?;

    let shape = MoleculeShape::from_linear_flag(args.linear);
    let options = AnalysisOptions {
        low_frequency_threshold: settings.thresholds().low_frequency,
        engine: PartitionFunctionEngine::default(),
    };
    let elements = settings.element_table();
    let report = analyze_pair(&light, &heavy, shape, &options, &elements)?;

    let detail = Detail::from_full_flag(args.full || settings.output().full_report);
    report::write_text(&report, &args.output, detail)?;
    let json_path = args
        .json
        .clone()
        .or_else(|| settings.output().json.then(|| args.output.with_extension("json")));
    if let Some(path) = &json_path {
        report::write_json(&report, path)?;
    }

    println!();
    print!("{}", report::render_summary(&report));
    println!("Report written to {}", args.output.display());
    if let Some(path) = json_path {
        println!("JSON report written to {}", path.display());
    }
    Ok(())
}

fn init_config(args: &InitConfigArgs) -> Result<(), Box<dyn Error>> {
    if args.path.exists() {
        return Err(format!(
            "{} already exists. Please remove it first or choose a different location.",
            args.path.display()
        )
        .into());
    }
    SettingsManager::create_template(&args.path)?;
    println!("Settings template created: {}", args.path.display());
    println!("The settings are loaded automatically from ./{}", CONFIG_FILE_NAME);
    Ok(())
}
