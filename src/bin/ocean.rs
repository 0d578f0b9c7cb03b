//! OCEAN CLI - Command-line interface for OCEAN Battery
//!
//! Commands:
//! - import: Build a battery catalog from rows and summarize it
//! - new: Create an empty session document
//! - score: Record a score in a session document
//! - remove: Remove a score from a session document
//! - analyze: Print the OCEAN profile of a session
//! - export: Print the tabular export view as JSON
//! - validate: Check a session document against the schema

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use ocean_battery::catalog::load_rows;
use ocean_battery::codec::{load_from_path, save_to_path};
use ocean_battery::{
    compute, enter_score, BatteryCatalog, BatteryError, Dimension, ErrorKind, ExportView,
    Gender, Session, Settings, Subject, SCHEMA_VERSION, VERSION,
};

/// OCEAN - behavioral test battery scoring
#[derive(Parser)]
#[command(name = "ocean")]
#[command(version = VERSION)]
#[command(about = "Score behavioral test batteries into OCEAN profiles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a battery catalog and print tests per dimension
    Import {
        /// Battery rows (.json array or .ndjson)
        #[arg(short, long)]
        battery: PathBuf,

        /// Remember this battery in the given env file
        #[arg(long)]
        remember: Option<PathBuf>,
    },

    /// Create an empty session document
    New {
        #[arg(long)]
        battery_name: String,

        #[arg(long)]
        owner: String,

        #[arg(long)]
        dog: String,

        #[arg(long, default_value = "0")]
        age_years: u32,

        #[arg(long, default_value = "0")]
        age_months: u32,

        #[arg(long, value_enum)]
        gender: GenderArg,

        #[arg(long)]
        neutered: bool,

        #[arg(long)]
        breed: Option<String>,

        /// Output session file (defaults to <sessions_dir>/<dog name slug>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Record or replace a score
    Score {
        #[arg(short, long)]
        session: PathBuf,

        #[arg(short, long)]
        test: u32,

        /// Score from -2 to +2
        #[arg(long, allow_hyphen_values = true)]
        score: i64,

        #[arg(long)]
        note: Option<String>,

        /// Battery used for entry-time id checks (defaults to the last battery)
        #[arg(short, long)]
        battery: Option<PathBuf>,
    },

    /// Remove a score
    Remove {
        #[arg(short, long)]
        session: PathBuf,

        #[arg(short, long)]
        test: u32,
    },

    /// Print the OCEAN profile of a session
    Analyze {
        #[arg(short, long)]
        session: PathBuf,

        /// Battery rows (defaults to the last battery)
        #[arg(short, long)]
        battery: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Print the export view as JSON
    Export {
        #[arg(short, long)]
        session: PathBuf,

        #[arg(short, long)]
        battery: Option<PathBuf>,
    },

    /// Validate a session document
    Validate {
        #[arg(short, long)]
        session: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum GenderArg {
    Male,
    Female,
}

impl From<GenderArg> for Gender {
    fn from(g: GenderArg) -> Self {
        match g {
            GenderArg::Male => Gender::Male,
            GenderArg::Female => Gender::Female,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => return report(e),
    };
    init_tracing(&settings);

    match run(cli, settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(e),
    }
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report(e: BatteryError) -> ExitCode {
    eprintln!(
        "{}",
        serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
    );
    ExitCode::FAILURE
}

fn run(cli: Cli, mut settings: Settings) -> Result<(), BatteryError> {
    match cli.command {
        Commands::Import { battery, remember } => {
            let catalog = load_catalog(&battery)?;
            println!("Battery: {} ({} tests)", catalog.name(), catalog.len());
            for dim in Dimension::ALL {
                println!("  {} {:<18} {}", dim.code(), dim.as_str(), catalog.tests_for(dim).len());
            }
            if let Some(env_file) = remember {
                settings.remember_battery_path(&env_file, &battery)?;
            }
            Ok(())
        }

        Commands::New {
            battery_name,
            owner,
            dog,
            age_years,
            age_months,
            gender,
            neutered,
            breed,
            output,
        } => {
            let mut subject = Subject::new(owner, dog, age_years, age_months, gender.into(), neutered)?;
            if let Some(breed) = breed {
                subject = subject.with_breed(breed);
            }
            let path = output
                .unwrap_or_else(|| settings.sessions_dir.join(format!("{}.json", subject.file_stem())));
            let mut session = Session::create(subject, battery_name)?;
            save_to_path(&mut session, &path)?;
            println!("Created {}", path.display());
            Ok(())
        }

        Commands::Score {
            session: path,
            test,
            score,
            note,
            battery,
        } => {
            let mut session = load_from_path(&path)?;
            enter_score(
                &mut session,
                settings.entry_policy(),
                || optional_catalog(battery, &settings),
                test,
                score,
                note,
            )?;
            save_to_path(&mut session, &path)?;
            println!(
                "Test {}: {} ({} of {} scored away from neutral)",
                test,
                score,
                session.completed_count(),
                session.len()
            );
            Ok(())
        }

        Commands::Remove { session: path, test } => {
            let mut session = load_from_path(&path)?;
            session.remove_score(test)?;
            save_to_path(&mut session, &path)?;
            println!("Removed test {}", test);
            Ok(())
        }

        Commands::Analyze {
            session,
            battery,
            json,
        } => {
            let session = load_from_path(&session)?;
            let catalog = optional_catalog(battery, &settings)?;
            if json {
                if catalog.is_none() {
                    return Err(BatteryError::MissingBattery);
                }
                let view = ExportView::build(&session, catalog.as_ref())?;
                println!("{}", serde_json::to_string_pretty(&view.summary).map_err(json_error)?);
                return Ok(());
            }

            let profile = compute(&session, catalog.as_ref())?;
            println!("OCEAN profile for {} ({})", session.subject().dog_name, session.battery_name());
            for (dim, totals) in profile.iter() {
                let avg = totals
                    .average()
                    .map(|a| format!("{:.2}", a))
                    .unwrap_or_else(|| "n/a".to_string());
                println!(
                    "  {} sum={:>3} count={:>2} avg={}",
                    dim.code(),
                    totals.sum,
                    totals.count,
                    avg
                );
            }
            Ok(())
        }

        Commands::Export { session, battery } => {
            let session = load_from_path(&session)?;
            let catalog = optional_catalog(battery, &settings)?;
            let view = ExportView::build(&session, catalog.as_ref())?;
            println!("{}", view.to_json()?);
            Ok(())
        }

        Commands::Validate { session } => {
            let session = load_from_path(&session)?;
            println!("Valid {} document", SCHEMA_VERSION);
            println!("  subject: {} / {}", session.subject().owner_name, session.subject().dog_name);
            println!("  battery: {}", session.battery_name());
            println!("  records: {}", session.len());
            Ok(())
        }
    }
}

fn load_catalog(path: &Path) -> Result<BatteryCatalog, BatteryError> {
    let rows = load_rows(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "battery".to_string());
    BatteryCatalog::build(name, rows)
}

fn optional_catalog(
    battery: Option<PathBuf>,
    settings: &Settings,
) -> Result<Option<BatteryCatalog>, BatteryError> {
    battery
        .or_else(|| settings.last_battery_path.clone())
        .map(|path| load_catalog(&path))
        .transpose()
}

fn json_error(e: serde_json::Error) -> BatteryError {
    BatteryError::Schema(format!("Failed to serialize output: {}", e))
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<BatteryError> for CliError {
    fn from(e: BatteryError) -> Self {
        let hint = match e.kind() {
            ErrorKind::Validation => "Scores must be integers from -2 to +2",
            ErrorKind::NotFound => "Check the test id against the battery",
            ErrorKind::Import => "Fix the battery rows and import again",
            ErrorKind::Schema => "Run 'ocean validate' on the session file",
            ErrorKind::MissingBattery => "Pass --battery or import a battery first",
            ErrorKind::Io => "Check the path, permissions, or close the file elsewhere",
        };
        CliError {
            code: e.kind().as_str().to_string(),
            message: e.to_string(),
            hint: Some(hint.to_string()),
        }
    }
}
