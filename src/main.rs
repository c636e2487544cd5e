use anyhow::Result;
use blockflow::app::{self, commands, AppConfig, Engines};
use blockflow::config::ConfigLoader;
use blockflow::BlockflowError;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

/// Run workflow control blocks from the command line
#[derive(Parser)]
#[command(name = "blockflow", version)]
#[command(about = "Iteration, merge, stop/error and wait engines for workflow blocks", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file to use instead of blockflow.toml
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one iteration step
    Iterate(BlockArgs),
    /// Merge the input* fields of the input document
    Merge(BlockArgs),
    /// Evaluate a stop/error block
    Stop(BlockArgs),
    /// Compute a wait
    Wait(BlockArgs),
    /// Print the effective runtime settings
    Config,
}

#[derive(clap::Args)]
struct BlockArgs {
    /// Block configuration (camelCase JSON)
    #[arg(short, long, value_name = "PATH")]
    config: PathBuf,

    /// Data flowing into the block (JSON)
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    if let Err(err) = run(cli) {
        app::handle_fatal_error(err, verbose);
    }
}

fn run(cli: Cli) -> Result<()> {
    let app_config = AppConfig::new(cli.verbose)?.with_config_file(cli.config_file);
    let settings = app::initialize_app(&app_config)?;
    let engines = Engines::from_config(&settings);

    match cli.command {
        Commands::Iterate(args) => {
            let config = commands::read_json(&args.config)?;
            let input = match &args.input {
                Some(path) => commands::read_json(path)?,
                None => commands::IterationInput::default(),
            };
            print_json(&commands::iterate(&engines, &config, input)?)
        }
        Commands::Merge(args) => {
            let config = commands::read_json(&args.config)?;
            let input = commands::read_input(args.input.as_deref())?;
            print_json(&commands::merge(&engines, &config, &input)?)
        }
        Commands::Stop(args) => {
            let config = commands::read_json(&args.config)?;
            let input = commands::read_input(args.input.as_deref())?;
            let outcome = commands::stop(&engines, &config, &input)?;
            print_json(&outcome.report)?;
            match outcome.signal {
                Some(signal) => Err(BlockflowError::from(signal).into()),
                None => Ok(()),
            }
        }
        Commands::Wait(args) => {
            let config = commands::read_json(&args.config)?;
            let input = commands::read_input(args.input.as_deref())?;
            print_json(&commands::wait(&engines, &config, &input)?)
        }
        Commands::Config => {
            let mut loader = ConfigLoader::new().with_working_dir(&app_config.working_dir);
            if let Some(path) = &app_config.config_file {
                loader = loader.with_file(path);
            }
            let source = loader.locate();
            debug!(source = ?source, "Showing configuration");
            print!("{}", commands::show_config(&settings, source.as_deref())?);
            Ok(())
        }
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
