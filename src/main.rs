use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use fxwatch::core::DisplayBase;
use fxwatch::core::log::init_logging;
use std::time::Duration;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Display base for rates (USD or BRL)
    #[arg(short, long, global = true)]
    base: Option<DisplayBase>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for fxwatch::AppCommand {
    fn from(cmd: Commands) -> fxwatch::AppCommand {
        match cmd {
            Commands::List => fxwatch::AppCommand::List,
            Commands::Add { code } => fxwatch::AppCommand::Add(code),
            Commands::Remove { code } => fxwatch::AppCommand::Remove(code),
            Commands::Refresh => fxwatch::AppCommand::Refresh,
            Commands::Catalog { remote } => fxwatch::AppCommand::Catalog { remote },
            Commands::Shell { every } => fxwatch::AppCommand::Shell {
                every: every.map(Duration::from_secs),
            },
            Commands::Setup { .. } => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
    /// Display the watchlist
    List,
    /// Add a currency to the watchlist
    Add { code: String },
    /// Remove a currency from the watchlist
    Remove { code: String },
    /// Fetch current rates for the watchlist
    Refresh,
    /// List the currencies that can be added
    Catalog {
        /// Ask the backend for its allowed currencies
        #[arg(long)]
        remote: bool,
    },
    /// Interactive session
    Shell {
        /// Refresh rates every N seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        every: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup { force }) => fxwatch::cli::setup::setup(force).map(|path| {
            println!("Configuration written to {}", path.display());
        }),
        Some(cmd) => fxwatch::run_command(cmd.into(), cli.config_path.as_deref(), cli.base).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
