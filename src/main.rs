use clap::Parser;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::process;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

mod auth;
mod cli;
mod client;
mod commands;
mod config;
mod confirm;
mod csv_handler;
mod errors;
mod models;
mod output;

use cli::{Cli, Commands, MutateArgs};
use client::HttpTransport;
use commands::Outcome;
use config::Operation;
use confirm::{AssumeYes, TerminalConfirm};
use csv_handler::{ExtractOptions, DEFAULT_HEADER_PREFIX};
use errors::ToolError;
use models::{Action, OutputFormat, StateFilter};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(Outcome::Completed) | Ok(Outcome::Cancelled) => {}
        Ok(Outcome::Failed) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: logging unavailable: {}", e);
    }
}

fn run(cli: Cli) -> Result<Outcome, ToolError> {
    let env_file = cli.env_file.as_deref();
    match cli.command {
        Commands::List { state, format } => {
            // Validate selectors before touching config or the network.
            let format: OutputFormat = format.parse()?;
            let state = state
                .as_deref()
                .map(str::parse::<StateFilter>)
                .transpose()?;

            let settings = config::load(env_file, Operation::List)?;
            debug!("Using API at {}", settings.api_url);
            let transport = HttpTransport::new(&settings.token)?;
            let stdout = io::stdout();
            let color = stdout.is_terminal();
            commands::list(&settings, transport, state, format, color, stdout.lock())
        }
        Commands::AddUsers(args) => run_mutation(Action::Add, &args, env_file),
        Commands::RemoveUsers(args) => run_mutation(Action::Remove, &args, env_file),
    }
}

fn run_mutation(action: Action, args: &MutateArgs, env_file: Option<&Path>) -> Result<Outcome, ToolError> {
    let settings = config::load(env_file, Operation::Mutate(action))?;
    debug!("Using API at {}", settings.api_url);
    let transport = HttpTransport::new(&settings.token)?;

    let options = ExtractOptions {
        header_prefix: (!args.no_header_detection).then(|| DEFAULT_HEADER_PREFIX.to_string()),
    };

    if args.yes {
        commands::mutate(
            &settings,
            action,
            transport,
            &options,
            &mut AssumeYes,
            io::stdout(),
            io::stderr(),
        )
    } else {
        let mut confirmer = TerminalConfirm::new(io::stdin().lock(), io::stderr());
        commands::mutate(
            &settings,
            action,
            transport,
            &options,
            &mut confirmer,
            io::stdout(),
            io::stderr(),
        )
    }
}
