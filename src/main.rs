// ABOUTME: Entry point for the omk CLI application.
// ABOUTME: Parses arguments, sets up logging and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use omk::config::{Paths, Settings};
use omk::error::Result;
use omk::output::{Output, OutputMode};
use omk::registry::RunOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // -v wins over RUST_LOG; otherwise RUST_LOG, then warn
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let mut output = Output::new(mode);

    if let Err(e) = run(cli.command, &mut output).await {
        output.error(e.kind().as_str(), &e.to_string());
        std::process::exit(1);
    }
}

async fn run(command: Commands, output: &mut Output) -> Result<()> {
    let paths = Paths::discover()?;
    paths.ensure()?;
    let settings = Settings::load(&paths.settings_file())?;

    let connect = || commands::connect_registry(&paths, &settings);

    match command {
        Commands::Login { token } => commands::login(token, &paths, &settings, output).await,
        Commands::Run {
            url,
            branch,
            name,
            description,
            force,
        } => {
            let registry = connect().await?;
            let options = RunOptions {
                branch,
                name,
                description,
                force,
            };
            commands::run(&registry, &url, options, output).await
        }
        Commands::List => commands::list(&connect().await?, output),
        Commands::Status { name } => commands::status(&connect().await?, &name, output).await,
        Commands::Delete { name } => commands::delete(&connect().await?, &name, output).await,
        Commands::Serve { bind } => commands::serve(connect().await?, &settings, bind, output).await,
    }
}
