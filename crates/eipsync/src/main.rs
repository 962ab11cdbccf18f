mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, LogFormat};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let debug = matches!(&cli.command, Command::Sync(args) if args.debug);
    init_tracing(cli.global.verbose, debug, cli.global.log_format);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Filter for our own crates; dependencies stay at warn. Stage and
/// summary lines are info, so they show by default.
fn default_directives(verbosity: u8, debug: bool) -> String {
    let level = match (verbosity, debug) {
        (0, false) => "info",
        (0 | 1, _) => "debug",
        _ => "trace",
    };
    format!(
        "warn,eipsync={level},eipsync_core={level},eipsync_api={level},eipsync_config={level}"
    )
}

/// Install the stderr subscriber. `RUST_LOG` wins over `-v` and `--debug`.
fn init_tracing(verbosity: u8, debug: bool, format: LogFormat) {
    let directives = default_directives(verbosity, debug);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives)),
        )
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Sync(args) => commands::sync::handle(args, &cli.global).await,

        // Config commands don't contact either system
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "eipsync", &mut std::io::stdout());
            Ok(())
        }
    }
}
