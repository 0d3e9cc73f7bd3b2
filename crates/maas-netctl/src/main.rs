mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    let format = cli.global.output;
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        // Scripts asking for structured output get the field errors on stdout.
        if let Some(errors) = err.field_errors() {
            if format.is_structured() {
                if let Ok(rendered) = output::render_single(format, errors, |_| String::new(), |_| String::new()) {
                    output::print_output(&rendered, false);
                }
            }
        }
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands work without an inventory
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "maas-netctl", &mut std::io::stdout());
            Ok(())
        }

        Command::Boot(args) => {
            let cfg = config::load(&cli.global)?;
            commands::boot::handle(args, &cfg, &cli.global).await
        }

        // Everything else operates on the inventory
        cmd => {
            let cfg = config::load(&cli.global)?;
            let ctx = commands::Context::open(&cfg, &cli.global)?;

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &ctx, &cli.global).await
        }
    }
}
