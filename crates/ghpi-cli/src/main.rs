use std::path::Path;

use clap::Parser;
use color_eyre::Result;
use ghpi_core::{CommandContext, GlobalOptions};

mod cli;
mod dispatch;
mod output;
mod style;

use cli::GhpiCli;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = GhpiCli::parse();
    init_tracing(cli.quiet, cli.trace, cli.verbose);
    load_dotenv(Path::new(".env"));

    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
    };
    let ctx = CommandContext::new(&global);
    let (info, outcome) = dispatch::dispatch_command(&ctx, &cli.command);
    let code = output::emit_output(&cli, info, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

/// Loads `KEY=value` pairs from `path` without overriding variables that are
/// already set. A missing file is not an error.
fn load_dotenv(path: &Path) {
    match dotenvy::from_path(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "loaded environment file"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable environment file"),
    }
}

fn init_tracing(quiet: bool, trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match (quiet, verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, 2) => "debug",
            _ => "trace",
        }
    };

    let filter = format!("warn,ghpi={level},ghpi_core={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
