//! tilesurf - assemble XYZ map tiles and query the gradient of the result.

use clap::Parser;
use std::process;
use tilesurf_cli::{init_logging, run, Cli, CliError};
use tilesurf_region::CancelToken;
use tracing::warn;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = try_main(&cli) {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn try_main(cli: &Cli) -> Result<(), CliError> {
    init_logging(cli.verbose)?;
    tilesurf_metrics::describe_metrics();

    // Ctrl-C stops further tile fetches; the command then fails with Cancelled
    let cancel = CancelToken::new();
    let handler_cancel = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupted, cancelling tile fetches");
        handler_cancel.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(cli, &cancel, &mut out)
}
