//! # Page Designer CLI
//!
//! Command-line entry point.

use std::process::ExitCode;

use clap::Parser;
use designer_cli::{CliArgs, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured tracing on stderr.
///
/// Set `RUST_LOG` to control log levels (default: info,designer_core=debug).
/// Set `RUST_LOG_FORMAT=json` or pass `--log-format json` for JSON output.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,designer_core=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init(),
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let args = CliArgs::parse();
    init_tracing(args.log_format);
    tracing::debug!(command = ?args.command, "Starting page-designer");

    let outcome = designer_cli::run(&args)?;
    print!("{}", outcome.output);
    Ok(if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
