mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;
use rix::ipc::SignalRegistry;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "rix", version, about = "Keyboard teleop and robot drive loops")]
struct Cli {
    /// Output format for received drive commands.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    std::process::exit(run(cli.command, format));
}

// Owns the signal registry so its handlers are reset before the process exits.
fn run(command: Command, format: OutputFormat) -> i32 {
    let signals = SignalRegistry::new();
    match cmd::run(command, format, &signals) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            err.code
        }
    }
}
