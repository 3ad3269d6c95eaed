use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Subcommand};
use rix::ipc::{Fifo, FifoMode, File, Io, SignalRegistry};
use rix::msg::DEFAULT_MAX_MESSAGE;
use tracing::debug;

use crate::exit::{ipc_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod drive;
pub mod teleop;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Turn key presses into drive commands.
    Teleop(TeleopArgs),
    /// Read drive commands and forward them to the robot.
    Drive(DriveArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, signals: &SignalRegistry) -> CliResult<i32> {
    match command {
        Command::Teleop(args) => teleop::run(args, signals),
        Command::Drive(args) => drive::run(args, format, signals),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct TeleopArgs {
    /// Key input (file or FIFO). Default: stdin.
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,
    /// Command output (file or FIFO). Default: stdout.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
    /// Forward/backward speed in m/s.
    #[arg(long, default_value_t = 0.5)]
    pub linear_speed: f64,
    /// Rotation speed in rad/s.
    #[arg(long, default_value_t = 1.0)]
    pub angular_speed: f64,
    /// Frame id stamped on every command.
    #[arg(long, default_value = "")]
    pub frame_id: String,
    /// Interrupt poll interval (e.g. 100ms, 1s).
    #[arg(long, default_value = "100ms")]
    pub poll: String,
}

#[derive(Args, Debug)]
pub struct DriveArgs {
    /// Command input (file or FIFO). Default: stdin.
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,
    /// Interrupt poll interval (e.g. 100ms, 1s).
    #[arg(long, default_value = "100ms")]
    pub poll: String,
    /// Largest accepted command size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE)]
    pub max_message_size: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Open a read channel: stdin, a FIFO, or a regular file.
pub(crate) fn open_input(path: Option<&Path>) -> CliResult<File> {
    let file = match path {
        None => File::stdin(),
        Some(path) if Fifo::is_fifo(path) => {
            debug!(path = %path.display(), "opening input fifo");
            Fifo::open(path, FifoMode::Read, false).map(Fifo::into_file)
        }
        Some(path) => File::open_readonly(path),
    };
    file.map_err(|err| ipc_error("cannot open input", err))
}

/// Open a write channel: stdout, a FIFO, or a regular file (created or
/// truncated).
pub(crate) fn open_output(path: Option<&Path>) -> CliResult<File> {
    let file = match path {
        None => File::stdout(),
        Some(path) if Fifo::is_fifo(path) => {
            debug!(path = %path.display(), "opening output fifo");
            Fifo::open(path, FifoMode::Write, false).map(Fifo::into_file)
        }
        Some(path) => File::create(path),
    };
    file.map_err(|err| ipc_error("cannot open output", err))
}

/// Puts a channel in non-blocking mode and restores the previous mode on
/// drop. Stdin may be a shared terminal.
pub(crate) struct NonblockingGuard<'a> {
    file: &'a File,
    previous: bool,
}

impl<'a> NonblockingGuard<'a> {
    pub(crate) fn enable(file: &'a File) -> CliResult<Self> {
        let previous = file
            .is_nonblocking()
            .map_err(|err| ipc_error("cannot query input mode", err))?;
        file.set_nonblocking(true)
            .map_err(|err| ipc_error("cannot make input non-blocking", err))?;
        Ok(Self { file, previous })
    }
}

impl Drop for NonblockingGuard<'_> {
    fn drop(&mut self) {
        if !self.previous {
            let _ = self.file.set_nonblocking(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
    }

    #[test]
    fn open_input_reports_missing_path() {
        let err = open_input(Some(Path::new("/nonexistent/rix-input"))).unwrap_err();
        assert_eq!(err.code, crate::exit::CHANNEL_ERROR);
    }

    #[test]
    fn nonblocking_guard_restores_mode() {
        let (read_end, _write_end) = rix::ipc::Pipe::create().unwrap();
        let file = read_end.into_file();
        {
            let _guard = NonblockingGuard::enable(&file).unwrap();
            assert!(file.is_nonblocking().unwrap());
        }
        assert!(!file.is_nonblocking().unwrap());
    }
}
