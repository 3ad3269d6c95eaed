use rix::ipc::signal::SIGINT;
use rix::ipc::{File, Signal, SignalRegistry};
use rix::msg::StreamConfig;
use rix::{Driver, DriverConfig, MBot, PrintMBot, RecordingMBot};
use tracing::info;

use crate::cmd::{open_input, parse_duration, DriveArgs, NonblockingGuard};
use crate::exit::{ipc_error, rix_error, CliResult, SUCCESS};
use crate::output::{print_command, print_command_table, OutputFormat};

pub fn run(args: DriveArgs, format: OutputFormat, signals: &SignalRegistry) -> CliResult<i32> {
    let config = DriverConfig {
        poll: parse_duration(&args.poll)?,
        stream: StreamConfig {
            max_message_size: args.max_message_size,
        },
    };

    let input = open_input(args.input.as_deref())?;
    let sigint = signals
        .register(SIGINT)
        .map_err(|err| ipc_error("cannot watch SIGINT", err))?;
    let _nonblocking = NonblockingGuard::enable(&input)?;

    let forwarded = match format {
        OutputFormat::Table => {
            let mut mbot = RecordingMBot::default();
            let forwarded = spin(&input, &mut mbot, config, &sigint)?;
            print_command_table(mbot.commands());
            forwarded
        }
        OutputFormat::Json | OutputFormat::Pretty => {
            let mbot = PrintMBot::new(|cmd| print_command(cmd, format));
            spin(&input, mbot, config, &sigint)?
        }
    };

    info!(forwarded, "drive finished");
    Ok(SUCCESS)
}

fn spin<M: MBot>(
    input: &File,
    mbot: M,
    config: DriverConfig,
    sigint: &Signal<'_>,
) -> CliResult<usize> {
    Driver::with_config(input, mbot, config)
        .spin(sigint)
        .map_err(|err| rix_error("drive failed", err))
}
