use rix::ipc::signal::SIGINT;
use rix::ipc::SignalRegistry;
use rix::{Teleop, TeleopConfig};
use tracing::info;

use crate::cmd::{open_input, open_output, parse_duration, NonblockingGuard, TeleopArgs};
use crate::exit::{ipc_error, rix_error, CliResult, SUCCESS};

pub fn run(args: TeleopArgs, signals: &SignalRegistry) -> CliResult<i32> {
    let config = TeleopConfig {
        linear_speed: args.linear_speed,
        angular_speed: args.angular_speed,
        poll: parse_duration(&args.poll)?,
        frame_id: args.frame_id,
    };

    let input = open_input(args.input.as_deref())?;
    let output = open_output(args.output.as_deref())?;
    let sigint = signals
        .register(SIGINT)
        .map_err(|err| ipc_error("cannot watch SIGINT", err))?;

    let _nonblocking = NonblockingGuard::enable(&input)?;
    let mut teleop = Teleop::new(&input, &output, config);
    let sent = teleop
        .spin(&sigint)
        .map_err(|err| rix_error("teleop failed", err))?;

    info!(sent, "teleop finished");
    Ok(SUCCESS)
}
