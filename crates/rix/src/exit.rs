use std::fmt;
use std::io;

use rix::ipc::IpcError;
use rix::msg::MsgError;
use rix::RixError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const CHANNEL_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::InvalidInput => USAGE,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => DATA_INVALID,
        _ => CHANNEL_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn ipc_error(context: &str, err: IpcError) -> CliError {
    match err {
        IpcError::Io(source) => io_error(context, source),
        IpcError::InvalidSignal(_) => CliError::new(USAGE, format!("{context}: {err}")),
        IpcError::AlreadyRegistered(_)
        | IpcError::NotRegistered(_)
        | IpcError::SignalInUse(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
        other => CliError::new(CHANNEL_ERROR, format!("{context}: {other}")),
    }
}

pub fn msg_error(context: &str, err: MsgError) -> CliError {
    match err {
        MsgError::Io(source) => io_error(context, source),
        MsgError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn rix_error(context: &str, err: RixError) -> CliError {
    match err {
        RixError::Ipc(err) => ipc_error(context, err),
        RixError::Msg(err) => msg_error(context, err),
        RixError::Drive(_) => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}
