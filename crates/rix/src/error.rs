/// Errors raised by the teleop and drive loops.
#[derive(Debug, thiserror::Error)]
pub enum RixError {
    /// Byte channel or signal error.
    #[error("ipc error: {0}")]
    Ipc(#[from] rix_ipc::IpcError),

    /// Message encoding, decoding or stream error.
    #[error("message error: {0}")]
    Msg(#[from] rix_msg::MsgError),

    /// The robot rejected a drive command.
    #[error("drive command failed: {0}")]
    Drive(String),
}

pub type Result<T> = std::result::Result<T, RixError>;
