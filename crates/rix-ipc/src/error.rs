use std::path::PathBuf;

/// Errors that can occur in byte-channel and signal operations.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Failed to open the specified path.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to create a named pipe at the specified path.
    #[error("failed to create fifo {path}: {source}")]
    CreateFifo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on a byte channel.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A system call failed.
    #[error("{op} failed: {source}")]
    Os {
        op: &'static str,
        source: std::io::Error,
    },

    /// The signal number is outside the supported range.
    #[error("signal number {0} out of range (expected 1..=32)")]
    InvalidSignal(i32),

    /// The signal already has a notifier in this registry.
    #[error("signal {0} is already registered")]
    AlreadyRegistered(i32),

    /// The signal has no notifier in this registry.
    #[error("signal {0} is not registered")]
    NotRegistered(i32),

    /// The signal is owned by another registry in this process.
    #[error("signal {0} is owned by another registry")]
    SignalInUse(i32),
}

impl IpcError {
    /// Wrap the current `errno` as a failed system call.
    pub(crate) fn last_os(op: &'static str) -> Self {
        Self::Os {
            op,
            source: std::io::Error::last_os_error(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IpcError>;
