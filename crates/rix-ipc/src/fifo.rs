use std::ffi::CString;
use std::fs::OpenOptions;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::{IpcError, Result};
use crate::file::File;
use crate::traits::Io;

/// Which side of a FIFO this handle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoMode {
    Read,
    Write,
}

/// A named pipe on the filesystem.
///
/// The node is not removed on drop; other processes may still be using it.
/// Call [`File::remove`] when it is no longer needed.
#[derive(Debug)]
pub struct Fifo {
    file: File,
    path: PathBuf,
    mode: FifoMode,
}

impl Fifo {
    /// Permission mode for FIFO nodes created by [`Fifo::open`].
    pub const DEFAULT_FIFO_MODE: libc::mode_t = 0o666;

    /// Create the FIFO at `path` if needed, then open it in `mode`.
    ///
    /// An existing FIFO is reused; an existing path of any other type is
    /// rejected. With `nonblocking`, opening the read side succeeds without a
    /// writer, while opening the write side fails with `ENXIO` until a reader
    /// exists.
    pub fn open(path: impl AsRef<Path>, mode: FifoMode, nonblocking: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        make_fifo(&path)?;

        let mut options = OpenOptions::new();
        match mode {
            FifoMode::Read => options.read(true),
            FifoMode::Write => options.write(true),
        };
        if nonblocking {
            options.custom_flags(libc::O_NONBLOCK);
        }
        let file = File::open(&path, &options)?;
        debug!(?path, ?mode, nonblocking, "opened fifo");

        Ok(Self { file, path, mode })
    }

    /// Whether `path` currently names a FIFO.
    pub fn is_fifo(path: impl AsRef<Path>) -> bool {
        std::fs::metadata(path.as_ref())
            .map(|m| m.file_type().is_fifo())
            .unwrap_or(false)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> FifoMode {
        self.mode
    }

    /// Duplicate the descriptor, keeping path and mode.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
            path: self.path.clone(),
            mode: self.mode,
        })
    }

    /// Give up the FIFO wrapper and keep the plain file.
    pub fn into_file(self) -> File {
        self.file
    }
}

fn make_fifo(path: &Path) -> Result<()> {
    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| IpcError::CreateFifo {
        path: path.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path contains an interior nul byte",
        ),
    })?;

    // SAFETY: `c_path` is a valid nul-terminated string for the duration of the call.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), Fifo::DEFAULT_FIFO_MODE) };
    if rc == 0 {
        debug!(?path, "created fifo");
        return Ok(());
    }

    let err = std::io::Error::last_os_error();
    if err.kind() != std::io::ErrorKind::AlreadyExists {
        return Err(IpcError::CreateFifo {
            path: path.to_path_buf(),
            source: err,
        });
    }
    if !Fifo::is_fifo(path) {
        return Err(IpcError::CreateFifo {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "existing path is not a fifo",
            ),
        });
    }
    Ok(())
}

impl Io for Fifo {
    fn read(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }

    fn write(&self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn wait_for_readable(&self, timeout: Option<Duration>) -> Result<bool> {
        self.file.wait_for_readable(timeout)
    }

    fn wait_for_writable(&self, timeout: Option<Duration>) -> Result<bool> {
        self.file.wait_for_writable(timeout)
    }

    fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.file.set_nonblocking(nonblocking)
    }

    fn is_nonblocking(&self) -> Result<bool> {
        self.file.is_nonblocking()
    }
}

impl AsFd for Fifo {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl AsRawFd for Fifo {
    fn as_raw_fd(&self) -> RawFd {
        self.file.fd()
    }
}
