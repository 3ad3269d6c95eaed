use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::time::Duration;

use crate::error::Result;
use crate::file::File;
use crate::traits::Io;

/// One end of an anonymous pipe.
#[derive(Debug)]
pub struct Pipe {
    file: File,
    read_end: bool,
}

impl Pipe {
    /// Create a connected pair, returned as `(read_end, write_end)`.
    ///
    /// Both descriptors are close-on-exec.
    pub fn create() -> Result<(Pipe, Pipe)> {
        let (read, write) = File::pipe()?;
        Ok((
            Pipe {
                file: read,
                read_end: true,
            },
            Pipe {
                file: write,
                read_end: false,
            },
        ))
    }

    pub fn is_read_end(&self) -> bool {
        self.read_end
    }

    pub fn is_write_end(&self) -> bool {
        !self.read_end
    }

    /// Duplicate this end of the pipe.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
            read_end: self.read_end,
        })
    }

    /// The raw descriptor number.
    pub fn fd(&self) -> RawFd {
        self.file.fd()
    }

    /// Give up the pipe wrapper and keep the plain file.
    pub fn into_file(self) -> File {
        self.file
    }
}

impl Io for Pipe {
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

impl AsFd for Pipe {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl AsRawFd for Pipe {
    fn as_raw_fd(&self) -> RawFd {
        self.fd()
    }
}
