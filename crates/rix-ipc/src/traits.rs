use std::time::Duration;

use crate::error::Result;

/// A duplex, optionally non-blocking byte channel.
///
/// This is the fundamental I/O capability shared by files, named FIFOs and
/// anonymous pipes. Reads and writes report raw `std::io` results so callers
/// can tell `WouldBlock` and `Interrupted` apart from real failures.
pub trait Io {
    /// Read up to `buf.len()` bytes. Returns `Ok(0)` at end of stream.
    fn read(&self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Write up to `buf.len()` bytes, returning how many were written.
    fn write(&self, buf: &[u8]) -> std::io::Result<usize>;

    /// Wait until the channel has data to read.
    ///
    /// `None` waits forever. Returns `false` if the timeout elapsed first.
    fn wait_for_readable(&self, timeout: Option<Duration>) -> Result<bool>;

    /// Wait until the channel can accept a write.
    ///
    /// `None` waits forever. Returns `false` if the timeout elapsed first.
    fn wait_for_writable(&self, timeout: Option<Duration>) -> Result<bool>;

    /// Toggle `O_NONBLOCK` on the underlying descriptor.
    fn set_nonblocking(&self, nonblocking: bool) -> Result<()>;

    /// Whether the underlying descriptor is in non-blocking mode.
    fn is_nonblocking(&self) -> Result<bool>;
}

/// Something a command loop can wait on to learn that it should stop.
pub trait Notification {
    /// Block for at most `timeout`; `true` means the event occurred.
    fn wait(&self, timeout: Duration) -> Result<bool>;
}

impl<N: Notification + ?Sized> Notification for &N {
    fn wait(&self, timeout: Duration) -> Result<bool> {
        (**self).wait(timeout)
    }
}

impl<N: Notification + ?Sized> Notification for Box<N> {
    fn wait(&self, timeout: Duration) -> Result<bool> {
        (**self).wait(timeout)
    }
}
