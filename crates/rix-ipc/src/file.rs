use std::fs::OpenOptions;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{IpcError, Result};
use crate::traits::Io;

/// A byte channel backed by a single owned file descriptor.
///
/// The descriptor is closed when the `File` is dropped. Cloning goes through
/// [`File::try_clone`], which `dup`s the descriptor so both handles share one
/// open file description.
pub struct File {
    fd: OwnedFd,
}

impl File {
    /// Default permission mode for files created by [`File::create`].
    pub const DEFAULT_CREATE_MODE: u32 = 0o644;

    /// Open `path` with explicit options.
    pub fn open(path: impl AsRef<Path>, options: &OpenOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = options.open(path).map_err(|e| IpcError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(?path, "opened file");
        Ok(Self {
            fd: OwnedFd::from(file),
        })
    }

    /// Open an existing file for reading.
    pub fn open_readonly(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path, OpenOptions::new().read(true))
    }

    /// Create (or truncate) a file for writing.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(
            path,
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(Self::DEFAULT_CREATE_MODE),
        )
    }

    /// Remove the file at `path`.
    pub fn remove(path: impl AsRef<Path>) -> Result<()> {
        std::fs::remove_file(path.as_ref()).map_err(IpcError::Io)
    }

    /// Take ownership of an already-open descriptor.
    pub fn from_fd(fd: OwnedFd) -> Self {
        Self { fd }
    }

    /// A duplicate of the process's standard input.
    pub fn stdin() -> Result<Self> {
        let fd = std::io::stdin().as_fd().try_clone_to_owned()?;
        Ok(Self { fd })
    }

    /// A duplicate of the process's standard output.
    pub fn stdout() -> Result<Self> {
        let fd = std::io::stdout().as_fd().try_clone_to_owned()?;
        Ok(Self { fd })
    }

    /// Duplicate the descriptor.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            fd: self.fd.try_clone()?,
        })
    }

    /// The raw descriptor number.
    pub fn fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    /// Create a pipe and wrap both ends, read end first. Both ends are
    /// close-on-exec.
    pub(crate) fn pipe() -> Result<(Self, Self)> {
        let mut fds = [-1 as libc::c_int; 2];
        create_pipe(&mut fds)?;
        // SAFETY: the pipe was created, so both descriptors are open and owned by us.
        let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
        let read = Self { fd: read };
        let write = Self { fd: write };
        Ok((read, write))
    }

    /// Whether the descriptor is closed on `exec`.
    pub fn is_cloexec(&self) -> Result<bool> {
        // SAFETY: fcntl on a descriptor we own; F_GETFD takes no pointer argument.
        let flags = unsafe { libc::fcntl(self.fd(), libc::F_GETFD) };
        if flags < 0 {
            return Err(IpcError::last_os("fcntl(F_GETFD)"));
        }
        Ok(flags & libc::FD_CLOEXEC != 0)
    }

    fn status_flags(&self) -> Result<libc::c_int> {
        // SAFETY: fcntl on a descriptor we own; F_GETFL takes no pointer argument.
        let flags = unsafe { libc::fcntl(self.fd(), libc::F_GETFL) };
        if flags < 0 {
            return Err(IpcError::last_os("fcntl(F_GETFL)"));
        }
        Ok(flags)
    }
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd"
))]
fn create_pipe(fds: &mut [libc::c_int; 2]) -> Result<()> {
    // SAFETY: `fds` is a valid writable array of two descriptors.
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
    if rc != 0 {
        return Err(IpcError::last_os("pipe2"));
    }
    Ok(())
}

// No pipe2: the flag is set right after creation instead.
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd"
)))]
fn create_pipe(fds: &mut [libc::c_int; 2]) -> Result<()> {
    // SAFETY: `fds` is a valid writable array of two descriptors.
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if rc != 0 {
        return Err(IpcError::last_os("pipe"));
    }
    for &fd in fds.iter() {
        // SAFETY: fcntl on a descriptor pipe(2) just returned.
        let rc = unsafe { libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) };
        if rc < 0 {
            let err = IpcError::last_os("fcntl(F_SETFD)");
            // SAFETY: both descriptors are open and not yet owned elsewhere.
            unsafe {
                libc::close(fds[0]);
                libc::close(fds[1]);
            }
            return Err(err);
        }
    }
    Ok(())
}

impl Io for File {
    fn read(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        // SAFETY: `buf` is valid for writes of `buf.len()` bytes.
        let n = unsafe { libc::read(self.fd(), buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    fn write(&self, buf: &[u8]) -> std::io::Result<usize> {
        // SAFETY: `buf` is valid for reads of `buf.len()` bytes.
        let n = unsafe { libc::write(self.fd(), buf.as_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    fn wait_for_readable(&self, timeout: Option<Duration>) -> Result<bool> {
        poll_fd(self.fd(), libc::POLLIN, timeout)
    }

    fn wait_for_writable(&self, timeout: Option<Duration>) -> Result<bool> {
        poll_fd(self.fd(), libc::POLLOUT, timeout)
    }

    fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        let flags = self.status_flags()?;
        let flags = if nonblocking {
            flags | libc::O_NONBLOCK
        } else {
            flags & !libc::O_NONBLOCK
        };
        // SAFETY: fcntl on a descriptor we own; F_SETFL takes an integer argument.
        let rc = unsafe { libc::fcntl(self.fd(), libc::F_SETFL, flags) };
        if rc < 0 {
            return Err(IpcError::last_os("fcntl(F_SETFL)"));
        }
        Ok(())
    }

    fn is_nonblocking(&self) -> Result<bool> {
        Ok(self.status_flags()? & libc::O_NONBLOCK != 0)
    }
}

impl std::io::Read for File {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Io::read(&*self, buf)
    }
}

impl std::io::Read for &File {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Io::read(*self, buf)
    }
}

impl std::io::Write for File {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Io::write(&*self, buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl std::io::Write for &File {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Io::write(*self, buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl AsFd for File {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for File {
    fn as_raw_fd(&self) -> RawFd {
        self.fd()
    }
}

impl From<OwnedFd> for File {
    fn from(fd: OwnedFd) -> Self {
        Self::from_fd(fd)
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File").field("fd", &self.fd()).finish()
    }
}

/// Poll a single descriptor for `events`.
///
/// `EINTR` restarts the poll with whatever is left of the timeout. Hang-up
/// and error conditions count as ready so the following read or write can
/// report them.
pub(crate) fn poll_fd(fd: RawFd, events: libc::c_short, timeout: Option<Duration>) -> Result<bool> {
    let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
    loop {
        let timeout_ms = match (timeout, deadline) {
            (None, _) | (Some(_), None) => -1,
            (Some(_), Some(deadline)) => {
                millis_ceil(deadline.saturating_duration_since(Instant::now()))
            }
        };
        let mut pfd = libc::pollfd {
            fd,
            events,
            revents: 0,
        };
        // SAFETY: `pfd` is a single valid pollfd and nfds is 1.
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            return Err(IpcError::Os {
                op: "poll",
                source: err,
            });
        }
        let ready = events | libc::POLLHUP | libc::POLLERR;
        return Ok(rc > 0 && pfd.revents & ready != 0);
    }
}

fn millis_ceil(d: Duration) -> libc::c_int {
    let mut ms = d.as_millis();
    if d.subsec_nanos() % 1_000_000 != 0 {
        ms += 1;
    }
    ms.min(libc::c_int::MAX as u128) as libc::c_int
}
