//! Self-pipe signal notification.
//!
//! Registering a signal creates a pipe pair and installs a handler that writes
//! one marker byte to the write end on every delivery. [`Signal::wait`] polls
//! the read end, so an asynchronous signal becomes an ordinary, timeout-bounded
//! event in the caller's control flow.
//!
//! Policy:
//! - registering a signal that already has a notifier in the same registry is
//!   rejected with [`IpcError::AlreadyRegistered`]; further handles come from
//!   [`SignalRegistry::handle`] or by cloning a [`Signal`];
//! - dropping a [`Signal`] never tears anything down; [`SignalRegistry::reset`]
//!   restores `SIG_DFL` and frees the slot, and dropping the registry resets
//!   every slot it still holds.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{IpcError, Result};
use crate::pipe::Pipe;
use crate::traits::{Io, Notification};

pub use libc::{SIGALRM, SIGHUP, SIGINT, SIGTERM, SIGUSR1, SIGUSR2};

/// Highest signal number a registry can hold.
pub const MAX_SIGNAL: i32 = 32;

const SLOTS: usize = MAX_SIGNAL as usize;

/// Byte written by the handler for each delivery.
const MARKER: u8 = 1;

const DRAIN_CHUNK: usize = 64;

/// Write end of the notifier pipe for each signal, or -1.
///
/// Signal dispositions are per process, so this is the one piece of state the
/// handler can reach. It never holds anything but a descriptor number.
static DELIVERY: [AtomicI32; SLOTS] = [const { AtomicI32::new(-1) }; SLOTS];

fn slot_index(signum: i32) -> Option<usize> {
    if (1..=MAX_SIGNAL).contains(&signum) {
        Some((signum - 1) as usize)
    } else {
        None
    }
}

/// Async-signal-safe: one atomic load and one non-blocking `write(2)`.
extern "C" fn on_signal(signum: libc::c_int) {
    let Some(index) = slot_index(signum) else {
        return;
    };
    let fd = DELIVERY[index].load(Ordering::Acquire);
    if fd < 0 {
        return;
    }

    let errno = errno_location();
    // SAFETY: `errno_location` returns the calling thread's errno slot or null.
    let saved = if errno.is_null() { 0 } else { unsafe { *errno } };
    let marker = MARKER;
    // SAFETY: `marker` is a live one-byte buffer; a full or closed pipe only
    // makes the write fail, which is ignored here.
    unsafe {
        libc::write(fd, (&marker as *const u8).cast(), 1);
    }
    if !errno.is_null() {
        // SAFETY: same thread-local errno slot as above.
        unsafe { *errno = saved };
    }
}

#[cfg(target_os = "linux")]
fn errno_location() -> *mut libc::c_int {
    // SAFETY: always returns the calling thread's errno address.
    unsafe { libc::__errno_location() }
}

#[cfg(target_os = "android")]
fn errno_location() -> *mut libc::c_int {
    // SAFETY: always returns the calling thread's errno address.
    unsafe { libc::__errno() }
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
fn errno_location() -> *mut libc::c_int {
    // SAFETY: always returns the calling thread's errno address.
    unsafe { libc::__error() }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd"
)))]
fn errno_location() -> *mut libc::c_int {
    std::ptr::null_mut()
}

fn set_disposition(signum: i32, handler: libc::sighandler_t) -> Result<()> {
    // SAFETY: an all-zero sigaction is a valid starting value.
    let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
    action.sa_sigaction = handler;
    action.sa_flags = libc::SA_RESTART;
    // SAFETY: `action.sa_mask` is a valid sigset_t owned by this frame.
    unsafe { libc::sigemptyset(&mut action.sa_mask) };
    // SAFETY: `action` is fully initialized and the old action is not requested.
    let rc = unsafe { libc::sigaction(signum, &action, std::ptr::null_mut()) };
    if rc != 0 {
        return Err(IpcError::last_os("sigaction"));
    }
    Ok(())
}

fn handler_address() -> libc::sighandler_t {
    on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t
}

/// The pipe pair owned by one registered slot.
#[derive(Debug)]
struct Notifier {
    read_end: Pipe,
    write_end: Pipe,
}

impl Notifier {
    fn new() -> Result<Self> {
        let (read_end, write_end) = Pipe::create()?;
        read_end.set_nonblocking(true)?;
        write_end.set_nonblocking(true)?;
        Ok(Self {
            read_end,
            write_end,
        })
    }

    /// Consume every marker currently buffered.
    fn drain(&self) -> Result<usize> {
        let mut buf = [0u8; DRAIN_CHUNK];
        let mut total = 0usize;
        loop {
            match self.read_end.read(&mut buf) {
                Ok(0) => return Ok(total),
                Ok(n) => total = total.saturating_add(n),
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => return Ok(total),
                Err(err) => return Err(IpcError::Io(err)),
            }
        }
    }
}

/// Table of signal notifiers, one slot per signal number 1..=32.
///
/// A registry is an ordinary value owned by the caller. Because signal
/// dispositions are process-wide, a given signal can belong to at most one
/// registry at a time; a second registry asking for it gets
/// [`IpcError::SignalInUse`].
pub struct SignalRegistry {
    slots: [Mutex<Option<Arc<Notifier>>>; SLOTS],
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| Mutex::new(None)),
        }
    }

    /// Create the notifier for `signum` and install its handler.
    ///
    /// The slot is filled and published before `sigaction` runs, so a
    /// delivery racing the installation always finds a complete entry.
    pub fn register(&self, signum: i32) -> Result<Signal<'_>> {
        let index = slot_index(signum).ok_or(IpcError::InvalidSignal(signum))?;
        let mut slot = lock(&self.slots[index]);
        if slot.is_some() {
            return Err(IpcError::AlreadyRegistered(signum));
        }

        let notifier = Arc::new(Notifier::new()?);
        DELIVERY[index]
            .compare_exchange(
                -1,
                notifier.write_end.fd(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| IpcError::SignalInUse(signum))?;
        *slot = Some(notifier);

        if let Err(err) = set_disposition(signum, handler_address()) {
            DELIVERY[index].store(-1, Ordering::Release);
            *slot = None;
            return Err(err);
        }

        debug!(signum, "registered signal notifier");
        Ok(Signal {
            registry: self,
            signum,
        })
    }

    /// Bind another handle to an already registered signal.
    pub fn handle(&self, signum: i32) -> Result<Signal<'_>> {
        self.notifier(signum)?;
        Ok(Signal {
            registry: self,
            signum,
        })
    }

    pub fn is_registered(&self, signum: i32) -> bool {
        slot_index(signum).is_some_and(|index| lock(&self.slots[index]).is_some())
    }

    /// Restore the default disposition for `signum` and free its slot.
    ///
    /// Markers still buffered are discarded. A `wait` already in progress keeps
    /// the pipe alive until it returns.
    pub fn reset(&self, signum: i32) -> Result<()> {
        let index = slot_index(signum).ok_or(IpcError::InvalidSignal(signum))?;
        let mut slot = lock(&self.slots[index]);
        let notifier = slot.take().ok_or(IpcError::NotRegistered(signum))?;

        DELIVERY[index].store(-1, Ordering::Release);
        let restored = set_disposition(signum, libc::SIG_DFL);
        drop(notifier);
        restored?;

        debug!(signum, "reset signal to default disposition");
        Ok(())
    }

    /// Signal numbers currently registered, in ascending order.
    pub fn registered(&self) -> Vec<i32> {
        (1..=MAX_SIGNAL)
            .filter(|&signum| self.is_registered(signum))
            .collect()
    }

    fn notifier(&self, signum: i32) -> Result<Arc<Notifier>> {
        let index = slot_index(signum).ok_or(IpcError::InvalidSignal(signum))?;
        lock(&self.slots[index])
            .clone()
            .ok_or(IpcError::NotRegistered(signum))
    }
}

impl Default for SignalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SignalRegistry {
    fn drop(&mut self) {
        for signum in self.registered() {
            if let Err(err) = self.reset(signum) {
                warn!(signum, error = %err, "failed to reset signal on registry drop");
            }
        }
    }
}

impl std::fmt::Debug for SignalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalRegistry")
            .field("registered", &self.registered())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A handle bound to one signal slot of a [`SignalRegistry`].
///
/// Handles are cheap to copy and all handles for the same signal observe the
/// same events: a marker drained by one is gone for the others.
#[derive(Debug, Clone, Copy)]
pub struct Signal<'r> {
    registry: &'r SignalRegistry,
    signum: i32,
}

impl<'r> Signal<'r> {
    pub fn signum(&self) -> i32 {
        self.signum
    }

    pub fn registry(&self) -> &'r SignalRegistry {
        self.registry
    }

    /// Deliver the signal to the calling thread.
    ///
    /// Refused once the slot has been reset, since the default disposition
    /// would usually terminate the process.
    pub fn raise(&self) -> Result<()> {
        self.registry.notifier(self.signum)?;
        // SAFETY: raise(3) has no memory-safety preconditions.
        let rc = unsafe { libc::raise(self.signum) };
        if rc != 0 {
            return Err(IpcError::last_os("raise"));
        }
        Ok(())
    }

    /// Deliver the signal to process `pid`.
    pub fn kill(&self, pid: libc::pid_t) -> Result<()> {
        self.registry.notifier(self.signum)?;
        // SAFETY: kill(2) has no memory-safety preconditions.
        let rc = unsafe { libc::kill(pid, self.signum) };
        if rc != 0 {
            return Err(IpcError::last_os("kill"));
        }
        Ok(())
    }

    /// Wait up to `timeout` for the signal; `true` if it occurred.
    ///
    /// Every buffered marker is consumed, so several deliveries before one
    /// call collapse into a single `true`.
    pub fn wait(&self, timeout: Duration) -> Result<bool> {
        Ok(self.wait_count(timeout)? > 0)
    }

    /// Like [`Signal::wait`], but report how many deliveries were drained.
    ///
    /// Returns 0 when the timeout elapses with nothing buffered.
    pub fn wait_count(&self, timeout: Duration) -> Result<usize> {
        let notifier = self.registry.notifier(self.signum)?;
        if !notifier.read_end.wait_for_readable(Some(timeout))? {
            return Ok(0);
        }
        notifier.drain()
    }
}

impl Notification for Signal<'_> {
    fn wait(&self, timeout: Duration) -> Result<bool> {
        Signal::wait(self, timeout)
    }
}
