//! Byte channels and signal notification for single-threaded polling loops.
//!
//! - [`File`], [`Fifo`] and [`Pipe`] wrap a single descriptor and implement
//!   the [`Io`] byte-channel trait (blocking or non-blocking reads and writes,
//!   readiness polling with a timeout).
//! - [`SignalRegistry`] turns an OS signal into a waitable [`Notification`]
//!   using the self-pipe pattern.
//!
//! Unix only.

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod fifo;
#[cfg(unix)]
pub mod file;
#[cfg(unix)]
pub mod pipe;
#[cfg(unix)]
pub mod signal;

pub use error::{IpcError, Result};
pub use traits::{Io, Notification};

#[cfg(unix)]
pub use fifo::{Fifo, FifoMode};
#[cfg(unix)]
pub use file::File;
#[cfg(unix)]
pub use pipe::Pipe;
#[cfg(unix)]
pub use signal::{Signal, SignalRegistry, MAX_SIGNAL};
