//! Keyboard teleoperation and robot drive loops over Unix byte channels.
//!
//! # Crate Structure
//!
//! - [`ipc`] - Files, FIFOs, pipes and signal notification
//! - [`msg`] - Binary message codec, standard messages and stream framing
//! - [`teleop`] - Turns key presses into stamped twist commands
//! - [`driver`] - Reads twist commands and forwards them to a robot

/// Re-export byte channel and signal types.
pub mod ipc {
    pub use rix_ipc::*;
}

/// Re-export message codec types.
pub mod msg {
    pub use rix_msg::*;
}

pub mod driver;
pub mod error;
pub mod teleop;

#[cfg(test)]
mod testing;

pub use driver::{Driver, DriverConfig, MBot, PrintMBot, RecordingMBot};
pub use error::{Result, RixError};
pub use teleop::{twist_for_key, Teleop, TeleopConfig};
