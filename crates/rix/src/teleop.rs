use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use rix_ipc::Notification;
use rix_msg::geometry::{Twist2D, Twist2DStamped};
use rix_msg::standard::{Header, Time};
use rix_msg::MessageWriter;
use tracing::{debug, info, trace, warn};

use crate::error::Result;

/// Default poll interval between notification checks.
pub const DEFAULT_POLL: Duration = Duration::from_millis(100);

/// Keyboard teleop settings.
#[derive(Debug, Clone)]
pub struct TeleopConfig {
    /// Forward/backward speed for `w`/`s`, in m/s.
    pub linear_speed: f64,
    /// Rotation speed for `a`/`d`, in rad/s.
    pub angular_speed: f64,
    /// How long each iteration waits on the notification.
    pub poll: Duration,
    /// Frame id stamped on every outgoing header.
    pub frame_id: String,
}

impl Default for TeleopConfig {
    fn default() -> Self {
        Self {
            linear_speed: 0.5,
            angular_speed: 1.0,
            poll: DEFAULT_POLL,
            frame_id: String::new(),
        }
    }
}

/// Map a key to a twist command. Returns `None` for keys with no binding.
pub fn twist_for_key(key: u8, linear_speed: f64, angular_speed: f64) -> Option<Twist2D> {
    let twist = match key {
        b'w' => Twist2D::new(linear_speed, 0.0, 0.0),
        b's' => Twist2D::new(-linear_speed, 0.0, 0.0),
        b'a' => Twist2D::new(0.0, 0.0, angular_speed),
        b'd' => Twist2D::new(0.0, 0.0, -angular_speed),
        b' ' => Twist2D::default(),
        _ => return None,
    };
    Some(twist)
}

/// Reads key bytes from `R` and writes size-prefixed `Twist2DStamped`
/// messages to `W`.
pub struct Teleop<R, W> {
    input: R,
    writer: MessageWriter<W>,
    config: TeleopConfig,
    seq: u32,
}

impl<R: Read, W: Write> Teleop<R, W> {
    pub fn new(input: R, output: W, config: TeleopConfig) -> Self {
        Self {
            input,
            writer: MessageWriter::new(output),
            config,
            seq: 0,
        }
    }

    /// Run until `notif` fires or the input reaches end of stream.
    ///
    /// Returns the number of commands written.
    pub fn spin<N: Notification + ?Sized>(&mut self, notif: &N) -> Result<usize> {
        info!(
            linear_speed = self.config.linear_speed,
            angular_speed = self.config.angular_speed,
            "teleop started"
        );
        let mut sent = 0usize;

        loop {
            if notif.wait(self.config.poll)? {
                info!(sent, "teleop interrupted");
                break;
            }

            let mut key = [0u8; 1];
            match self.input.read(&mut key) {
                Ok(0) => {
                    info!(sent, "teleop input closed");
                    break;
                }
                Ok(_) => {}
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock
                        || err.kind() == ErrorKind::Interrupted =>
                {
                    continue
                }
                Err(err) => {
                    warn!(error = %err, "teleop read failed");
                    continue;
                }
            }

            let Some(twist) =
                twist_for_key(key[0], self.config.linear_speed, self.config.angular_speed)
            else {
                trace!(key = key[0], "ignoring unbound key");
                continue;
            };

            let cmd = self.stamp(twist);
            self.writer.write_message(&cmd)?;
            debug!(
                seq = cmd.header.seq,
                vx = cmd.twist.vx,
                wz = cmd.twist.wz,
                "sent drive command"
            );
            sent += 1;
        }

        Ok(sent)
    }

    /// Wrap `twist` in a header with the next sequence number and the
    /// current time.
    pub fn stamp(&mut self, twist: Twist2D) -> Twist2DStamped {
        self.seq = self.seq.wrapping_add(1);
        Twist2DStamped {
            header: Header {
                seq: self.seq,
                stamp: Time::now(),
                frame_id: self.config.frame_id.clone(),
            },
            twist,
        }
    }

    pub fn config(&self) -> &TeleopConfig {
        &self.config
    }

    pub fn into_parts(self) -> (R, W) {
        (self.input, self.writer.into_inner())
    }
}
