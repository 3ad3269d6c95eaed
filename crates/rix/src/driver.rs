use std::io::Read;
use std::time::Duration;

use rix_ipc::Notification;
use rix_msg::geometry::Twist2DStamped;
use rix_msg::{MessageReader, MsgError, StreamConfig};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::teleop::DEFAULT_POLL;

/// A robot base that accepts planar velocity commands.
pub trait MBot {
    fn drive(&mut self, cmd: &Twist2DStamped) -> Result<()>;
}

impl<M: MBot + ?Sized> MBot for &mut M {
    fn drive(&mut self, cmd: &Twist2DStamped) -> Result<()> {
        (**self).drive(cmd)
    }
}

impl<M: MBot + ?Sized> MBot for Box<M> {
    fn drive(&mut self, cmd: &Twist2DStamped) -> Result<()> {
        (**self).drive(cmd)
    }
}

/// Keeps every command it is given.
#[derive(Debug, Default)]
pub struct RecordingMBot {
    commands: Vec<Twist2DStamped>,
}

impl RecordingMBot {
    pub fn commands(&self) -> &[Twist2DStamped] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Twist2DStamped> {
        self.commands
    }
}

impl MBot for RecordingMBot {
    fn drive(&mut self, cmd: &Twist2DStamped) -> Result<()> {
        self.commands.push(cmd.clone());
        Ok(())
    }
}

/// Hands every command to a callback, typically one that prints it.
pub struct PrintMBot<F> {
    print: F,
}

impl<F: FnMut(&Twist2DStamped)> PrintMBot<F> {
    pub fn new(print: F) -> Self {
        Self { print }
    }
}

impl<F: FnMut(&Twist2DStamped)> MBot for PrintMBot<F> {
    fn drive(&mut self, cmd: &Twist2DStamped) -> Result<()> {
        (self.print)(cmd);
        Ok(())
    }
}

/// Drive loop settings.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// How long each iteration waits on the notification.
    pub poll: Duration,
    /// Framing limits for the command stream.
    pub stream: StreamConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll: DEFAULT_POLL,
            stream: StreamConfig::default(),
        }
    }
}

/// Reads size-prefixed `Twist2DStamped` commands and forwards them to an
/// [`MBot`].
pub struct Driver<R, M> {
    reader: MessageReader<R>,
    mbot: M,
    poll: Duration,
}

impl<R: Read, M: MBot> Driver<R, M> {
    pub fn new(input: R, mbot: M) -> Self {
        Self::with_config(input, mbot, DriverConfig::default())
    }

    pub fn with_config(input: R, mbot: M, config: DriverConfig) -> Self {
        Self {
            reader: MessageReader::with_config(input, config.stream),
            mbot,
            poll: config.poll,
        }
    }

    /// Run until `notif` fires or the input reaches end of stream, then
    /// send one stop command.
    ///
    /// Commands that fail to decode and transient read errors are skipped;
    /// an oversize command is fatal. Returns the number of
    /// commands forwarded, not counting the final stop.
    pub fn spin<N: Notification + ?Sized>(&mut self, notif: &N) -> Result<usize> {
        info!(poll_ms = self.poll.as_millis() as u64, "driver started");
        let mut forwarded = 0usize;

        loop {
            if notif.wait(self.poll)? {
                info!(forwarded, "driver interrupted");
                break;
            }

            match self.reader.read_message::<Twist2DStamped>() {
                Ok(Some(cmd)) => {
                    debug!(
                        seq = cmd.header.seq,
                        vx = cmd.twist.vx,
                        vy = cmd.twist.vy,
                        wz = cmd.twist.wz,
                        "received drive command"
                    );
                    self.mbot.drive(&cmd)?;
                    forwarded += 1;
                }
                Ok(None) => {}
                Err(MsgError::ConnectionClosed) => {
                    info!(forwarded, "driver input closed");
                    break;
                }
                Err(
                    err @ (MsgError::Truncated { .. }
                    | MsgError::InvalidUtf8(_)
                    | MsgError::InvalidBool(_)),
                ) => {
                    warn!(error = %err, "skipping undecodable drive command");
                }
                Err(MsgError::Io(err)) => {
                    warn!(error = %err, "driver read failed");
                }
                Err(err) => return Err(err.into()),
            }
        }

        self.mbot.drive(&Twist2DStamped::stop())?;
        debug!("sent stop command");
        Ok(forwarded)
    }

    pub fn mbot(&self) -> &M {
        &self.mbot
    }

    pub fn into_mbot(self) -> M {
        self.mbot
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rix_msg::geometry::Twist2D;
    use rix_msg::standard::Header;
    use rix_msg::MessageWriter;

    use super::*;
    use crate::error::RixError;
    use crate::testing::ScriptedNotification;

    fn encode_all(cmds: &[Twist2DStamped]) -> Vec<u8> {
        let mut writer = MessageWriter::new(Vec::new());
        for cmd in cmds {
            writer.write_message(cmd).unwrap();
        }
        writer.into_inner()
    }

    fn cmd(seq: u32, vx: f64, wz: f64) -> Twist2DStamped {
        Twist2DStamped {
            header: Header {
                seq,
                ..Header::default()
            },
            twist: Twist2D::new(vx, 0.0, wz),
        }
    }

    #[test]
    fn forwards_commands_then_stops_at_eof() {
        let wire = encode_all(&[cmd(1, 0.5, 0.0), cmd(2, 0.0, -1.0), cmd(3, 0.0, 0.0)]);
        let mut driver = Driver::new(Cursor::new(wire), RecordingMBot::default());

        let forwarded = driver.spin(&ScriptedNotification::never()).unwrap();
        assert_eq!(forwarded, 3);

        let cmds = driver.into_mbot().into_commands();
        assert_eq!(cmds.len(), 4);
        assert_eq!(cmds[0], cmd(1, 0.5, 0.0));
        assert_eq!(cmds[1].twist.wz, -1.0);
        assert!(cmds[3].twist.is_stop());
    }

    #[test]
    fn notification_sends_stop_without_reading() {
        let wire = encode_all(&[cmd(1, 0.5, 0.0)]);
        let mut driver = Driver::new(Cursor::new(wire), RecordingMBot::default());

        assert_eq!(driver.spin(&ScriptedNotification::on_call(2)).unwrap(), 1);
        assert_eq!(driver.mbot().commands().len(), 2);
        assert!(driver.mbot().commands()[1].twist.is_stop());
    }

    #[test]
    fn undecodable_command_is_skipped() {
        let mut wire = 2u32.to_ne_bytes().to_vec();
        wire.extend_from_slice(&[0xff, 0xff]);
        wire.extend(encode_all(&[cmd(7, 1.0, 0.0)]));

        let mut driver = Driver::new(Cursor::new(wire), RecordingMBot::default());
        assert_eq!(driver.spin(&ScriptedNotification::never()).unwrap(), 1);
        assert_eq!(driver.mbot().commands()[0].header.seq, 7);
    }

    #[test]
    fn read_error_is_retried() {
        let source = FailsOnceThen {
            failed: false,
            bytes: Cursor::new(encode_all(&[cmd(5, 0.25, 0.0)])),
        };
        let mut driver = Driver::new(source, RecordingMBot::default());

        assert_eq!(driver.spin(&ScriptedNotification::never()).unwrap(), 1);
        let cmds = driver.mbot().commands();
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0].header.seq, 5);
        assert!(cmds[1].twist.is_stop());
    }

    struct FailsOnceThen {
        failed: bool,
        bytes: Cursor<Vec<u8>>,
    }

    impl Read for FailsOnceThen {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.failed {
                self.failed = true;
                return Err(std::io::Error::from_raw_os_error(libc::EIO));
            }
            self.bytes.read(buf)
        }
    }

    #[test]
    fn oversized_command_is_an_error() {
        let config = DriverConfig {
            stream: StreamConfig {
                max_message_size: 8,
            },
            ..DriverConfig::default()
        };
        let wire = encode_all(&[cmd(1, 0.5, 0.0)]);
        let mut driver = Driver::with_config(Cursor::new(wire), RecordingMBot::default(), config);

        let err = driver.spin(&ScriptedNotification::never()).unwrap_err();
        assert!(matches!(
            err,
            RixError::Msg(MsgError::MessageTooLarge { max: 8, .. })
        ));
    }

    #[test]
    fn mbot_failure_propagates() {
        struct Refuses;

        impl MBot for Refuses {
            fn drive(&mut self, _cmd: &Twist2DStamped) -> Result<()> {
                Err(RixError::Drive("motors disabled".to_string()))
            }
        }

        let wire = encode_all(&[cmd(1, 0.5, 0.0)]);
        let mut driver = Driver::new(Cursor::new(wire), Refuses);
        let err = driver.spin(&ScriptedNotification::never()).unwrap_err();
        assert!(err.to_string().contains("motors disabled"));
    }

    #[test]
    fn print_mbot_sees_every_command() {
        let mut seen = Vec::new();
        {
            let wire = encode_all(&[cmd(1, 0.5, 0.0), cmd(2, -0.5, 0.0)]);
            let mbot = PrintMBot::new(|c: &Twist2DStamped| seen.push(c.twist.vx));
            let mut driver = Driver::new(Cursor::new(wire), mbot);
            driver.spin(&ScriptedNotification::never()).unwrap();
        }
        assert_eq!(seen, [0.5, -0.5, 0.0]);
    }
}
