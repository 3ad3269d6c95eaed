use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rix::msg::geometry::Twist2DStamped;
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct DriveCommandOutput<'a> {
    seq: u32,
    stamp_sec: u32,
    stamp_nsec: u32,
    frame_id: &'a str,
    vx: f64,
    vy: f64,
    wz: f64,
}

impl<'a> From<&'a Twist2DStamped> for DriveCommandOutput<'a> {
    fn from(cmd: &'a Twist2DStamped) -> Self {
        Self {
            seq: cmd.header.seq,
            stamp_sec: cmd.header.stamp.sec,
            stamp_nsec: cmd.header.stamp.nsec,
            frame_id: &cmd.header.frame_id,
            vx: cmd.twist.vx,
            vy: cmd.twist.vy,
            wz: cmd.twist.wz,
        }
    }
}

/// Print one drive command as it arrives. Table output is collected and
/// printed once by [`print_command_table`].
pub fn print_command(cmd: &Twist2DStamped, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&DriveCommandOutput::from(cmd))
                    .unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Pretty | OutputFormat::Table => {
            println!(
                "Received Drive Command: vx={}, vy={}, wz={}",
                cmd.twist.vx, cmd.twist.vy, cmd.twist.wz
            );
        }
    }
}

pub fn print_command_table(cmds: &[Twist2DStamped]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["SEQ", "STAMP", "FRAME", "VX", "VY", "WZ"]);

    for cmd in cmds {
        let stamp = &cmd.header.stamp;
        table.add_row(vec![
            cmd.header.seq.to_string(),
            format!("{}.{:09}", stamp.sec, stamp.nsec),
            cmd.header.frame_id.clone(),
            format!("{:.3}", cmd.twist.vx),
            format!("{:.3}", cmd.twist.vy),
            format!("{:.3}", cmd.twist.wz),
        ]);
    }
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use rix::msg::geometry::Twist2D;

    use super::*;

    #[test]
    fn json_output_fields() {
        let mut cmd = Twist2DStamped::default();
        cmd.header.seq = 4;
        cmd.header.frame_id = "base".to_string();
        cmd.twist = Twist2D::new(0.5, 0.0, -1.0);

        let value = serde_json::to_value(DriveCommandOutput::from(&cmd)).unwrap();
        assert_eq!(value["seq"], 4);
        assert_eq!(value["frame_id"], "base");
        assert_eq!(value["vx"], 0.5);
        assert_eq!(value["wz"], -1.0);
    }
}
